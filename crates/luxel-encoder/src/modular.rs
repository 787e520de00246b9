//! Modular (lossless) coding path
//!
//! Channel pipeline: optional RCT across the first three channels, MED
//! residuals per channel, entropy coding, one length-prefixed section per
//! channel. Responsive encodes squeeze the planes first and split the
//! coefficient regions across refinement frames.

use std::sync::{Arc, Mutex};

use luxel_bitstream::BitstreamWriter;
use luxel_core::{Error, ImageFrame, Result};
use luxel_entropy::encode_residual_section;
use luxel_runtime::{Kernels, WorkStealingPool};

use crate::frame::{
    extra_channel_to_i32, med_max_sample, plane_to_i32, uses_med, uses_rct, write_section,
    MAX_MED_BIT_DEPTH,
};

/// Encode the color channels of a modular frame into per-channel sections.
///
/// Channels run concurrently on the pool; sections are then emitted in
/// channel order so the bitstream is independent of completion order.
pub(crate) fn modular_payload(
    frame: &ImageFrame,
    use_ans: bool,
    kernels: &'static dyn Kernels,
    pool: &WorkStealingPool,
) -> Result<Vec<u8>> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let pixel_type = frame.pixel_type();
    let max_sample = med_max_sample(frame.bit_depth);

    let mut planes: Vec<Vec<i32>> = frame.buffer.planes().iter().map(plane_to_i32).collect();
    if uses_rct(planes.len(), pixel_type, frame.color_space) {
        let (first, rest) = planes.split_at_mut(1);
        let (second, third) = rest.split_at_mut(1);
        kernels.rct_forward(&mut first[0], &mut second[0], &mut third[0]);
    }

    let med = uses_med(pixel_type);
    let slots: Vec<Arc<Mutex<Option<Result<Vec<u8>>>>>> = planes
        .iter()
        .map(|_| Arc::new(Mutex::new(None)))
        .collect();
    for (plane, slot) in planes.into_iter().zip(slots.iter()) {
        let slot = Arc::clone(slot);
        pool.submit(move || {
            let residuals = if med {
                kernels.med_residuals(&plane, width, height, max_sample)
            } else {
                plane
            };
            *slot.lock().unwrap() = Some(encode_residual_section(&residuals, use_ans));
        });
    }
    pool.wait_for_all();

    let mut writer = BitstreamWriter::new();
    for slot in &slots {
        let section = slot
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::EncodingFailed("channel job dropped".to_string()))??;
        write_section(&mut writer, &section);
    }

    for ec in &frame.extra_channels {
        let samples = extra_channel_to_i32(ec, frame.width(), frame.height());
        let w = (frame.width() >> ec.dim_shift).max(1) as usize;
        let h = (frame.height() >> ec.dim_shift).max(1) as usize;
        let residuals = if ec.bit_depth <= MAX_MED_BIT_DEPTH {
            kernels.med_residuals(&samples, w, h, med_max_sample(ec.bit_depth))
        } else {
            samples
        };
        let section = encode_residual_section(&residuals, use_ans)?;
        write_section(&mut writer, &section);
    }

    Ok(writer.into_bytes())
}

/// Delta frame payload: plain per-sample differences against the
/// reference slot, one section per color channel. No RCT and no MED; the
/// differences are already small.
pub(crate) fn delta_payload(
    planes: &[Vec<i32>],
    reference: &[Vec<i32>],
    use_ans: bool,
) -> Result<Vec<u8>> {
    if planes.len() != reference.len() {
        return Err(Error::EncodingFailed(format!(
            "delta against {} reference channels, frame has {}",
            reference.len(),
            planes.len()
        )));
    }
    let mut writer = BitstreamWriter::new();
    for (plane, ref_plane) in planes.iter().zip(reference.iter()) {
        if plane.len() != ref_plane.len() {
            return Err(Error::EncodingFailed("delta reference size mismatch".to_string()));
        }
        let residuals: Vec<i32> = plane
            .iter()
            .zip(ref_plane.iter())
            .map(|(&a, &b)| a - b)
            .collect();
        let section = encode_residual_section(&residuals, use_ans)?;
        write_section(&mut writer, &section);
    }
    Ok(writer.into_bytes())
}

/// Region sizes produced by `levels` squeeze applications, largest first;
/// entry 0 is the full frame.
pub(crate) fn squeeze_regions(width: usize, height: usize, levels: usize) -> Vec<(usize, usize)> {
    let mut regions = vec![(width, height)];
    let (mut w, mut h) = (width, height);
    for _ in 0..levels {
        w = w.div_ceil(2);
        h = h.div_ceil(2);
        regions.push((w, h));
    }
    regions
}

/// Apply `levels` recursive squeeze passes in place (full-width stride).
pub(crate) fn apply_squeeze(
    plane: &mut [i32],
    width: usize,
    height: usize,
    levels: usize,
    kernels: &'static dyn Kernels,
) {
    let (mut w, mut h) = (width, height);
    for _ in 0..levels {
        kernels.squeeze_horizontal(plane, w, h, width);
        kernels.squeeze_vertical(plane, w, h, width);
        w = w.div_ceil(2);
        h = h.div_ceil(2);
    }
}

/// Samples of one responsive layer in transmission order.
///
/// Layer 0 is the deepest average region; layer i >= 1 carries the detail
/// samples of the region one level up, skipping its top-left average
/// quadrant (already known from earlier layers).
pub(crate) fn layer_samples(
    plane: &[i32],
    stride: usize,
    regions: &[(usize, usize)],
    layer: usize,
) -> Vec<i32> {
    let levels = regions.len() - 1;
    if layer == 0 {
        let (w, h) = regions[levels];
        let mut samples = Vec::with_capacity(w * h);
        for y in 0..h {
            samples.extend_from_slice(&plane[y * stride..y * stride + w]);
        }
        samples
    } else {
        let (w, h) = regions[levels - layer];
        let (inner_w, inner_h) = regions[levels - layer + 1];
        let mut samples = Vec::with_capacity(w * h - inner_w * inner_h);
        for y in 0..h {
            for x in 0..w {
                if y < inner_h && x < inner_w {
                    continue;
                }
                samples.push(plane[y * stride + x]);
            }
        }
        samples
    }
}
