//! VarDCT (lossy) coding path
//!
//! Per channel, per 8x8 block: forward DCT, quantization against the
//! distance-derived matrix (optionally rescaled per block by the adaptive
//! / ROI scale map), DC prediction in raster order, zigzag scan, entropy
//! emission. Channels transform concurrently on the pool; DC prediction
//! and emission run as a serial second pass so the bitstream is
//! deterministic regardless of scheduling.

use std::sync::{Arc, Mutex};

use luxel_bitstream::BitstreamWriter;
use luxel_color::{rgb_planes_to_xyb, rgb_planes_to_ycbcr, srgb_to_linear};
use luxel_core::consts::{BLOCK_COEFFS, END_OF_CHANNEL};
use luxel_core::{BufferPool, ColorSpace, Error, ImageFrame, RegionOfInterest, Result};
use luxel_entropy::{
    ac_context, dc_context, encode_coeff_band_rle, encode_residual_section, modular_context,
    signed_to_symbol, RansEncoder, NUM_CONTEXTS,
};
use luxel_headers::frame::color_transform;
use luxel_runtime::{Kernels, WorkStealingPool};
use luxel_transform::{
    adaptive_scale, extract_block, roi_factor, scan_block, QuantMatrix,
    ADAPTIVE_QUANT_CALIBRATION,
};

use crate::frame::{
    extra_channel_to_i32, frame_to_f32_planes, med_max_sample, write_section, MAX_MED_BIT_DEPTH,
};

/// Working-range scale: transformed channels are coded in 0..255 units so
/// the distance-derived quantization steps land where they were tuned.
const SAMPLE_SCALE: f32 = 255.0;

/// Fixed-point granularity of the per-block scale map
const SCALE_MAP_UNIT: f32 = 64.0;

pub(crate) struct VarDctSettings {
    pub distance: f32,
    pub color_transform: u32,
    pub adaptive: bool,
    pub roi: Option<RegionOfInterest>,
    pub num_passes: u8,
    pub use_ans: bool,
}

pub(crate) struct VarDctOutput {
    pub payload: Vec<u8>,
    pub has_scale_map: bool,
}

/// Coefficient bands per pass: pass 0 carries the DC of every block, the
/// remaining passes split the 63 AC positions into contiguous chunks.
pub(crate) fn pass_bands(num_passes: u8) -> Vec<(usize, usize)> {
    if num_passes <= 1 {
        return vec![(0, BLOCK_COEFFS)];
    }
    let mut bands = vec![(0, 1)];
    let parts = (num_passes - 1) as usize;
    let mut start = 1;
    for p in 0..parts {
        let len = 63 / parts + usize::from(p < 63 % parts);
        bands.push((start, start + len));
        start += len;
    }
    bands
}

/// Whether this channel index gets the chroma matrix under the given
/// transform. XYB keeps luminance in channel 1; YCbCr keeps it in 0.
fn is_chroma(transform: u32, channel: usize) -> bool {
    match transform {
        color_transform::YCBCR => channel == 1 || channel == 2,
        color_transform::XYB => channel == 0 || channel == 2,
        _ => false,
    }
}

fn luma_channel(transform: u32) -> usize {
    if transform == color_transform::XYB {
        1
    } else {
        0
    }
}

/// Per-block matrix multipliers from adaptive quantization and the ROI
/// boost, quantized to 1/64 steps so encoder and decoder agree exactly.
fn build_scale_map(
    luma: &[f32],
    width: usize,
    height: usize,
    adaptive: bool,
    roi: Option<&RegionOfInterest>,
    kernels: &'static dyn Kernels,
) -> Vec<u8> {
    let blocks_x = width.div_ceil(8);
    let blocks_y = height.div_ceil(8);
    let mut map = Vec::with_capacity(blocks_x * blocks_y);
    let mut spatial = [0.0f32; BLOCK_COEFFS];
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let mut multiplier = 1.0f32;
            if adaptive {
                extract_block(luma, width, height, bx, by, &mut spatial);
                let sigma = kernels.block_variance(&spatial).sqrt();
                multiplier /= adaptive_scale(sigma, ADAPTIVE_QUANT_CALIBRATION);
            }
            if let Some(roi) = roi {
                multiplier *= roi_factor(roi, bx, by);
            }
            let byte = (multiplier * SCALE_MAP_UNIT).round().clamp(1.0, 255.0) as u8;
            map.push(byte);
        }
    }
    map
}

/// Transform, quantize and zigzag-scan one channel; 64 coefficients per
/// block in raster order.
fn transform_channel(
    plane: &[f32],
    width: usize,
    height: usize,
    matrix: QuantMatrix,
    scale_map: Option<&[u8]>,
    kernels: &'static dyn Kernels,
) -> Vec<i16> {
    let blocks_x = width.div_ceil(8);
    let blocks_y = height.div_ceil(8);
    let num_blocks = blocks_x * blocks_y;

    let mut scanned = vec![0i16; num_blocks * BLOCK_COEFFS];
    let mut spatial = [0.0f32; BLOCK_COEFFS];
    let mut coeffs = [0.0f32; BLOCK_COEFFS];
    let mut quantized = [0i16; BLOCK_COEFFS];
    let mut zigzagged = [0i16; BLOCK_COEFFS];

    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let block_index = by * blocks_x + bx;
            extract_block(plane, width, height, bx, by, &mut spatial);
            kernels.forward_dct(&spatial, &mut coeffs);

            let effective = match scale_map {
                Some(map) => matrix.scaled(map[block_index] as f32 / SCALE_MAP_UNIT),
                None => matrix,
            };
            kernels.quantize(&coeffs, &effective, &mut quantized);

            scan_block(&quantized, &mut zigzagged);
            scanned[block_index * BLOCK_COEFFS..(block_index + 1) * BLOCK_COEFFS]
                .copy_from_slice(&zigzagged);
        }
    }

    scanned
}

/// Replace each block's DC with its residual against the causal-neighbor
/// prediction, in raster order.
fn predict_dcs(scanned: &mut [i16], blocks_x: usize, blocks_y: usize) {
    let dcs: Vec<i32> = (0..blocks_x * blocks_y)
        .map(|b| scanned[b * BLOCK_COEFFS] as i32)
        .collect();
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let b = by * blocks_x + bx;
            let left = (bx > 0).then(|| dcs[b - 1]);
            let above = (by > 0).then(|| dcs[b - blocks_x]);
            let predicted = luxel_transform::predict_dc(left, above);
            scanned[b * BLOCK_COEFFS] = (dcs[b] - predicted) as i16;
        }
    }
}

fn emit_pass_rle(
    writer: &mut BitstreamWriter,
    channels: &[ChannelData],
    band: (usize, usize),
) {
    for channel in channels {
        for b in 0..channel.num_blocks {
            let base = b * BLOCK_COEFFS;
            encode_coeff_band_rle(&channel.scanned[base + band.0..base + band.1], writer);
        }
        writer.write_varint(END_OF_CHANNEL);
    }
}

fn emit_pass_rans(
    writer: &mut BitstreamWriter,
    channels: &[ChannelData],
    band: (usize, usize),
) -> Result<()> {
    let mut encoder = RansEncoder::new(NUM_CONTEXTS);
    for (c, channel) in channels.iter().enumerate() {
        for b in 0..channel.num_blocks {
            let base = b * BLOCK_COEFFS;
            let mut run = 0usize;
            for i in band.0..band.1 {
                let value = channel.scanned[base + i];
                if i == 0 {
                    encoder.push(dc_context(c), signed_to_symbol(value as i32))?;
                    continue;
                }
                encoder.push(ac_context(i, run), signed_to_symbol(value as i32))?;
                if value == 0 {
                    run += 1;
                } else {
                    run = 0;
                }
            }
        }
        encoder.push(modular_context(), END_OF_CHANNEL)?;
    }
    let section = encoder.finish()?;
    write_section(writer, &section);
    Ok(())
}

struct ChannelData {
    scanned: Vec<i16>,
    num_blocks: usize,
}

pub(crate) fn encode_vardct_payload(
    frame: &ImageFrame,
    settings: &VarDctSettings,
    kernels: &'static dyn Kernels,
    pool: &WorkStealingPool,
    scratch: &Arc<BufferPool<f32>>,
) -> Result<VarDctOutput> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let blocks_x = width.div_ceil(8);
    let blocks_y = height.div_ceil(8);
    let num_blocks = blocks_x * blocks_y;

    // Color transform on normalized planes, then scale to working range
    let mut planes = frame_to_f32_planes(frame);
    let transform = settings.color_transform;
    let linearize = transform == color_transform::XYB && frame.color_space == ColorSpace::Srgb;
    if transform != color_transform::NONE && planes.len() >= 3 {
        let (c0, rest) = planes.split_at_mut(1);
        let (c1, c2) = rest.split_at_mut(1);
        if linearize {
            for plane in [&mut c0[0], &mut c1[0], &mut c2[0]] {
                for v in plane.iter_mut() {
                    *v = srgb_to_linear(*v);
                }
            }
        }
        match transform {
            color_transform::YCBCR => rgb_planes_to_ycbcr(&mut c0[0], &mut c1[0], &mut c2[0]),
            color_transform::XYB => rgb_planes_to_xyb(&mut c0[0], &mut c1[0], &mut c2[0]),
            _ => unreachable!(),
        }
    }
    for plane in planes.iter_mut() {
        for v in plane.iter_mut() {
            *v *= SAMPLE_SCALE;
        }
    }

    let has_scale_map =
        settings.adaptive || settings.roi.map(|r| r.boost > 0.0).unwrap_or(false);
    let scale_map: Option<Arc<Vec<u8>>> = has_scale_map.then(|| {
        Arc::new(build_scale_map(
            &planes[luma_channel(transform).min(planes.len() - 1)],
            width,
            height,
            settings.adaptive,
            settings.roi.as_ref(),
            kernels,
        ))
    });

    // One pool job per channel; results land in ordered slots
    let slots: Vec<Arc<Mutex<Option<Vec<i16>>>>> = planes
        .iter()
        .map(|_| Arc::new(Mutex::new(None)))
        .collect();
    for (c, (plane, slot)) in planes.iter().zip(slots.iter()).enumerate() {
        let matrix = QuantMatrix::from_distance(settings.distance, is_chroma(transform, c));
        let slot = Arc::clone(slot);
        let map = scale_map.clone();
        let pool_handle = Arc::clone(scratch);
        let mut buffer = pool_handle.acquire(plane.len());
        buffer.extend_from_slice(plane);
        pool.submit(move || {
            let result =
                transform_channel(
                    &buffer,
                    width,
                    height,
                    matrix,
                    map.as_deref().map(|v| v.as_slice()),
                    kernels,
                );
            pool_handle.release(buffer);
            *slot.lock().unwrap() = Some(result);
        });
    }
    pool.wait_for_all();

    let mut channels = Vec::with_capacity(slots.len());
    for slot in &slots {
        let scanned = slot
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::EncodingFailed("channel job dropped".to_string()))?;
        channels.push(ChannelData { scanned, num_blocks });
    }
    for channel in channels.iter_mut() {
        predict_dcs(&mut channel.scanned, blocks_x, blocks_y);
    }

    // Serial emission in raster order
    let mut writer = BitstreamWriter::new();
    if let Some(map) = &scale_map {
        writer.write_varint(map.len() as u64);
        writer.write_data(map);
    }
    for (pass_index, band) in pass_bands(settings.num_passes).into_iter().enumerate() {
        writer.flush_byte();
        writer.write_varint(pass_index as u64);
        writer.write_varint(band.0 as u64);
        writer.write_varint(band.1 as u64);
        if settings.use_ans {
            emit_pass_rans(&mut writer, &channels, band)?;
        } else {
            emit_pass_rle(&mut writer, &channels, band);
        }
    }
    writer.flush_byte();

    // Extra channels ride along losslessly
    for ec in &frame.extra_channels {
        let samples = extra_channel_to_i32(ec, frame.width(), frame.height());
        let w = (frame.width() >> ec.dim_shift).max(1) as usize;
        let h = (frame.height() >> ec.dim_shift).max(1) as usize;
        let residuals = if ec.bit_depth <= MAX_MED_BIT_DEPTH {
            kernels.med_residuals(&samples, w, h, med_max_sample(ec.bit_depth))
        } else {
            samples
        };
        let section = encode_residual_section(&residuals, settings.use_ans)?;
        write_section(&mut writer, &section);
    }

    Ok(VarDctOutput {
        payload: writer.into_bytes(),
        has_scale_map,
    })
}
