//! VarDCT-path decoding
//!
//! Collects quantized coefficients across the progressive passes, then
//! reconstructs: DC un-prediction in raster order, inverse zigzag,
//! dequantization (honoring the per-block scale map), inverse DCT,
//! inverse color transform.

use luxel_bitstream::BitstreamReader;
use luxel_color::{linear_to_srgb, xyb_planes_to_rgb, ycbcr_planes_to_rgb};
use luxel_core::consts::{BLOCK_COEFFS, END_OF_CHANNEL};
use luxel_core::{ColorSpace, Error, ExtraChannel, Result};
use luxel_entropy::{
    ac_context, dc_context, decode_coeff_band_rle, modular_context, symbol_to_signed, RansDecoder,
};
use luxel_headers::frame::{color_transform, FrameHeader};
use luxel_transform::{
    dequantize_block, inverse_dct_8x8, place_block, predict_dc, unscan_block, QuantMatrix,
};

use crate::modular::{decode_extra_channels, read_section};
use crate::DecodeContext;

/// Working-range scale shared with the encoder
const SAMPLE_SCALE: f32 = 255.0;
const SCALE_MAP_UNIT: f32 = 64.0;

fn is_chroma(transform: u32, channel: usize) -> bool {
    match transform {
        color_transform::YCBCR => channel == 1 || channel == 2,
        color_transform::XYB => channel == 0 || channel == 2,
        _ => false,
    }
}

/// Coefficient bands per pass; must mirror the encoder exactly.
fn pass_bands(num_passes: u8) -> Vec<(usize, usize)> {
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

pub(crate) fn decode_vardct(
    reader: &mut BitstreamReader<'_>,
    frame_header: &FrameHeader,
    context: &DecodeContext,
) -> Result<(Vec<Vec<i32>>, Vec<ExtraChannel>)> {
    let width = context.width;
    let height = context.height;
    let blocks_x = width.div_ceil(8);
    let blocks_y = height.div_ceil(8);
    let num_blocks = blocks_x * blocks_y;
    let channel_count = context.header.channels.count();
    let transform = frame_header.color_transform;

    let scale_map: Option<Vec<u8>> = if frame_header.has_scale_map {
        let count = reader.read_varint()? as usize;
        if count != num_blocks {
            return Err(Error::DecodeFailed(format!(
                "scale map covers {} blocks, frame has {}",
                count, num_blocks
            )));
        }
        Some(reader.read_data(count)?.to_vec())
    } else {
        None
    };

    // Gather coefficients across passes
    let mut scanned: Vec<Vec<i16>> = (0..channel_count)
        .map(|_| vec![0i16; num_blocks * BLOCK_COEFFS])
        .collect();
    for expected_pass in 0..frame_header.num_passes {
        reader.skip_to_byte_alignment();
        let pass_index = reader.read_varint()?;
        if pass_index != expected_pass as u64 {
            return Err(Error::DecodeFailed(format!(
                "pass {} where {} was expected",
                pass_index, expected_pass
            )));
        }
        let first = reader.read_varint()? as usize;
        let last = reader.read_varint()? as usize;
        if first >= last || last > BLOCK_COEFFS {
            return Err(Error::DecodeFailed(format!(
                "coefficient band {}..{}",
                first, last
            )));
        }
        let expected = pass_bands(frame_header.num_passes)[expected_pass as usize];
        if (first, last) != expected {
            return Err(Error::DecodeFailed(format!(
                "band {}..{} does not match the pass layout",
                first, last
            )));
        }

        if frame_header.use_ans {
            decode_pass_rans(reader, &mut scanned, num_blocks, (first, last))?;
        } else {
            decode_pass_rle(reader, &mut scanned, num_blocks, (first, last))?;
        }
    }
    reader.skip_to_byte_alignment();

    let extra_channels = decode_extra_channels(reader, context, frame_header.use_ans)?;

    // Reconstruct each channel
    let mut planes: Vec<Vec<f32>> = Vec::with_capacity(channel_count);
    for (c, channel_scanned) in scanned.iter().enumerate() {
        let matrix = QuantMatrix::from_distance(frame_header.distance, is_chroma(transform, c));
        planes.push(reconstruct_channel(
            channel_scanned,
            width,
            height,
            blocks_x,
            blocks_y,
            &matrix,
            scale_map.as_deref(),
        ));
    }

    // Back to normalized range, then undo the color transform
    for plane in planes.iter_mut() {
        for v in plane.iter_mut() {
            *v /= SAMPLE_SCALE;
        }
    }
    let linearized = transform == color_transform::XYB
        && context.header.color_space == ColorSpace::Srgb;
    if transform != color_transform::NONE && planes.len() >= 3 {
        let (c0, rest) = planes.split_at_mut(1);
        let (c1, c2) = rest.split_at_mut(1);
        match transform {
            color_transform::YCBCR => ycbcr_planes_to_rgb(&mut c0[0], &mut c1[0], &mut c2[0]),
            color_transform::XYB => xyb_planes_to_rgb(&mut c0[0], &mut c1[0], &mut c2[0]),
            other => {
                return Err(Error::DecodeFailed(format!("color transform {}", other)));
            }
        }
        if linearized {
            for plane in [&mut c0[0], &mut c1[0], &mut c2[0]] {
                for v in plane.iter_mut() {
                    *v = linear_to_srgb(*v);
                }
            }
        }
    }
    let working = planes
        .iter()
        .map(|p| {
            let plane = luxel_core::Plane::from_f32(context.header.pixel_type, p);
            match &plane {
                luxel_core::Plane::F32(v) => v.iter().map(|&s| s.to_bits() as i32).collect(),
                luxel_core::Plane::U8(v) => v.iter().map(|&s| s as i32).collect(),
                luxel_core::Plane::U16(v) => v.iter().map(|&s| s as i32).collect(),
                luxel_core::Plane::I16(v) => v.iter().map(|&s| s as i32).collect(),
            }
        })
        .collect();

    Ok((working, extra_channels))
}

fn decode_pass_rle(
    reader: &mut BitstreamReader<'_>,
    scanned: &mut [Vec<i16>],
    num_blocks: usize,
    band: (usize, usize),
) -> Result<()> {
    let band_len = band.1 - band.0;
    for channel in scanned.iter_mut() {
        for b in 0..num_blocks {
            let coeffs = decode_coeff_band_rle(reader, band_len)?;
            let base = b * BLOCK_COEFFS;
            channel[base + band.0..base + band.1].copy_from_slice(&coeffs);
        }
        let token = reader.read_varint()?;
        if token != END_OF_CHANNEL {
            return Err(Error::DecodeFailed(format!(
                "missing end-of-channel token, got {:#x}",
                token
            )));
        }
    }
    Ok(())
}

fn decode_pass_rans(
    reader: &mut BitstreamReader<'_>,
    scanned: &mut [Vec<i16>],
    num_blocks: usize,
    band: (usize, usize),
) -> Result<()> {
    let section = read_section(reader)?;
    let mut decoder = RansDecoder::new(section)?;
    for (c, channel) in scanned.iter_mut().enumerate() {
        for b in 0..num_blocks {
            let base = b * BLOCK_COEFFS;
            let mut run = 0usize;
            for i in band.0..band.1 {
                let value = if i == 0 {
                    symbol_to_signed(decoder.read(dc_context(c))?)
                } else {
                    let v = symbol_to_signed(decoder.read(ac_context(i, run))?);
                    if v == 0 {
                        run += 1;
                    } else {
                        run = 0;
                    }
                    v
                };
                channel[base + i] = value as i16;
            }
        }
        let token = decoder.read(modular_context())?;
        if token != END_OF_CHANNEL {
            return Err(Error::DecodeFailed(format!(
                "missing end-of-channel token, got {:#x}",
                token
            )));
        }
    }
    Ok(())
}

fn reconstruct_channel(
    scanned: &[i16],
    width: usize,
    height: usize,
    blocks_x: usize,
    blocks_y: usize,
    matrix: &QuantMatrix,
    scale_map: Option<&[u8]>,
) -> Vec<f32> {
    // Undo DC prediction in raster order
    let num_blocks = blocks_x * blocks_y;
    let mut dcs = vec![0i32; num_blocks];
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let b = by * blocks_x + bx;
            let left = (bx > 0).then(|| dcs[b - 1]);
            let above = (by > 0).then(|| dcs[b - blocks_x]);
            dcs[b] = scanned[b * BLOCK_COEFFS] as i32 + predict_dc(left, above);
        }
    }

    let mut plane = vec![0.0f32; width * height];
    let mut zigzagged = [0i16; BLOCK_COEFFS];
    let mut block = [0i16; BLOCK_COEFFS];
    let mut dequantized = [0.0f32; BLOCK_COEFFS];
    let mut spatial = [0.0f32; BLOCK_COEFFS];
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let b = by * blocks_x + bx;
            let base = b * BLOCK_COEFFS;
            zigzagged.copy_from_slice(&scanned[base..base + BLOCK_COEFFS]);
            zigzagged[0] = dcs[b] as i16;
            unscan_block(&zigzagged, &mut block);

            let effective = match scale_map {
                Some(map) => matrix.scaled(map[b] as f32 / SCALE_MAP_UNIT),
                None => *matrix,
            };
            dequantize_block(&block, &effective, &mut dequantized);
            inverse_dct_8x8(&dequantized, &mut spatial);
            place_block(&mut plane, width, height, bx, by, &spatial);
        }
    }
    plane
}
