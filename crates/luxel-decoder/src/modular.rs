//! Modular-path decoding: lossless frames, delta frames and responsive
//! squeeze pyramids. Mirrors the encoder's deterministic rules exactly.

use luxel_bitstream::BitstreamReader;
use luxel_core::{ColorSpace, Error, ExtraChannel, PixelType, Plane, Result};
use luxel_entropy::decode_residual_section;
use luxel_headers::FrameHeader;
use luxel_transform::{med_reconstruct, unsqueeze_horizontal, unsqueeze_vertical};

use crate::DecodeContext;

/// Deepest extra channel still safe for i32 gradient prediction; must
/// match the encoder's rule.
const MAX_MED_BIT_DEPTH: u8 = 28;

fn med_max_sample(bit_depth: u8) -> i32 {
    if bit_depth >= 31 {
        i32::MAX
    } else {
        (1i32 << bit_depth) - 1
    }
}

fn uses_rct(channel_count: usize, pixel_type: PixelType, color_space: ColorSpace) -> bool {
    channel_count >= 3
        && pixel_type != PixelType::F32
        && !matches!(color_space, ColorSpace::Cmyk | ColorSpace::Grayscale)
}

fn uses_med(pixel_type: PixelType) -> bool {
    pixel_type != PixelType::F32
}

/// Working i32 representation back to a typed plane. Floats travel as
/// bit patterns, everything else clamps into its storage range.
pub(crate) fn plane_from_working(pixel_type: PixelType, samples: &[i32]) -> Plane {
    match pixel_type {
        PixelType::U8 => Plane::U8(samples.iter().map(|&s| s.clamp(0, 255) as u8).collect()),
        PixelType::U16 => Plane::U16(samples.iter().map(|&s| s.clamp(0, 65535) as u16).collect()),
        PixelType::I16 => Plane::I16(
            samples
                .iter()
                .map(|&s| s.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
                .collect(),
        ),
        PixelType::F32 => Plane::F32(samples.iter().map(|&s| f32::from_bits(s as u32)).collect()),
    }
}

/// Read one length-prefixed channel section.
pub(crate) fn read_section<'a>(reader: &mut BitstreamReader<'a>) -> Result<&'a [u8]> {
    let len = reader.read_varint()? as usize;
    reader.read_data(len)
}

/// Decode a full modular frame: color channel sections, then extra
/// channels.
pub(crate) fn decode_modular(
    reader: &mut BitstreamReader<'_>,
    context: &DecodeContext,
    use_ans: bool,
) -> Result<(Vec<Vec<i32>>, Vec<ExtraChannel>)> {
    let width = context.width;
    let height = context.height;
    let pixel_type = context.header.pixel_type;
    let channel_count = context.header.channels.count();
    let max_sample = med_max_sample(context.header.bits_per_sample);
    let med = uses_med(pixel_type);

    let mut planes = Vec::with_capacity(channel_count);
    for _ in 0..channel_count {
        let section = read_section(reader)?;
        let residuals = decode_residual_section(section, width * height, use_ans)?;
        let samples = if med {
            med_reconstruct(&residuals, width, height, max_sample)
        } else {
            residuals
        };
        planes.push(samples);
    }

    if uses_rct(channel_count, pixel_type, context.header.color_space) {
        let (c0, rest) = planes.split_at_mut(1);
        let (c1, c2) = rest.split_at_mut(1);
        luxel_color::inverse_rct(&mut c0[0], &mut c1[0], &mut c2[0]);
    }

    let extra_channels = decode_extra_channels(reader, context, use_ans)?;
    Ok((planes, extra_channels))
}

/// Extra-channel sections shared by the modular and VarDCT payloads.
pub(crate) fn decode_extra_channels(
    reader: &mut BitstreamReader<'_>,
    context: &DecodeContext,
    use_ans: bool,
) -> Result<Vec<ExtraChannel>> {
    let mut extra_channels = Vec::with_capacity(context.header.extra_channels.len());
    for info in &context.header.extra_channels {
        let w = (context.width as u32 >> info.dim_shift).max(1) as usize;
        let h = (context.height as u32 >> info.dim_shift).max(1) as usize;
        let section = read_section(reader)?;
        let residuals = decode_residual_section(section, w * h, use_ans)?;
        let samples = if info.bit_depth <= MAX_MED_BIT_DEPTH {
            med_reconstruct(&residuals, w, h, med_max_sample(info.bit_depth))
        } else {
            residuals
        };
        let bytes_per_sample = (info.bit_depth as usize).div_ceil(8);
        let mut data = Vec::with_capacity(samples.len() * bytes_per_sample);
        for &s in &samples {
            let v = s as u32;
            for b in 0..bytes_per_sample {
                data.push((v >> (8 * b)) as u8);
            }
        }
        extra_channels.push(ExtraChannel {
            kind: info.kind,
            bit_depth: info.bit_depth,
            dim_shift: info.dim_shift,
            name: info.name.clone(),
            data,
        });
    }
    Ok(extra_channels)
}

/// Delta frame: per-channel residuals added onto the reference slot.
pub(crate) fn decode_delta(
    reader: &mut BitstreamReader<'_>,
    reference: &[Vec<i32>],
    use_ans: bool,
) -> Result<Vec<Vec<i32>>> {
    let mut planes = Vec::with_capacity(reference.len());
    for ref_plane in reference {
        let section = read_section(reader)?;
        let residuals = decode_residual_section(section, ref_plane.len(), use_ans)?;
        planes.push(
            ref_plane
                .iter()
                .zip(residuals.iter())
                .map(|(&r, &d)| r + d)
                .collect(),
        );
    }
    Ok(planes)
}

/// Squeeze pyramid shared across responsive modular layers.
pub(crate) struct ResponsiveState {
    planes: Vec<Vec<i32>>,
    regions: Vec<(usize, usize)>,
    layers: usize,
    next_layer: usize,
}

impl ResponsiveState {
    pub fn new(context: &DecodeContext, layers: usize) -> Result<Self> {
        if layers < 2 {
            return Err(Error::DecodeFailed(format!(
                "responsive stream with {} layers",
                layers
            )));
        }
        let levels = layers - 1;
        let mut regions = vec![(context.width, context.height)];
        let (mut w, mut h) = (context.width, context.height);
        for _ in 0..levels {
            w = w.div_ceil(2);
            h = h.div_ceil(2);
            regions.push((w, h));
        }
        let plane_len = context.width * context.height;
        Ok(Self {
            planes: (0..context.header.channels.count())
                .map(|_| vec![0i32; plane_len])
                .collect(),
            regions,
            layers,
            next_layer: 0,
        })
    }

    /// Decode one layer and produce the image reconstructable from the
    /// layers seen so far (lower resolution until the final layer lands).
    pub fn decode_layer(
        &mut self,
        reader: &mut BitstreamReader<'_>,
        frame_header: &FrameHeader,
        context: &DecodeContext,
    ) -> Result<luxel_core::ImageFrame> {
        let layer = frame_header.layer_index as usize;
        if layer != self.next_layer || layer >= self.layers {
            return Err(Error::DecodeFailed(format!(
                "responsive layer {} out of order",
                layer
            )));
        }
        self.next_layer += 1;

        let stride = context.width;
        let levels = self.layers - 1;
        let mut extra_channels = Vec::new();
        for plane in self.planes.iter_mut() {
            let count = layer_sample_count(&self.regions, layer);
            let section = read_section(reader)?;
            let values = decode_residual_section(section, count, frame_header.use_ans)?;
            let samples = if layer == 0 {
                let (bw, bh) = self.regions[levels];
                med_reconstruct(
                    &values,
                    bw,
                    bh,
                    med_max_sample(context.header.bits_per_sample),
                )
            } else {
                values
            };
            place_layer(plane, stride, &self.regions, layer, &samples)?;
        }
        if layer == 0 {
            extra_channels = decode_extra_channels(reader, context, frame_header.use_ans)?;
        }

        // Reconstruct the image available at this prefix
        let known_region = self.regions[levels - layer];
        let mut planes: Vec<Vec<i32>> = self.planes.clone();
        for plane in planes.iter_mut() {
            for level in ((levels - layer)..levels).rev() {
                let (w, h) = self.regions[level];
                unsqueeze_vertical(plane, w, h, stride);
                unsqueeze_horizontal(plane, w, h, stride);
            }
        }

        // Crop to the known region
        let (rw, rh) = known_region;
        let mut cropped: Vec<Vec<i32>> = planes
            .iter()
            .map(|plane| {
                let mut out = Vec::with_capacity(rw * rh);
                for y in 0..rh {
                    out.extend_from_slice(&plane[y * stride..y * stride + rw]);
                }
                out
            })
            .collect();

        if uses_rct(cropped.len(), context.header.pixel_type, context.header.color_space) {
            let (c0, rest) = cropped.split_at_mut(1);
            let (c1, c2) = rest.split_at_mut(1);
            luxel_color::inverse_rct(&mut c0[0], &mut c1[0], &mut c2[0]);
        }

        crate::build_frame(
            cropped,
            extra_channels,
            rw as u32,
            rh as u32,
            &context.header,
        )
    }
}

fn layer_sample_count(regions: &[(usize, usize)], layer: usize) -> usize {
    let levels = regions.len() - 1;
    if layer == 0 {
        let (w, h) = regions[levels];
        w * h
    } else {
        let (w, h) = regions[levels - layer];
        let (iw, ih) = regions[levels - layer + 1];
        w * h - iw * ih
    }
}

fn place_layer(
    plane: &mut [i32],
    stride: usize,
    regions: &[(usize, usize)],
    layer: usize,
    samples: &[i32],
) -> Result<()> {
    let levels = regions.len() - 1;
    let mut iter = samples.iter();
    if layer == 0 {
        let (w, h) = regions[levels];
        for y in 0..h {
            for x in 0..w {
                plane[y * stride + x] = *iter
                    .next()
                    .ok_or_else(|| Error::DecodeFailed("layer underrun".to_string()))?;
            }
        }
    } else {
        let (w, h) = regions[levels - layer];
        let (iw, ih) = regions[levels - layer + 1];
        for y in 0..h {
            for x in 0..w {
                if y < ih && x < iw {
                    continue;
                }
                plane[y * stride + x] = *iter
                    .next()
                    .ok_or_else(|| Error::DecodeFailed("layer underrun".to_string()))?;
            }
        }
    }
    Ok(())
}
