//! Shared frame preparation and payload helpers
//!
//! Both coding paths and the decoder agree on a handful of deterministic
//! rules that therefore never need signaling:
//!
//! - integer planes widen to i32; f32 planes travel as their raw bit
//!   patterns (so the lossless path is bit-exact for floats too)
//! - the modular path applies the RCT to the first three channels iff the
//!   frame has at least three, the storage type is not f32, and the color
//!   space is RGB-like (grayscale and CMYK ink planes pass through
//!   untransformed, matching the lossy path)
//! - MED prediction is skipped for f32 bit patterns and for extra
//!   channels deeper than 28 bits, where the gradient could overflow i32
//! - channel payloads are length-prefixed byte sections

use luxel_bitstream::BitstreamWriter;
use luxel_core::{
    ColorSpace, Error, ExtraChannel, ImageFrame, NoiseConfig, Patch, PixelType, Plane, Result,
    Spline,
};
use luxel_headers::{noise::NoiseParams, patch::write_patches, spline::write_splines};

/// Deepest extra channel still safe for i32 gradient prediction
pub(crate) const MAX_MED_BIT_DEPTH: u8 = 28;

/// Whether the modular path runs the RCT for this frame
pub(crate) fn uses_rct(channel_count: usize, pixel_type: PixelType, color_space: ColorSpace) -> bool {
    channel_count >= 3
        && pixel_type != PixelType::F32
        && !matches!(color_space, ColorSpace::Cmyk | ColorSpace::Grayscale)
}

/// Whether a plane of this storage type takes MED prediction
pub(crate) fn uses_med(pixel_type: PixelType) -> bool {
    pixel_type != PixelType::F32
}

/// Clamp bound handed to the MED predictor
pub(crate) fn med_max_sample(bit_depth: u8) -> i32 {
    if bit_depth >= 31 {
        i32::MAX
    } else {
        (1i32 << bit_depth) - 1
    }
}

/// Widen one plane into the i32 working representation
pub(crate) fn plane_to_i32(plane: &Plane) -> Vec<i32> {
    match plane {
        Plane::U8(v) => v.iter().map(|&s| s as i32).collect(),
        Plane::U16(v) => v.iter().map(|&s| s as i32).collect(),
        Plane::I16(v) => v.iter().map(|&s| s as i32).collect(),
        // Bit patterns, not values: keeps float planes bit-exact
        Plane::F32(v) => v.iter().map(|&s| s.to_bits() as i32).collect(),
    }
}

/// Inverse of [`plane_to_i32`]
pub(crate) fn plane_from_i32(pixel_type: PixelType, samples: &[i32]) -> Plane {
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

/// Unpack an extra channel into i32 samples
pub(crate) fn extra_channel_to_i32(ec: &ExtraChannel, width: u32, height: u32) -> Vec<i32> {
    let w = (width >> ec.dim_shift).max(1) as usize;
    let h = (height >> ec.dim_shift).max(1) as usize;
    (0..w * h).map(|i| ec.sample(i) as i32).collect()
}

/// Write one length-prefixed channel section
pub(crate) fn write_section(writer: &mut BitstreamWriter, section: &[u8]) {
    writer.write_varint(section.len() as u64);
    writer.write_data(section);
}

/// Overlay records appended after a frame payload
pub(crate) struct Overlays<'a> {
    pub patches: &'a [Patch],
    pub splines: &'a [Spline],
    pub noise: Option<&'a NoiseConfig>,
}

impl<'a> Overlays<'a> {
    pub fn none() -> Self {
        Self {
            patches: &[],
            splines: &[],
            noise: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.splines.is_empty() && self.noise.is_none()
    }

    pub fn write(&self, writer: &mut BitstreamWriter) -> Result<()> {
        writer.flush_byte();
        if !self.patches.is_empty() {
            let merged = luxel_core::merge_patches(self.patches)?;
            write_patches(&merged, writer);
        }
        if !self.splines.is_empty() {
            write_splines(self.splines, writer)?;
        }
        if let Some(noise) = self.noise {
            NoiseParams::from_config(noise).write(writer)?;
            writer.flush_byte();
        }
        Ok(())
    }
}

/// Enforce the configured output-size cap
pub(crate) fn check_size_cap(len: usize, cap: Option<usize>) -> Result<()> {
    if let Some(cap) = cap {
        if len > cap {
            return Err(Error::EncodingFailed(format!(
                "encoded size {} exceeds cap {}",
                len, cap
            )));
        }
    }
    Ok(())
}

/// Normalized f32 planes for the lossy path, scaled to the 0..255 working
/// range after the color transform.
pub(crate) fn frame_to_f32_planes(frame: &ImageFrame) -> Vec<Vec<f32>> {
    frame
        .buffer
        .planes()
        .iter()
        .map(|plane| plane.to_f32())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxel_core::ExtraChannelType;

    #[test]
    fn f32_planes_are_bit_exact_through_i32() {
        let values = vec![0.0f32, -0.0, 1.5, -3.25, f32::MIN_POSITIVE, 1e30];
        let plane = Plane::F32(values.clone());
        let ints = plane_to_i32(&plane);
        match plane_from_i32(PixelType::F32, &ints) {
            Plane::F32(restored) => {
                for (a, b) in values.iter().zip(restored.iter()) {
                    assert_eq!(a.to_bits(), b.to_bits());
                }
            }
            _ => panic!("wrong plane type"),
        }
    }

    #[test]
    fn rct_rule() {
        assert!(uses_rct(3, PixelType::U8, ColorSpace::Srgb));
        assert!(uses_rct(4, PixelType::U16, ColorSpace::LinearRgb));
        assert!(!uses_rct(2, PixelType::U8, ColorSpace::Srgb));
        assert!(!uses_rct(3, PixelType::F32, ColorSpace::Srgb));
        // Ink and luminance planes pass through untransformed
        assert!(!uses_rct(4, PixelType::U8, ColorSpace::Cmyk));
        assert!(!uses_rct(3, PixelType::U8, ColorSpace::Grayscale));
    }

    #[test]
    fn med_max_sample_bounds() {
        assert_eq!(med_max_sample(8), 255);
        assert_eq!(med_max_sample(16), 65535);
        assert_eq!(med_max_sample(31), i32::MAX);
        assert_eq!(med_max_sample(32), i32::MAX);
    }

    #[test]
    fn extra_channel_unpacking() {
        let ec = ExtraChannel {
            kind: ExtraChannelType::Depth,
            bit_depth: 12,
            dim_shift: 0,
            name: String::new(),
            data: vec![0x34, 0x12, 0xFF, 0x0F],
        };
        let samples = extra_channel_to_i32(&ec, 2, 1);
        assert_eq!(samples, vec![0x1234, 0x0FFF]);
    }
}
