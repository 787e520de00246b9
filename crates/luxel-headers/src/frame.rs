//! Per-frame header
//!
//! One header precedes every frame payload. The duration field is only
//! present when the image header declared an animation, so both sides of
//! the wire pass that flag in.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::consts::MAX_REFERENCE_SLOTS;
use luxel_core::{Error, Result};

/// Byte written after the last frame's payload
pub const FRAME_TERMINATOR: u8 = 0x00;

/// Coding path of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEncoding {
    VarDct = 0,
    Modular = 1,
}

/// Color transform recorded in a VarDCT frame header
pub mod color_transform {
    pub const NONE: u32 = 0;
    pub const YCBCR: u32 = 1;
    pub const XYB: u32 = 2;
}

/// Bit-packed frame header
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    pub encoding: FrameEncoding,
    pub is_last: bool,
    /// Duration in ticks; serialized only for animations
    pub duration: u32,
    /// Slot this frame is saved into after decode; 0 = not saved
    pub save_slot: u8,
    /// Slot this frame is a delta against; 0 = full frame
    pub reference_slot: u8,
    /// Progressive pass count, at least 1
    pub num_passes: u8,
    /// One of the `color_transform` constants; NONE for modular frames
    pub color_transform: u32,
    /// Quantization distance (VarDCT frames only)
    pub distance: f32,
    /// Entropy coder selection: rANS when set, RLE fast path otherwise
    pub use_ans: bool,
    /// A per-block quantization scale map follows in the payload
    pub has_scale_map: bool,
    pub has_patches: bool,
    pub has_splines: bool,
    pub has_noise: bool,
    /// Responsive refinement layer rather than a self-contained frame
    pub is_refinement: bool,
    /// Responsive layer index, 0 for plain frames
    pub layer_index: u8,
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self {
            encoding: FrameEncoding::VarDct,
            is_last: true,
            duration: 0,
            save_slot: 0,
            reference_slot: 0,
            num_passes: 1,
            color_transform: color_transform::YCBCR,
            distance: 1.0,
            use_ans: false,
            has_scale_map: false,
            has_patches: false,
            has_splines: false,
            has_noise: false,
            is_refinement: false,
            layer_index: 0,
        }
    }
}

impl FrameHeader {
    pub fn validate(&self) -> Result<()> {
        if self.num_passes == 0 {
            return Err(Error::invalid("frame needs at least one pass"));
        }
        if self.save_slot > MAX_REFERENCE_SLOTS || self.reference_slot > MAX_REFERENCE_SLOTS {
            return Err(Error::invalid(format!(
                "reference slot {}/{} out of range",
                self.save_slot, self.reference_slot
            )));
        }
        if self.color_transform > color_transform::XYB {
            return Err(Error::invalid(format!(
                "color transform {}",
                self.color_transform
            )));
        }
        if self.distance < 0.0 || self.distance.is_nan() {
            return Err(Error::invalid("negative frame distance"));
        }
        Ok(())
    }

    pub fn write(&self, writer: &mut BitstreamWriter, animated: bool) -> Result<()> {
        self.validate()?;
        writer.write_bit(self.encoding == FrameEncoding::Modular);
        writer.write_bit(self.is_last);
        writer.write_bits(self.save_slot as u32, 4)?;
        writer.write_bits(self.reference_slot as u32, 4)?;
        writer.write_bits(self.num_passes as u32, 4)?;
        writer.write_bits(self.color_transform, 2)?;
        writer.write_bit(self.use_ans);
        writer.write_bit(self.has_scale_map);
        writer.write_bit(self.has_patches);
        writer.write_bit(self.has_splines);
        writer.write_bit(self.has_noise);
        writer.write_bit(self.is_refinement);
        writer.write_bits(self.layer_index as u32, 4)?;
        if animated {
            writer.write_bits(self.duration, 32)?;
        }
        if self.encoding == FrameEncoding::VarDct {
            writer.write_u32_be(self.distance.to_bits());
        }
        Ok(())
    }

    pub fn parse(reader: &mut BitstreamReader<'_>, animated: bool) -> Result<Self> {
        let encoding = if reader.read_bit()? {
            FrameEncoding::Modular
        } else {
            FrameEncoding::VarDct
        };
        let is_last = reader.read_bit()?;
        let save_slot = reader.read_bits(4)? as u8;
        let reference_slot = reader.read_bits(4)? as u8;
        let num_passes = reader.read_bits(4)? as u8;
        let color_transform = reader.read_bits(2)?;
        let use_ans = reader.read_bit()?;
        let has_scale_map = reader.read_bit()?;
        let has_patches = reader.read_bit()?;
        let has_splines = reader.read_bit()?;
        let has_noise = reader.read_bit()?;
        let is_refinement = reader.read_bit()?;
        let layer_index = reader.read_bits(4)? as u8;
        let duration = if animated { reader.read_bits(32)? } else { 0 };
        let distance = if encoding == FrameEncoding::VarDct {
            f32::from_bits(reader.read_u32_be()?)
        } else {
            0.0
        };

        let header = Self {
            encoding,
            is_last,
            duration,
            save_slot,
            reference_slot,
            num_passes,
            color_transform,
            distance,
            use_ans,
            has_scale_map,
            has_patches,
            has_splines,
            has_noise,
            is_refinement,
            layer_index,
        };
        header.validate().map_err(|e| match e {
            Error::InvalidInput(msg) => Error::DecodeFailed(msg),
            other => other,
        })?;
        Ok(header)
    }
}
