//! Range-compact size header
//!
//! Dimensions are stored minus one under one of three selectors, whichever
//! is shortest: 9 bits per dimension for images up to 256 wide and tall,
//! 13 bits up to 512, or a fallback with a 2-bit size class choosing 8, 16,
//! 24 or 32 raw bits per dimension.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::consts::MAX_IMAGE_DIMENSION;
use luxel_core::{Error, Result};

const SELECTOR_SMALL: u32 = 0;
const SELECTOR_MEDIUM: u32 = 1;
const SELECTOR_LARGE: u32 = 2;

/// Image dimensions as serialized at the head of the codestream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHeader {
    pub width: u32,
    pub height: u32,
}

impl SizeHeader {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!("zero dimension: {}x{}", width, height)));
        }
        if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
            return Err(Error::invalid(format!(
                "dimension {}x{} exceeds {}",
                width, height, MAX_IMAGE_DIMENSION
            )));
        }
        Ok(Self { width, height })
    }

    /// Size class for the fallback selector: 0..=3 choosing 8/16/24/32 bits.
    fn size_class(dim: u32) -> u32 {
        let bits = 32 - (dim - 1).leading_zeros();
        bits.saturating_sub(1) / 8
    }

    pub fn write(&self, writer: &mut BitstreamWriter) -> Result<()> {
        if self.width <= 256 && self.height <= 256 {
            writer.write_bits(SELECTOR_SMALL, 2)?;
            writer.write_bits(self.width - 1, 9)?;
            writer.write_bits(self.height - 1, 9)?;
        } else if self.width <= 512 && self.height <= 512 {
            writer.write_bits(SELECTOR_MEDIUM, 2)?;
            writer.write_bits(self.width - 1, 13)?;
            writer.write_bits(self.height - 1, 13)?;
        } else {
            writer.write_bits(SELECTOR_LARGE, 2)?;
            for dim in [self.width, self.height] {
                let class = Self::size_class(dim);
                writer.write_bits(class, 2)?;
                writer.write_bits(dim - 1, (class as usize + 1) * 8)?;
            }
        }
        Ok(())
    }

    pub fn parse(reader: &mut BitstreamReader<'_>) -> Result<Self> {
        let selector = reader.read_bits(2)?;
        let (width, height) = match selector {
            SELECTOR_SMALL => (reader.read_bits(9)? + 1, reader.read_bits(9)? + 1),
            SELECTOR_MEDIUM => (reader.read_bits(13)? + 1, reader.read_bits(13)? + 1),
            SELECTOR_LARGE => {
                let mut dims = [0u32; 2];
                for dim in dims.iter_mut() {
                    let class = reader.read_bits(2)?;
                    *dim = reader.read_bits((class as usize + 1) * 8)? + 1;
                }
                (dims[0], dims[1])
            }
            _ => {
                return Err(Error::DecodeFailed(format!(
                    "reserved size selector {}",
                    selector
                )))
            }
        };
        if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
            return Err(Error::DecodeFailed(format!(
                "decoded dimension {}x{} out of range",
                width, height
            )));
        }
        Ok(Self { width, height })
    }
}
