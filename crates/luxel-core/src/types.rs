//! Pixel and color primitive types

use num_traits::NumCast;

/// Pixel storage type of a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 16-bit signed integer
    I16,
    /// 32-bit floating point
    F32,
}

impl PixelType {
    /// Size in bytes of one sample
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            PixelType::U8 => 1,
            PixelType::U16 | PixelType::I16 => 2,
            PixelType::F32 => 4,
        }
    }

    /// Default bit depth recorded for this storage type
    pub fn natural_bit_depth(&self) -> u8 {
        match self {
            PixelType::U8 => 8,
            PixelType::U16 | PixelType::I16 => 16,
            PixelType::F32 => 32,
        }
    }
}

/// Transfer function of a custom color space
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferFunction {
    Linear,
    Srgb,
    Gamma(f32),
}

/// Color-space tag carried by a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorSpace {
    /// sRGB primaries and transfer
    Srgb,
    /// sRGB primaries, linear transfer
    LinearRgb,
    /// Single luminance channel
    Grayscale,
    /// Four ink channels, passed through untransformed
    Cmyk,
    /// Caller-specified primaries and transfer function
    Custom {
        /// xy chromaticities for R, G, B
        primaries: [[f32; 2]; 3],
        /// xy white point
        white_point: [f32; 2],
        transfer: TransferFunction,
    },
}

/// Alpha interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    /// No alpha channel present
    None,
    /// Color samples are independent of alpha
    Straight,
    /// Color samples are premultiplied by alpha
    Premultiplied,
}

/// Channel layout of the color portion of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannels {
    Gray = 1,
    GrayAlpha = 2,
    Rgb = 3,
    Rgba = 4,
}

impl ColorChannels {
    pub fn count(&self) -> usize {
        *self as usize
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, ColorChannels::GrayAlpha | ColorChannels::Rgba)
    }

    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ColorChannels::Gray),
            2 => Some(ColorChannels::GrayAlpha),
            3 => Some(ColorChannels::Rgb),
            4 => Some(ColorChannels::Rgba),
            _ => None,
        }
    }
}

/// EXIF-style orientation, values 1 through 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Identity = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    Rotate90 = 6,
    AntiTranspose = 7,
    Rotate270 = 8,
}

impl Orientation {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Orientation::Identity),
            2 => Some(Orientation::FlipHorizontal),
            3 => Some(Orientation::Rotate180),
            4 => Some(Orientation::FlipVertical),
            5 => Some(Orientation::Transpose),
            6 => Some(Orientation::Rotate90),
            7 => Some(Orientation::AntiTranspose),
            8 => Some(Orientation::Rotate270),
            _ => None,
        }
    }
}

/// Sample type of a pixel plane
///
/// `to_f32` normalizes into [0,1] for unsigned types and [-1,1] for i16;
/// `from_f32` is its inverse with rounding.
pub trait Sample: Copy + NumCast + PartialOrd + Default + Send + Sync + 'static {
    const PIXEL_TYPE: PixelType;

    fn to_f32(self) -> f32;
    fn from_f32(value: f32) -> Self;
    /// Widen to i32 without normalization (used by the integer paths)
    fn to_i32(self) -> i32;
    fn from_i32(value: i32) -> Self;
}

impl Sample for u8 {
    const PIXEL_TYPE: PixelType = PixelType::U8;

    fn to_f32(self) -> f32 {
        self as f32 / 255.0
    }

    fn from_f32(value: f32) -> Self {
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    }

    fn to_i32(self) -> i32 {
        self as i32
    }

    fn from_i32(value: i32) -> Self {
        value.clamp(0, 255) as u8
    }
}

impl Sample for u16 {
    const PIXEL_TYPE: PixelType = PixelType::U16;

    fn to_f32(self) -> f32 {
        self as f32 / 65535.0
    }

    fn from_f32(value: f32) -> Self {
        (value * 65535.0).round().clamp(0.0, 65535.0) as u16
    }

    fn to_i32(self) -> i32 {
        self as i32
    }

    fn from_i32(value: i32) -> Self {
        value.clamp(0, 65535) as u16
    }
}

impl Sample for i16 {
    const PIXEL_TYPE: PixelType = PixelType::I16;

    fn to_f32(self) -> f32 {
        self as f32 / 32767.0
    }

    fn from_f32(value: f32) -> Self {
        (value * 32767.0).round().clamp(-32768.0, 32767.0) as i16
    }

    fn to_i32(self) -> i32 {
        self as i32
    }

    fn from_i32(value: i32) -> Self {
        value.clamp(-32768, 32767) as i16
    }
}

impl Sample for f32 {
    const PIXEL_TYPE: PixelType = PixelType::F32;

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(value: f32) -> Self {
        value
    }

    fn to_i32(self) -> i32 {
        self.round() as i32
    }

    fn from_i32(value: i32) -> Self {
        value as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_type_sizes() {
        assert_eq!(PixelType::U8.bytes_per_sample(), 1);
        assert_eq!(PixelType::U16.bytes_per_sample(), 2);
        assert_eq!(PixelType::I16.bytes_per_sample(), 2);
        assert_eq!(PixelType::F32.bytes_per_sample(), 4);
    }

    #[test]
    fn orientation_range() {
        for v in 1..=8u8 {
            assert!(Orientation::from_u8(v).is_some());
        }
        assert!(Orientation::from_u8(0).is_none());
        assert!(Orientation::from_u8(9).is_none());
    }

    #[test]
    fn sample_roundtrip_u8() {
        for v in [0u8, 1, 127, 128, 254, 255] {
            assert_eq!(u8::from_f32(v.to_f32()), v);
        }
    }

    #[test]
    fn sample_roundtrip_i16() {
        for v in [-32767i16, -1, 0, 1, 32767] {
            assert_eq!(i16::from_f32(v.to_f32()), v);
        }
    }
}
