//! # luxel — JPEG XL encoder
//!
//! A JPEG XL (ISO/IEC 18181) encoder core with a round-trip decoder for
//! validation. Both block-coding paths are implemented: the lossless
//! Modular path (reversible color transform, MED prediction, squeeze) and
//! the lossy VarDCT path (YCbCr/XYB, 8x8 DCT, distance-derived
//! quantization), behind RLE and rANS entropy coders.
//!
//! ## Encoding
//!
//! ```
//! use luxel::{encode, ColorChannels, EncodingOptions, ImageFrame, PixelType};
//!
//! let frame = ImageFrame::new(64, 64, ColorChannels::Rgb, PixelType::U8).unwrap();
//! let encoded = encode(&frame, &EncodingOptions::lossless()).unwrap();
//! assert_eq!(&encoded.data[..2], &[0xFF, 0x0A]);
//! ```
//!
//! ## Round-trip
//!
//! ```
//! use luxel::{encode, Decoder, ColorChannels, EncodingOptions, ImageFrame, PixelType};
//!
//! let frame = ImageFrame::new(16, 16, ColorChannels::Rgb, PixelType::U8).unwrap();
//! let encoded = encode(&frame, &EncodingOptions::lossless()).unwrap();
//! let decoded = Decoder::new().decode(&encoded.data).unwrap();
//! assert_eq!(decoded.width(), 16);
//! ```

pub use luxel_core::{
    AlphaMode, AnimationConfig, BufferPool, ColorChannels, ColorSpace, EncodingMode,
    EncodingOptions, Error, ExtraChannel, ExtraChannelType, ImageFrame, LossyColorTransform,
    NoiseConfig, Orientation, Patch, PixelBuffer, PixelType, Plane, PoolMetrics,
    ReferenceFrameConfig, RegionOfInterest, ResponsiveConfig, Result, Spline, TransferFunction,
    CODESTREAM_SIGNATURE,
};

pub use luxel_bitstream::{BitstreamReader, BitstreamWriter};
pub use luxel_decoder::Decoder;
pub use luxel_encoder::{encode, EncodeStats, EncodedImage, Encoder};
pub use luxel_headers::{
    BoxType, Container, FrameHeader, ImageHeader, SizeHeader, CONTAINER_SIGNATURE,
};
pub use luxel_runtime::{Backend, WorkStealingPool};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Specification this implementation targets
pub const SPEC_VERSION: &str = "ISO/IEC 18181:2022";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn frame_construction() {
        let frame = ImageFrame::new(100, 50, ColorChannels::Rgba, PixelType::U16).unwrap();
        assert_eq!(frame.width(), 100);
        assert_eq!(frame.height(), 50);
        assert_eq!(frame.channel_count(), 4);
    }
}
