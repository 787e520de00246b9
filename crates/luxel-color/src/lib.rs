//! Color transforms
//!
//! Three transform families feed the two coding paths: BT.601 YCbCr and the
//! opsin-based XYB space for the lossy path, and the reversible YCoCg-R
//! transform for the lossless path. sRGB transfer helpers convert between
//! gamma-encoded input and the linear values the float transforms expect.
//!
//! Every RGB transform leaves non-3-channel data untouched; the callers
//! route grayscale and CMYK planes straight to the coding stage.

mod rct;
mod srgb;
mod xyb;
mod ycbcr;

pub use rct::{forward_rct, inverse_rct};
pub use srgb::{linear_to_srgb, srgb_to_linear};
pub use xyb::{rgb_to_xyb, xyb_planes_to_rgb, xyb_to_rgb, rgb_planes_to_xyb};
pub use ycbcr::{rgb_planes_to_ycbcr, rgb_to_ycbcr, ycbcr_planes_to_rgb, ycbcr_to_rgb};
