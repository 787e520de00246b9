//! Codestream headers
//!
//! Bit-packed header records: the range-compact size header, the image
//! header, per-frame headers, overlay record serialization (patches,
//! splines, noise parameters), and the optional ISOBMFF container wrapper.
//! The bare codestream never uses the container; external callers wrap it
//! when they want metadata boxes.

pub mod container;
pub mod frame;
pub mod image;
pub mod noise;
pub mod patch;
pub mod size;
pub mod spline;

pub use container::{Container, ContainerBox, BoxType, CONTAINER_SIGNATURE};
pub use frame::{FrameEncoding, FrameHeader, FRAME_TERMINATOR};
pub use image::ImageHeader;
pub use noise::{NoiseParams, XorShift64Star};
pub use size::SizeHeader;
