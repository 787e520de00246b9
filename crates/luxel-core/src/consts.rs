//! Constants shared across the workspace

/// DCT block size in pixels
pub const BLOCK_SIZE: usize = 8;

/// Number of coefficients in one block
pub const BLOCK_COEFFS: usize = BLOCK_SIZE * BLOCK_SIZE;

/// Maximum image dimension representable by the size header
pub const MAX_IMAGE_DIMENSION: u32 = 1 << 24;

/// Maximum number of color channels (RGBA)
pub const MAX_CHANNELS: usize = 4;

/// Default quality for lossy encoding (0-100)
pub const DEFAULT_QUALITY: f32 = 90.0;

/// Default encoding effort (1-9)
pub const DEFAULT_EFFORT: u8 = 7;

/// Minimum and maximum quality values
pub const MIN_QUALITY: f32 = 0.0;
pub const MAX_QUALITY: f32 = 100.0;

/// Minimum and maximum effort values
pub const MIN_EFFORT: u8 = 1;
pub const MAX_EFFORT: u8 = 9;

/// Responsive layer count bounds
pub const MIN_RESPONSIVE_LAYERS: u8 = 2;
pub const MAX_RESPONSIVE_LAYERS: u8 = 8;

/// Maximum number of reference frame slots
pub const MAX_REFERENCE_SLOTS: u8 = 8;

/// Maximum ROI quality boost in quality points
pub const MAX_ROI_BOOST: f32 = 50.0;

/// Spline limits
pub const MIN_SPLINE_POINTS: usize = 2;
pub const MAX_SPLINE_POINTS: usize = 1 << 20;
pub const MAX_SPLINE_COORD: i64 = 1 << 23;
pub const SPLINE_DCT_LEN: usize = 32;

/// End-of-block sentinel emitted by the fast entropy path
pub const END_OF_BLOCK: u64 = 0xFFFF;

/// End-of-channel token following the last block of a channel
pub const END_OF_CHANNEL: u64 = 0xFFFE;

/// Ticks per second numerator used for animation durations
pub const TICKS_PER_SECOND: u32 = 1000;
