//! Image frame and pixel buffer types
//!
//! Pixel storage is planar: one plane per channel, all planes sharing the
//! frame dimensions. Frames are constructed by the caller and are immutable
//! during encode; the encoder only borrows plane views.

use crate::{AlphaMode, ColorChannels, ColorSpace, Error, Orientation, PixelType, Result, Sample};

/// One channel plane, typed by sample storage
#[derive(Debug, Clone, PartialEq)]
pub enum Plane {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    F32(Vec<f32>),
}

impl Plane {
    pub fn new(pixel_type: PixelType, len: usize) -> Self {
        match pixel_type {
            PixelType::U8 => Plane::U8(vec![0; len]),
            PixelType::U16 => Plane::U16(vec![0; len]),
            PixelType::I16 => Plane::I16(vec![0; len]),
            PixelType::F32 => Plane::F32(vec![0.0; len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Plane::U8(v) => v.len(),
            Plane::U16(v) => v.len(),
            Plane::I16(v) => v.len(),
            Plane::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            Plane::U8(_) => PixelType::U8,
            Plane::U16(_) => PixelType::U16,
            Plane::I16(_) => PixelType::I16,
            Plane::F32(_) => PixelType::F32,
        }
    }

    /// Copy out as widened i32 samples (integer encode paths)
    pub fn to_i32(&self) -> Vec<i32> {
        match self {
            Plane::U8(v) => v.iter().map(|&s| s as i32).collect(),
            Plane::U16(v) => v.iter().map(|&s| s as i32).collect(),
            Plane::I16(v) => v.iter().map(|&s| s as i32).collect(),
            Plane::F32(v) => v.iter().map(|&s| s.round() as i32).collect(),
        }
    }

    /// Copy out as normalized f32 samples (float encode paths)
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            Plane::U8(v) => v.iter().map(|&s| s.to_f32()).collect(),
            Plane::U16(v) => v.iter().map(|&s| s.to_f32()).collect(),
            Plane::I16(v) => v.iter().map(|&s| s.to_f32()).collect(),
            Plane::F32(v) => v.clone(),
        }
    }

    /// Rebuild a plane of the given storage type from widened i32 samples
    pub fn from_i32(pixel_type: PixelType, samples: &[i32]) -> Self {
        match pixel_type {
            PixelType::U8 => Plane::U8(samples.iter().map(|&s| u8::from_i32(s)).collect()),
            PixelType::U16 => Plane::U16(samples.iter().map(|&s| u16::from_i32(s)).collect()),
            PixelType::I16 => Plane::I16(samples.iter().map(|&s| i16::from_i32(s)).collect()),
            PixelType::F32 => Plane::F32(samples.iter().map(|&s| s as f32).collect()),
        }
    }

    /// Rebuild a plane of the given storage type from normalized f32 samples
    pub fn from_f32(pixel_type: PixelType, samples: &[f32]) -> Self {
        match pixel_type {
            PixelType::U8 => Plane::U8(samples.iter().map(|&s| u8::from_f32(s)).collect()),
            PixelType::U16 => Plane::U16(samples.iter().map(|&s| u16::from_f32(s)).collect()),
            PixelType::I16 => Plane::I16(samples.iter().map(|&s| i16::from_f32(s)).collect()),
            PixelType::F32 => Plane::F32(samples.to_vec()),
        }
    }
}

/// Planar pixel storage without metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixel_type: PixelType,
    planes: Vec<Plane>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer with one plane per channel
    pub fn new(width: u32, height: u32, channels: usize, pixel_type: PixelType) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "zero dimension: {}x{}",
                width, height
            )));
        }
        if channels == 0 || channels > crate::consts::MAX_CHANNELS {
            return Err(Error::invalid(format!(
                "unsupported channel count: {}",
                channels
            )));
        }
        let len = width as usize * height as usize;
        let planes = (0..channels).map(|_| Plane::new(pixel_type, len)).collect();
        Ok(Self {
            width,
            height,
            pixel_type,
            planes,
        })
    }

    /// Build a buffer from preexisting planes, validating lengths
    pub fn from_planes(width: u32, height: u32, planes: Vec<Plane>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "zero dimension: {}x{}",
                width, height
            )));
        }
        if planes.is_empty() || planes.len() > crate::consts::MAX_CHANNELS {
            return Err(Error::invalid(format!(
                "unsupported channel count: {}",
                planes.len()
            )));
        }
        let expected = width as usize * height as usize;
        let pixel_type = planes[0].pixel_type();
        for (c, plane) in planes.iter().enumerate() {
            if plane.len() != expected {
                return Err(Error::invalid(format!(
                    "plane {} has {} samples, expected {}",
                    c,
                    plane.len(),
                    expected
                )));
            }
            if plane.pixel_type() != pixel_type {
                return Err(Error::invalid("mixed pixel types across planes"));
            }
        }
        Ok(Self {
            width,
            height,
            pixel_type,
            planes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Total payload size in bytes across all planes
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * self.channels() * self.pixel_type.bytes_per_sample()
    }

    pub fn plane(&self, channel: usize) -> Result<&Plane> {
        self.planes
            .get(channel)
            .ok_or_else(|| Error::invalid(format!("channel {} out of range", channel)))
    }

    pub fn plane_mut(&mut self, channel: usize) -> Result<&mut Plane> {
        self.planes
            .get_mut(channel)
            .ok_or_else(|| Error::invalid(format!("channel {} out of range", channel)))
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Borrow a rectangular view of one plane for tiled processing
    pub fn tile(&self, channel: usize, origin_x: u32, origin_y: u32, w: u32, h: u32) -> Result<Tile<'_>> {
        if origin_x + w > self.width || origin_y + h > self.height {
            return Err(Error::invalid(format!(
                "tile {}x{}+{}+{} exceeds {}x{}",
                w, h, origin_x, origin_y, self.width, self.height
            )));
        }
        Ok(Tile {
            plane: self.plane(channel)?,
            stride: self.width as usize,
            origin_x: origin_x as usize,
            origin_y: origin_y as usize,
            width: w as usize,
            height: h as usize,
        })
    }
}

/// Borrowed rectangular view of a plane
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a> {
    plane: &'a Plane,
    stride: usize,
    origin_x: usize,
    origin_y: usize,
    width: usize,
    height: usize,
}

impl<'a> Tile<'a> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample at tile-local coordinates, widened to f32 without normalization
    pub fn sample(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        let idx = (self.origin_y + y) * self.stride + self.origin_x + x;
        match self.plane {
            Plane::U8(v) => v[idx] as f32,
            Plane::U16(v) => v[idx] as f32,
            Plane::I16(v) => v[idx] as f32,
            Plane::F32(v) => v[idx],
        }
    }
}

/// Extra-channel semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraChannelType {
    Alpha,
    Depth,
    SpotColor,
    SelectionMask,
    Thermal,
    Unknown,
}

/// Descriptor and payload for one extra channel
///
/// Samples are stored little-endian, `ceil(bit_depth / 8)` bytes each, so
/// the plane occupies `width * height * ceil(bit_depth / 8)` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraChannel {
    pub kind: ExtraChannelType,
    pub bit_depth: u8,
    /// Downsampling shift relative to the color channels (0 = full size)
    pub dim_shift: u8,
    pub name: String,
    pub data: Vec<u8>,
}

impl ExtraChannel {
    pub fn bytes_per_sample(&self) -> usize {
        (self.bit_depth as usize).div_ceil(8)
    }

    pub fn expected_len(&self, width: u32, height: u32) -> usize {
        let w = (width >> self.dim_shift).max(1) as usize;
        let h = (height >> self.dim_shift).max(1) as usize;
        w * h * self.bytes_per_sample()
    }

    /// Read sample `i` as an unsigned value
    pub fn sample(&self, i: usize) -> u32 {
        let bps = self.bytes_per_sample();
        let mut v = 0u32;
        for b in 0..bps {
            v |= (self.data[i * bps + b] as u32) << (8 * b);
        }
        v
    }
}

/// A raster frame handed to the encoder
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub buffer: PixelBuffer,
    pub channels: ColorChannels,
    pub color_space: ColorSpace,
    pub alpha_mode: AlphaMode,
    /// Effective sample precision, independent of storage type
    /// (e.g. 12-bit data carried in u16)
    pub bit_depth: u8,
    pub orientation: Orientation,
    pub extra_channels: Vec<ExtraChannel>,
    /// Opaque EXIF/XMP/ICC bytes passed through to the container wrapper
    pub metadata: Option<Vec<u8>>,
}

impl ImageFrame {
    /// Allocate a zeroed frame with defaults for metadata fields
    pub fn new(
        width: u32,
        height: u32,
        channels: ColorChannels,
        pixel_type: PixelType,
    ) -> Result<Self> {
        let buffer = PixelBuffer::new(width, height, channels.count(), pixel_type)?;
        let alpha_mode = if channels.has_alpha() {
            AlphaMode::Straight
        } else {
            AlphaMode::None
        };
        let color_space = match channels {
            ColorChannels::Gray | ColorChannels::GrayAlpha => ColorSpace::Grayscale,
            _ => ColorSpace::Srgb,
        };
        Ok(Self {
            buffer,
            channels,
            color_space,
            alpha_mode,
            bit_depth: pixel_type.natural_bit_depth(),
            orientation: Orientation::Identity,
            extra_channels: Vec::new(),
            metadata: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn pixel_type(&self) -> PixelType {
        self.buffer.pixel_type()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.count()
    }

    /// Check the frame invariants before encoding
    pub fn validate(&self) -> Result<()> {
        if self.buffer.channels() != self.channels.count() {
            return Err(Error::invalid(format!(
                "channel layout says {} channels but buffer has {} planes",
                self.channels.count(),
                self.buffer.channels()
            )));
        }
        let has_alpha = self.channels.has_alpha();
        if has_alpha == (self.alpha_mode == AlphaMode::None) {
            return Err(Error::invalid(
                "alpha mode inconsistent with channel layout",
            ));
        }
        if self.bit_depth == 0 || self.bit_depth as usize > self.pixel_type().bytes_per_sample() * 8
        {
            return Err(Error::invalid(format!(
                "bit depth {} incompatible with {:?} storage",
                self.bit_depth,
                self.pixel_type()
            )));
        }
        for (i, ec) in self.extra_channels.iter().enumerate() {
            if ec.bit_depth == 0 || ec.bit_depth > 32 {
                return Err(Error::invalid(format!(
                    "extra channel {} bit depth {} out of range",
                    i, ec.bit_depth
                )));
            }
            let expected = ec.expected_len(self.width(), self.height());
            if ec.data.len() != expected {
                return Err(Error::invalid(format!(
                    "extra channel {} has {} bytes, expected {}",
                    i,
                    ec.data.len(),
                    expected
                )));
            }
        }
        Ok(())
    }
}
