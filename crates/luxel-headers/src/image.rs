//! Image-level header
//!
//! Records everything a decoder needs before the first frame: channel
//! layout, sample precision, alpha interpretation, color space,
//! orientation, extra-channel descriptors and the animation timebase.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::{
    AlphaMode, AnimationConfig, ColorChannels, ColorSpace, Error, ExtraChannel,
    ExtraChannelType, ImageFrame, Orientation, PixelType, Result, TransferFunction,
};

/// Extra-channel descriptor as serialized (payload travels in the frame)
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraChannelInfo {
    pub kind: ExtraChannelType,
    pub bit_depth: u8,
    pub dim_shift: u8,
    pub name: String,
}

impl ExtraChannelInfo {
    pub fn from_channel(ec: &ExtraChannel) -> Self {
        Self {
            kind: ec.kind,
            bit_depth: ec.bit_depth,
            dim_shift: ec.dim_shift,
            name: ec.name.clone(),
        }
    }
}

fn kind_to_bits(kind: ExtraChannelType) -> u32 {
    match kind {
        ExtraChannelType::Alpha => 0,
        ExtraChannelType::Depth => 1,
        ExtraChannelType::SpotColor => 2,
        ExtraChannelType::SelectionMask => 3,
        ExtraChannelType::Thermal => 4,
        ExtraChannelType::Unknown => 5,
    }
}

fn kind_from_bits(bits: u32) -> Result<ExtraChannelType> {
    match bits {
        0 => Ok(ExtraChannelType::Alpha),
        1 => Ok(ExtraChannelType::Depth),
        2 => Ok(ExtraChannelType::SpotColor),
        3 => Ok(ExtraChannelType::SelectionMask),
        4 => Ok(ExtraChannelType::Thermal),
        5 => Ok(ExtraChannelType::Unknown),
        _ => Err(Error::DecodeFailed(format!("extra channel type {}", bits))),
    }
}

/// Image header following the size header in the codestream
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    pub channels: ColorChannels,
    pub pixel_type: PixelType,
    pub bits_per_sample: u8,
    pub alpha_mode: AlphaMode,
    pub color_space: ColorSpace,
    pub orientation: Orientation,
    pub extra_channels: Vec<ExtraChannelInfo>,
    pub animation: Option<AnimationHeader>,
}

/// Animation timebase carried by the image header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationHeader {
    /// Ticks per second numerator
    pub tps_numerator: u32,
    pub tps_denominator: u32,
    /// 0 = loop forever
    pub num_loops: u32,
}

impl AnimationHeader {
    pub fn from_config(config: &AnimationConfig) -> Self {
        Self {
            tps_numerator: luxel_core::consts::TICKS_PER_SECOND,
            tps_denominator: config.tps_denominator,
            num_loops: config.num_loops,
        }
    }
}

impl ImageHeader {
    pub fn from_frame(frame: &ImageFrame, animation: Option<&AnimationConfig>) -> Self {
        Self {
            channels: frame.channels,
            pixel_type: frame.pixel_type(),
            bits_per_sample: frame.bit_depth,
            alpha_mode: frame.alpha_mode,
            color_space: frame.color_space,
            orientation: frame.orientation,
            extra_channels: frame
                .extra_channels
                .iter()
                .map(ExtraChannelInfo::from_channel)
                .collect(),
            animation: animation.map(AnimationHeader::from_config),
        }
    }

    pub fn write(&self, writer: &mut BitstreamWriter) -> Result<()> {
        writer.write_bits(self.channels.count() as u32 - 1, 2)?;
        let storage_bits = match self.pixel_type {
            PixelType::U8 => 0,
            PixelType::U16 => 1,
            PixelType::I16 => 2,
            PixelType::F32 => 3,
        };
        writer.write_bits(storage_bits, 2)?;
        writer.write_bits(self.bits_per_sample as u32 - 1, 6)?;
        let alpha_bits = match self.alpha_mode {
            AlphaMode::None => 0,
            AlphaMode::Straight => 1,
            AlphaMode::Premultiplied => 2,
        };
        writer.write_bits(alpha_bits, 2)?;

        match self.color_space {
            ColorSpace::Srgb => writer.write_bits(0, 3)?,
            ColorSpace::LinearRgb => writer.write_bits(1, 3)?,
            ColorSpace::Grayscale => writer.write_bits(2, 3)?,
            ColorSpace::Cmyk => writer.write_bits(3, 3)?,
            ColorSpace::Custom {
                primaries,
                white_point,
                transfer,
            } => {
                writer.write_bits(4, 3)?;
                for xy in primaries.iter().chain(std::iter::once(&white_point)) {
                    writer.write_u32_be(xy[0].to_bits());
                    writer.write_u32_be(xy[1].to_bits());
                }
                match transfer {
                    TransferFunction::Linear => writer.write_bits(0, 2)?,
                    TransferFunction::Srgb => writer.write_bits(1, 2)?,
                    TransferFunction::Gamma(g) => {
                        writer.write_bits(2, 2)?;
                        writer.write_u32_be(g.to_bits());
                    }
                }
            }
        }

        writer.write_bits(self.orientation as u32 - 1, 3)?;

        writer.write_bits(self.extra_channels.len() as u32, 4)?;
        for ec in &self.extra_channels {
            writer.write_bits(kind_to_bits(ec.kind), 3)?;
            writer.write_bits(ec.bit_depth as u32 - 1, 6)?;
            writer.write_bits(ec.dim_shift as u32, 3)?;
            let name = ec.name.as_bytes();
            if name.len() > 255 {
                return Err(Error::invalid("extra channel name longer than 255 bytes"));
            }
            writer.write_bits(name.len() as u32, 8)?;
            for &b in name {
                writer.write_bits(b as u32, 8)?;
            }
        }

        writer.write_bit(self.animation.is_some());
        if let Some(animation) = &self.animation {
            writer.write_bits(animation.tps_numerator, 32)?;
            writer.write_bits(animation.tps_denominator, 32)?;
            writer.write_bits(animation.num_loops, 32)?;
        }
        Ok(())
    }

    pub fn parse(reader: &mut BitstreamReader<'_>) -> Result<Self> {
        let channel_count = reader.read_bits(2)? as usize + 1;
        let channels = ColorChannels::from_count(channel_count)
            .ok_or_else(|| Error::DecodeFailed(format!("channel count {}", channel_count)))?;
        let pixel_type = match reader.read_bits(2)? {
            0 => PixelType::U8,
            1 => PixelType::U16,
            2 => PixelType::I16,
            _ => PixelType::F32,
        };
        let bits_per_sample = reader.read_bits(6)? as u8 + 1;
        let alpha_mode = match reader.read_bits(2)? {
            0 => AlphaMode::None,
            1 => AlphaMode::Straight,
            2 => AlphaMode::Premultiplied,
            v => return Err(Error::DecodeFailed(format!("alpha mode {}", v))),
        };

        let color_space = match reader.read_bits(3)? {
            0 => ColorSpace::Srgb,
            1 => ColorSpace::LinearRgb,
            2 => ColorSpace::Grayscale,
            3 => ColorSpace::Cmyk,
            4 => {
                let mut coords = [0.0f32; 8];
                for c in coords.iter_mut() {
                    *c = f32::from_bits(reader.read_u32_be()?);
                }
                let transfer = match reader.read_bits(2)? {
                    0 => TransferFunction::Linear,
                    1 => TransferFunction::Srgb,
                    2 => TransferFunction::Gamma(f32::from_bits(reader.read_u32_be()?)),
                    v => return Err(Error::DecodeFailed(format!("transfer function {}", v))),
                };
                ColorSpace::Custom {
                    primaries: [
                        [coords[0], coords[1]],
                        [coords[2], coords[3]],
                        [coords[4], coords[5]],
                    ],
                    white_point: [coords[6], coords[7]],
                    transfer,
                }
            }
            v => return Err(Error::DecodeFailed(format!("color space {}", v))),
        };

        let orientation_bits = reader.read_bits(3)? as u8 + 1;
        let orientation = Orientation::from_u8(orientation_bits)
            .ok_or_else(|| Error::DecodeFailed(format!("orientation {}", orientation_bits)))?;

        let num_extra = reader.read_bits(4)? as usize;
        let mut extra_channels = Vec::with_capacity(num_extra);
        for _ in 0..num_extra {
            let kind = kind_from_bits(reader.read_bits(3)?)?;
            let bit_depth = reader.read_bits(6)? as u8 + 1;
            let dim_shift = reader.read_bits(3)? as u8;
            let name_len = reader.read_bits(8)? as usize;
            let mut name_bytes = Vec::with_capacity(name_len);
            for _ in 0..name_len {
                name_bytes.push(reader.read_bits(8)? as u8);
            }
            let name = String::from_utf8(name_bytes)
                .map_err(|_| Error::DecodeFailed("extra channel name not UTF-8".to_string()))?;
            extra_channels.push(ExtraChannelInfo {
                kind,
                bit_depth,
                dim_shift,
                name,
            });
        }

        let animation = if reader.read_bit()? {
            Some(AnimationHeader {
                tps_numerator: reader.read_bits(32)?,
                tps_denominator: reader.read_bits(32)?,
                num_loops: reader.read_bits(32)?,
            })
        } else {
            None
        };

        Ok(Self {
            channels,
            pixel_type,
            bits_per_sample,
            alpha_mode,
            color_space,
            orientation,
            extra_channels,
            animation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxel_core::PixelType;

    fn roundtrip(header: &ImageHeader) {
        let mut writer = BitstreamWriter::new();
        header.write(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = BitstreamReader::new(&bytes);
        assert_eq!(&ImageHeader::parse(&mut reader).unwrap(), header);
    }

    #[test]
    fn rgb_u8_roundtrip() {
        let frame = ImageFrame::new(10, 10, ColorChannels::Rgb, PixelType::U8).unwrap();
        roundtrip(&ImageHeader::from_frame(&frame, None));
    }

    #[test]
    fn animated_rgba_roundtrip() {
        let frame = ImageFrame::new(10, 10, ColorChannels::Rgba, PixelType::U16).unwrap();
        let config = AnimationConfig::default();
        let header = ImageHeader::from_frame(&frame, Some(&config));
        assert!(header.animation.is_some());
        roundtrip(&header);
    }

    #[test]
    fn custom_color_space_roundtrip() {
        let mut frame = ImageFrame::new(10, 10, ColorChannels::Rgb, PixelType::F32).unwrap();
        frame.color_space = ColorSpace::Custom {
            primaries: [[0.64, 0.33], [0.30, 0.60], [0.15, 0.06]],
            white_point: [0.3127, 0.3290],
            transfer: TransferFunction::Gamma(2.2),
        };
        roundtrip(&ImageHeader::from_frame(&frame, None));
    }

    #[test]
    fn extra_channel_descriptors_roundtrip() {
        let mut frame = ImageFrame::new(4, 4, ColorChannels::Rgb, PixelType::U8).unwrap();
        frame.extra_channels.push(ExtraChannel {
            kind: ExtraChannelType::Depth,
            bit_depth: 12,
            dim_shift: 1,
            name: "depth".to_string(),
            data: vec![0; 2 * 2 * 2],
        });
        let header = ImageHeader::from_frame(&frame, None);
        assert_eq!(header.extra_channels.len(), 1);
        assert_eq!(header.extra_channels[0].bit_depth, 12);
        roundtrip(&header);
    }

    #[test]
    fn bit_depth_boundaries() {
        for depth in [1u8, 8, 12, 16, 24, 32] {
            let mut frame = ImageFrame::new(4, 4, ColorChannels::Rgb, PixelType::F32).unwrap();
            frame.bit_depth = depth;
            roundtrip(&ImageHeader::from_frame(&frame, None));
        }
    }
}
