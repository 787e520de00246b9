//! Round-trip decoder
//!
//! Covers every feature the encoder emits, which is what the round-trip
//! test matrix needs; it is not a general conformance decoder. The walk
//! is: signature, size header, image header, then frames until `is_last`
//! or the stream ends at a frame boundary (responsive prefixes stop
//! early and yield the best layer decoded so far).

mod modular;
mod overlays;
mod vardct;

use luxel_bitstream::BitstreamReader;
use luxel_core::{
    AlphaMode, ColorChannels, Error, ExtraChannel, ImageFrame, PixelBuffer, Result,
    CODESTREAM_SIGNATURE,
};
use luxel_headers::{FrameEncoding, FrameHeader, ImageHeader, SizeHeader, CONTAINER_SIGNATURE};

use modular::ResponsiveState;

pub(crate) struct DecodeContext {
    pub width: usize,
    pub height: usize,
    pub header: ImageHeader,
    /// Reference slots, 1-based externally; each holds color planes in
    /// the i32 working representation
    pub slots: Vec<Option<Vec<Vec<i32>>>>,
    /// Extra channels carried forward across delta frames
    pub extra_channels: Vec<ExtraChannel>,
}

impl DecodeContext {
    pub(crate) fn slot(&self, index: u8) -> Result<&Vec<Vec<i32>>> {
        self.slots
            .get(index as usize - 1)
            .and_then(|s| s.as_ref())
            .ok_or_else(|| Error::DecodeFailed(format!("reference slot {} empty", index)))
    }
}

/// JPEG XL decoder for bare codestreams
#[derive(Debug, Default)]
pub struct Decoder;

impl Decoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode the displayed image: the last frame of an animation, the
    /// finest layer of a responsive stream, or simply the single frame.
    pub fn decode(&self, data: &[u8]) -> Result<ImageFrame> {
        let mut frames = self.decode_frames(data)?;
        frames
            .pop()
            .ok_or_else(|| Error::DecodeFailed("stream holds no frames".to_string()))
    }

    /// Decode every frame in the stream.
    pub fn decode_frames(&self, data: &[u8]) -> Result<Vec<ImageFrame>> {
        if data.len() >= CONTAINER_SIGNATURE.len() && data[..12] == CONTAINER_SIGNATURE {
            return Err(Error::DecodeFailed(
                "input is an ISOBMFF container, expected a bare codestream".to_string(),
            ));
        }
        if data.len() < 2 || data[..2] != CODESTREAM_SIGNATURE {
            return Err(Error::DecodeFailed("bad codestream signature".to_string()));
        }

        let mut reader = BitstreamReader::new(data);
        reader.read_data(2)?; // signature
        let size = SizeHeader::parse(&mut reader)?;
        let header = ImageHeader::parse(&mut reader)?;
        let animated = header.animation.is_some();

        let mut context = DecodeContext {
            width: size.width as usize,
            height: size.height as usize,
            header,
            slots: (0..luxel_core::consts::MAX_REFERENCE_SLOTS).map(|_| None).collect(),
            extra_channels: Vec::new(),
        };

        let mut frames = Vec::new();
        let mut responsive: Option<ResponsiveState> = None;
        loop {
            reader.skip_to_byte_alignment();
            if reader.is_empty() {
                break;
            }
            let frame_header = FrameHeader::parse(&mut reader, animated)?;
            reader.skip_to_byte_alignment();

            let decoded = self.decode_frame(&mut reader, &frame_header, &mut context, &mut responsive)?;
            let is_last = frame_header.is_last;
            if let Some(frame) = decoded {
                frames.push(frame);
            }
            if is_last {
                break;
            }
        }

        if frames.is_empty() {
            return Err(Error::DecodeFailed("stream holds no frames".to_string()));
        }
        Ok(frames)
    }

    fn decode_frame(
        &self,
        reader: &mut BitstreamReader<'_>,
        frame_header: &FrameHeader,
        context: &mut DecodeContext,
        responsive: &mut Option<ResponsiveState>,
    ) -> Result<Option<ImageFrame>> {
        // Responsive-modular pyramid frames
        if frame_header.encoding == FrameEncoding::Modular
            && (frame_header.is_refinement
                || (frame_header.num_passes > 1 && frame_header.reference_slot == 0))
        {
            if responsive.is_none() {
                if frame_header.is_refinement {
                    return Err(Error::DecodeFailed(
                        "refinement layer without a base layer".to_string(),
                    ));
                }
                *responsive = Some(ResponsiveState::new(
                    context,
                    frame_header.num_passes as usize,
                )?);
            }
            let state = responsive
                .as_mut()
                .ok_or_else(|| Error::DecodeFailed("missing pyramid state".to_string()))?;
            let frame = state.decode_layer(reader, frame_header, context)?;
            return Ok(Some(frame));
        }

        let mut planes;
        let extra_channels;
        match frame_header.encoding {
            FrameEncoding::Modular if frame_header.reference_slot > 0 => {
                let reference = context.slot(frame_header.reference_slot)?.clone();
                planes = modular::decode_delta(reader, &reference, frame_header.use_ans)?;
                extra_channels = context.extra_channels.clone();
            }
            FrameEncoding::Modular => {
                let (color, ecs) = modular::decode_modular(reader, context, frame_header.use_ans)?;
                planes = color;
                extra_channels = ecs;
            }
            FrameEncoding::VarDct => {
                let (color, ecs) = vardct::decode_vardct(reader, frame_header, context)?;
                planes = color;
                extra_channels = ecs;
            }
        }

        // Overlay records follow the payload
        reader.skip_to_byte_alignment();
        if frame_header.has_patches {
            let patches = luxel_headers::patch::parse_patches(reader)?;
            overlays::apply_patches(&patches, &mut planes, context)?;
        }
        if frame_header.has_splines {
            let splines = luxel_headers::spline::parse_splines(reader)?;
            overlays::render_splines(&splines, &mut planes, context.width, context.height);
        }
        if frame_header.has_noise {
            let params = luxel_headers::noise::NoiseParams::parse(reader)?;
            reader.skip_to_byte_alignment();
            overlays::synthesize_noise(&params, &mut planes, context.header.pixel_type);
        }

        if frame_header.save_slot > 0 {
            context.slots[frame_header.save_slot as usize - 1] = Some(planes.clone());
        }
        context.extra_channels = extra_channels.clone();

        let frame = build_frame(
            planes,
            extra_channels,
            context.width as u32,
            context.height as u32,
            &context.header,
        )?;
        Ok(Some(frame))
    }
}

/// Assemble an [`ImageFrame`] from decoded working planes.
pub(crate) fn build_frame(
    planes: Vec<Vec<i32>>,
    extra_channels: Vec<ExtraChannel>,
    width: u32,
    height: u32,
    header: &ImageHeader,
) -> Result<ImageFrame> {
    let typed_planes = planes
        .iter()
        .map(|p| modular::plane_from_working(header.pixel_type, p))
        .collect();
    let buffer = PixelBuffer::from_planes(width, height, typed_planes)?;
    let channels = ColorChannels::from_count(planes.len())
        .ok_or_else(|| Error::DecodeFailed(format!("{} channels", planes.len())))?;
    let alpha_mode = if channels.has_alpha() {
        match header.alpha_mode {
            AlphaMode::None => AlphaMode::Straight,
            mode => mode,
        }
    } else {
        AlphaMode::None
    };
    Ok(ImageFrame {
        buffer,
        channels,
        color_space: header.color_space,
        alpha_mode,
        bit_depth: header.bits_per_sample,
        orientation: header.orientation,
        extra_channels,
        metadata: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_signature() {
        let decoder = Decoder::new();
        assert!(matches!(
            decoder.decode(&[0x00, 0x01, 0x02]),
            Err(Error::DecodeFailed(_))
        ));
    }

    #[test]
    fn rejects_container_wrapped_input() {
        let decoder = Decoder::new();
        let mut data = CONTAINER_SIGNATURE.to_vec();
        data.extend_from_slice(&[0; 16]);
        let err = decoder.decode(&data).unwrap_err();
        assert!(matches!(err, Error::DecodeFailed(_)));
    }

    #[test]
    fn rejects_truncated_header() {
        let decoder = Decoder::new();
        assert!(decoder.decode(&[0xFF, 0x0A, 0x00]).is_err());
    }
}
