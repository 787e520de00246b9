//! Encoding pipelines
//!
//! [`Encoder`] is the library entry point: it validates the frame and
//! options, routes to the modular or VarDCT path (plain, progressive,
//! responsive or animated), and assembles the bare codestream. The
//! convenience [`encode`] function covers the one-shot case.

mod frame;
mod modular;
mod multiframe;
mod vardct;

use std::sync::Arc;

use luxel_bitstream::BitstreamWriter;
use luxel_core::{
    BufferPool, ColorSpace, EncodingOptions, Error, ImageFrame, LossyColorTransform, PixelType,
    PoolMetrics, ResponsiveConfig, Result,
};
use luxel_headers::{frame::color_transform, FrameEncoding, FrameHeader, ImageHeader, SizeHeader, FRAME_TERMINATOR};
use luxel_runtime::{Backend, Dispatcher, WorkStealingPool};

use frame::Overlays;
use luxel_entropy::encode_residual_section;
use modular::{apply_squeeze, layer_samples, modular_payload, squeeze_regions};
use vardct::{encode_vardct_payload, VarDctSettings};

/// Counters reported alongside the codestream
#[derive(Debug, Clone)]
pub struct EncodeStats {
    pub encoded_bytes: usize,
    pub frame_count: usize,
    pub keyframe_count: usize,
    pub delta_frame_count: usize,
    /// Whether the lossless path produced the stream
    pub modular: bool,
    pub backend: Backend,
    pub pool_metrics: PoolMetrics,
}

/// Result of an encode call
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub stats: EncodeStats,
}

/// Resolve the VarDCT settings for a frame: a color transform only
/// applies to three-or-more-channel RGB-like frames.
pub(crate) fn vardct_settings(
    frame: &ImageFrame,
    options: &EncodingOptions,
    distance: f32,
    num_passes: u8,
) -> VarDctSettings {
    let rgb_like = frame.channel_count() >= 3
        && !matches!(frame.color_space, ColorSpace::Cmyk | ColorSpace::Grayscale);
    let transform = if !rgb_like {
        color_transform::NONE
    } else {
        match options.color_transform {
            LossyColorTransform::YCbCr => color_transform::YCBCR,
            LossyColorTransform::Xyb => color_transform::XYB,
        }
    };
    VarDctSettings {
        distance,
        color_transform: transform,
        adaptive: options.adaptive_quantization && options.effort >= 3,
        roi: options.roi,
        num_passes,
        use_ans: options.use_ans,
    }
}

/// JPEG XL encoder with cached dispatch and per-encoder pools
pub struct Encoder {
    options: EncodingOptions,
    dispatcher: Dispatcher,
    pool: WorkStealingPool,
    scratch: Arc<BufferPool<f32>>,
}

impl Encoder {
    pub fn new(options: EncodingOptions) -> Self {
        Self {
            options,
            dispatcher: Dispatcher::new(),
            pool: WorkStealingPool::new(),
            scratch: Arc::new(BufferPool::default()),
        }
    }

    /// Force a dispatch backend (errors when this build lacks it).
    pub fn with_backend(options: EncodingOptions, backend: Backend) -> Result<Self> {
        Ok(Self {
            options,
            dispatcher: Dispatcher::with_backend(backend)?,
            pool: WorkStealingPool::new(),
            scratch: Arc::new(BufferPool::default()),
        })
    }

    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    pub fn backend(&self) -> Backend {
        self.dispatcher.backend()
    }

    /// Encode a single frame into a bare codestream.
    pub fn encode(&self, frame: &ImageFrame) -> Result<EncodedImage> {
        frame.validate()?;
        self.options.validate(frame)?;

        let mut writer = BitstreamWriter::new();
        writer.jxl_signature();
        SizeHeader::new(frame.width(), frame.height())?.write(&mut writer)?;
        let animated = self.options.animation.is_some();
        ImageHeader::from_frame(frame, self.options.animation.as_ref()).write(&mut writer)?;
        // Frames start byte-aligned
        writer.flush_byte();

        let mut frame_count = 1;
        if let Some(responsive) = self.options.responsive.clone() {
            frame_count = responsive.layers as usize;
            self.encode_responsive(frame, &responsive, animated, &mut writer)?;
        } else {
            self.encode_plain_frame(frame, animated, &mut writer)?;
        }
        writer.write_byte(FRAME_TERMINATOR);

        let data = writer.into_bytes();
        frame::check_size_cap(data.len(), self.options.max_encoded_size)?;
        Ok(EncodedImage {
            stats: self.stats(data.len(), frame_count, frame_count, 0),
            data,
        })
    }

    /// Encode an animation: keyframes plus reference-frame deltas.
    pub fn encode_animation(&self, frames: &[ImageFrame]) -> Result<EncodedImage> {
        let first = frames
            .first()
            .ok_or_else(|| Error::invalid("animation with zero frames"))?;
        first.validate()?;
        self.options.validate(first)?;

        let mut writer = BitstreamWriter::new();
        writer.jxl_signature();
        SizeHeader::new(first.width(), first.height())?.write(&mut writer)?;
        let animation = self.options.animation.clone().unwrap_or_default();
        ImageHeader::from_frame(first, Some(&animation)).write(&mut writer)?;
        writer.flush_byte();

        let mut options = self.options.clone();
        options.animation = Some(animation);
        let stats = multiframe::encode_sequence(
            frames,
            &options,
            self.dispatcher.kernels(),
            &self.pool,
            &self.scratch,
            &mut writer,
        )?;
        writer.write_byte(FRAME_TERMINATOR);

        let data = writer.into_bytes();
        frame::check_size_cap(data.len(), self.options.max_encoded_size)?;
        Ok(EncodedImage {
            stats: self.stats(data.len(), frames.len(), stats.keyframes, stats.deltas),
            data,
        })
    }

    fn stats(
        &self,
        encoded_bytes: usize,
        frame_count: usize,
        keyframe_count: usize,
        delta_frame_count: usize,
    ) -> EncodeStats {
        EncodeStats {
            encoded_bytes,
            frame_count,
            keyframe_count,
            delta_frame_count,
            modular: self.options.is_modular(),
            backend: self.dispatcher.backend(),
            pool_metrics: self.scratch.metrics(),
        }
    }

    fn overlays(&self) -> Overlays<'_> {
        Overlays {
            patches: &self.options.patches,
            splines: &self.options.splines,
            noise: if self.options.is_modular() {
                None
            } else {
                self.options.noise.as_ref()
            },
        }
    }

    /// One self-contained frame, modular or VarDCT, optionally progressive.
    fn encode_plain_frame(
        &self,
        frame: &ImageFrame,
        animated: bool,
        writer: &mut BitstreamWriter,
    ) -> Result<()> {
        let overlays = self.overlays();
        let duration = if animated {
            multiframe::frame_duration(&self.options, 0)
        } else {
            0
        };

        if self.options.is_modular() {
            let payload =
                modular_payload(frame, self.options.use_ans, self.dispatcher.kernels(), &self.pool)?;
            let header = FrameHeader {
                encoding: FrameEncoding::Modular,
                is_last: true,
                duration,
                color_transform: color_transform::NONE,
                distance: 0.0,
                use_ans: self.options.use_ans,
                has_patches: !overlays.patches.is_empty(),
                has_splines: !overlays.splines.is_empty(),
                has_noise: overlays.noise.is_some(),
                ..FrameHeader::default()
            };
            header.write(writer, animated)?;
            writer.flush_byte();
            writer.write_data(&payload);
        } else {
            let num_passes = if self.options.progressive { 3 } else { 1 };
            let settings = vardct_settings(frame, &self.options, self.options.distance(), num_passes);
            let output = encode_vardct_payload(
                frame,
                &settings,
                self.dispatcher.kernels(),
                &self.pool,
                &self.scratch,
            )?;
            let header = FrameHeader {
                encoding: FrameEncoding::VarDct,
                is_last: true,
                duration,
                num_passes,
                color_transform: settings.color_transform,
                distance: settings.distance,
                use_ans: self.options.use_ans,
                has_scale_map: output.has_scale_map,
                has_patches: !overlays.patches.is_empty(),
                has_splines: !overlays.splines.is_empty(),
                has_noise: overlays.noise.is_some(),
                ..FrameHeader::default()
            };
            header.write(writer, animated)?;
            writer.flush_byte();
            writer.write_data(&output.payload);
        }

        if !overlays.is_empty() {
            overlays.write(writer)?;
        }
        Ok(())
    }

    /// Responsive layering. VarDCT layers are self-contained re-encodes at
    /// strictly decreasing distances; modular layers refine a squeezed
    /// pyramid. Every layer is byte-aligned and the stream stays decodable
    /// when truncated at any layer boundary.
    fn encode_responsive(
        &self,
        frame: &ImageFrame,
        responsive: &ResponsiveConfig,
        animated: bool,
        writer: &mut BitstreamWriter,
    ) -> Result<()> {
        let layers = responsive.layers as usize;
        if self.options.is_modular() {
            self.encode_responsive_modular(frame, layers, animated, writer)
        } else {
            let distances = match &responsive.layer_distances {
                Some(distances) => distances.clone(),
                None => {
                    let base = self.options.distance().max(0.5);
                    (0..layers)
                        .map(|i| base * (1u32 << (layers - 1 - i)) as f32)
                        .collect()
                }
            };
            for (layer, &distance) in distances.iter().enumerate() {
                let settings = vardct_settings(frame, &self.options, distance, 1);
                let output = encode_vardct_payload(
                    frame,
                    &settings,
                    self.dispatcher.kernels(),
                    &self.pool,
                    &self.scratch,
                )?;
                let header = FrameHeader {
                    encoding: FrameEncoding::VarDct,
                    is_last: layer == layers - 1,
                    duration: 0,
                    layer_index: layer as u8,
                    color_transform: settings.color_transform,
                    distance: settings.distance,
                    use_ans: self.options.use_ans,
                    has_scale_map: output.has_scale_map,
                    ..FrameHeader::default()
                };
                header.write(writer, animated)?;
                writer.flush_byte();
                writer.write_data(&output.payload);
            }
            Ok(())
        }
    }

    fn encode_responsive_modular(
        &self,
        frame: &ImageFrame,
        layers: usize,
        animated: bool,
        writer: &mut BitstreamWriter,
    ) -> Result<()> {
        if frame.pixel_type() == PixelType::F32 {
            return Err(Error::NotSupported(
                "responsive lossless encoding of float frames".to_string(),
            ));
        }
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let levels = layers - 1;
        let kernels = self.dispatcher.kernels();

        let mut planes: Vec<Vec<i32>> =
            frame.buffer.planes().iter().map(frame::plane_to_i32).collect();
        if frame::uses_rct(planes.len(), frame.pixel_type(), frame.color_space) {
            let (c0, rest) = planes.split_at_mut(1);
            let (c1, c2) = rest.split_at_mut(1);
            kernels.rct_forward(&mut c0[0], &mut c1[0], &mut c2[0]);
        }
        for plane in planes.iter_mut() {
            apply_squeeze(plane, width, height, levels, kernels);
        }
        let regions = squeeze_regions(width, height, levels);

        for layer in 0..layers {
            let header = FrameHeader {
                encoding: FrameEncoding::Modular,
                is_last: layer == layers - 1,
                is_refinement: layer > 0,
                layer_index: layer as u8,
                // Layer 0 advertises the total layer count so the decoder
                // can size the squeeze pyramid up front
                num_passes: if layer == 0 { layers as u8 } else { 1 },
                color_transform: color_transform::NONE,
                distance: 0.0,
                use_ans: self.options.use_ans,
                ..FrameHeader::default()
            };
            header.write(writer, animated)?;
            writer.flush_byte();

            let mut payload = BitstreamWriter::new();
            for plane in planes.iter() {
                let samples = layer_samples(plane, width, &regions, layer);
                let residuals = if layer == 0 {
                    let (bw, bh) = regions[levels];
                    kernels.med_residuals(&samples, bw, bh, frame::med_max_sample(frame.bit_depth))
                } else {
                    samples
                };
                let section = encode_residual_section(&residuals, self.options.use_ans)?;
                frame::write_section(&mut payload, &section);
            }
            if layer == 0 {
                for ec in &frame.extra_channels {
                    let samples = frame::extra_channel_to_i32(ec, frame.width(), frame.height());
                    let w = (frame.width() >> ec.dim_shift).max(1) as usize;
                    let h = (frame.height() >> ec.dim_shift).max(1) as usize;
                    let residuals = if ec.bit_depth <= frame::MAX_MED_BIT_DEPTH {
                        kernels.med_residuals(&samples, w, h, frame::med_max_sample(ec.bit_depth))
                    } else {
                        samples
                    };
                    let section = encode_residual_section(&residuals, self.options.use_ans)?;
                    frame::write_section(&mut payload, &section);
                }
            }
            writer.write_data(&payload.into_bytes());
        }
        Ok(())
    }
}

/// One-shot encode, the contract consumed by the validation harness.
pub fn encode(frame: &ImageFrame, options: &EncodingOptions) -> Result<EncodedImage> {
    Encoder::new(options.clone()).encode(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxel_core::{ColorChannels, EncodingMode, Plane};

    fn gradient_frame() -> ImageFrame {
        let mut frame = ImageFrame::new(32, 32, ColorChannels::Rgb, PixelType::U8).unwrap();
        for c in 0..3 {
            if let Plane::U8(data) = frame.buffer.plane_mut(c).unwrap() {
                for y in 0..32u32 {
                    for x in 0..32u32 {
                        data[(y * 32 + x) as usize] = match c {
                            0 => (x * 255 / 31) as u8,
                            1 => (y * 255 / 31) as u8,
                            _ => ((x + y) * 255 / 62) as u8,
                        };
                    }
                }
            }
        }
        frame
    }

    #[test]
    fn lossless_stream_is_signature_prefixed() {
        let encoded = encode(&gradient_frame(), &EncodingOptions::lossless()).unwrap();
        assert_eq!(&encoded.data[..2], &[0xFF, 0x0A]);
        assert!(encoded.stats.modular);
        assert_eq!(encoded.stats.frame_count, 1);
    }

    #[test]
    fn lossy_stream_smaller_than_raw() {
        let encoded = encode(&gradient_frame(), &EncodingOptions::lossy(90.0)).unwrap();
        assert!(encoded.data.len() < 32 * 32 * 3);
        assert!(!encoded.stats.modular);
    }

    #[test]
    fn size_cap_enforced() {
        let mut options = EncodingOptions::lossless();
        options.max_encoded_size = Some(16);
        assert!(matches!(
            encode(&gradient_frame(), &options),
            Err(Error::EncodingFailed(_))
        ));
    }

    #[test]
    fn roi_zero_boost_matches_no_roi() {
        let frame = gradient_frame();
        let plain = encode(&frame, &EncodingOptions::lossy(85.0)).unwrap();

        let mut with_roi = EncodingOptions::lossy(85.0);
        with_roi.roi = Some(luxel_core::RegionOfInterest {
            x: 4,
            y: 4,
            width: 8,
            height: 8,
            boost: 0.0,
            feather: 4.0,
        });
        let boosted = encode(&frame, &with_roi).unwrap();
        assert_eq!(plain.data, boosted.data);
    }

    #[test]
    fn roi_boost_changes_stream() {
        let frame = gradient_frame();
        let plain = encode(&frame, &EncodingOptions::lossy(85.0)).unwrap();

        let mut with_roi = EncodingOptions::lossy(85.0);
        with_roi.roi = Some(luxel_core::RegionOfInterest {
            x: 4,
            y: 4,
            width: 8,
            height: 8,
            boost: 30.0,
            feather: 4.0,
        });
        let boosted = encode(&frame, &with_roi).unwrap();
        assert_ne!(plain.data, boosted.data);
    }

    #[test]
    fn distance_mode_roundtrips_options() {
        let mut options = EncodingOptions::with_distance(1.0);
        options.mode = EncodingMode::Distance { distance: 1.0 };
        let encoded = encode(&gradient_frame(), &options).unwrap();
        assert!(!encoded.data.is_empty());
    }

    #[test]
    fn animation_of_identical_frames_compresses_with_deltas() {
        let frame = gradient_frame();
        let frames = vec![frame.clone(), frame.clone(), frame];

        let mut options = EncodingOptions::lossy(90.0);
        options.animation = Some(luxel_core::AnimationConfig {
            fps: 30.0,
            ..Default::default()
        });
        options.reference_frames = Some(luxel_core::ReferenceFrameConfig::default());

        let encoder = Encoder::new(options.clone());
        let animated = encoder.encode_animation(&frames).unwrap();
        assert_eq!(animated.stats.keyframe_count, 1);
        assert_eq!(animated.stats.delta_frame_count, 2);

        let single = encode(&frames[0], &EncodingOptions::lossy(90.0)).unwrap();
        assert!(
            (animated.data.len() as f64) <= 1.5 * single.data.len() as f64,
            "animation {} vs single {}",
            animated.data.len(),
            single.data.len()
        );
    }

    #[test]
    fn responsive_layer_count_in_stats() {
        let mut options = EncodingOptions::lossy(80.0);
        options.responsive = Some(ResponsiveConfig {
            layers: 3,
            layer_distances: None,
        });
        let encoded = encode(&gradient_frame(), &options).unwrap();
        assert_eq!(encoded.stats.frame_count, 3);
    }
}
