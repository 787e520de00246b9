//! Encoder options
//!
//! `EncodingOptions` is validated up front against the frame being encoded;
//! every out-of-range field maps to `Error::InvalidInput` so callers see
//! problems before any bits are written.

use crate::consts::{
    MAX_EFFORT, MAX_QUALITY, MAX_REFERENCE_SLOTS, MAX_RESPONSIVE_LAYERS, MAX_ROI_BOOST,
    MIN_EFFORT, MIN_QUALITY, MIN_RESPONSIVE_LAYERS,
};
use crate::{Error, ImageFrame, Patch, Result, Spline};

/// Rate-control mode
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodingMode {
    /// Bit-exact modular path
    Lossless,
    /// Quality-driven VarDCT path, quality in [0, 100]
    Lossy { quality: f32 },
    /// Butteraugli-style distance, d >= 0 (0 behaves as near-lossless)
    Distance { distance: f32 },
}

/// Color transform applied by the VarDCT path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LossyColorTransform {
    YCbCr,
    Xyb,
}

/// Nested quality layers decodable at any layer boundary
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponsiveConfig {
    /// Layer count, 2 through 8
    pub layers: u8,
    /// Optional per-layer distances; must be strictly decreasing
    pub layer_distances: Option<Vec<f32>>,
}

/// Animation timing
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationConfig {
    pub fps: f32,
    /// Tick rate is `TICKS_PER_SECOND / tps_denominator` per second
    pub tps_denominator: u32,
    /// Per-frame durations in ticks; falls back to `1000 / fps`
    pub frame_durations: Option<Vec<u32>>,
    /// 0 = loop forever
    pub num_loops: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            tps_denominator: 1,
            frame_durations: None,
            num_loops: 0,
        }
    }
}

/// Region-of-interest quality boost
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionOfInterest {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Quality points added inside the region, 0 through 50
    pub boost: f32,
    /// Feather band width in pixels around the region
    pub feather: f32,
}

/// Reference-frame policy for multi-frame encodes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceFrameConfig {
    /// Force a keyframe every this many frames
    pub keyframe_interval: u32,
    /// Maximum consecutive delta frames
    pub max_delta_frames: u32,
    /// Minimum slot similarity for a delta, in [0, 1]
    pub similarity_threshold: f32,
    /// Slot count, 1 through 8
    pub max_reference_slots: u8,
}

impl Default for ReferenceFrameConfig {
    fn default() -> Self {
        Self {
            keyframe_interval: 32,
            max_delta_frames: 7,
            similarity_threshold: 0.5,
            max_reference_slots: 4,
        }
    }
}

/// Synthetic film-grain parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoiseConfig {
    /// Overall amplitude, 0 through 1
    pub amplitude: f32,
    /// Luma strength, 0 through 2
    pub luma_strength: f32,
    /// Chroma strength, 0 through 2
    pub chroma_strength: f32,
    /// PRNG seed; 0 means the caller seeds from time and the output is not
    /// reproducible
    pub seed: u64,
}

/// All knobs for a single encode call
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingOptions {
    pub mode: EncodingMode,
    /// Encoding thoroughness, 1 (fastest) through 9 (smallest)
    pub effort: u8,
    pub progressive: bool,
    pub responsive: Option<ResponsiveConfig>,
    /// Route lossy modes through the modular path
    pub modular_for_lossy: bool,
    pub adaptive_quantization: bool,
    /// Select the rANS entropy coder instead of the RLE fast path
    pub use_ans: bool,
    /// Request the JPEG-transcode keep path (only valid for JPEG input)
    pub keep_jpeg: bool,
    pub color_transform: LossyColorTransform,
    pub animation: Option<AnimationConfig>,
    pub roi: Option<RegionOfInterest>,
    pub reference_frames: Option<ReferenceFrameConfig>,
    pub noise: Option<NoiseConfig>,
    /// Caller-provided overlays
    pub patches: Vec<Patch>,
    pub splines: Vec<Spline>,
    /// Abort with `EncodingFailed` if the output would exceed this size
    pub max_encoded_size: Option<usize>,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            mode: EncodingMode::Lossy {
                quality: crate::consts::DEFAULT_QUALITY,
            },
            effort: crate::consts::DEFAULT_EFFORT,
            progressive: false,
            responsive: None,
            modular_for_lossy: false,
            adaptive_quantization: false,
            use_ans: false,
            keep_jpeg: false,
            color_transform: LossyColorTransform::YCbCr,
            animation: None,
            roi: None,
            reference_frames: None,
            noise: None,
            patches: Vec::new(),
            splines: Vec::new(),
            max_encoded_size: None,
        }
    }
}

impl EncodingOptions {
    pub fn lossless() -> Self {
        Self {
            mode: EncodingMode::Lossless,
            ..Self::default()
        }
    }

    pub fn lossy(quality: f32) -> Self {
        Self {
            mode: EncodingMode::Lossy { quality },
            ..Self::default()
        }
    }

    pub fn with_distance(distance: f32) -> Self {
        Self {
            mode: EncodingMode::Distance { distance },
            ..Self::default()
        }
    }

    pub fn effort(mut self, effort: u8) -> Self {
        self.effort = effort;
        self
    }

    pub fn progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }

    pub fn use_ans(mut self, use_ans: bool) -> Self {
        self.use_ans = use_ans;
        self
    }

    pub fn adaptive_quantization(mut self, enabled: bool) -> Self {
        self.adaptive_quantization = enabled;
        self
    }

    /// Whether this encode takes the modular (lossless) path
    pub fn is_modular(&self) -> bool {
        matches!(self.mode, EncodingMode::Lossless) || self.modular_for_lossy
    }

    /// Distance derived from the rate-control mode. Lossy quality maps
    /// linearly: quality 100 -> 0, quality 90 -> 1, quality 0 -> 10.
    pub fn distance(&self) -> f32 {
        match self.mode {
            EncodingMode::Lossless => 0.0,
            EncodingMode::Distance { distance } => distance,
            EncodingMode::Lossy { quality } => ((MAX_QUALITY - quality) / 10.0).max(0.0),
        }
    }

    /// Validate option ranges and cross-checks against the target frame
    pub fn validate(&self, frame: &ImageFrame) -> Result<()> {
        match self.mode {
            EncodingMode::Lossy { quality } => {
                if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) || quality.is_nan() {
                    return Err(Error::invalid(format!(
                        "quality {} out of [0, 100]",
                        quality
                    )));
                }
            }
            EncodingMode::Distance { distance } => {
                if distance < 0.0 || distance.is_nan() {
                    return Err(Error::invalid(format!("negative distance {}", distance)));
                }
            }
            EncodingMode::Lossless => {}
        }

        if !(MIN_EFFORT..=MAX_EFFORT).contains(&self.effort) {
            return Err(Error::invalid(format!("effort {} not in 1..9", self.effort)));
        }

        if self.keep_jpeg {
            // Raw pixel input cannot take the JPEG-transcode keep path.
            return Err(Error::NotSupported(
                "keep_jpeg requires JPEG bitstream input, got raw pixels".to_string(),
            ));
        }

        if let Some(responsive) = &self.responsive {
            if !(MIN_RESPONSIVE_LAYERS..=MAX_RESPONSIVE_LAYERS).contains(&responsive.layers) {
                return Err(Error::invalid(format!(
                    "responsive layer count {} not in 2..8",
                    responsive.layers
                )));
            }
            if let Some(distances) = &responsive.layer_distances {
                if distances.len() != responsive.layers as usize {
                    return Err(Error::invalid(format!(
                        "{} layer distances for {} layers",
                        distances.len(),
                        responsive.layers
                    )));
                }
                for pair in distances.windows(2) {
                    if pair[1] >= pair[0] {
                        return Err(Error::invalid(
                            "responsive layer distances must be strictly decreasing",
                        ));
                    }
                }
            }
        }

        if let Some(roi) = &self.roi {
            if roi.x + roi.width > frame.width() || roi.y + roi.height > frame.height() {
                return Err(Error::invalid("ROI exceeds image bounds"));
            }
            if !(0.0..=MAX_ROI_BOOST).contains(&roi.boost) {
                return Err(Error::invalid(format!(
                    "ROI boost {} out of [0, 50]",
                    roi.boost
                )));
            }
            if roi.feather < 0.0 {
                return Err(Error::invalid("negative ROI feather radius"));
            }
        }

        if let Some(refs) = &self.reference_frames {
            if refs.max_reference_slots == 0 || refs.max_reference_slots > MAX_REFERENCE_SLOTS {
                return Err(Error::invalid(format!(
                    "reference slot count {} not in 1..8",
                    refs.max_reference_slots
                )));
            }
            if !(0.0..=1.0).contains(&refs.similarity_threshold) {
                return Err(Error::invalid("similarity threshold out of [0, 1]"));
            }
        }

        if let Some(animation) = &self.animation {
            if animation.fps <= 0.0 || animation.tps_denominator == 0 {
                return Err(Error::invalid("animation timing must be positive"));
            }
        }

        if let Some(noise) = &self.noise {
            if !(0.0..=1.0).contains(&noise.amplitude)
                || !(0.0..=2.0).contains(&noise.luma_strength)
                || !(0.0..=2.0).contains(&noise.chroma_strength)
            {
                return Err(Error::invalid("noise parameters out of range"));
            }
        }

        for patch in &self.patches {
            patch.validate(frame.width(), frame.height())?;
        }
        for spline in &self.splines {
            spline.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorChannels, PixelType};

    fn frame() -> ImageFrame {
        ImageFrame::new(32, 32, ColorChannels::Rgb, PixelType::U8).unwrap()
    }

    #[test]
    fn defaults_validate() {
        assert!(EncodingOptions::default().validate(&frame()).is_ok());
    }

    #[test]
    fn quality_bounds() {
        assert!(EncodingOptions::lossy(101.0).validate(&frame()).is_err());
        assert!(EncodingOptions::lossy(-1.0).validate(&frame()).is_err());
        assert!(EncodingOptions::lossy(0.0).validate(&frame()).is_ok());
    }

    #[test]
    fn effort_bounds() {
        assert!(EncodingOptions::lossless().effort(0).validate(&frame()).is_err());
        assert!(EncodingOptions::lossless().effort(10).validate(&frame()).is_err());
        assert!(EncodingOptions::lossless().effort(9).validate(&frame()).is_ok());
    }

    #[test]
    fn keep_jpeg_not_supported_for_raw() {
        let mut options = EncodingOptions::default();
        options.keep_jpeg = true;
        assert!(matches!(
            options.validate(&frame()),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn responsive_distances_must_decrease() {
        let mut options = EncodingOptions::default();
        options.responsive = Some(ResponsiveConfig {
            layers: 3,
            layer_distances: Some(vec![4.0, 2.0, 2.0]),
        });
        assert!(options.validate(&frame()).is_err());

        options.responsive = Some(ResponsiveConfig {
            layers: 3,
            layer_distances: Some(vec![4.0, 2.0, 1.0]),
        });
        assert!(options.validate(&frame()).is_ok());
    }

    #[test]
    fn roi_bounds_checked() {
        let mut options = EncodingOptions::default();
        options.roi = Some(RegionOfInterest {
            x: 16,
            y: 16,
            width: 17,
            height: 8,
            boost: 10.0,
            feather: 4.0,
        });
        assert!(options.validate(&frame()).is_err());
    }

    #[test]
    fn quality_to_distance() {
        assert_eq!(EncodingOptions::lossy(100.0).distance(), 0.0);
        assert_eq!(EncodingOptions::lossy(90.0).distance(), 1.0);
        assert_eq!(EncodingOptions::lossy(75.0).distance(), 2.5);
    }
}
