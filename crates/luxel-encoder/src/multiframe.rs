//! Multi-frame orchestration: animation and reference-frame deltas
//!
//! Each frame is either a keyframe (full encode, saved into a reference
//! slot) or a delta frame carrying residuals against the most similar
//! slot. Residuals are computed against the slot's source pixels
//! (open-loop prediction); deltas are never saved as references, so the
//! prediction error cannot accumulate. Slots evict oldest-first.

use std::sync::Arc;

use luxel_bitstream::BitstreamWriter;
use luxel_core::consts::TICKS_PER_SECOND;
use luxel_core::{
    BufferPool, EncodingOptions, Error, ImageFrame, PixelType, ReferenceFrameConfig, Result,
};
use luxel_headers::{FrameEncoding, FrameHeader};
use luxel_runtime::{Kernels, WorkStealingPool};

use crate::frame::{plane_to_i32, Overlays};
use crate::modular::{delta_payload, modular_payload};
use crate::vardct::{encode_vardct_payload, VarDctSettings};

struct ReferenceSlot {
    planes: Vec<Vec<i32>>,
    inserted_at: u64,
}

struct SlotTable {
    slots: Vec<Option<ReferenceSlot>>,
    clock: u64,
}

impl SlotTable {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            clock: 0,
        }
    }

    /// Store a frame's planes, evicting the oldest slot when full.
    /// Returns the 1-based slot index.
    fn save(&mut self, planes: Vec<Vec<i32>>) -> u8 {
        self.clock += 1;
        let index = match self.slots.iter().position(|s| s.is_none()) {
            Some(empty) => empty,
            None => self
                .slots
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.as_ref().map(|r| r.inserted_at).unwrap_or(0))
                .map(|(i, _)| i)
                .unwrap_or(0),
        };
        self.slots[index] = Some(ReferenceSlot {
            planes,
            inserted_at: self.clock,
        });
        index as u8 + 1
    }

    /// Most similar occupied slot: (1-based index, similarity score).
    fn best_match(&self, planes: &[Vec<i32>], range: f64) -> Option<(u8, f32)> {
        let mut best: Option<(u8, f32)> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let score = similarity(planes, &slot.planes, range);
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((i as u8 + 1, score));
            }
        }
        best
    }

    fn planes(&self, slot: u8) -> Result<&[Vec<i32>]> {
        self.slots
            .get(slot as usize - 1)
            .and_then(|s| s.as_ref())
            .map(|s| s.planes.as_slice())
            .ok_or_else(|| Error::EncodingFailed(format!("reference slot {} empty", slot)))
    }
}

/// Similarity in [0, 1]: 1 means identical planes.
fn similarity(a: &[Vec<i32>], b: &[Vec<i32>], range: f64) -> f32 {
    let mut total_diff = 0f64;
    let mut total_samples = 0usize;
    for (pa, pb) in a.iter().zip(b.iter()) {
        for (&x, &y) in pa.iter().zip(pb.iter()) {
            total_diff += (x as f64 - y as f64).abs();
        }
        total_samples += pa.len();
    }
    if total_samples == 0 {
        return 0.0;
    }
    let mad = total_diff / total_samples as f64;
    (1.0 - mad / range).clamp(0.0, 1.0) as f32
}

/// Duration in ticks for frame `index`
pub(crate) fn frame_duration(options: &EncodingOptions, index: usize) -> u32 {
    let animation = options.animation.clone().unwrap_or_default();
    if let Some(durations) = &animation.frame_durations {
        if let Some(&d) = durations.get(index) {
            return d;
        }
    }
    (TICKS_PER_SECOND as f32 / animation.fps) as u32
}

fn with_frame_index(error: Error, index: usize) -> Error {
    match error {
        Error::InvalidInput(msg) => Error::InvalidInput(format!("frame {}: {}", index, msg)),
        Error::EncodingFailed(msg) => Error::EncodingFailed(format!("frame {}: {}", index, msg)),
        Error::NotSupported(msg) => Error::NotSupported(format!("frame {}: {}", index, msg)),
        Error::DecodeFailed(msg) => Error::DecodeFailed(format!("frame {}: {}", index, msg)),
    }
}

pub(crate) struct SequenceStats {
    pub keyframes: usize,
    pub deltas: usize,
}

/// Encode an animation sequence into `writer` (headers for the image
/// itself are already written).
pub(crate) fn encode_sequence(
    frames: &[ImageFrame],
    options: &EncodingOptions,
    kernels: &'static dyn Kernels,
    pool: &WorkStealingPool,
    scratch: &Arc<BufferPool<f32>>,
    writer: &mut BitstreamWriter,
) -> Result<SequenceStats> {
    let first = &frames[0];
    let reference_config = options.reference_frames;
    let slot_capacity = reference_config
        .map(|c| c.max_reference_slots as usize)
        .unwrap_or(1);
    let mut slots = SlotTable::new(slot_capacity);
    let range = crate::frame::med_max_sample(first.bit_depth).max(1) as f64;

    let mut stats = SequenceStats {
        keyframes: 0,
        deltas: 0,
    };
    let mut frames_since_keyframe = 0u32;
    let mut consecutive_deltas = 0u32;

    for (index, frame) in frames.iter().enumerate() {
        frame.validate().map_err(|e| with_frame_index(e, index))?;
        if frame.width() != first.width()
            || frame.height() != first.height()
            || frame.channel_count() != first.channel_count()
            || frame.pixel_type() != first.pixel_type()
        {
            return Err(Error::InvalidInput(format!(
                "frame {}: geometry differs from frame 0",
                index
            )));
        }

        let planes: Vec<Vec<i32>> = frame.buffer.planes().iter().map(plane_to_i32).collect();
        let is_last = index == frames.len() - 1;
        let duration = frame_duration(options, index);

        // Overlays attach to the last frame, once reference slots exist
        let overlays = if is_last {
            Overlays {
                patches: &options.patches,
                splines: &options.splines,
                noise: if options.is_modular() {
                    None
                } else {
                    options.noise.as_ref()
                },
            }
        } else {
            Overlays::none()
        };

        let delta_target = reference_config.and_then(|config| {
            decide_delta(
                index,
                frames_since_keyframe,
                consecutive_deltas,
                &config,
                &slots,
                &planes,
                range,
                frame.pixel_type(),
            )
        });

        match delta_target {
            Some(reference_slot) => {
                let reference = slots.planes(reference_slot)?;
                let payload = delta_payload(&planes, reference, options.use_ans)
                    .map_err(|e| with_frame_index(e, index))?;
                let header = FrameHeader {
                    encoding: FrameEncoding::Modular,
                    is_last,
                    duration,
                    reference_slot,
                    color_transform: luxel_headers::frame::color_transform::NONE,
                    distance: 0.0,
                    use_ans: options.use_ans,
                    has_patches: !overlays.patches.is_empty(),
                    has_splines: !overlays.splines.is_empty(),
                    has_noise: overlays.noise.is_some(),
                    ..FrameHeader::default()
                };
                header.write(writer, true)?;
                writer.flush_byte();
                writer.write_data(&payload);
                stats.deltas += 1;
                consecutive_deltas += 1;
                frames_since_keyframe += 1;
            }
            None => {
                let (payload, header_encoding, header_extra) =
                    encode_keyframe(frame, options, kernels, pool, scratch)
                        .map_err(|e| with_frame_index(e, index))?;
                let save_slot = slots.save(planes);
                let header = FrameHeader {
                    encoding: header_encoding,
                    is_last,
                    duration,
                    save_slot,
                    color_transform: header_extra.color_transform,
                    distance: header_extra.distance,
                    use_ans: options.use_ans,
                    has_scale_map: header_extra.has_scale_map,
                    has_patches: !overlays.patches.is_empty(),
                    has_splines: !overlays.splines.is_empty(),
                    has_noise: overlays.noise.is_some(),
                    ..FrameHeader::default()
                };
                header.write(writer, true)?;
                writer.flush_byte();
                writer.write_data(&payload);
                stats.keyframes += 1;
                consecutive_deltas = 0;
                frames_since_keyframe = 1;
            }
        }

        if !overlays.is_empty() {
            overlays.write(writer).map_err(|e| with_frame_index(e, index))?;
        }
    }
    Ok(stats)
}

pub(crate) struct KeyframeHeaderInfo {
    pub color_transform: u32,
    pub distance: f32,
    pub has_scale_map: bool,
}

/// Full encode of one frame.
pub(crate) fn encode_keyframe(
    frame: &ImageFrame,
    options: &EncodingOptions,
    kernels: &'static dyn Kernels,
    pool: &WorkStealingPool,
    scratch: &Arc<BufferPool<f32>>,
) -> Result<(Vec<u8>, FrameEncoding, KeyframeHeaderInfo)> {
    if options.is_modular() {
        let payload = modular_payload(frame, options.use_ans, kernels, pool)?;
        Ok((
            payload,
            FrameEncoding::Modular,
            KeyframeHeaderInfo {
                color_transform: luxel_headers::frame::color_transform::NONE,
                distance: 0.0,
                has_scale_map: false,
            },
        ))
    } else {
        let settings = crate::vardct_settings(frame, options, options.distance(), 1);
        let output = encode_vardct_payload(frame, &settings, kernels, pool, scratch)?;
        Ok((
            output.payload,
            FrameEncoding::VarDct,
            KeyframeHeaderInfo {
                color_transform: settings.color_transform,
                distance: settings.distance,
                has_scale_map: output.has_scale_map,
            },
        ))
    }
}

#[allow(clippy::too_many_arguments)]
fn decide_delta(
    index: usize,
    frames_since_keyframe: u32,
    consecutive_deltas: u32,
    config: &ReferenceFrameConfig,
    slots: &SlotTable,
    planes: &[Vec<i32>],
    range: f64,
    pixel_type: PixelType,
) -> Option<u8> {
    if index == 0 {
        return None;
    }
    // Float planes travel as bit patterns; differencing them is meaningless
    if pixel_type == PixelType::F32 {
        return None;
    }
    if frames_since_keyframe >= config.keyframe_interval {
        return None;
    }
    if consecutive_deltas >= config.max_delta_frames {
        return None;
    }
    let (slot, score) = slots.best_match(planes, range)?;
    if score < config.similarity_threshold {
        return None;
    }
    Some(slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_of_identical_planes_is_one() {
        let planes = vec![vec![5i32; 64]; 3];
        assert_eq!(similarity(&planes, &planes, 255.0), 1.0);
    }

    #[test]
    fn similarity_decreases_with_difference() {
        let a = vec![vec![0i32; 64]];
        let b = vec![vec![51i32; 64]];
        let score = similarity(&a, &b, 255.0);
        assert!((score - 0.8).abs() < 1e-5, "score {}", score);
    }

    #[test]
    fn slot_table_evicts_oldest() {
        let mut table = SlotTable::new(2);
        assert_eq!(table.save(vec![vec![1]]), 1);
        assert_eq!(table.save(vec![vec![2]]), 2);
        // Full: oldest (slot 1) is replaced
        assert_eq!(table.save(vec![vec![3]]), 1);
        assert_eq!(table.planes(1).unwrap()[0], vec![3]);
        assert_eq!(table.planes(2).unwrap()[0], vec![2]);
    }

    #[test]
    fn duration_falls_back_to_fps() {
        let mut options = EncodingOptions::default();
        options.animation = Some(luxel_core::AnimationConfig {
            fps: 30.0,
            ..Default::default()
        });
        assert_eq!(frame_duration(&options, 0), 33);

        options.animation = Some(luxel_core::AnimationConfig {
            fps: 30.0,
            frame_durations: Some(vec![10, 20]),
            ..Default::default()
        });
        assert_eq!(frame_duration(&options, 1), 20);
        assert_eq!(frame_duration(&options, 5), 33);
    }

    #[test]
    fn keyframe_interval_forces_refresh() {
        let config = ReferenceFrameConfig {
            keyframe_interval: 4,
            max_delta_frames: 10,
            similarity_threshold: 0.0,
            max_reference_slots: 2,
        };
        let slots = {
            let mut t = SlotTable::new(2);
            t.save(vec![vec![0i32; 16]]);
            t
        };
        let planes = vec![vec![0i32; 16]];
        assert!(decide_delta(1, 1, 0, &config, &slots, &planes, 255.0, PixelType::U8).is_some());
        assert!(decide_delta(5, 4, 3, &config, &slots, &planes, 255.0, PixelType::U8).is_none());
    }
}
