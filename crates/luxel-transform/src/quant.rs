//! Quantization matrices
//!
//! Matrices derive from the encoding distance; adaptive quantization and
//! the region-of-interest boost rescale them per block.

use luxel_core::consts::BLOCK_SIZE;
use luxel_core::RegionOfInterest;

/// Calibration constant for variance-driven adaptive quantization. The
/// scaling rule is a heuristic; this constant is tuned for 8-bit-range
/// spatial blocks.
pub const ADAPTIVE_QUANT_CALIBRATION: f32 = 0.02;

/// 8x8 quantization matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantMatrix {
    pub entries: [f32; 64],
}

impl QuantMatrix {
    /// Build the matrix for one channel from the encoding distance.
    /// Step size grows linearly with frequency; chroma channels use 1.5x
    /// coarser steps.
    pub fn from_distance(distance: f32, chroma: bool) -> Self {
        let base = (distance * 8.0).max(1.0);
        let chroma_scale = if chroma { 1.5 } else { 1.0 };
        let mut entries = [0.0f32; 64];
        for y in 0..BLOCK_SIZE {
            for x in 0..BLOCK_SIZE {
                entries[y * BLOCK_SIZE + x] =
                    base * (1.0 + 0.5 * (x + y) as f32) * chroma_scale;
            }
        }
        Self { entries }
    }

    /// Divide every step by `fineness` (> 1 means finer quantization).
    pub fn refined(&self, fineness: f32) -> Self {
        let mut entries = self.entries;
        for e in entries.iter_mut() {
            *e /= fineness;
        }
        Self { entries }
    }

    /// Multiply every step by `factor` (< 1 means finer quantization).
    pub fn scaled(&self, factor: f32) -> Self {
        let mut entries = self.entries;
        for e in entries.iter_mut() {
            *e *= factor;
        }
        Self { entries }
    }
}

/// Quantize one block: divide by the matrix, round half away from zero,
/// clamp into i16.
pub fn quantize_block(coeffs: &[f32; 64], matrix: &QuantMatrix, output: &mut [i16; 64]) {
    for i in 0..64 {
        let q = (coeffs[i] / matrix.entries[i]).round();
        output[i] = q.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}

/// Inverse of [`quantize_block`] up to the rounding loss.
pub fn dequantize_block(coeffs: &[i16; 64], matrix: &QuantMatrix, output: &mut [f32; 64]) {
    for i in 0..64 {
        output[i] = coeffs[i] as f32 * matrix.entries[i];
    }
}

/// Population variance of a spatial block: E[X^2] - E[X]^2.
pub fn block_variance(block: &[f32; 64]) -> f32 {
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;
    for &v in block.iter() {
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / 64.0;
    (sum_sq / 64.0 - mean * mean).max(0.0)
}

/// Fineness factor from the block's standard deviation. Higher variance
/// yields a finer quantizer; the factor is clamped into [0.5, 2.0].
pub fn adaptive_scale(sigma: f32, calibration: f32) -> f32 {
    (sigma * calibration).clamp(0.5, 2.0)
}

/// Per-block quantization factor for a region-of-interest boost.
///
/// Blocks overlapping the region get the full boost factor
/// `1 / (1 + boost/100)`; inside the feather band the factor follows a
/// cosine smoothstep of the L2 distance from the block center to the
/// region rectangle; beyond the band the factor is exactly 1.
pub fn roi_factor(roi: &RegionOfInterest, block_x: usize, block_y: usize) -> f32 {
    if roi.boost == 0.0 {
        return 1.0;
    }
    let boosted = 1.0 / (1.0 + roi.boost / 100.0);

    let bx0 = (block_x * BLOCK_SIZE) as f32;
    let by0 = (block_y * BLOCK_SIZE) as f32;
    let bx1 = bx0 + BLOCK_SIZE as f32;
    let by1 = by0 + BLOCK_SIZE as f32;

    let rx0 = roi.x as f32;
    let ry0 = roi.y as f32;
    let rx1 = rx0 + roi.width as f32;
    let ry1 = ry0 + roi.height as f32;

    let overlaps = bx0 < rx1 && rx0 < bx1 && by0 < ry1 && ry0 < by1;
    if overlaps {
        return boosted;
    }
    if roi.feather <= 0.0 {
        return 1.0;
    }

    let cx = (bx0 + bx1) * 0.5;
    let cy = (by0 + by1) * 0.5;
    let dx = (rx0 - cx).max(0.0).max(cx - rx1);
    let dy = (ry0 - cy).max(0.0).max(cy - ry1);
    let dist = (dx * dx + dy * dy).sqrt();
    if dist >= roi.feather {
        return 1.0;
    }

    let t = dist / roi.feather;
    let s = (1.0 - (std::f32::consts::PI * t).cos()) * 0.5;
    boosted + (1.0 - boosted) * s
}
