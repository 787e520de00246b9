//! Spatial predictors
//!
//! The MED (median edge detector) predictor drives the modular path; DC
//! prediction links neighboring blocks in the VarDCT path. Both are shared
//! verbatim by the decoder so residuals reconstruct exactly.

/// MED prediction for one pixel given its causal neighbors.
///
/// Interior pixels predict the gradient `N + W - NW` clamped into
/// `[0, max_sample]`; the first pixel predicts 0, the first row predicts
/// from the left neighbor, the first column from the neighbor above.
#[inline]
fn med_predict(samples: &[i32], width: usize, x: usize, y: usize, max_sample: i32) -> i32 {
    let idx = y * width + x;
    match (x, y) {
        (0, 0) => 0,
        (_, 0) => samples[idx - 1],
        (0, _) => samples[idx - width],
        _ => {
            let n = samples[idx - width];
            let w = samples[idx - 1];
            let nw = samples[idx - width - 1];
            (n + w - nw).clamp(0, max_sample)
        }
    }
}

/// Residual plane: `actual - predicted` for every pixel in raster order.
pub fn med_residuals(samples: &[i32], width: usize, height: usize, max_sample: i32) -> Vec<i32> {
    debug_assert_eq!(samples.len(), width * height);
    let mut residuals = vec![0i32; samples.len()];
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            residuals[idx] = samples[idx] - med_predict(samples, width, x, y, max_sample);
        }
    }
    residuals
}

/// Exact inverse of [`med_residuals`].
pub fn med_reconstruct(
    residuals: &[i32],
    width: usize,
    height: usize,
    max_sample: i32,
) -> Vec<i32> {
    debug_assert_eq!(residuals.len(), width * height);
    let mut samples = vec![0i32; residuals.len()];
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            samples[idx] = residuals[idx] + med_predict(&samples, width, x, y, max_sample);
        }
    }
    samples
}

/// DC prediction from causal block neighbors in raster order: the average
/// of left and above when both exist, else the available one, else 0.
#[inline]
pub fn predict_dc(left: Option<i32>, above: Option<i32>) -> i32 {
    match (left, above) {
        (Some(l), Some(a)) => (l + a) / 2,
        (Some(l), None) => l,
        (None, Some(a)) => a,
        (None, None) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_plane_compresses_to_small_residuals() {
        let width = 8;
        let height = 8;
        let samples: Vec<i32> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x + y) as i32 * 10))
            .collect();
        let residuals = med_residuals(&samples, width, height, 255);
        // A perfect linear ramp is fully predicted away in the interior
        for y in 1..height {
            for x in 1..width {
                assert_eq!(residuals[y * width + x], 0);
            }
        }
    }

    #[test]
    fn roundtrip_arbitrary_plane() {
        let width = 13;
        let height = 7;
        let samples: Vec<i32> = (0..width * height)
            .map(|i| ((i * 37 + 11) % 256) as i32)
            .collect();
        let residuals = med_residuals(&samples, width, height, 255);
        let restored = med_reconstruct(&residuals, width, height, 255);
        assert_eq!(samples, restored);
    }

    #[test]
    fn roundtrip_negative_samples() {
        // RCT chroma channels can go negative; the clamp bound only shapes
        // the prediction, not correctness.
        let width = 5;
        let height = 5;
        let samples: Vec<i32> = (0..25).map(|i| (i as i32 % 7) - 3).collect();
        let residuals = med_residuals(&samples, width, height, 255);
        let restored = med_reconstruct(&residuals, width, height, 255);
        assert_eq!(samples, restored);
    }

    #[test]
    fn single_row_and_column() {
        let row: Vec<i32> = vec![9, 8, 7, 6];
        let r = med_residuals(&row, 4, 1, 255);
        assert_eq!(r, vec![9, -1, -1, -1]);
        assert_eq!(med_reconstruct(&r, 4, 1, 255), row);

        let col: Vec<i32> = vec![1, 3, 6];
        let r = med_residuals(&col, 1, 3, 255);
        assert_eq!(r, vec![1, 2, 3]);
        assert_eq!(med_reconstruct(&r, 1, 3, 255), col);
    }

    #[test]
    fn dc_prediction_cases() {
        assert_eq!(predict_dc(None, None), 0);
        assert_eq!(predict_dc(Some(10), None), 10);
        assert_eq!(predict_dc(None, Some(6)), 6);
        assert_eq!(predict_dc(Some(10), Some(6)), 8);
    }
}
