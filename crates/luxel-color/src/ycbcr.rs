//! BT.601 YCbCr transform on normalized [0,1] floats

/// Forward transform for one pixel. Chroma channels are offset by 0.5 so
/// the full output range stays in [0,1].
#[inline]
pub fn rgb_to_ycbcr(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = -0.168_736 * r - 0.331_264 * g + 0.5 * b + 0.5;
    let cr = 0.5 * r - 0.418_688 * g - 0.081_312 * b + 0.5;
    (y, cb, cr)
}

/// Inverse transform for one pixel.
#[inline]
pub fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> (f32, f32, f32) {
    let cb = cb - 0.5;
    let cr = cr - 0.5;
    let r = y + 1.402 * cr;
    let g = y - 0.344_136 * cb - 0.714_136 * cr;
    let b = y + 1.772 * cb;
    (r, g, b)
}

/// In-place forward transform over three planes of equal length.
pub fn rgb_planes_to_ycbcr(ch0: &mut [f32], ch1: &mut [f32], ch2: &mut [f32]) {
    debug_assert!(ch0.len() == ch1.len() && ch1.len() == ch2.len());
    for i in 0..ch0.len() {
        let (y, cb, cr) = rgb_to_ycbcr(ch0[i], ch1[i], ch2[i]);
        ch0[i] = y;
        ch1[i] = cb;
        ch2[i] = cr;
    }
}

/// In-place inverse transform over three planes of equal length.
pub fn ycbcr_planes_to_rgb(ch0: &mut [f32], ch1: &mut [f32], ch2: &mut [f32]) {
    debug_assert!(ch0.len() == ch1.len() && ch1.len() == ch2.len());
    for i in 0..ch0.len() {
        let (r, g, b) = ycbcr_to_rgb(ch0[i], ch1[i], ch2[i]);
        ch0[i] = r;
        ch1[i] = g;
        ch2[i] = b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_map_to_expected_luma() {
        let (y, _, _) = rgb_to_ycbcr(1.0, 0.0, 0.0);
        assert!((y - 0.299).abs() < 1e-6);
        let (y, _, _) = rgb_to_ycbcr(0.0, 1.0, 0.0);
        assert!((y - 0.587).abs() < 1e-6);
        let (y, _, _) = rgb_to_ycbcr(0.0, 0.0, 1.0);
        assert!((y - 0.114).abs() < 1e-6);
    }

    #[test]
    fn gray_has_neutral_chroma() {
        let (y, cb, cr) = rgb_to_ycbcr(0.5, 0.5, 0.5);
        assert!((y - 0.5).abs() < 1e-6);
        assert!((cb - 0.5).abs() < 1e-6);
        assert!((cr - 0.5).abs() < 1e-6);
    }

    #[test]
    fn roundtrip_within_tolerance() {
        for &(r, g, b) in &[
            (0.0, 0.0, 0.0),
            (1.0, 1.0, 1.0),
            (0.25, 0.5, 0.75),
            (0.9, 0.1, 0.4),
        ] {
            let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
            let (r2, g2, b2) = ycbcr_to_rgb(y, cb, cr);
            assert!((r - r2).abs() < 1e-4);
            assert!((g - g2).abs() < 1e-4);
            assert!((b - b2).abs() < 1e-4);
        }
    }
}
