//! XYB opponent color space
//!
//! XYB applies a fixed opsin absorbance matrix to linear RGB, a cube-root
//! transfer per channel, and an opponent rotation: X carries the L-M
//! difference, Y the L+M average, B the S response.

/// Opsin absorbance matrix, rows are L, M, S responses
const OPSIN_ABSORBANCE: [[f32; 3]; 3] = [
    [0.30, 0.622, 0.078],
    [0.23, 0.692, 0.078],
    [0.243_422_69, 0.204_767_44, 0.551_809_87],
];

/// Inverse of `OPSIN_ABSORBANCE`
const OPSIN_INVERSE: [[f32; 3]; 3] = [
    [11.031_567, -9.866_944, -0.164_623],
    [-3.254_147_4, 4.418_770_4, -0.164_623],
    [-3.658_851_3, 2.712_923, 1.945_928_2],
];

/// Bias added before the cube root so dark values stay invertible
const OPSIN_BIAS: f32 = 0.003_793_073_2;

#[inline]
fn transfer(v: f32) -> f32 {
    (v.max(0.0) + OPSIN_BIAS).cbrt() - OPSIN_BIAS.cbrt()
}

#[inline]
fn inverse_transfer(v: f32) -> f32 {
    let g = v + OPSIN_BIAS.cbrt();
    g * g * g - OPSIN_BIAS
}

/// Forward transform for one linear-RGB pixel.
#[inline]
pub fn rgb_to_xyb(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let m = &OPSIN_ABSORBANCE;
    let l_mix = m[0][0] * r + m[0][1] * g + m[0][2] * b;
    let m_mix = m[1][0] * r + m[1][1] * g + m[1][2] * b;
    let s_mix = m[2][0] * r + m[2][1] * g + m[2][2] * b;

    let l = transfer(l_mix);
    let m_resp = transfer(m_mix);
    let s = transfer(s_mix);

    ((l - m_resp) * 0.5, (l + m_resp) * 0.5, s)
}

/// Inverse transform for one pixel, back to linear RGB.
#[inline]
pub fn xyb_to_rgb(x: f32, y: f32, b: f32) -> (f32, f32, f32) {
    let l = inverse_transfer(y + x);
    let m_resp = inverse_transfer(y - x);
    let s = inverse_transfer(b);

    let inv = &OPSIN_INVERSE;
    let r = inv[0][0] * l + inv[0][1] * m_resp + inv[0][2] * s;
    let g = inv[1][0] * l + inv[1][1] * m_resp + inv[1][2] * s;
    let b = inv[2][0] * l + inv[2][1] * m_resp + inv[2][2] * s;
    (r, g, b)
}

/// In-place forward transform over three planes of equal length.
pub fn rgb_planes_to_xyb(ch0: &mut [f32], ch1: &mut [f32], ch2: &mut [f32]) {
    debug_assert!(ch0.len() == ch1.len() && ch1.len() == ch2.len());
    for i in 0..ch0.len() {
        let (x, y, b) = rgb_to_xyb(ch0[i], ch1[i], ch2[i]);
        ch0[i] = x;
        ch1[i] = y;
        ch2[i] = b;
    }
}

/// In-place inverse transform over three planes of equal length.
pub fn xyb_planes_to_rgb(ch0: &mut [f32], ch1: &mut [f32], ch2: &mut [f32]) {
    debug_assert!(ch0.len() == ch1.len() && ch1.len() == ch2.len());
    for i in 0..ch0.len() {
        let (r, g, b) = xyb_to_rgb(ch0[i], ch1[i], ch2[i]);
        ch0[i] = r;
        ch1[i] = g;
        ch2[i] = b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_axis_has_zero_x() {
        for &v in &[0.0f32, 0.18, 0.5, 1.0] {
            let (x, y, _) = rgb_to_xyb(v, v, v);
            assert!(x.abs() < 1e-6, "x = {} for gray {}", x, v);
            assert!(y >= 0.0);
        }
    }

    #[test]
    fn y_increases_with_luminance() {
        let (_, y_dark, _) = rgb_to_xyb(0.1, 0.1, 0.1);
        let (_, y_bright, _) = rgb_to_xyb(0.9, 0.9, 0.9);
        assert!(y_bright > y_dark);
    }

    #[test]
    fn roundtrip_within_tolerance() {
        for &(r, g, b) in &[
            (0.0, 0.0, 0.0),
            (1.0, 1.0, 1.0),
            (0.5, 0.7, 0.3),
            (0.05, 0.9, 0.35),
            (0.8, 0.05, 0.6),
        ] {
            let (x, y, bb) = rgb_to_xyb(r, g, b);
            let (r2, g2, b2) = xyb_to_rgb(x, y, bb);
            assert!((r - r2).abs() < 2e-3, "r: {} vs {}", r, r2);
            assert!((g - g2).abs() < 2e-3, "g: {} vs {}", g, g2);
            assert!((b - b2).abs() < 2e-3, "b: {} vs {}", b, b2);
        }
    }

    #[test]
    fn plane_transform_matches_pixel_transform() {
        let mut c0 = vec![0.2f32, 0.8];
        let mut c1 = vec![0.4f32, 0.1];
        let mut c2 = vec![0.6f32, 0.5];
        let expected = rgb_to_xyb(0.2, 0.4, 0.6);
        rgb_planes_to_xyb(&mut c0, &mut c1, &mut c2);
        assert_eq!((c0[0], c1[0], c2[0]), expected);
    }
}
