//! sRGB transfer function

/// Gamma expansion: sRGB-encoded value to linear light.
#[inline]
pub fn srgb_to_linear(srgb: f32) -> f32 {
    if srgb <= 0.040_45 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    }
}

/// Gamma compression: linear light to sRGB encoding.
#[inline]
pub fn linear_to_srgb(linear: f32) -> f32 {
    if linear <= 0.003_130_8 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        for &v in &[0.0f32, 0.02, 0.2, 0.5, 0.99, 1.0] {
            let linear = srgb_to_linear(v);
            assert!((linear_to_srgb(linear) - v).abs() < 1e-5);
        }
    }

    #[test]
    fn endpoints_fixed() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn u8_values_stable() {
        for v in 0..=255u32 {
            let srgb = v as f32 / 255.0;
            let back = (linear_to_srgb(srgb_to_linear(srgb)) * 255.0).round() as u32;
            assert_eq!(back, v);
        }
    }
}
