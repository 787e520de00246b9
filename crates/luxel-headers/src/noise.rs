//! Noise parameters and the synthesis PRNG
//!
//! The encoder only ships parameters; reconstruction happens at decode
//! time from a deterministic xorshift64* generator driving Box-Muller
//! Gaussian samples. Parameters are quantized on write so both sides agree
//! on the exact values.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::{NoiseConfig, Result};

/// State multiplier of the xorshift64* generator
const XORSHIFT_MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// Quantization steps: amplitude maps onto [0, 4095], strengths onto
/// half-steps of 1/2048 covering [0, 2].
const AMPLITUDE_STEPS: f32 = 4095.0;
const STRENGTH_SCALE: f32 = 2048.0;

/// Noise parameters as they travel in the frame header extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseParams {
    amplitude_q: u16,
    luma_q: u16,
    chroma_q: u16,
    pub seed: u64,
}

impl NoiseParams {
    /// Quantize caller-provided noise settings.
    pub fn from_config(config: &NoiseConfig) -> Self {
        Self {
            amplitude_q: (config.amplitude.clamp(0.0, 1.0) * AMPLITUDE_STEPS).round() as u16,
            luma_q: (config.luma_strength.clamp(0.0, 2.0) * STRENGTH_SCALE).round() as u16,
            chroma_q: (config.chroma_strength.clamp(0.0, 2.0) * STRENGTH_SCALE).round() as u16,
            seed: config.seed,
        }
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude_q as f32 / AMPLITUDE_STEPS
    }

    pub fn luma_strength(&self) -> f32 {
        self.luma_q as f32 / STRENGTH_SCALE
    }

    pub fn chroma_strength(&self) -> f32 {
        self.chroma_q as f32 / STRENGTH_SCALE
    }

    pub fn write(&self, writer: &mut BitstreamWriter) -> Result<()> {
        writer.write_bits(self.amplitude_q as u32, 12)?;
        writer.write_bits(self.luma_q as u32, 13)?;
        writer.write_bits(self.chroma_q as u32, 13)?;
        writer.write_bits((self.seed >> 32) as u32, 32)?;
        writer.write_bits(self.seed as u32, 32)?;
        Ok(())
    }

    pub fn parse(reader: &mut BitstreamReader<'_>) -> Result<Self> {
        let amplitude_q = reader.read_bits(12)? as u16;
        let luma_q = reader.read_bits(13)? as u16;
        let chroma_q = reader.read_bits(13)? as u16;
        let high = reader.read_bits(32)? as u64;
        let low = reader.read_bits(32)? as u64;
        Ok(Self {
            amplitude_q,
            luma_q,
            chroma_q,
            seed: (high << 32) | low,
        })
    }
}

/// xorshift64* generator used for noise synthesis
#[derive(Debug, Clone)]
pub struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    /// Seed 0 would lock the generator at zero, so it is mapped to an
    /// arbitrary nonzero constant; callers wanting reproducible output
    /// must pass a nonzero seed anyway.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(XORSHIFT_MULTIPLIER)
    }

    /// Uniform sample in (0, 1]
    pub fn next_unit(&mut self) -> f32 {
        (((self.next_u64() >> 40) + 1) as f32) / (1u64 << 24) as f32
    }

    /// One pair of independent standard Gaussian samples via Box-Muller
    pub fn next_gaussian_pair(&mut self) -> (f32, f32) {
        let u1 = self.next_unit();
        let u2 = self.next_unit();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f32::consts::PI * u2;
        (radius * angle.cos(), radius * angle.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_roundtrip() {
        let config = NoiseConfig {
            amplitude: 0.5,
            luma_strength: 1.25,
            chroma_strength: 0.75,
            seed: 0xDEAD_BEEF_CAFE_F00D,
        };
        let params = NoiseParams::from_config(&config);
        let mut writer = BitstreamWriter::new();
        params.write(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = BitstreamReader::new(&bytes);
        assert_eq!(NoiseParams::parse(&mut reader).unwrap(), params);
    }

    #[test]
    fn quantization_is_close() {
        let config = NoiseConfig {
            amplitude: 0.333,
            luma_strength: 1.999,
            chroma_strength: 0.001,
            seed: 7,
        };
        let params = NoiseParams::from_config(&config);
        assert!((params.amplitude() - 0.333).abs() < 1e-3);
        assert!((params.luma_strength() - 1.999).abs() < 1e-3);
        assert!((params.chroma_strength() - 0.001).abs() < 1e-3);
    }

    #[test]
    fn prng_is_deterministic() {
        let mut a = XorShift64Star::new(42);
        let mut b = XorShift64Star::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut c = XorShift64Star::new(43);
        assert_ne!(a.next_u64(), c.next_u64());
    }

    #[test]
    fn unit_samples_in_range() {
        let mut rng = XorShift64Star::new(1);
        for _ in 0..10_000 {
            let u = rng.next_unit();
            assert!(u > 0.0 && u <= 1.0);
        }
    }

    #[test]
    fn gaussian_moments_plausible() {
        let mut rng = XorShift64Star::new(12345);
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let n = 20_000;
        for _ in 0..n / 2 {
            let (a, b) = rng.next_gaussian_pair();
            sum += (a + b) as f64;
            sum_sq += (a * a + b * b) as f64;
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.1, "variance {}", var);
    }
}
