//! Backend selection and kernel dispatch
//!
//! Every hot operation has a scalar reference implementation; vector
//! backends override the ones they accelerate. Selection runs once per
//! encoder and is cached in the [`Dispatcher`], so there is no per-call
//! capability branching. Float kernels stay scalar across backends so all
//! backends agree bit-for-bit; the integer RCT rows are vectorized where
//! the ISA allows, which is exact by construction.

use luxel_core::{Error, Result};
use luxel_transform::QuantMatrix;

/// Dispatch target, ordered by probe preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Backend {
    Scalar,
    Sse2,
    Avx2,
    Neon,
    /// Platform vector library; only selectable when a binding is built in
    Accelerate,
    /// Opt-in only: transfer overhead makes it a poor default
    Gpu,
}

impl Backend {
    /// Probe the CPU. Preference order: vector library, NEON, AVX2, SSE2,
    /// scalar. GPU never wins a probe.
    #[allow(unreachable_code)]
    pub fn detect() -> Self {
        #[cfg(target_arch = "aarch64")]
        {
            return Backend::Neon;
        }
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                return Backend::Avx2;
            }
            if is_x86_feature_detected!("sse2") {
                return Backend::Sse2;
            }
        }
        Backend::Scalar
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Scalar => "scalar",
            Backend::Sse2 => "sse2",
            Backend::Avx2 => "avx2",
            Backend::Neon => "neon",
            Backend::Accelerate => "accelerate",
            Backend::Gpu => "gpu",
        }
    }
}

/// The hot operations of the pipeline. Default methods are the scalar
/// reference; backends override what they accelerate.
pub trait Kernels: Send + Sync {
    fn backend(&self) -> Backend;

    fn forward_dct(&self, input: &[f32; 64], output: &mut [f32; 64]) {
        luxel_transform::forward_dct_8x8(input, output);
    }

    fn inverse_dct(&self, input: &[f32; 64], output: &mut [f32; 64]) {
        luxel_transform::inverse_dct_8x8(input, output);
    }

    fn quantize(&self, coeffs: &[f32; 64], matrix: &QuantMatrix, output: &mut [i16; 64]) {
        luxel_transform::quantize_block(coeffs, matrix, output);
    }

    fn block_variance(&self, block: &[f32; 64]) -> f32 {
        luxel_transform::block_variance(block)
    }

    fn rct_forward(&self, ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
        luxel_color::forward_rct(ch0, ch1, ch2);
    }

    fn rct_inverse(&self, ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
        luxel_color::inverse_rct(ch0, ch1, ch2);
    }

    fn med_residuals(&self, samples: &[i32], width: usize, height: usize, max: i32) -> Vec<i32> {
        luxel_transform::med_residuals(samples, width, height, max)
    }

    fn squeeze_horizontal(&self, data: &mut [i32], width: usize, height: usize, stride: usize) {
        luxel_transform::squeeze_horizontal(data, width, height, stride);
    }

    fn squeeze_vertical(&self, data: &mut [i32], width: usize, height: usize, stride: usize) {
        luxel_transform::squeeze_vertical(data, width, height, stride);
    }
}

/// Scalar reference kernels, available on every target
pub struct ScalarKernels;

impl Kernels for ScalarKernels {
    fn backend(&self) -> Backend {
        Backend::Scalar
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::{Backend, Kernels};

    pub struct Sse2Kernels;
    pub struct Avx2Kernels;

    #[target_feature(enable = "sse2")]
    unsafe fn rct_forward_sse2(ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
        use std::arch::x86_64::*;
        let n = ch0.len();
        let lanes = n / 4 * 4;
        let mut i = 0;
        while i < lanes {
            let r = _mm_loadu_si128(ch0.as_ptr().add(i) as *const __m128i);
            let g = _mm_loadu_si128(ch1.as_ptr().add(i) as *const __m128i);
            let b = _mm_loadu_si128(ch2.as_ptr().add(i) as *const __m128i);

            let co = _mm_sub_epi32(r, b);
            let t = _mm_add_epi32(b, _mm_srai_epi32(co, 1));
            let cg = _mm_sub_epi32(g, t);
            let y = _mm_add_epi32(t, _mm_srai_epi32(cg, 1));

            _mm_storeu_si128(ch0.as_mut_ptr().add(i) as *mut __m128i, y);
            _mm_storeu_si128(ch1.as_mut_ptr().add(i) as *mut __m128i, co);
            _mm_storeu_si128(ch2.as_mut_ptr().add(i) as *mut __m128i, cg);
            i += 4;
        }
        if lanes < n {
            luxel_color::forward_rct(&mut ch0[lanes..], &mut ch1[lanes..], &mut ch2[lanes..]);
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn rct_inverse_sse2(ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
        use std::arch::x86_64::*;
        let n = ch0.len();
        let lanes = n / 4 * 4;
        let mut i = 0;
        while i < lanes {
            let y = _mm_loadu_si128(ch0.as_ptr().add(i) as *const __m128i);
            let co = _mm_loadu_si128(ch1.as_ptr().add(i) as *const __m128i);
            let cg = _mm_loadu_si128(ch2.as_ptr().add(i) as *const __m128i);

            let t = _mm_sub_epi32(y, _mm_srai_epi32(cg, 1));
            let g = _mm_add_epi32(cg, t);
            let b = _mm_sub_epi32(t, _mm_srai_epi32(co, 1));
            let r = _mm_add_epi32(b, co);

            _mm_storeu_si128(ch0.as_mut_ptr().add(i) as *mut __m128i, r);
            _mm_storeu_si128(ch1.as_mut_ptr().add(i) as *mut __m128i, g);
            _mm_storeu_si128(ch2.as_mut_ptr().add(i) as *mut __m128i, b);
            i += 4;
        }
        if lanes < n {
            luxel_color::inverse_rct(&mut ch0[lanes..], &mut ch1[lanes..], &mut ch2[lanes..]);
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn rct_forward_avx2(ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
        use std::arch::x86_64::*;
        let n = ch0.len();
        let lanes = n / 8 * 8;
        let mut i = 0;
        while i < lanes {
            let r = _mm256_loadu_si256(ch0.as_ptr().add(i) as *const __m256i);
            let g = _mm256_loadu_si256(ch1.as_ptr().add(i) as *const __m256i);
            let b = _mm256_loadu_si256(ch2.as_ptr().add(i) as *const __m256i);

            let co = _mm256_sub_epi32(r, b);
            let t = _mm256_add_epi32(b, _mm256_srai_epi32(co, 1));
            let cg = _mm256_sub_epi32(g, t);
            let y = _mm256_add_epi32(t, _mm256_srai_epi32(cg, 1));

            _mm256_storeu_si256(ch0.as_mut_ptr().add(i) as *mut __m256i, y);
            _mm256_storeu_si256(ch1.as_mut_ptr().add(i) as *mut __m256i, co);
            _mm256_storeu_si256(ch2.as_mut_ptr().add(i) as *mut __m256i, cg);
            i += 8;
        }
        if lanes < n {
            luxel_color::forward_rct(&mut ch0[lanes..], &mut ch1[lanes..], &mut ch2[lanes..]);
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn rct_inverse_avx2(ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
        use std::arch::x86_64::*;
        let n = ch0.len();
        let lanes = n / 8 * 8;
        let mut i = 0;
        while i < lanes {
            let y = _mm256_loadu_si256(ch0.as_ptr().add(i) as *const __m256i);
            let co = _mm256_loadu_si256(ch1.as_ptr().add(i) as *const __m256i);
            let cg = _mm256_loadu_si256(ch2.as_ptr().add(i) as *const __m256i);

            let t = _mm256_sub_epi32(y, _mm256_srai_epi32(cg, 1));
            let g = _mm256_add_epi32(cg, t);
            let b = _mm256_sub_epi32(t, _mm256_srai_epi32(co, 1));
            let r = _mm256_add_epi32(b, co);

            _mm256_storeu_si256(ch0.as_mut_ptr().add(i) as *mut __m256i, r);
            _mm256_storeu_si256(ch1.as_mut_ptr().add(i) as *mut __m256i, g);
            _mm256_storeu_si256(ch2.as_mut_ptr().add(i) as *mut __m256i, b);
            i += 8;
        }
        if lanes < n {
            luxel_color::inverse_rct(&mut ch0[lanes..], &mut ch1[lanes..], &mut ch2[lanes..]);
        }
    }

    impl Kernels for Sse2Kernels {
        fn backend(&self) -> Backend {
            Backend::Sse2
        }

        fn rct_forward(&self, ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
            // Selection guarantees SSE2 is present
            unsafe { rct_forward_sse2(ch0, ch1, ch2) }
        }

        fn rct_inverse(&self, ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
            unsafe { rct_inverse_sse2(ch0, ch1, ch2) }
        }
    }

    impl Kernels for Avx2Kernels {
        fn backend(&self) -> Backend {
            Backend::Avx2
        }

        fn rct_forward(&self, ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
            unsafe { rct_forward_avx2(ch0, ch1, ch2) }
        }

        fn rct_inverse(&self, ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
            unsafe { rct_inverse_avx2(ch0, ch1, ch2) }
        }
    }
}

#[cfg(target_arch = "aarch64")]
mod arm {
    use super::{Backend, Kernels};

    pub struct NeonKernels;

    unsafe fn rct_forward_neon(ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
        use std::arch::aarch64::*;
        let n = ch0.len();
        let lanes = n / 4 * 4;
        let mut i = 0;
        while i < lanes {
            let r = vld1q_s32(ch0.as_ptr().add(i));
            let g = vld1q_s32(ch1.as_ptr().add(i));
            let b = vld1q_s32(ch2.as_ptr().add(i));

            let co = vsubq_s32(r, b);
            let t = vaddq_s32(b, vshrq_n_s32(co, 1));
            let cg = vsubq_s32(g, t);
            let y = vaddq_s32(t, vshrq_n_s32(cg, 1));

            vst1q_s32(ch0.as_mut_ptr().add(i), y);
            vst1q_s32(ch1.as_mut_ptr().add(i), co);
            vst1q_s32(ch2.as_mut_ptr().add(i), cg);
            i += 4;
        }
        if lanes < n {
            luxel_color::forward_rct(&mut ch0[lanes..], &mut ch1[lanes..], &mut ch2[lanes..]);
        }
    }

    unsafe fn rct_inverse_neon(ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
        use std::arch::aarch64::*;
        let n = ch0.len();
        let lanes = n / 4 * 4;
        let mut i = 0;
        while i < lanes {
            let y = vld1q_s32(ch0.as_ptr().add(i));
            let co = vld1q_s32(ch1.as_ptr().add(i));
            let cg = vld1q_s32(ch2.as_ptr().add(i));

            let t = vsubq_s32(y, vshrq_n_s32(cg, 1));
            let g = vaddq_s32(cg, t);
            let b = vsubq_s32(t, vshrq_n_s32(co, 1));
            let r = vaddq_s32(b, co);

            vst1q_s32(ch0.as_mut_ptr().add(i), r);
            vst1q_s32(ch1.as_mut_ptr().add(i), g);
            vst1q_s32(ch2.as_mut_ptr().add(i), b);
            i += 4;
        }
        if lanes < n {
            luxel_color::inverse_rct(&mut ch0[lanes..], &mut ch1[lanes..], &mut ch2[lanes..]);
        }
    }

    impl Kernels for NeonKernels {
        fn backend(&self) -> Backend {
            Backend::Neon
        }

        fn rct_forward(&self, ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
            // NEON is baseline on aarch64
            unsafe { rct_forward_neon(ch0, ch1, ch2) }
        }

        fn rct_inverse(&self, ch0: &mut [i32], ch1: &mut [i32], ch2: &mut [i32]) {
            unsafe { rct_inverse_neon(ch0, ch1, ch2) }
        }
    }
}

/// Cached backend selection plus its kernel set.
pub struct Dispatcher {
    backend: Backend,
    kernels: &'static dyn Kernels,
}

impl Dispatcher {
    /// Probe once and cache the best kernel set.
    pub fn new() -> Self {
        let backend = Backend::detect();
        // Probe result is always instantiable, so this cannot fail.
        Self::with_backend(backend).unwrap_or(Self {
            backend: Backend::Scalar,
            kernels: &ScalarKernels,
        })
    }

    /// Force a specific backend; errors when this build cannot provide it.
    pub fn with_backend(backend: Backend) -> Result<Self> {
        let kernels: &'static dyn Kernels = match backend {
            Backend::Scalar => &ScalarKernels,
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 if is_x86_feature_detected!("sse2") => &x86::Sse2Kernels,
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 if is_x86_feature_detected!("avx2") => &x86::Avx2Kernels,
            #[cfg(target_arch = "aarch64")]
            Backend::Neon => &arm::NeonKernels,
            other => {
                return Err(Error::NotSupported(format!(
                    "backend {} not available in this build",
                    other.name()
                )))
            }
        };
        Ok(Self { backend, kernels })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn kernels(&self) -> &'static dyn Kernels {
        self.kernels
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_returns_cpu_backend() {
        let backend = Backend::detect();
        assert!(backend != Backend::Gpu && backend != Backend::Accelerate);
    }

    #[test]
    fn gpu_requires_opt_in_support() {
        assert!(matches!(
            Dispatcher::with_backend(Backend::Gpu),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn scalar_always_available() {
        let dispatcher = Dispatcher::with_backend(Backend::Scalar).unwrap();
        assert_eq!(dispatcher.backend(), Backend::Scalar);
    }

    #[test]
    fn selected_kernels_match_scalar_reference() {
        let selected = Dispatcher::new();
        let scalar = Dispatcher::with_backend(Backend::Scalar).unwrap();

        // Integer RCT must agree exactly
        let base0: Vec<i32> = (0..35).map(|i| i * 7 % 256).collect();
        let base1: Vec<i32> = (0..35).map(|i| (i * 13 + 5) % 256).collect();
        let base2: Vec<i32> = (0..35).map(|i| (i * 29 + 11) % 256).collect();

        let (mut a0, mut a1, mut a2) = (base0.clone(), base1.clone(), base2.clone());
        let (mut b0, mut b1, mut b2) = (base0.clone(), base1.clone(), base2.clone());
        selected.kernels().rct_forward(&mut a0, &mut a1, &mut a2);
        scalar.kernels().rct_forward(&mut b0, &mut b1, &mut b2);
        assert_eq!((&a0, &a1, &a2), (&b0, &b1, &b2));

        selected.kernels().rct_inverse(&mut a0, &mut a1, &mut a2);
        assert_eq!((a0, a1, a2), (base0, base1, base2));

        // Float kernels share the scalar implementation
        let block: [f32; 64] = core::array::from_fn(|i| (i as f32) / 64.0);
        let mut out_a = [0.0f32; 64];
        let mut out_b = [0.0f32; 64];
        selected.kernels().forward_dct(&block, &mut out_a);
        scalar.kernels().forward_dct(&block, &mut out_b);
        assert_eq!(out_a, out_b);
        assert_eq!(
            selected.kernels().block_variance(&block),
            scalar.kernels().block_variance(&block)
        );
    }
}
