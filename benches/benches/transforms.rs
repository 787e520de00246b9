//! Transform microbenchmarks: DCT, quantization, RCT, squeeze

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use luxel_color::{forward_rct, inverse_rct};
use luxel_transform::{
    forward_dct_8x8, inverse_dct_8x8, quantize_block, squeeze_horizontal, squeeze_vertical,
    unsqueeze_horizontal, unsqueeze_vertical, QuantMatrix,
};

fn sample_block() -> [f32; 64] {
    core::array::from_fn(|i| ((i * 37 + 11) % 256) as f32)
}

fn bench_dct(c: &mut Criterion) {
    let input = sample_block();
    let mut coeffs = [0.0f32; 64];
    let mut restored = [0.0f32; 64];

    c.bench_function("dct8x8_forward", |b| {
        b.iter(|| forward_dct_8x8(black_box(&input), &mut coeffs))
    });

    forward_dct_8x8(&input, &mut coeffs);
    c.bench_function("dct8x8_inverse", |b| {
        b.iter(|| inverse_dct_8x8(black_box(&coeffs), &mut restored))
    });
}

fn bench_quantize(c: &mut Criterion) {
    let input = sample_block();
    let mut coeffs = [0.0f32; 64];
    forward_dct_8x8(&input, &mut coeffs);
    let matrix = QuantMatrix::from_distance(1.0, false);
    let mut quantized = [0i16; 64];

    c.bench_function("quantize_block", |b| {
        b.iter(|| quantize_block(black_box(&coeffs), &matrix, &mut quantized))
    });
}

fn bench_rct(c: &mut Criterion) {
    let len = 256 * 256;
    let base0: Vec<i32> = (0..len).map(|i| (i * 7) as i32 % 256).collect();
    let base1: Vec<i32> = (0..len).map(|i| (i * 13) as i32 % 256).collect();
    let base2: Vec<i32> = (0..len).map(|i| (i * 29) as i32 % 256).collect();

    c.bench_function("rct_forward_256x256", |b| {
        b.iter(|| {
            let mut c0 = base0.clone();
            let mut c1 = base1.clone();
            let mut c2 = base2.clone();
            forward_rct(&mut c0, &mut c1, &mut c2);
            black_box((c0, c1, c2))
        })
    });

    c.bench_function("rct_roundtrip_256x256", |b| {
        b.iter(|| {
            let mut c0 = base0.clone();
            let mut c1 = base1.clone();
            let mut c2 = base2.clone();
            forward_rct(&mut c0, &mut c1, &mut c2);
            inverse_rct(&mut c0, &mut c1, &mut c2);
            black_box(c0)
        })
    });
}

fn bench_squeeze(c: &mut Criterion) {
    let width = 256;
    let height = 256;
    let base: Vec<i32> = (0..width * height).map(|i| (i * 31) as i32 % 256).collect();

    c.bench_function("squeeze_roundtrip_256x256", |b| {
        b.iter(|| {
            let mut plane = base.clone();
            squeeze_horizontal(&mut plane, width, height, width);
            squeeze_vertical(&mut plane, width, height, width);
            unsqueeze_vertical(&mut plane, width, height, width);
            unsqueeze_horizontal(&mut plane, width, height, width);
            black_box(plane)
        })
    });
}

criterion_group!(benches, bench_dct, bench_quantize, bench_rct, bench_squeeze);
criterion_main!(benches);
