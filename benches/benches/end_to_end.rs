//! Whole-pipeline benchmarks over a synthetic photographic frame

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use luxel::{encode, ColorChannels, Decoder, EncodingOptions, ImageFrame, PixelType, Plane};

fn test_frame(size: u32) -> ImageFrame {
    let mut frame = ImageFrame::new(size, size, ColorChannels::Rgb, PixelType::U8).unwrap();
    for c in 0..3 {
        if let Plane::U8(data) = frame.buffer.plane_mut(c).unwrap() {
            for y in 0..size as usize {
                for x in 0..size as usize {
                    let wave = ((x as f32 * 0.2).sin() + (y as f32 * 0.13).cos()) * 60.0;
                    data[y * size as usize + x] =
                        (128.0 + wave + (c * 20) as f32).clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
    frame
}

fn bench_encode(c: &mut Criterion) {
    let frame = test_frame(128);

    c.bench_function("encode_lossless_128", |b| {
        b.iter(|| black_box(encode(&frame, &EncodingOptions::lossless()).unwrap()))
    });

    c.bench_function("encode_lossy_q90_128", |b| {
        b.iter(|| black_box(encode(&frame, &EncodingOptions::lossy(90.0)).unwrap()))
    });
}

fn bench_roundtrip(c: &mut Criterion) {
    let frame = test_frame(128);
    let encoded = encode(&frame, &EncodingOptions::lossy(90.0)).unwrap();
    let decoder = Decoder::new();

    c.bench_function("decode_lossy_q90_128", |b| {
        b.iter(|| black_box(decoder.decode(&encoded.data).unwrap()))
    });
}

criterion_group!(benches, bench_encode, bench_roundtrip);
criterion_main!(benches);
