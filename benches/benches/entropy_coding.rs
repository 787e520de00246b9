//! Entropy coder benchmarks: RLE fast path vs rANS

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_entropy::{
    decode_residuals_rle, encode_residuals_rle, modular_context, signed_to_symbol, RansDecoder,
    RansEncoder, NUM_CONTEXTS,
};

fn residuals() -> Vec<i32> {
    // Residual-shaped data: mostly near zero with occasional spikes
    (0..65536)
        .map(|i| match i % 97 {
            0 => 50,
            1..=5 => ((i % 7) as i32) - 3,
            _ => 0,
        })
        .collect()
}

fn bench_rle(c: &mut Criterion) {
    let values = residuals();

    c.bench_function("rle_encode_64k", |b| {
        b.iter(|| {
            let mut writer = BitstreamWriter::new();
            encode_residuals_rle(black_box(&values), &mut writer);
            black_box(writer.into_bytes())
        })
    });

    let mut writer = BitstreamWriter::new();
    encode_residuals_rle(&values, &mut writer);
    let bytes = writer.into_bytes();
    c.bench_function("rle_decode_64k", |b| {
        b.iter(|| {
            let mut reader = BitstreamReader::new(black_box(&bytes));
            black_box(decode_residuals_rle(&mut reader, values.len()).unwrap())
        })
    });
}

fn bench_rans(c: &mut Criterion) {
    let values = residuals();

    c.bench_function("rans_encode_64k", |b| {
        b.iter(|| {
            let mut encoder = RansEncoder::new(NUM_CONTEXTS);
            for &v in black_box(&values) {
                encoder.push(modular_context(), signed_to_symbol(v)).unwrap();
            }
            black_box(encoder.finish().unwrap())
        })
    });

    let mut encoder = RansEncoder::new(NUM_CONTEXTS);
    for &v in &values {
        encoder.push(modular_context(), signed_to_symbol(v)).unwrap();
    }
    let section = encoder.finish().unwrap();
    c.bench_function("rans_decode_64k", |b| {
        b.iter(|| {
            let mut decoder = RansDecoder::new(black_box(&section)).unwrap();
            let mut out = Vec::with_capacity(values.len());
            for _ in 0..values.len() {
                out.push(decoder.read(modular_context()).unwrap());
            }
            black_box(out)
        })
    });
}

criterion_group!(benches, bench_rle, bench_rans);
criterion_main!(benches);
