//! Lossy round-trip quality and codestream shape

mod common;

use common::{checkerboard_frame, gradient_frame, psnr};
use luxel::{
    encode, Backend, Container, Decoder, Encoder, EncodingOptions, CONTAINER_SIGNATURE,
};

#[test]
fn quality_90_gradient() {
    let frame = gradient_frame();
    let encoded = encode(&frame, &EncodingOptions::lossy(90.0)).unwrap();
    assert!(
        encoded.data.len() < 32 * 32 * 3,
        "lossy stream {} bytes is larger than a raw plane",
        encoded.data.len()
    );

    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    let quality = psnr(&frame, &decoded);
    assert!(quality >= 35.0, "PSNR {:.2} dB below 35", quality);
}

#[test]
fn quality_75_gradient() {
    let frame = gradient_frame();
    let encoded = encode(&frame, &EncodingOptions::lossy(75.0)).unwrap();
    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    let quality = psnr(&frame, &decoded);
    assert!(quality >= 30.0, "PSNR {:.2} dB below 30", quality);
}

#[test]
fn distance_one_checkerboard() {
    let frame = checkerboard_frame();
    let encoded = encode(&frame, &EncodingOptions::with_distance(1.0)).unwrap();
    assert!(!encoded.data.is_empty());
    assert_eq!(&encoded.data[..2], &[0xFF, 0x0A]);

    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    assert_eq!(decoded.width(), frame.width());
    assert_eq!(decoded.height(), frame.height());
}

#[test]
fn bare_codestream_is_never_boxed() {
    let encoded = encode(&gradient_frame(), &EncodingOptions::lossy(90.0)).unwrap();
    assert_eq!(&encoded.data[..2], &[0xFF, 0x0A]);
    assert!(!encoded.data.starts_with(&CONTAINER_SIGNATURE));
    // No ISOBMFF box header hiding behind the signature either
    assert_ne!(&encoded.data[4..8], b"JXL ");
    assert_ne!(&encoded.data[4..8], b"ftyp");
}

#[test]
fn container_wraps_and_unwraps() {
    let encoded = encode(&gradient_frame(), &EncodingOptions::lossy(85.0)).unwrap();
    let container = Container::wrap(encoded.data.clone());
    let bytes = container.to_bytes();
    assert!(bytes.starts_with(&CONTAINER_SIGNATURE));

    let unwrapped = Container::from_bytes(&bytes).unwrap().codestream().unwrap();
    assert_eq!(unwrapped, encoded.data);
    // The decoder insists on the bare codestream
    assert!(Decoder::new().decode(&bytes).is_err());
    assert!(Decoder::new().decode(&unwrapped).is_ok());
}

#[test]
fn rans_path_roundtrips_lossy() {
    let frame = gradient_frame();
    let encoded = encode(&frame, &EncodingOptions::lossy(90.0).use_ans(true)).unwrap();
    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    let quality = psnr(&frame, &decoded);
    assert!(quality >= 35.0, "rANS path PSNR {:.2} dB", quality);
}

#[test]
fn adaptive_quantization_roundtrips() {
    let frame = checkerboard_frame();
    let encoded = encode(
        &frame,
        &EncodingOptions::lossy(85.0).adaptive_quantization(true),
    )
    .unwrap();
    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    assert_eq!(decoded.width(), 32);
    let quality = psnr(&frame, &decoded);
    assert!(quality >= 25.0, "adaptive PSNR {:.2} dB", quality);
}

#[test]
fn xyb_transform_roundtrips() {
    let frame = gradient_frame();
    let mut options = EncodingOptions::lossy(95.0);
    options.color_transform = luxel::LossyColorTransform::Xyb;
    let encoded = encode(&frame, &options).unwrap();
    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    assert_eq!(decoded.width(), frame.width());
    // XYB chroma is coarse under the shared matrix rule; luma survives
    let quality = psnr(&frame, &decoded);
    assert!(quality >= 15.0, "XYB PSNR {:.2} dB", quality);
}

#[test]
fn scalar_backend_matches_detected_backend() {
    let frame = gradient_frame();
    let detected = Encoder::new(EncodingOptions::lossy(90.0))
        .encode(&frame)
        .unwrap();
    let scalar = Encoder::with_backend(EncodingOptions::lossy(90.0), Backend::Scalar)
        .unwrap()
        .encode(&frame)
        .unwrap();
    assert_eq!(detected.data, scalar.data);
}

#[test]
fn stats_reflect_the_encode() {
    let encoded = encode(&gradient_frame(), &EncodingOptions::lossy(90.0)).unwrap();
    assert_eq!(encoded.stats.encoded_bytes, encoded.data.len());
    assert_eq!(encoded.stats.frame_count, 1);
    assert!(!encoded.stats.modular);
    assert!(encoded.stats.pool_metrics.acquire_count > 0);
}
