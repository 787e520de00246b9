//! Lossless round-trip coverage: every supported pixel type must
//! reconstruct bit-exactly.

mod common;

use common::{frames_equal, gradient_frame};
use luxel::{
    encode, ColorChannels, Decoder, EncodingOptions, ExtraChannel, ExtraChannelType, ImageFrame,
    PixelType, Plane,
};

fn roundtrip_exact(frame: &ImageFrame, options: &EncodingOptions) {
    let encoded = encode(frame, options).unwrap();
    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    assert!(
        frames_equal(frame, &decoded),
        "lossless round trip drifted for {:?}",
        frame.pixel_type()
    );
}

#[test]
fn gradient_u8_identity_and_size() {
    let frame = gradient_frame();
    let encoded = encode(&frame, &EncodingOptions::lossless()).unwrap();
    let raw = 32 * 32 * 3;
    assert!(
        encoded.data.len() < 2 * raw,
        "encoded {} bytes for {} raw",
        encoded.data.len(),
        raw
    );
    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    assert!(frames_equal(&frame, &decoded));
}

#[test]
fn gradient_u8_with_rans() {
    let frame = gradient_frame();
    roundtrip_exact(&frame, &EncodingOptions::lossless().use_ans(true));
}

#[test]
fn u16_plane_identity() {
    let mut frame = ImageFrame::new(17, 9, ColorChannels::Rgb, PixelType::U16).unwrap();
    for c in 0..3 {
        if let Plane::U16(data) = frame.buffer.plane_mut(c).unwrap() {
            for (i, s) in data.iter_mut().enumerate() {
                *s = ((i * 4099 + c * 777) % 65536) as u16;
            }
        }
    }
    roundtrip_exact(&frame, &EncodingOptions::lossless());
}

#[test]
fn i16_negative_samples_identity() {
    let mut frame = ImageFrame::new(8, 8, ColorChannels::Gray, PixelType::I16).unwrap();
    if let Plane::I16(data) = frame.buffer.plane_mut(0).unwrap() {
        for (i, s) in data.iter_mut().enumerate() {
            *s = (i as i32 * 1021 - 32000) as i16;
        }
    }
    roundtrip_exact(&frame, &EncodingOptions::lossless());
}

#[test]
fn f32_bit_patterns_identity() {
    let mut frame = ImageFrame::new(6, 4, ColorChannels::Rgb, PixelType::F32).unwrap();
    for c in 0..3 {
        if let Plane::F32(data) = frame.buffer.plane_mut(c).unwrap() {
            for (i, s) in data.iter_mut().enumerate() {
                *s = (i as f32 - 10.0) * 0.37 + c as f32 * 0.001;
            }
        }
    }
    roundtrip_exact(&frame, &EncodingOptions::lossless());
}

#[test]
fn grayscale_and_gray_alpha_identity() {
    let mut gray = ImageFrame::new(16, 16, ColorChannels::Gray, PixelType::U8).unwrap();
    if let Plane::U8(data) = gray.buffer.plane_mut(0).unwrap() {
        for (i, s) in data.iter_mut().enumerate() {
            *s = (i * 7 % 256) as u8;
        }
    }
    roundtrip_exact(&gray, &EncodingOptions::lossless());

    let mut ga = ImageFrame::new(16, 16, ColorChannels::GrayAlpha, PixelType::U8).unwrap();
    for c in 0..2 {
        if let Plane::U8(data) = ga.buffer.plane_mut(c).unwrap() {
            for (i, s) in data.iter_mut().enumerate() {
                *s = ((i + c * 31) * 13 % 256) as u8;
            }
        }
    }
    roundtrip_exact(&ga, &EncodingOptions::lossless());
}

#[test]
fn rgba_identity() {
    let mut frame = ImageFrame::new(12, 20, ColorChannels::Rgba, PixelType::U8).unwrap();
    for c in 0..4 {
        if let Plane::U8(data) = frame.buffer.plane_mut(c).unwrap() {
            for (i, s) in data.iter_mut().enumerate() {
                *s = ((i * 5 + c * 63) % 256) as u8;
            }
        }
    }
    roundtrip_exact(&frame, &EncodingOptions::lossless());
}

#[test]
fn single_pixel_smallest_stream() {
    let mut frame = ImageFrame::new(1, 1, ColorChannels::Rgb, PixelType::U8).unwrap();
    for (c, value) in [(0usize, 200u8), (1, 100), (2, 50)] {
        if let Plane::U8(data) = frame.buffer.plane_mut(c).unwrap() {
            data[0] = value;
        }
    }
    let encoded = encode(&frame, &EncodingOptions::lossless()).unwrap();
    assert!(
        encoded.data.len() < 64,
        "1x1 stream took {} bytes",
        encoded.data.len()
    );
    let decoded = Decoder::new().decode(&encoded.data).unwrap();
    assert!(frames_equal(&frame, &decoded));
}

#[test]
fn one_by_n_identity() {
    let mut frame = ImageFrame::new(1, 37, ColorChannels::Rgb, PixelType::U8).unwrap();
    for c in 0..3 {
        if let Plane::U8(data) = frame.buffer.plane_mut(c).unwrap() {
            for (i, s) in data.iter_mut().enumerate() {
                *s = ((i * 11 + c) % 256) as u8;
            }
        }
    }
    roundtrip_exact(&frame, &EncodingOptions::lossless());

    let mut wide = ImageFrame::new(41, 1, ColorChannels::Rgb, PixelType::U8).unwrap();
    for c in 0..3 {
        if let Plane::U8(data) = wide.buffer.plane_mut(c).unwrap() {
            for (i, s) in data.iter_mut().enumerate() {
                *s = ((i * 3 + c * 80) % 256) as u8;
            }
        }
    }
    roundtrip_exact(&wide, &EncodingOptions::lossless());
}

#[test]
fn extra_channel_depths_roundtrip() {
    for bit_depth in [1u8, 8, 12, 16, 24, 32] {
        let mut frame = ImageFrame::new(8, 8, ColorChannels::Rgb, PixelType::U8).unwrap();
        let bytes_per_sample = (bit_depth as usize).div_ceil(8);
        let mask: u64 = if bit_depth == 64 { u64::MAX } else { (1u64 << bit_depth) - 1 };
        let mut data = Vec::with_capacity(64 * bytes_per_sample);
        for i in 0..64u64 {
            let value = (i * 2654435761) & mask;
            for b in 0..bytes_per_sample {
                data.push((value >> (8 * b)) as u8);
            }
        }
        frame.extra_channels.push(ExtraChannel {
            kind: ExtraChannelType::Depth,
            bit_depth,
            dim_shift: 0,
            name: format!("depth{}", bit_depth),
            data: data.clone(),
        });

        let encoded = encode(&frame, &EncodingOptions::lossless()).unwrap();
        let decoded = Decoder::new().decode(&encoded.data).unwrap();
        assert_eq!(decoded.extra_channels.len(), 1, "depth {}", bit_depth);
        assert_eq!(decoded.extra_channels[0].bit_depth, bit_depth);
        assert_eq!(decoded.extra_channels[0].data, data, "depth {}", bit_depth);
    }
}
