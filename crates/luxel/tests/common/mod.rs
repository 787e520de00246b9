//! Shared helpers for the integration tests

use luxel::{ColorChannels, ImageFrame, PixelType, Plane};

/// 32x32 RGB gradient: R = x*255/31, G = y*255/31, B = (x+y)*255/62
pub fn gradient_frame() -> ImageFrame {
    let mut frame = ImageFrame::new(32, 32, ColorChannels::Rgb, PixelType::U8).unwrap();
    for c in 0..3 {
        if let Plane::U8(data) = frame.buffer.plane_mut(c).unwrap() {
            for y in 0..32u32 {
                for x in 0..32u32 {
                    data[(y * 32 + x) as usize] = match c {
                        0 => (x * 255 / 31) as u8,
                        1 => (y * 255 / 31) as u8,
                        _ => ((x + y) * 255 / 62) as u8,
                    };
                }
            }
        }
    }
    frame
}

/// 32x32 black/white checkerboard with 8-pixel tiles
pub fn checkerboard_frame() -> ImageFrame {
    let mut frame = ImageFrame::new(32, 32, ColorChannels::Rgb, PixelType::U8).unwrap();
    for c in 0..3 {
        if let Plane::U8(data) = frame.buffer.plane_mut(c).unwrap() {
            for y in 0..32usize {
                for x in 0..32usize {
                    let on = ((x / 8) + (y / 8)) % 2 == 0;
                    data[y * 32 + x] = if on { 255 } else { 0 };
                }
            }
        }
    }
    frame
}

/// PSNR between two u8 frames, in dB
pub fn psnr(a: &ImageFrame, b: &ImageFrame) -> f64 {
    assert_eq!(a.width(), b.width());
    assert_eq!(a.height(), b.height());
    assert_eq!(a.channel_count(), b.channel_count());

    let mut mse = 0.0f64;
    let mut samples = 0usize;
    for c in 0..a.channel_count() {
        let pa = match a.buffer.plane(c).unwrap() {
            Plane::U8(v) => v,
            _ => panic!("psnr expects u8 frames"),
        };
        let pb = match b.buffer.plane(c).unwrap() {
            Plane::U8(v) => v,
            _ => panic!("psnr expects u8 frames"),
        };
        for (&x, &y) in pa.iter().zip(pb.iter()) {
            let diff = x as f64 - y as f64;
            mse += diff * diff;
        }
        samples += pa.len();
    }
    mse /= samples as f64;
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (255.0 * 255.0 / mse).log10()
    }
}

/// Exact pixel equality across all planes
pub fn frames_equal(a: &ImageFrame, b: &ImageFrame) -> bool {
    a.width() == b.width()
        && a.height() == b.height()
        && a.buffer.planes() == b.buffer.planes()
}
