//! Haar-like squeeze transform
//!
//! Integer multiresolution transform for the modular path: each pass
//! replaces pairs of samples with their floor-average and difference.
//! Operates in place on an active (width, height) region inside a buffer
//! with an arbitrary row stride, so recursive application can reuse one
//! allocation.

use num_integer::Integer;

/// Squeeze one row segment: the first `ceil(w/2)` slots become averages,
/// the next `floor(w/2)` become differences. An odd trailing sample is
/// copied verbatim into the last average slot.
fn squeeze_line(line: &mut [i32], scratch: &mut Vec<i32>) {
    let w = line.len();
    let pairs = w / 2;
    let n_avg = w.div_ceil(2);
    scratch.clear();
    scratch.extend_from_slice(line);

    for k in 0..pairs {
        let even = scratch[2 * k];
        let odd = scratch[2 * k + 1];
        line[k] = (even + odd).div_floor(&2);
        line[n_avg + k] = even - odd;
    }
    if w % 2 == 1 {
        line[n_avg - 1] = scratch[w - 1];
    }
}

/// Exact inverse of [`squeeze_line`].
fn unsqueeze_line(line: &mut [i32], scratch: &mut Vec<i32>) {
    let w = line.len();
    let pairs = w / 2;
    let n_avg = w.div_ceil(2);
    scratch.clear();
    scratch.extend_from_slice(line);

    for k in 0..pairs {
        let avg = scratch[k];
        let diff = scratch[n_avg + k];
        let even = avg + (diff + 1).div_floor(&2);
        line[2 * k] = even;
        line[2 * k + 1] = even - diff;
    }
    if w % 2 == 1 {
        line[w - 1] = scratch[n_avg - 1];
    }
}

/// Horizontal squeeze over the active `(width, height)` region of a buffer
/// with row stride `stride`.
pub fn squeeze_horizontal(data: &mut [i32], width: usize, height: usize, stride: usize) {
    debug_assert!(width <= stride);
    let mut scratch = Vec::with_capacity(width);
    for y in 0..height {
        squeeze_line(&mut data[y * stride..y * stride + width], &mut scratch);
    }
}

/// Inverse of [`squeeze_horizontal`].
pub fn unsqueeze_horizontal(data: &mut [i32], width: usize, height: usize, stride: usize) {
    debug_assert!(width <= stride);
    let mut scratch = Vec::with_capacity(width);
    for y in 0..height {
        unsqueeze_line(&mut data[y * stride..y * stride + width], &mut scratch);
    }
}

/// Vertical squeeze over the active `(width, height)` region.
pub fn squeeze_vertical(data: &mut [i32], width: usize, height: usize, stride: usize) {
    debug_assert!(width <= stride);
    let mut column = Vec::with_capacity(height);
    let mut scratch = Vec::with_capacity(height);
    for x in 0..width {
        column.clear();
        column.extend((0..height).map(|y| data[y * stride + x]));
        squeeze_line(&mut column, &mut scratch);
        for (y, &v) in column.iter().enumerate() {
            data[y * stride + x] = v;
        }
    }
}

/// Inverse of [`squeeze_vertical`].
pub fn unsqueeze_vertical(data: &mut [i32], width: usize, height: usize, stride: usize) {
    debug_assert!(width <= stride);
    let mut column = Vec::with_capacity(height);
    let mut scratch = Vec::with_capacity(height);
    for x in 0..width {
        column.clear();
        column.extend((0..height).map(|y| data[y * stride + x]));
        unsqueeze_line(&mut column, &mut scratch);
        for (y, &v) in column.iter().enumerate() {
            data[y * stride + x] = v;
        }
    }
}
