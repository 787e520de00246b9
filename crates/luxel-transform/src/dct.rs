//! 8x8 DCT-II and DCT-III
//!
//! Separable implementation over a precomputed cosine basis. Accumulation
//! happens in f64 so the forward/inverse pair stays well inside the 1e-4
//! reversibility bound on normalized inputs.

use luxel_core::consts::BLOCK_SIZE;

lazy_static::lazy_static! {
    /// cos((2x + 1) * u * PI / 16), indexed [u][x]
    static ref COS_TABLE: [[f64; BLOCK_SIZE]; BLOCK_SIZE] = {
        let mut table = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
        for (u, row) in table.iter_mut().enumerate() {
            for (x, entry) in row.iter_mut().enumerate() {
                let angle = ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI) / 16.0;
                *entry = angle.cos();
            }
        }
        table
    };

    /// C(u): 1/sqrt(2) for u = 0, otherwise 1
    static ref BASIS_SCALE: [f64; BLOCK_SIZE] = {
        let mut scale = [1.0f64; BLOCK_SIZE];
        scale[0] = 1.0 / 2.0f64.sqrt();
        scale
    };
}

#[inline]
fn dct_1d_forward(input: &[f64; BLOCK_SIZE], output: &mut [f64; BLOCK_SIZE]) {
    for u in 0..BLOCK_SIZE {
        let mut sum = 0.0f64;
        for x in 0..BLOCK_SIZE {
            sum += input[x] * COS_TABLE[u][x];
        }
        output[u] = sum * BASIS_SCALE[u] * 0.5;
    }
}

#[inline]
fn dct_1d_inverse(input: &[f64; BLOCK_SIZE], output: &mut [f64; BLOCK_SIZE]) {
    for x in 0..BLOCK_SIZE {
        let mut sum = 0.0f64;
        for u in 0..BLOCK_SIZE {
            sum += input[u] * BASIS_SCALE[u] * COS_TABLE[u][x];
        }
        output[x] = sum * 0.5;
    }
}

/// Forward DCT-II on one 8x8 block, rows then columns.
pub fn forward_dct_8x8(input: &[f32; 64], output: &mut [f32; 64]) {
    let mut temp = [0.0f64; 64];
    let mut line = [0.0f64; BLOCK_SIZE];
    let mut transformed = [0.0f64; BLOCK_SIZE];

    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            line[x] = input[y * BLOCK_SIZE + x] as f64;
        }
        dct_1d_forward(&line, &mut transformed);
        temp[y * BLOCK_SIZE..y * BLOCK_SIZE + BLOCK_SIZE]
            .copy_from_slice(&transformed);
    }

    for x in 0..BLOCK_SIZE {
        for y in 0..BLOCK_SIZE {
            line[y] = temp[y * BLOCK_SIZE + x];
        }
        dct_1d_forward(&line, &mut transformed);
        for y in 0..BLOCK_SIZE {
            output[y * BLOCK_SIZE + x] = transformed[y] as f32;
        }
    }
}

/// Inverse DCT-III on one 8x8 block, rows then columns.
pub fn inverse_dct_8x8(input: &[f32; 64], output: &mut [f32; 64]) {
    let mut temp = [0.0f64; 64];
    let mut line = [0.0f64; BLOCK_SIZE];
    let mut transformed = [0.0f64; BLOCK_SIZE];

    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            line[x] = input[y * BLOCK_SIZE + x] as f64;
        }
        dct_1d_inverse(&line, &mut transformed);
        temp[y * BLOCK_SIZE..y * BLOCK_SIZE + BLOCK_SIZE]
            .copy_from_slice(&transformed);
    }

    for x in 0..BLOCK_SIZE {
        for y in 0..BLOCK_SIZE {
            line[y] = temp[y * BLOCK_SIZE + x];
        }
        dct_1d_inverse(&line, &mut transformed);
        for y in 0..BLOCK_SIZE {
            output[y * BLOCK_SIZE + x] = transformed[y] as f32;
        }
    }
}

/// Copy an 8x8 block out of a plane, replicating edge samples for partial
/// blocks at the right and bottom borders.
pub fn extract_block(
    plane: &[f32],
    width: usize,
    height: usize,
    block_x: usize,
    block_y: usize,
    block: &mut [f32; 64],
) {
    for y in 0..BLOCK_SIZE {
        let src_y = (block_y * BLOCK_SIZE + y).min(height - 1);
        for x in 0..BLOCK_SIZE {
            let src_x = (block_x * BLOCK_SIZE + x).min(width - 1);
            block[y * BLOCK_SIZE + x] = plane[src_y * width + src_x];
        }
    }
}

/// Write an 8x8 block back into a plane, dropping samples that fall outside
/// the image.
pub fn place_block(
    plane: &mut [f32],
    width: usize,
    height: usize,
    block_x: usize,
    block_y: usize,
    block: &[f32; 64],
) {
    for y in 0..BLOCK_SIZE {
        let dst_y = block_y * BLOCK_SIZE + y;
        if dst_y >= height {
            break;
        }
        for x in 0..BLOCK_SIZE {
            let dst_x = block_x * BLOCK_SIZE + x;
            if dst_x >= width {
                break;
            }
            plane[dst_y * width + dst_x] = block[y * BLOCK_SIZE + x];
        }
    }
}
