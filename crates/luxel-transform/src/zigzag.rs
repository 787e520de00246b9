//! Zigzag coefficient scan
//!
//! The fixed 64-entry scan shared by JPEG and JPEG XL: row 0 first, then
//! anti-diagonal traversal, so low-frequency coefficients come first.

/// Scan order: `ZIGZAG_8X8[i]` is the row-major block index of the i-th
/// scanned coefficient.
pub const ZIGZAG_8X8: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Reorder a row-major block into scan order.
pub fn scan_block(block: &[i16; 64], scanned: &mut [i16; 64]) {
    for (i, &pos) in ZIGZAG_8X8.iter().enumerate() {
        scanned[i] = block[pos];
    }
}

/// Restore a row-major block from scan order.
pub fn unscan_block(scanned: &[i16; 64], block: &mut [i16; 64]) {
    for (i, &pos) in ZIGZAG_8X8.iter().enumerate() {
        block[pos] = scanned[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_is_permutation() {
        let mut seen = [false; 64];
        for &pos in &ZIGZAG_8X8 {
            assert!(!seen[pos]);
            seen[pos] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn scan_starts_with_low_frequencies() {
        assert_eq!(&ZIGZAG_8X8[..6], &[0, 1, 8, 16, 9, 2]);
        assert_eq!(ZIGZAG_8X8[63], 63);
    }

    #[test]
    fn roundtrip() {
        let block: [i16; 64] = core::array::from_fn(|i| i as i16 - 32);
        let mut scanned = [0i16; 64];
        let mut restored = [0i16; 64];
        scan_block(&block, &mut scanned);
        unscan_block(&scanned, &mut restored);
        assert_eq!(block, restored);
    }
}
