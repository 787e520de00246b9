//! Entropy coders
//!
//! Two interchangeable coders sit behind the block and residual streams:
//! a varint-based RLE fast path and a context-modeled rANS path. Both use
//! the same sign-preserving symbol map, and both are mirrored exactly by
//! their decoders.

pub mod context;
pub mod rans;
pub mod rle;
pub mod section;

pub use context::{ac_context, dc_context, modular_context, FrequencyBand, NUM_CONTEXTS};
pub use rans::{RansDecoder, RansEncoder};
pub use rle::{
    decode_coeff_band_rle, decode_residuals_rle, encode_coeff_band_rle, encode_residuals_rle,
};
pub use section::{decode_residual_section, encode_residual_section};

/// Map a signed value to an unsigned symbol, preserving sign information
/// in the low bit: 0, -1, 1, -2, 2 ... become 0, 1, 2, 3, 4 ...
#[inline]
pub fn signed_to_symbol(value: i32) -> u64 {
    (((value << 1) ^ (value >> 31)) as u32) as u64
}

/// Inverse of [`signed_to_symbol`].
#[inline]
pub fn symbol_to_signed(symbol: u64) -> i32 {
    let s = symbol as u32;
    ((s >> 1) as i32) ^ -((s & 1) as i32)
}
