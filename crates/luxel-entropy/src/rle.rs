//! RLE + varint fast path
//!
//! The low-effort coder: coefficients and residuals become byte-aligned
//! varints with zero-run compression. Roughly Golomb-Rice shaped thanks to
//! the sign-preserving symbol map, and cheap enough for effort 1.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::consts::END_OF_BLOCK;
use luxel_core::{Error, Result};

use crate::{signed_to_symbol, symbol_to_signed};

/// Encode one zigzag-ordered coefficient band.
///
/// The first entry (the DC residual when the band starts at zero) is a
/// plain signed varint. The rest are zero runs followed by the nonzero
/// value; a trailing run of zeros collapses into the end-of-block sentinel.
pub fn encode_coeff_band_rle(coeffs: &[i16], writer: &mut BitstreamWriter) {
    if coeffs.is_empty() {
        return;
    }
    writer.write_varint(signed_to_symbol(coeffs[0] as i32));

    let mut i = 1;
    while i < coeffs.len() {
        let run_start = i;
        while i < coeffs.len() && coeffs[i] == 0 {
            i += 1;
        }
        if i == coeffs.len() {
            writer.write_varint(END_OF_BLOCK);
            return;
        }
        writer.write_varint((i - run_start) as u64);
        writer.write_varint(signed_to_symbol(coeffs[i] as i32));
        i += 1;
    }
}

/// Decode a band of `len` coefficients written by [`encode_coeff_band_rle`].
pub fn decode_coeff_band_rle(reader: &mut BitstreamReader<'_>, len: usize) -> Result<Vec<i16>> {
    let mut coeffs = vec![0i16; len];
    if len == 0 {
        return Ok(coeffs);
    }
    coeffs[0] = symbol_to_signed(reader.read_varint()?) as i16;

    let mut i = 1;
    while i < len {
        let run = reader.read_varint()?;
        if run == END_OF_BLOCK {
            return Ok(coeffs);
        }
        i += run as usize;
        if i >= len {
            return Err(Error::DecodeFailed(format!(
                "zero run of {} overflows band of {}",
                run, len
            )));
        }
        coeffs[i] = symbol_to_signed(reader.read_varint()?) as i16;
        i += 1;
    }
    Ok(coeffs)
}

/// Encode a residual plane: nonzero values as signed varints, zero runs as
/// a zero symbol followed by the run length.
pub fn encode_residuals_rle(values: &[i32], writer: &mut BitstreamWriter) {
    let mut i = 0;
    while i < values.len() {
        if values[i] == 0 {
            let run_start = i;
            while i < values.len() && values[i] == 0 {
                i += 1;
            }
            writer.write_varint(0);
            writer.write_varint((i - run_start) as u64);
        } else {
            writer.write_varint(signed_to_symbol(values[i]));
            i += 1;
        }
    }
}

/// Decode exactly `count` residuals written by [`encode_residuals_rle`].
pub fn decode_residuals_rle(reader: &mut BitstreamReader<'_>, count: usize) -> Result<Vec<i32>> {
    let mut values = Vec::with_capacity(count);
    while values.len() < count {
        let symbol = reader.read_varint()?;
        if symbol == 0 {
            let run = reader.read_varint()? as usize;
            if run == 0 || values.len() + run > count {
                return Err(Error::DecodeFailed(format!(
                    "zero run of {} overflows plane of {}",
                    run, count
                )));
            }
            values.resize(values.len() + run, 0);
        } else {
            values.push(symbol_to_signed(symbol));
        }
    }
    Ok(values)
}
