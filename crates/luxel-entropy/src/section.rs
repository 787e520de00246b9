//! Residual sections
//!
//! A section is a standalone byte string carrying one channel's residual
//! stream under either coder. Sections are length-prefixed by the caller,
//! so the decoder always knows the slice and the sample count up front.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::Result;

use crate::{
    decode_residuals_rle, encode_residuals_rle, modular_context, signed_to_symbol,
    symbol_to_signed, RansDecoder, RansEncoder, NUM_CONTEXTS,
};

/// Entropy-code one residual stream into a standalone section.
pub fn encode_residual_section(residuals: &[i32], use_ans: bool) -> Result<Vec<u8>> {
    if use_ans {
        let mut encoder = RansEncoder::new(NUM_CONTEXTS);
        for &r in residuals {
            encoder.push(modular_context(), signed_to_symbol(r))?;
        }
        encoder.finish()
    } else {
        let mut writer = BitstreamWriter::new();
        encode_residuals_rle(residuals, &mut writer);
        Ok(writer.into_bytes())
    }
}

/// Inverse of [`encode_residual_section`].
pub fn decode_residual_section(section: &[u8], count: usize, use_ans: bool) -> Result<Vec<i32>> {
    if use_ans {
        let mut decoder = RansDecoder::new(section)?;
        let mut residuals = Vec::with_capacity(count);
        for _ in 0..count {
            residuals.push(symbol_to_signed(decoder.read(modular_context())?));
        }
        Ok(residuals)
    } else {
        let mut reader = BitstreamReader::new(section);
        decode_residuals_rle(&mut reader, count)
    }
}
