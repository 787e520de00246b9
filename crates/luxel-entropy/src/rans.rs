//! rANS entropy coder
//!
//! Two-pass range Asymmetric Numeral Systems coder over per-context
//! alphabets. Values pass through a hybrid tokenizer: small values are
//! tokens themselves, larger ones split into a magnitude token plus raw
//! bits, keeping every alphabet small while covering the full u64 range.
//!
//! Frequencies are quantized so each context sums to `2^PRECISION`.
//! Encoding walks the symbol list in reverse with the state update
//! `state = (state / freq) * M + (state % freq) + start`, renormalizing in
//! 16-bit chunks so the state stays in `[L, L * 2^16)`. The final state is
//! serialized LSB-first at the head of the payload.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::{Error, Result};

/// Probability precision: frequencies per context sum to `1 << PRECISION`.
pub const PRECISION: u32 = 12;
const TAB_SIZE: u32 = 1 << PRECISION;
/// Lower bound of the normalized state interval.
const RANS_L: u64 = 1 << 16;
/// Largest possible token: direct tokens 0..15, then 11 + bitlen for
/// magnitudes up to 64 bits.
const ALPHABET_MAX: usize = 76;

#[inline]
fn tokenize(value: u64) -> (u8, u64, u32) {
    if value < 16 {
        (value as u8, 0, 0)
    } else {
        let bits = 64 - value.leading_zeros();
        let raw_len = bits - 1;
        (11 + bits as u8, value - (1u64 << raw_len), raw_len)
    }
}

#[inline]
fn detokenize(token: u8, raw: u64) -> u64 {
    if token < 16 {
        token as u64
    } else {
        let raw_len = token as u32 - 12;
        (1u64 << raw_len) + raw
    }
}

fn write_raw(writer: &mut BitstreamWriter, raw: u64, len: u32) -> Result<()> {
    if len > 32 {
        writer.write_bits((raw >> 32) as u32, (len - 32) as usize)?;
        writer.write_bits(raw as u32, 32)?;
    } else if len > 0 {
        writer.write_bits(raw as u32, len as usize)?;
    }
    Ok(())
}

fn read_raw(reader: &mut BitstreamReader<'_>, len: u32) -> Result<u64> {
    if len > 32 {
        let high = reader.read_bits((len - 32) as usize)? as u64;
        let low = reader.read_bits(32)? as u64;
        Ok((high << 32) | low)
    } else if len > 0 {
        Ok(reader.read_bits(len as usize)? as u64)
    } else {
        Ok(0)
    }
}

/// Quantize raw counts so present symbols keep frequency >= 1 and the
/// total is exactly `TAB_SIZE`.
fn normalize_frequencies(counts: &[u32]) -> Vec<u32> {
    let last_used = match counts.iter().rposition(|&c| c > 0) {
        Some(pos) => pos,
        None => return vec![0],
    };
    let counts = &counts[..=last_used];
    let total: u64 = counts.iter().map(|&c| c as u64).sum();

    let mut freqs: Vec<u32> = counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0
            } else {
                (((c as u64 * TAB_SIZE as u64) / total) as u32).max(1)
            }
        })
        .collect();

    let mut sum: i64 = freqs.iter().map(|&f| f as i64).sum();
    while sum != TAB_SIZE as i64 {
        if sum < TAB_SIZE as i64 {
            let largest = freqs
                .iter()
                .enumerate()
                .max_by_key(|(_, &f)| f)
                .map(|(i, _)| i)
                .unwrap();
            freqs[largest] += (TAB_SIZE as i64 - sum) as u32;
            sum = TAB_SIZE as i64;
        } else {
            // Steal from the largest reducible frequency
            let largest = freqs
                .iter()
                .enumerate()
                .filter(|(_, &f)| f > 1)
                .max_by_key(|(_, &f)| f)
                .map(|(i, _)| i)
                .unwrap();
            let take = ((sum - TAB_SIZE as i64) as u32).min(freqs[largest] - 1);
            freqs[largest] -= take;
            sum -= take as i64;
        }
    }
    freqs
}

fn cumulative(freqs: &[u32]) -> Vec<u32> {
    let mut cums = Vec::with_capacity(freqs.len());
    let mut acc = 0u32;
    for &f in freqs {
        cums.push(acc);
        acc += f;
    }
    cums
}

#[derive(Clone, Copy)]
struct EncSymbol {
    ctx: u8,
    token: u8,
}

/// Two-pass rANS encoder: collect symbols per context, then serialize one
/// self-contained section.
pub struct RansEncoder {
    counts: Vec<[u32; ALPHABET_MAX]>,
    symbols: Vec<EncSymbol>,
    raw: BitstreamWriter,
}

impl RansEncoder {
    pub fn new(num_contexts: usize) -> Self {
        Self {
            counts: vec![[0u32; ALPHABET_MAX]; num_contexts],
            symbols: Vec::new(),
            raw: BitstreamWriter::new(),
        }
    }

    /// Record one value in the given context. Call order defines the
    /// decode order.
    pub fn push(&mut self, ctx: usize, value: u64) -> Result<()> {
        if ctx >= self.counts.len() {
            return Err(Error::EncodingFailed(format!(
                "context {} out of {}",
                ctx,
                self.counts.len()
            )));
        }
        let (token, raw, raw_len) = tokenize(value);
        self.counts[ctx][token as usize] += 1;
        self.symbols.push(EncSymbol {
            ctx: ctx as u8,
            token,
        });
        write_raw(&mut self.raw, raw, raw_len)
    }

    /// Serialize frequency tables, the reverse-encoded payload, and the
    /// raw-bit stream into one byte section.
    pub fn finish(self) -> Result<Vec<u8>> {
        let num_contexts = self.counts.len();
        let freqs: Vec<Vec<u32>> = self
            .counts
            .iter()
            .map(|c| normalize_frequencies(c))
            .collect();
        let cums: Vec<Vec<u32>> = freqs.iter().map(|f| cumulative(f)).collect();

        // Encode in reverse so the decoder can walk forward.
        let mut state = RANS_L;
        let mut chunks: Vec<u16> = Vec::new();
        for sym in self.symbols.iter().rev() {
            let ctx = sym.ctx as usize;
            let token = sym.token as usize;
            let freq = freqs[ctx][token] as u64;
            debug_assert!(freq > 0);
            let x_max = ((RANS_L >> PRECISION) << 16) * freq;
            while state >= x_max {
                chunks.push(state as u16);
                state >>= 16;
            }
            state = (state / freq) * TAB_SIZE as u64 + (state % freq) + cums[ctx][token] as u64;
        }

        let mut writer = BitstreamWriter::new();
        writer.write_varint(num_contexts as u64);
        for ctx_freqs in &freqs {
            writer.write_varint(ctx_freqs.len() as u64);
            for &f in ctx_freqs {
                writer.write_varint(f as u64);
            }
        }
        writer.write_varint(self.symbols.len() as u64);

        let payload_len = 4 + 2 * chunks.len();
        writer.write_varint(payload_len as u64);
        for shift in [0, 8, 16, 24] {
            writer.write_byte((state >> shift) as u8);
        }
        // Chunks are consumed in reverse emission order.
        for &chunk in chunks.iter().rev() {
            writer.write_byte(chunk as u8);
            writer.write_byte((chunk >> 8) as u8);
        }

        let raw_bytes = self.raw.into_bytes();
        writer.write_varint(raw_bytes.len() as u64);
        writer.write_data(&raw_bytes);
        Ok(writer.into_bytes())
    }
}

/// Forward-walking decoder over a section produced by [`RansEncoder`].
pub struct RansDecoder<'a> {
    freqs: Vec<Vec<u32>>,
    cums: Vec<Vec<u32>>,
    /// slot -> token lookup per context
    luts: Vec<Vec<u8>>,
    state: u64,
    chunks: std::slice::Iter<'a, u8>,
    remaining: u64,
    raw: BitstreamReader<'a>,
}

impl<'a> RansDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut reader = BitstreamReader::new(data);
        let num_contexts = reader.read_varint()? as usize;
        if num_contexts == 0 || num_contexts > 256 {
            return Err(Error::DecodeFailed(format!(
                "implausible context count {}",
                num_contexts
            )));
        }

        let mut freqs = Vec::with_capacity(num_contexts);
        let mut cums = Vec::with_capacity(num_contexts);
        let mut luts = Vec::with_capacity(num_contexts);
        for _ in 0..num_contexts {
            let alphabet = reader.read_varint()? as usize;
            if alphabet > ALPHABET_MAX {
                return Err(Error::DecodeFailed(format!(
                    "alphabet of {} exceeds limit",
                    alphabet
                )));
            }
            let mut ctx_freqs = Vec::with_capacity(alphabet);
            for _ in 0..alphabet {
                ctx_freqs.push(reader.read_varint()? as u32);
            }
            let total: u64 = ctx_freqs.iter().map(|&f| f as u64).sum();
            if total != 0 && total != TAB_SIZE as u64 {
                return Err(Error::DecodeFailed(format!(
                    "frequencies sum to {} instead of {}",
                    total, TAB_SIZE
                )));
            }
            let ctx_cums = cumulative(&ctx_freqs);
            let mut lut = vec![0u8; TAB_SIZE as usize];
            for (token, (&f, &start)) in ctx_freqs.iter().zip(ctx_cums.iter()).enumerate() {
                for slot in start..start + f {
                    lut[slot as usize] = token as u8;
                }
            }
            freqs.push(ctx_freqs);
            cums.push(ctx_cums);
            luts.push(lut);
        }

        let remaining = reader.read_varint()?;
        let payload_len = reader.read_varint()? as usize;
        if payload_len < 4 {
            return Err(Error::DecodeFailed("rANS payload too short".to_string()));
        }
        let payload = reader.read_data(payload_len)?;
        let state = payload[0] as u64
            | (payload[1] as u64) << 8
            | (payload[2] as u64) << 16
            | (payload[3] as u64) << 24;

        let raw_len = reader.read_varint()? as usize;
        let raw_bytes = reader.read_data(raw_len)?;

        Ok(Self {
            freqs,
            cums,
            luts,
            state,
            chunks: payload[4..].iter(),
            remaining,
            raw: BitstreamReader::new(raw_bytes),
        })
    }

    /// Decode the next value in the given context. Contexts must match the
    /// encoder's push order exactly.
    pub fn read(&mut self, ctx: usize) -> Result<u64> {
        if self.remaining == 0 {
            return Err(Error::DecodeFailed("rANS symbol stream exhausted".to_string()));
        }
        if ctx >= self.luts.len() {
            return Err(Error::DecodeFailed(format!("context {} out of range", ctx)));
        }
        self.remaining -= 1;

        let slot = (self.state & (TAB_SIZE as u64 - 1)) as u32;
        let token = self.luts[ctx][slot as usize];
        let freq = self.freqs[ctx][token as usize] as u64;
        let start = self.cums[ctx][token as usize] as u64;
        if freq == 0 {
            return Err(Error::DecodeFailed("slot maps to empty symbol".to_string()));
        }

        self.state = freq * (self.state >> PRECISION) + slot as u64 - start;
        while self.state < RANS_L {
            let low = *self.chunks.next().ok_or_else(|| {
                Error::DecodeFailed("rANS payload exhausted during renorm".to_string())
            })? as u64;
            let high = *self.chunks.next().ok_or_else(|| {
                Error::DecodeFailed("rANS payload exhausted during renorm".to_string())
            })? as u64;
            self.state = (self.state << 16) | (high << 8) | low;
        }

        let token_raw_len = if token < 16 { 0 } else { token as u32 - 12 };
        let raw = read_raw(&mut self.raw, token_raw_len)?;
        Ok(detokenize(token, raw))
    }

    /// Symbols left to decode.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_roundtrip() {
        for v in [0u64, 1, 15, 16, 17, 255, 256, 65535, 1 << 20, u32::MAX as u64, u64::MAX >> 1] {
            let (token, raw, len) = tokenize(v);
            if len > 0 {
                assert!(raw < (1u64 << len));
            }
            assert_eq!(detokenize(token, raw), v);
        }
    }

    #[test]
    fn frequencies_always_sum_to_table_size() {
        let cases: Vec<Vec<u32>> = vec![
            vec![1],
            vec![1, 1],
            vec![1000, 1, 1, 1],
            vec![0, 0, 7, 0, 3],
            (0..76).map(|i| i * i).collect(),
        ];
        for counts in cases {
            let freqs = normalize_frequencies(&counts);
            let total: u32 = freqs.iter().sum();
            assert_eq!(total, TAB_SIZE);
            for (f, c) in freqs.iter().zip(counts.iter()) {
                assert_eq!(*f == 0, *c == 0);
            }
        }
    }

    fn roundtrip(values_per_ctx: &[Vec<u64>]) {
        let num_contexts = values_per_ctx.len();
        // Interleave contexts so the order exercises the shared stream
        let mut sequence: Vec<(usize, u64)> = Vec::new();
        let max_len = values_per_ctx.iter().map(|v| v.len()).max().unwrap();
        for i in 0..max_len {
            for (ctx, values) in values_per_ctx.iter().enumerate() {
                if let Some(&v) = values.get(i) {
                    sequence.push((ctx, v));
                }
            }
        }

        let mut encoder = RansEncoder::new(num_contexts);
        for &(ctx, v) in &sequence {
            encoder.push(ctx, v).unwrap();
        }
        let section = encoder.finish().unwrap();

        let mut decoder = RansDecoder::new(&section).unwrap();
        for &(ctx, v) in &sequence {
            assert_eq!(decoder.read(ctx).unwrap(), v, "ctx {}", ctx);
        }
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn single_context_roundtrip() {
        roundtrip(&[vec![0, 1, 2, 0, 0, 5, 16, 255, 0, 1, 4096, 0]]);
    }

    #[test]
    fn multi_context_roundtrip() {
        roundtrip(&[
            vec![0, 0, 0, 1, 2, 0, 0, 0],
            vec![100, 200, 300, 400, 500],
            vec![1 << 30, 5, 0, 1 << 18],
        ]);
    }

    #[test]
    fn single_symbol_alphabet() {
        // Degenerate distribution: one symbol with full probability mass
        roundtrip(&[vec![7; 100]]);
    }

    #[test]
    fn skewed_distribution_compresses() {
        let mut values = vec![0u64; 4000];
        for (i, v) in values.iter_mut().enumerate() {
            if i % 100 == 0 {
                *v = 9;
            }
        }
        let mut encoder = RansEncoder::new(1);
        for &v in &values {
            encoder.push(0, v).unwrap();
        }
        let section = encoder.finish().unwrap();
        // 4000 highly skewed symbols should fit well under a byte each
        assert!(
            section.len() < 1000,
            "section took {} bytes",
            section.len()
        );

        let mut decoder = RansDecoder::new(&section).unwrap();
        for &v in &values {
            assert_eq!(decoder.read(0).unwrap(), v);
        }
    }

    #[test]
    fn exhausted_stream_errors() {
        let mut encoder = RansEncoder::new(1);
        encoder.push(0, 3).unwrap();
        let section = encoder.finish().unwrap();
        let mut decoder = RansDecoder::new(&section).unwrap();
        decoder.read(0).unwrap();
        assert!(decoder.read(0).is_err());
    }

    #[test]
    fn corrupt_frequency_table_rejected() {
        let mut encoder = RansEncoder::new(1);
        encoder.push(0, 1).unwrap();
        let mut section = encoder.finish().unwrap();
        // Bump one frequency varint so the table no longer sums to 2^12.
        // Layout: varint(contexts), varint(alphabet), freq varints...
        section[2] = section[2].wrapping_add(1);
        assert!(RansDecoder::new(&section).is_err());
    }
}
