//! Bitstream writer

use byteorder::{BigEndian, ByteOrder};
use luxel_core::{Error, Result, CODESTREAM_SIGNATURE};

/// Accumulates a codestream into a byte buffer, MSB-first within each byte.
#[derive(Debug, Default)]
pub struct BitstreamWriter {
    bytes: Vec<u8>,
    current: u8,
    /// Bits already occupied in `current`, 0 through 7
    position: usize,
}

impl BitstreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            current: 0,
            position: 0,
        }
    }

    /// Write a single bit into position `7 - position` of the current byte.
    pub fn write_bit(&mut self, bit: bool) {
        if bit {
            self.current |= 1 << (7 - self.position);
        }
        self.position += 1;
        if self.position == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.position = 0;
        }
    }

    /// Write the `n` least significant bits of `value`, high-order first.
    pub fn write_bits(&mut self, value: u32, n: usize) -> Result<()> {
        if n > 32 {
            return Err(Error::EncodingFailed(format!(
                "cannot write {} bits at once",
                n
            )));
        }
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Byte-aligned single-byte write.
    pub fn write_byte(&mut self, byte: u8) {
        self.flush_byte();
        self.bytes.push(byte);
    }

    /// Byte-aligned bulk write; flushes the partial byte first.
    pub fn write_data(&mut self, data: &[u8]) {
        self.flush_byte();
        self.bytes.extend_from_slice(data);
    }

    /// LEB128-style varint: 7-bit groups, least significant first, with a
    /// continuation bit. Byte-aligned.
    pub fn write_varint(&mut self, mut value: u64) {
        self.flush_byte();
        loop {
            let group = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.bytes.push(group);
                break;
            }
            self.bytes.push(group | 0x80);
        }
    }

    /// Signed varint with a zigzag sign map preserving small magnitudes.
    pub fn write_signed_varint(&mut self, value: i64) {
        self.write_varint(((value << 1) ^ (value >> 63)) as u64);
    }

    /// Byte-aligned big-endian u32.
    pub fn write_u32_be(&mut self, value: u32) {
        self.flush_byte();
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.bytes.extend_from_slice(&buf);
    }

    /// Pad the current byte with zero bits. After this the output is
    /// byte-aligned.
    pub fn flush_byte(&mut self) {
        if self.position > 0 {
            self.bytes.push(self.current);
            self.current = 0;
            self.position = 0;
        }
    }

    /// Emit the bare codestream signature `0xFF 0x0A`.
    pub fn jxl_signature(&mut self) {
        self.write_data(&CODESTREAM_SIGNATURE);
    }

    /// Bytes written so far, counting a partial byte as one.
    pub fn byte_len(&self) -> usize {
        self.bytes.len() + usize::from(self.position > 0)
    }

    pub fn is_aligned(&self) -> bool {
        self.position == 0
    }

    /// Finish the stream, flushing any partial byte.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush_byte();
        self.bytes
    }
}
