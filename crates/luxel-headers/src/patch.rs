//! Patch list serialization
//!
//! Emitted after the main frame payload when the frame header sets the
//! patch flag: a count followed by seven varints per patch.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::{Error, Patch, Result};

pub fn write_patches(patches: &[Patch], writer: &mut BitstreamWriter) {
    writer.write_varint(patches.len() as u64);
    for patch in patches {
        writer.write_varint(patch.dest_x as u64);
        writer.write_varint(patch.dest_y as u64);
        writer.write_varint(patch.width as u64);
        writer.write_varint(patch.height as u64);
        writer.write_varint(patch.reference_index as u64);
        writer.write_varint(patch.source_x as u64);
        writer.write_varint(patch.source_y as u64);
    }
}

pub fn parse_patches(reader: &mut BitstreamReader<'_>) -> Result<Vec<Patch>> {
    let count = reader.read_varint()? as usize;
    let mut patches = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let dest_x = reader.read_varint()? as u32;
        let dest_y = reader.read_varint()? as u32;
        let width = reader.read_varint()? as u32;
        let height = reader.read_varint()? as u32;
        let reference_index = reader.read_varint()? as u8;
        let source_x = reader.read_varint()? as u32;
        let source_y = reader.read_varint()? as u32;
        if !(1..=4).contains(&reference_index) {
            return Err(Error::DecodeFailed(format!(
                "patch reference index {}",
                reference_index
            )));
        }
        patches.push(Patch {
            dest_x,
            dest_y,
            width,
            height,
            reference_index,
            source_x,
            source_y,
            similarity: 0.0,
        });
    }
    Ok(patches)
}
