//! ISOBMFF container wrapper
//!
//! The bare codestream never uses this: callers wanting metadata boxes
//! wrap the codestream themselves through [`Container`]. Box framing is a
//! big-endian u32 size followed by a four-byte type; `Exif`, `xml ` and
//! `colr` payloads pass through verbatim.

use byteorder::{BigEndian, ByteOrder};
use luxel_core::{Error, Result};

/// Container signature box: size 12, type `JXL `, corruption check bytes.
pub const CONTAINER_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, // box size = 12
    0x4A, 0x58, 0x4C, 0x20, // "JXL "
    0x0D, 0x0A, 0x87, 0x0A, // CR LF 0x87 LF
];

/// Brand written into the file type box
pub const BRAND_JXL: [u8; 4] = *b"jxl ";

/// Box types the wrapper understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxType {
    /// File type box (`ftyp`)
    FileType,
    /// Codestream box (`jxlc`)
    Codestream,
    /// EXIF metadata, verbatim
    Exif,
    /// XML/XMP metadata, verbatim
    Xml,
    /// ICC profile, verbatim
    Colr,
    Unknown([u8; 4]),
}

impl BoxType {
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Self {
        match fourcc {
            b"ftyp" => BoxType::FileType,
            b"jxlc" => BoxType::Codestream,
            b"Exif" => BoxType::Exif,
            b"xml " => BoxType::Xml,
            b"colr" => BoxType::Colr,
            _ => BoxType::Unknown(*fourcc),
        }
    }

    pub fn to_fourcc(self) -> [u8; 4] {
        match self {
            BoxType::FileType => *b"ftyp",
            BoxType::Codestream => *b"jxlc",
            BoxType::Exif => *b"Exif",
            BoxType::Xml => *b"xml ",
            BoxType::Colr => *b"colr",
            BoxType::Unknown(fourcc) => fourcc,
        }
    }
}

/// One box: type plus payload
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBox {
    pub box_type: BoxType,
    pub data: Vec<u8>,
}

impl ContainerBox {
    pub fn new(box_type: BoxType, data: Vec<u8>) -> Self {
        Self { box_type, data }
    }

    fn file_type() -> Self {
        let mut data = Vec::with_capacity(12);
        data.extend_from_slice(&BRAND_JXL);
        data.extend_from_slice(&0u32.to_be_bytes()); // minor version
        data.extend_from_slice(&BRAND_JXL); // compatible brand
        Self::new(BoxType::FileType, data)
    }

    fn write(&self, out: &mut Vec<u8>) {
        let size = 8 + self.data.len() as u32;
        let mut header = [0u8; 4];
        BigEndian::write_u32(&mut header, size);
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.box_type.to_fourcc());
        out.extend_from_slice(&self.data);
    }

    fn read(input: &[u8]) -> Result<(Self, usize)> {
        if input.len() < 8 {
            return Err(Error::DecodeFailed("truncated box header".to_string()));
        }
        let size = BigEndian::read_u32(&input[..4]) as usize;
        if size < 8 || size > input.len() {
            return Err(Error::DecodeFailed(format!("box size {} out of range", size)));
        }
        let mut fourcc = [0u8; 4];
        fourcc.copy_from_slice(&input[4..8]);
        Ok((
            Self {
                box_type: BoxType::from_fourcc(&fourcc),
                data: input[8..size].to_vec(),
            },
            size,
        ))
    }
}

/// An ISOBMFF container wrapping one codestream plus optional metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub boxes: Vec<ContainerBox>,
}

impl Container {
    /// Standard layout: file type box, then the codestream box.
    pub fn wrap(codestream: Vec<u8>) -> Self {
        Self {
            boxes: vec![
                ContainerBox::file_type(),
                ContainerBox::new(BoxType::Codestream, codestream),
            ],
        }
    }

    /// Attach verbatim metadata (EXIF, XMP or ICC) as a passthrough box.
    pub fn with_metadata(mut self, box_type: BoxType, data: Vec<u8>) -> Self {
        self.boxes.push(ContainerBox::new(box_type, data));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&CONTAINER_SIGNATURE);
        for container_box in &self.boxes {
            container_box.write(&mut out);
        }
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self> {
        if input.len() < CONTAINER_SIGNATURE.len()
            || input[..CONTAINER_SIGNATURE.len()] != CONTAINER_SIGNATURE
        {
            return Err(Error::DecodeFailed("missing container signature".to_string()));
        }
        let mut offset = CONTAINER_SIGNATURE.len();
        let mut boxes = Vec::new();
        while offset < input.len() {
            let (container_box, consumed) = ContainerBox::read(&input[offset..])?;
            boxes.push(container_box);
            offset += consumed;
        }
        Ok(Self { boxes })
    }

    /// Concatenated codestream payload.
    pub fn codestream(&self) -> Result<Vec<u8>> {
        let mut codestream = Vec::new();
        for container_box in &self.boxes {
            if container_box.box_type == BoxType::Codestream {
                codestream.extend_from_slice(&container_box.data);
            }
        }
        if codestream.is_empty() {
            return Err(Error::DecodeFailed("container holds no codestream".to_string()));
        }
        Ok(codestream)
    }
}
