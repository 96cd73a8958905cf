//! BasisLZ supercompression global data.
//!
//! Layout: a 20-byte header, one 20-byte image descriptor per image, then the
//! endpoint codebook, selector codebook, Huffman tables and extended data,
//! each sized by the header.

use std::io::Write;

use ktxkit_common::BinaryReader;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Error, Geometry, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct BasisLzHeader {
    pub endpoint_count: u16,
    pub selector_count: u16,
    pub endpoints_byte_length: u32,
    pub selectors_byte_length: u32,
    pub tables_byte_length: u32,
    pub extended_byte_length: u32,
}

impl BasisLzHeader {
    pub const SIZE: usize = 20;
}

/// Where one image's slices live within its level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct BasisLzImageDesc {
    pub image_flags: u32,
    pub rgb_slice_byte_offset: u32,
    pub rgb_slice_byte_length: u32,
    pub alpha_slice_byte_offset: u32,
    pub alpha_slice_byte_length: u32,
}

impl BasisLzImageDesc {
    pub const SIZE: usize = 20;
    /// The image is an I-frame of a video sequence.
    pub const FLAG_IS_I_FRAME: u32 = 0x2;

    pub fn is_i_frame(&self) -> bool {
        self.image_flags & Self::FLAG_IS_I_FRAME != 0
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha_slice_byte_length != 0
    }
}

/// Parsed BasisLZ global data section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasisLzGlobalData {
    pub header: BasisLzHeader,
    /// One descriptor per image, ordered by level, then layer, face and depth slice.
    pub images: Vec<BasisLzImageDesc>,
    pub endpoints: Vec<u8>,
    pub selectors: Vec<u8>,
    pub tables: Vec<u8>,
    pub extended: Vec<u8>,
}

impl BasisLzGlobalData {
    /// Number of image descriptors a texture of this shape carries.
    pub fn image_count(geometry: &Geometry) -> u64 {
        geometry.image_count()
    }

    /// Parse the section, expecting `image_count` descriptors.
    pub fn parse(data: &[u8], image_count: u64) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let header: BasisLzHeader = reader.read_struct().map_err(malformed)?;

        let fitting = (reader.remaining() / BasisLzImageDesc::SIZE) as u64;
        if image_count > fitting {
            return Err(Error::InvalidSgd(format!(
                "{image_count} image descriptors expected, room for {fitting}"
            )));
        }
        let mut images = Vec::with_capacity(image_count as usize);
        for _ in 0..image_count {
            images.push(reader.read_struct::<BasisLzImageDesc>().map_err(malformed)?);
        }

        let endpoints = reader
            .read_bytes(header.endpoints_byte_length as usize)
            .map_err(malformed)?
            .to_vec();
        let selectors = reader
            .read_bytes(header.selectors_byte_length as usize)
            .map_err(malformed)?
            .to_vec();
        let tables = reader
            .read_bytes(header.tables_byte_length as usize)
            .map_err(malformed)?
            .to_vec();
        let extended = reader
            .read_bytes(header.extended_byte_length as usize)
            .map_err(malformed)?
            .to_vec();

        if !reader.is_empty() {
            return Err(Error::InvalidSgd(format!(
                "{} trailing bytes after global data",
                reader.remaining()
            )));
        }

        Ok(Self {
            header,
            images,
            endpoints,
            selectors,
            tables,
            extended,
        })
    }

    /// Serialized byte length.
    pub fn byte_length(&self) -> u64 {
        (BasisLzHeader::SIZE
            + self.images.len() * BasisLzImageDesc::SIZE
            + self.endpoints.len()
            + self.selectors.len()
            + self.tables.len()
            + self.extended.len()) as u64
    }

    /// Write the section. Payload lengths in the header are taken from the
    /// stored buffers.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let header = BasisLzHeader {
            endpoints_byte_length: self.endpoints.len() as u32,
            selectors_byte_length: self.selectors.len() as u32,
            tables_byte_length: self.tables.len() as u32,
            extended_byte_length: self.extended.len() as u32,
            ..self.header
        };
        writer.write_all(header.as_bytes())?;
        for image in &self.images {
            writer.write_all(image.as_bytes())?;
        }
        writer.write_all(&self.endpoints)?;
        writer.write_all(&self.selectors)?;
        writer.write_all(&self.tables)?;
        writer.write_all(&self.extended)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_length() as usize);
        let _ = self.write_to(&mut bytes);
        bytes
    }
}

fn malformed(error: ktxkit_common::Error) -> Error {
    Error::InvalidSgd(error.to_string())
}
