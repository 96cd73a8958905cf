//! Fixed-size KTX2 wire structures.

use std::fmt;

use ktxkit_format::Format;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// The 12-byte KTX2 file identifier: `«KTX 20»\r\n\x1A\n`.
pub const KTX2_MAGIC: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

/// KTX2 file header.
///
/// `pixel_height`, `pixel_depth`, `layer_count` and `level_count` may be 0.
/// Use the `effective_*` accessors for the value the count stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Header {
    pub identifier: [u8; 12],
    pub vk_format: Format,
    /// Bytes per channel, 0 for block-compressed formats.
    pub type_size: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixel_depth: u32,
    pub layer_count: u32,
    /// 1, or 6 for cube maps.
    pub face_count: u32,
    pub level_count: u32,
    pub supercompression_scheme: SupercompressionScheme,
}

impl Header {
    pub const SIZE: usize = 48;

    /// Check the identifier against [`KTX2_MAGIC`].
    pub fn has_valid_identifier(&self) -> bool {
        self.identifier == KTX2_MAGIC
    }

    /// Number of mip levels stored, treating 0 as 1.
    pub fn effective_level_count(&self) -> u32 {
        self.level_count.max(1)
    }

    /// Number of array layers, treating 0 as 1.
    pub fn effective_layer_count(&self) -> u32 {
        self.layer_count.max(1)
    }

    pub fn effective_face_count(&self) -> u32 {
        self.face_count.max(1)
    }

    pub fn is_supercompressed(&self) -> bool {
        self.supercompression_scheme != SupercompressionScheme::NONE
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            identifier: KTX2_MAGIC,
            vk_format: Format::UNDEFINED,
            type_size: 0,
            pixel_width: 0,
            pixel_height: 0,
            pixel_depth: 0,
            layer_count: 0,
            face_count: 0,
            level_count: 0,
            supercompression_scheme: SupercompressionScheme::NONE,
        }
    }
}

/// Locations of the descriptor, key/value and global data sections.
///
/// Offsets are relative to the start of the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct SectionIndex {
    pub dfd_byte_offset: u32,
    pub dfd_byte_length: u32,
    pub kvd_byte_offset: u32,
    pub kvd_byte_length: u32,
    pub sgd_byte_offset: u64,
    pub sgd_byte_length: u64,
}

impl SectionIndex {
    pub const SIZE: usize = 32;
}

/// One entry of the level index, in file order (entry 0 is the smallest mip).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct LevelIndex {
    pub byte_offset: u64,
    pub byte_length: u64,
    /// Length before supercompression; equals `byte_length` when none is applied.
    pub uncompressed_byte_length: u64,
}

impl LevelIndex {
    pub const SIZE: usize = 24;
}

/// Supercompression scheme identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct SupercompressionScheme(pub u32);

impl SupercompressionScheme {
    pub const NONE: Self = Self(0);
    /// Basis Universal ETC1S payload with global codebooks.
    pub const BASIS_LZ: Self = Self(1);
    pub const ZSTANDARD: Self = Self(2);
    pub const ZLIB: Self = Self(3);

    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("none"),
            1 => Some("BasisLZ"),
            2 => Some("Zstandard"),
            3 => Some("ZLIB"),
            _ => None,
        }
    }
}

impl fmt::Debug for SupercompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SupercompressionScheme({})", self)
    }
}

impl fmt::Display for SupercompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "scheme {}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes_match_wire_layout() {
        assert_eq!(std::mem::size_of::<Header>(), Header::SIZE);
        assert_eq!(std::mem::size_of::<SectionIndex>(), SectionIndex::SIZE);
        assert_eq!(std::mem::size_of::<LevelIndex>(), LevelIndex::SIZE);
    }

    #[test]
    fn test_header_bytes() {
        let header = Header {
            vk_format: Format::R8G8B8A8_UNORM,
            type_size: 1,
            pixel_width: 4,
            pixel_height: 4,
            face_count: 1,
            level_count: 3,
            ..Header::default()
        };
        let bytes = header.as_bytes();
        assert_eq!(&bytes[..12], &KTX2_MAGIC);
        assert_eq!(&bytes[12..16], &37u32.to_le_bytes());
        assert_eq!(&bytes[40..44], &3u32.to_le_bytes());

        let parsed = Header::read_from_bytes(bytes).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.has_valid_identifier());
    }

    #[test]
    fn test_effective_counts() {
        let header = Header::default();
        assert_eq!(header.effective_level_count(), 1);
        assert_eq!(header.effective_layer_count(), 1);
        assert_eq!(header.effective_face_count(), 1);
        assert!(!header.is_supercompressed());
    }

    #[test]
    fn test_scheme_display() {
        assert_eq!(SupercompressionScheme::ZSTANDARD.to_string(), "Zstandard");
        assert_eq!(SupercompressionScheme(9).to_string(), "scheme 9");
    }
}
