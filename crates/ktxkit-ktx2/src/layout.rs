//! Placement of every section of a KTX2 file.

use ktxkit_common::align;

use crate::{Geometry, Header, LevelIndex, SectionIndex};

/// Alignment of the supercompression global data section.
pub const SGD_ALIGNMENT: u32 = 8;

/// Offsets of every section and level, relative to the start of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLayout {
    pub section_index: SectionIndex,
    /// File order, smallest level first.
    pub level_index: Vec<LevelIndex>,
    /// Total file size.
    pub size: u64,
}

impl FileLayout {
    /// Lay out a file.
    ///
    /// `levels` holds `(byte_length, uncompressed_byte_length)` per level in
    /// file order. An SGD length of 0 omits the section.
    pub fn compute(geometry: &Geometry, dfd_length: u32, kvd_length: u32, sgd_length: u64, levels: &[(u64, u64)]) -> Self {
        let mut offset = (Header::SIZE + SectionIndex::SIZE + levels.len() * LevelIndex::SIZE) as u64;

        let dfd_byte_offset = offset as u32;
        offset += dfd_length as u64;

        let kvd_byte_offset = offset as u32;
        offset += kvd_length as u64;

        let (sgd_byte_offset, sgd_byte_length) = if sgd_length > 0 {
            offset = align::align_up(offset, SGD_ALIGNMENT);
            let sgd_offset = offset;
            offset += sgd_length;
            (sgd_offset, sgd_length)
        } else {
            (0, 0)
        };

        let (level_index, size) = geometry.place_levels(offset, levels);

        Self {
            section_index: SectionIndex {
                dfd_byte_offset,
                dfd_byte_length: dfd_length,
                kvd_byte_offset,
                kvd_byte_length: kvd_length,
                sgd_byte_offset,
                sgd_byte_length,
            },
            level_index,
            size,
        }
    }

    /// Where level data begins.
    pub fn data_start(&self) -> u64 {
        let index = &self.section_index;
        if index.sgd_byte_length > 0 {
            index.sgd_byte_offset + index.sgd_byte_length
        } else {
            index.kvd_byte_offset as u64 + index.kvd_byte_length as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use ktxkit_format::Format;

    use super::*;

    fn rgba8_4x4() -> Geometry {
        Geometry {
            format: Format::R8G8B8A8_UNORM,
            width: 4,
            height: 4,
            depth: 0,
            level_count: 3,
            face_count: 1,
            layer_count: 1,
            supercompressed: false,
        }
    }

    #[test]
    fn test_sections_follow_level_index() {
        let geometry = rgba8_4x4();
        let levels = [(4, 4), (16, 16), (64, 64)];
        let layout = FileLayout::compute(&geometry, 92, 28, 0, &levels);

        // 48 + 32 + 3 * 24
        assert_eq!(layout.section_index.dfd_byte_offset, 152);
        assert_eq!(layout.section_index.kvd_byte_offset, 244);
        assert_eq!(layout.section_index.sgd_byte_offset, 0);
        assert_eq!(layout.data_start(), 272);

        let offsets: Vec<u64> = layout.level_index.iter().map(|l| l.byte_offset).collect();
        assert_eq!(offsets, [272, 276, 292]);
        assert_eq!(layout.size, 356);
    }

    #[test]
    fn test_sgd_is_eight_byte_aligned() {
        let mut geometry = rgba8_4x4();
        geometry.supercompressed = true;
        let levels = [(3, 4), (5, 16), (7, 64)];
        let layout = FileLayout::compute(&geometry, 92, 28, 10, &levels);

        assert_eq!(layout.section_index.sgd_byte_offset, 272);
        assert_eq!(layout.section_index.sgd_byte_length, 10);
        let offsets: Vec<u64> = layout.level_index.iter().map(|l| l.byte_offset).collect();
        // Supercompressed levels are packed without padding.
        assert_eq!(offsets, [282, 285, 290]);
        assert_eq!(layout.level_index[2].uncompressed_byte_length, 64);
        assert_eq!(layout.size, 297);

        let layout = FileLayout::compute(&geometry, 92, 30, 10, &levels);
        assert_eq!(layout.section_index.sgd_byte_offset, 280);
    }
}
