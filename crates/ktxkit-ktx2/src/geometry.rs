//! Offset and size arithmetic for mip levels, faces and layers.
//!
//! Levels are addressed two ways. The public API uses *API levels*, where 0 is
//! the full-resolution image. The file stores levels smallest first, so its
//! *file levels* run the other way: `file = level_count - api - 1`.
//!
//! A zero height or depth means the dimension is absent. Every function here
//! treats it as 1, so no caller has to.

use ktxkit_common::align;
use ktxkit_format::{byte_size, block_extent, Format};

use crate::{Error, Header, LevelIndex, Result};

pub use ktxkit_common::align::padding;

/// Texel block size used for level alignment when the format has none.
const UNDEFINED_ALIGNMENT: u32 = 16;

/// Extent of a dimension at `level`. Absent dimensions are 1.
#[inline]
pub const fn level_dimension(extent: u32, level: u32) -> u32 {
    let extent = if extent == 0 { 1 } else { extent };
    match extent.checked_shr(level) {
        Some(0) | None => 1,
        Some(value) => value,
    }
}

/// Number of texels in one face of `level`. Saturates at `u64::MAX`.
pub const fn pixel_count(level: u32, width: u32, height: u32, depth: u32) -> u64 {
    (level_dimension(width, level) as u64)
        .saturating_mul(level_dimension(height, level) as u64)
        .saturating_mul(level_dimension(depth, level) as u64)
}

/// Byte size of a single face (all depth slices) of `level`.
///
/// Saturates at `u64::MAX`; [`Geometry::validate`] rejects extents where that
/// would happen.
pub const fn face_byte_size(format: Format, level: u32, width: u32, height: u32, depth: u32) -> u64 {
    match block_extent(format) {
        Some(block) => {
            let blocks_x = level_dimension(width, level).div_ceil(block.width) as u64;
            let blocks_y = level_dimension(height, level).div_ceil(block.height) as u64;
            (byte_size(format) as u64)
                .saturating_mul(blocks_x)
                .saturating_mul(blocks_y)
                .saturating_mul(level_dimension(depth, level) as u64)
        }
        None => pixel_count(level, width, height, depth).saturating_mul(byte_size(format) as u64),
    }
}

/// Byte size of `level` across all faces and layers. Saturates at `u64::MAX`.
pub const fn level_byte_length(
    format: Format,
    level: u32,
    width: u32,
    height: u32,
    depth: u32,
    face_count: u32,
    layer_count: u32,
) -> u64 {
    let faces = (if face_count == 0 { 1 } else { face_count }) as u64;
    let layers = (if layer_count == 0 { 1 } else { layer_count }) as u64;
    face_byte_size(format, level, width, height, depth)
        .saturating_mul(faces)
        .saturating_mul(layers)
}

/// [`face_byte_size`], or `None` if it does not fit in a `u64`.
fn checked_face_byte_size(format: Format, level: u32, width: u32, height: u32, depth: u32) -> Option<u64> {
    let depth = level_dimension(depth, level) as u64;
    match block_extent(format) {
        Some(block) => {
            let blocks_x = level_dimension(width, level).div_ceil(block.width) as u64;
            let blocks_y = level_dimension(height, level).div_ceil(block.height) as u64;
            (byte_size(format) as u64)
                .checked_mul(blocks_x)?
                .checked_mul(blocks_y)?
                .checked_mul(depth)
        }
        None => (level_dimension(width, level) as u64)
            .checked_mul(level_dimension(height, level) as u64)?
            .checked_mul(depth)?
            .checked_mul(byte_size(format) as u64),
    }
}

/// Alignment a level must start on.
///
/// Supercompressed levels are byte aligned; others align to
/// `lcm(texel block size, 4)`.
pub const fn mip_alignment(format: Format, supercompressed: bool) -> u32 {
    if supercompressed {
        return 1;
    }
    let size = match byte_size(format) {
        0 => UNDEFINED_ALIGNMENT,
        size => size,
    };
    align::lcm(size, 4)
}

/// Padding between `file_offset` and the start of the next level.
pub const fn mip_padding(file_offset: u64, format: Format, supercompressed: bool) -> u32 {
    padding(file_offset, mip_alignment(format, supercompressed))
}

/// Offset of an image within its level. Layers are the outer loop, faces the inner.
#[allow(clippy::too_many_arguments)]
pub const fn face_offset_within_level(
    format: Format,
    level: u32,
    width: u32,
    height: u32,
    depth: u32,
    face_count: u32,
    face: u32,
    layer: u32,
) -> u64 {
    let faces = (if face_count == 0 { 1 } else { face_count }) as u64;
    let index = (layer as u64).saturating_mul(faces).saturating_add(face as u64);
    face_byte_size(format, level, width, height, depth).saturating_mul(index)
}

/// Length of the longest mip chain for the given extent: `floor(log2(max)) + 1`.
pub const fn max_level_count(width: u32, height: u32, depth: u32) -> u32 {
    let mut largest = width;
    if height > largest {
        largest = height;
    }
    if depth > largest {
        largest = depth;
    }
    if largest == 0 {
        return 1;
    }
    u32::BITS - largest.leading_zeros()
}

/// Texture shape derived from a header, with every count made effective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub format: Format,
    pub width: u32,
    /// Raw header value; 0 when the dimension is absent.
    pub height: u32,
    /// Raw header value; 0 when the dimension is absent.
    pub depth: u32,
    pub level_count: u32,
    pub face_count: u32,
    pub layer_count: u32,
    pub supercompressed: bool,
}

impl Geometry {
    pub fn from_header(header: &Header) -> Self {
        Self {
            format: header.vk_format,
            width: header.pixel_width,
            height: header.pixel_height,
            depth: header.pixel_depth,
            level_count: header.effective_level_count(),
            face_count: header.effective_face_count(),
            layer_count: header.effective_layer_count(),
            supercompressed: header.is_supercompressed(),
        }
    }

    /// File-order index of an API level.
    pub fn file_level(&self, level: u32) -> Result<usize> {
        self.check_level(level)?;
        Ok((self.level_count - level - 1) as usize)
    }

    /// API level stored at a file-order index.
    pub fn api_level(&self, file_level: usize) -> u32 {
        self.level_count - file_level as u32 - 1
    }

    pub fn check_level(&self, level: u32) -> Result<()> {
        if level >= self.level_count {
            return Err(Error::InvalidLevelIndex {
                level,
                count: self.level_count,
            });
        }
        Ok(())
    }

    /// Validate an image address.
    pub fn check_image(&self, level: u32, face: u32, layer: u32) -> Result<()> {
        self.check_level(level)?;
        if face >= self.face_count {
            return Err(Error::InvalidFaceIndex {
                face,
                count: self.face_count,
            });
        }
        if layer >= self.layer_count {
            return Err(Error::InvalidLayerIndex {
                layer,
                count: self.layer_count,
            });
        }
        Ok(())
    }

    pub fn face_byte_size(&self, level: u32) -> u64 {
        face_byte_size(self.format, level, self.width, self.height, self.depth)
    }

    pub fn level_byte_length(&self, level: u32) -> u64 {
        level_byte_length(
            self.format,
            level,
            self.width,
            self.height,
            self.depth,
            self.face_count,
            self.layer_count,
        )
    }

    pub fn face_offset(&self, level: u32, face: u32, layer: u32) -> u64 {
        face_offset_within_level(
            self.format,
            level,
            self.width,
            self.height,
            self.depth,
            self.face_count,
            face,
            layer,
        )
    }

    /// Depth slices in `level`.
    pub fn depth_slices(&self, level: u32) -> u32 {
        level_dimension(self.depth, level)
    }

    /// Images in one level: `layers × faces × depth slices`.
    pub fn images_in_level(&self, level: u32) -> u64 {
        (self.layer_count as u64)
            .saturating_mul(self.face_count as u64)
            .saturating_mul(self.depth_slices(level) as u64)
    }

    /// Images across the whole mip chain.
    pub fn image_count(&self) -> u64 {
        (0..self.level_count).fold(0u64, |total, level| {
            total.saturating_add(self.images_in_level(level))
        })
    }

    /// Check that every size and count derived from this shape is
    /// representable.
    ///
    /// Level lengths and the padded payload must fit in a `u64`, and the
    /// image count in a `u32`.
    pub fn validate(&self) -> Result<()> {
        let too_large = |what: &str| {
            Error::InvalidDimensions(format!(
                "{what} overflows for {}x{}x{}, {} faces, {} layers",
                self.width, self.height, self.depth, self.face_count, self.layer_count
            ))
        };
        let alignment = mip_alignment(self.format, self.supercompressed) as u64;
        let mut payload = 0u64;
        for level in 0..self.level_count {
            let length = checked_face_byte_size(self.format, level, self.width, self.height, self.depth)
                .and_then(|size| size.checked_mul(self.face_count as u64))
                .and_then(|size| size.checked_mul(self.layer_count as u64))
                .ok_or_else(|| too_large("level byte length"))?;
            payload = payload
                .checked_add(length)
                .and_then(|size| size.checked_add(alignment))
                .ok_or_else(|| too_large("level data size"))?;
        }

        let mut images = 0u64;
        for level in 0..self.level_count {
            images = (self.layer_count as u64)
                .checked_mul(self.face_count as u64)
                .and_then(|count| count.checked_mul(self.depth_slices(level) as u64))
                .and_then(|count| count.checked_add(images))
                .ok_or_else(|| too_large("image count"))?;
        }
        if images > u32::MAX as u64 {
            return Err(too_large("image count"));
        }
        Ok(())
    }

    /// Uncompressed level lengths in file order.
    pub fn level_lengths(&self) -> Vec<u64> {
        (0..self.level_count)
            .rev()
            .map(|level| self.level_byte_length(level))
            .collect()
    }

    /// Place levels of the given lengths (file order) starting at `start`.
    ///
    /// Returns the level index entries and the end offset.
    pub fn place_levels(&self, start: u64, lengths: &[(u64, u64)]) -> (Vec<LevelIndex>, u64) {
        let mut offset = start;
        let mut entries = Vec::with_capacity(lengths.len());
        for &(byte_length, uncompressed_byte_length) in lengths {
            offset = offset.saturating_add(mip_padding(offset, self.format, self.supercompressed) as u64);
            entries.push(LevelIndex {
                byte_offset: offset,
                byte_length,
                uncompressed_byte_length,
            });
            offset = offset.saturating_add(byte_length);
        }
        (entries, offset)
    }

    /// Total bytes taken by uncompressed level data placed at `start`,
    /// including inter-level padding.
    pub fn payload_size(&self, start: u64) -> u64 {
        let lengths: Vec<(u64, u64)> = self
            .level_lengths()
            .into_iter()
            .map(|length| (length, length))
            .collect();
        let (_, end) = self.place_levels(start, &lengths);
        end - start
    }
}
