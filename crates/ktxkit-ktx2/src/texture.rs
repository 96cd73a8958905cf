//! The KTX2 texture container.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use ktxkit_common::BinaryReader;
use ktxkit_format::{transcode_to_vk_format, type_size, Format, TranscodeFormat};
use zerocopy::IntoBytes;

use crate::basis::BasisLzGlobalData;
use crate::dfd::ColorModel;
use crate::geometry::{max_level_count, Geometry};
use crate::io::{self, diag, Capabilities};
use crate::layout::FileLayout;
use crate::transcode::{ImageSlice, Transcoder};
use crate::{
    supercompression, DataFormatDescriptor, Error, Header, KeyValueData, LevelIndex, Result,
    SectionIndex, SupercompressionScheme, KTX2_MAGIC,
};

/// Smallest DFD section: `totalSize` and one block header.
const MIN_DFD_LENGTH: u32 = 4 + 24;
/// Smallest KVD section: one length prefix and a one-byte key with its NUL.
const MIN_KVD_LENGTH: u32 = 4 + 2;

/// Where a texture is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureState {
    /// Nothing configured or parsed.
    Empty,
    /// Header and level index are known; no image storage yet.
    Configured,
    /// Image storage exists but not every image has been set.
    Allocated,
    /// Every image has been set.
    Populated,
    /// Written to a stream at least once.
    Serialized,
    /// Read from a stream.
    Parsed,
}

/// A KTX2 texture: header, section and level indices, descriptor, metadata
/// and per-level image data.
///
/// Level data is kept as one buffer per mip level in file order, so index 0
/// of the internal storage is the smallest level. Every public method takes
/// API levels, where 0 is the full-resolution image.
///
/// # Example
///
/// ```
/// use ktxkit_ktx2::Ktx2Texture;
/// use ktxkit_format::Format;
///
/// let mut texture = Ktx2Texture::default();
/// texture.specify_format(Format::R8G8B8A8_UNORM, 4, 4, 3, 1, 0, 1)?;
/// texture.allocate_image_storage()?;
/// texture.set_image(&[0xFF; 64], 0, 0, 0)?;
/// texture.set_image(&[0x80; 16], 1, 0, 0)?;
/// texture.set_image(&[0x00; 4], 2, 0, 0)?;
///
/// let bytes = texture.to_bytes()?;
/// let parsed = Ktx2Texture::from_bytes(&bytes)?;
/// assert_eq!(parsed.image(1, 0, 0)?, &[0x80; 16]);
/// # Ok::<(), ktxkit_ktx2::Error>(())
/// ```
#[derive(Debug)]
pub struct Ktx2Texture {
    caps: Capabilities,
    header: Header,
    section_index: SectionIndex,
    level_index: Option<Vec<LevelIndex>>,
    levels: Option<Vec<Vec<u8>>>,
    dfd: Option<DataFormatDescriptor>,
    kvd: Option<KeyValueData>,
    sgd: Vec<u8>,
    /// One flag per (level, layer, face) image while the texture is being filled.
    written: Vec<bool>,
    state: TextureState,
}

impl Default for Ktx2Texture {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl Ktx2Texture {
    /// Create an empty texture using `caps` for allocation and diagnostics.
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            header: Header::default(),
            section_index: SectionIndex::default(),
            level_index: None,
            levels: None,
            dfd: None,
            kvd: None,
            sgd: Vec::new(),
            written: Vec::new(),
            state: TextureState::Empty,
        }
    }

    /// Read a texture from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::IoReadFail {
            what: "file",
            offset: 0,
            needed: 0,
            source,
        })?;
        let mut texture = Self::default();
        texture.parse(&mut BufReader::new(file))?;
        Ok(texture)
    }

    /// Parse a texture held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut texture = Self::default();
        texture.parse(&mut Cursor::new(data))?;
        Ok(texture)
    }

    /// Serialize into a new buffer.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.serialize(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Serialize to a file, replacing it if it exists.
    pub fn write_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::IoWriteFail { what: "file", source })?;
        let mut writer = BufWriter::new(file);
        self.serialize(&mut writer)?;
        writer
            .flush()
            .map_err(|source| Error::IoWriteFail { what: "file", source })
    }

    // ---- configuration -------------------------------------------------

    /// Configure a new texture, discarding any previous content.
    ///
    /// `level_count` is clamped to the longest mip chain the extent allows;
    /// 0 is kept and means a single level. `height` and `depth` of 0 mean the
    /// dimension is absent. The descriptor is generated from `format` and the
    /// key/value data is reset to its default.
    #[allow(clippy::too_many_arguments)]
    pub fn specify_format(
        &mut self,
        format: Format,
        width: u32,
        height: u32,
        level_count: u32,
        face_count: u32,
        depth: u32,
        layer_count: u32,
    ) -> Result<()> {
        self.clear();

        if width == 0 {
            return Err(Error::InvalidDimensions("width must be non-zero".to_string()));
        }
        if face_count != 1 && face_count != 6 {
            return Err(Error::InvalidDimensions(format!(
                "face count must be 1 or 6, got {}",
                face_count
            )));
        }
        if face_count == 6 && (width != height || depth > 1) {
            return Err(Error::InvalidDimensions(format!(
                "cube map faces must be square and 2D, got {}x{}x{}",
                width, height, depth
            )));
        }

        let max_levels = max_level_count(width, height, depth);
        let levels = if level_count > max_levels {
            diag!(
                self.caps,
                Debug,
                "clamping level count {} to {} for {}x{}x{}",
                level_count,
                max_levels,
                width,
                height,
                depth
            );
            max_levels
        } else {
            level_count
        };

        let header = Header {
            identifier: KTX2_MAGIC,
            vk_format: format,
            type_size: type_size(format),
            pixel_width: width,
            pixel_height: height,
            pixel_depth: depth,
            layer_count,
            face_count,
            level_count: levels,
            supercompression_scheme: SupercompressionScheme::NONE,
        };
        let geometry = Geometry::from_header(&header);
        geometry.validate()?;

        self.header = header;
        self.level_index = Some(
            geometry
                .level_lengths()
                .into_iter()
                .map(|length| LevelIndex {
                    byte_offset: 0,
                    byte_length: length,
                    uncompressed_byte_length: length,
                })
                .collect(),
        );
        self.dfd = Some(DataFormatDescriptor::for_format(format));
        self.kvd = Some(KeyValueData::default());
        self.state = TextureState::Configured;
        Ok(())
    }

    /// Allocate zeroed storage for every mip level.
    pub fn allocate_image_storage(&mut self) -> Result<()> {
        let index = self.level_index.as_ref().ok_or(Error::LevelIndexNotAllocated)?;

        let mut levels = Vec::with_capacity(index.len());
        for entry in index {
            levels.push(self.caps.allocate(entry.byte_length, "mip level")?);
        }

        let slots = image_slots(&self.geometry()?)?;
        let mut written = Vec::new();
        written
            .try_reserve_exact(slots)
            .map_err(|_| Error::AllocationFailed {
                what: "image flags",
                size: slots as u64,
            })?;
        written.resize(slots, false);
        self.written = written;
        self.levels = Some(levels);
        self.state = TextureState::Allocated;
        Ok(())
    }

    /// Copy one image into storage.
    ///
    /// `data` must be exactly one face of `level`, all depth slices included.
    pub fn set_image(&mut self, data: &[u8], level: u32, face: u32, layer: u32) -> Result<()> {
        let geometry = self.geometry()?;
        if geometry.supercompressed {
            return Err(Error::Supercompressed(self.header.supercompression_scheme));
        }
        let levels = self.levels.as_mut().ok_or(Error::MipLevelArrayNotAllocated)?;
        geometry.check_image(level, face, layer)?;

        let expected = geometry.face_byte_size(level);
        if data.len() as u64 != expected {
            return Err(Error::InvalidImageSize {
                expected,
                actual: data.len() as u64,
            });
        }

        let buffer = &mut levels[geometry.file_level(level)?];
        let offset = geometry.face_offset(level, face, layer) as usize;
        buffer[offset..offset + data.len()].copy_from_slice(data);

        let slot = image_slot(&geometry, level, face, layer) as usize;
        if let Some(flag) = self.written.get_mut(slot) {
            *flag = true;
        }
        if self.state == TextureState::Allocated && self.written.iter().all(|&w| w) {
            self.state = TextureState::Populated;
        }
        Ok(())
    }

    // ---- image access --------------------------------------------------

    /// One face of `level`, all depth slices included.
    pub fn image(&self, level: u32, face: u32, layer: u32) -> Result<&[u8]> {
        self.image_expecting(level, face, layer, 0)
    }

    /// Like [`image`](Self::image), but returns `expected_size` bytes from the
    /// image's start when non-zero. Fails if that runs past the level.
    pub fn image_expecting(&self, level: u32, face: u32, layer: u32, expected_size: u64) -> Result<&[u8]> {
        let (file_level, range) = self.image_range(level, face, layer, expected_size)?;
        let levels = self.levels.as_ref().ok_or(Error::MipLevelArrayNotAllocated)?;
        Ok(&levels[file_level][range])
    }

    pub fn image_mut(&mut self, level: u32, face: u32, layer: u32) -> Result<&mut [u8]> {
        let (file_level, range) = self.image_range(level, face, layer, 0)?;
        let levels = self.levels.as_mut().ok_or(Error::MipLevelArrayNotAllocated)?;
        Ok(&mut levels[file_level][range])
    }

    fn image_range(
        &self,
        level: u32,
        face: u32,
        layer: u32,
        expected_size: u64,
    ) -> Result<(usize, std::ops::Range<usize>)> {
        let levels = self.levels.as_ref().ok_or(Error::MipLevelArrayNotAllocated)?;
        let geometry = self.geometry()?;
        geometry.check_image(level, face, layer)?;
        if geometry.supercompressed {
            return Err(Error::Supercompressed(self.header.supercompression_scheme));
        }

        let file_level = geometry.file_level(level)?;
        let level_length = levels[file_level].len() as u64;
        let offset = geometry.face_offset(level, face, layer);
        let length = if expected_size == 0 {
            geometry.face_byte_size(level)
        } else {
            expected_size
        };
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= level_length)
            .ok_or(Error::InvalidImageSize {
                expected: level_length.saturating_sub(offset),
                actual: length,
            })?;
        Ok((file_level, offset as usize..end as usize))
    }

    /// Raw data of `level` as stored, supercompressed or not.
    pub fn level_data(&self, level: u32) -> Result<&[u8]> {
        let levels = self.levels.as_ref().ok_or(Error::MipLevelArrayNotAllocated)?;
        let file_level = self.geometry()?.file_level(level)?;
        Ok(&levels[file_level])
    }

    /// Every image of the texture, located within its level's data.
    ///
    /// BasisLZ textures take their slices from the global data; other
    /// textures must not be supercompressed.
    pub fn image_slices(&self) -> Result<Vec<ImageSlice>> {
        let geometry = self.geometry()?;
        let count = geometry.image_count();
        let mut slices = Vec::new();
        slices
            .try_reserve_exact(count as usize)
            .map_err(|_| Error::AllocationFailed {
                what: "image slices",
                size: count.saturating_mul(std::mem::size_of::<ImageSlice>() as u64),
            })?;

        if self.header.supercompression_scheme == SupercompressionScheme::BASIS_LZ {
            let global = self
                .basis_global_data()?
                .ok_or_else(|| Error::InvalidSgd("BasisLZ texture without global data".to_string()))?;
            let mut images = global.images.iter();
            for (level, layer, face, depth_slice) in image_order(&geometry) {
                let image = images
                    .next()
                    .ok_or_else(|| Error::InvalidSgd("too few image descriptors".to_string()))?;
                slices.push(ImageSlice {
                    level,
                    layer,
                    face,
                    depth_slice,
                    byte_offset: image.rgb_slice_byte_offset as u64,
                    byte_length: image.rgb_slice_byte_length as u64,
                    alpha: image
                        .has_alpha()
                        .then_some((image.alpha_slice_byte_offset as u64, image.alpha_slice_byte_length as u64)),
                    flags: image.image_flags,
                });
            }
            return Ok(slices);
        }

        if geometry.supercompressed {
            return Err(Error::Supercompressed(self.header.supercompression_scheme));
        }
        for (level, layer, face, depth_slice) in image_order(&geometry) {
            let slice_length = geometry.face_byte_size(level) / geometry.depth_slices(level) as u64;
            slices.push(ImageSlice {
                level,
                layer,
                face,
                depth_slice,
                byte_offset: geometry.face_offset(level, face, layer) + slice_length * depth_slice as u64,
                byte_length: slice_length,
                alpha: None,
                flags: 0,
            });
        }
        Ok(slices)
    }

    // ---- parsing -------------------------------------------------------

    /// Read a texture from `reader`, replacing the current content.
    ///
    /// Offsets in the file are taken relative to the reader's position on
    /// entry. On failure the texture is left empty.
    pub fn parse<R: Read + Seek>(&mut self, reader: &mut R) -> Result<()> {
        self.clear();
        match self.parse_inner(reader) {
            Ok(()) => {
                self.state = TextureState::Parsed;
                Ok(())
            }
            Err(error) => {
                diag!(self.caps, Debug, "parse failed: {}", error);
                self.clear();
                Err(error)
            }
        }
    }

    fn parse_inner<R: Read + Seek>(&mut self, reader: &mut R) -> Result<()> {
        let start = io::tell(reader)?;

        let mut header_bytes = [0u8; Header::SIZE];
        io::read_at(reader, start, &mut header_bytes[..KTX2_MAGIC.len()], "identifier")?;
        if header_bytes[..KTX2_MAGIC.len()] != KTX2_MAGIC {
            let mut identifier = [0u8; 12];
            identifier.copy_from_slice(&header_bytes[..KTX2_MAGIC.len()]);
            return Err(Error::InvalidIdentifier(identifier));
        }
        io::read_at(
            reader,
            start + KTX2_MAGIC.len() as u64,
            &mut header_bytes[KTX2_MAGIC.len()..],
            "header",
        )?;
        let header: Header = BinaryReader::new(&header_bytes).read_struct()?;
        validate_header(&header)?;
        let geometry = Geometry::from_header(&header);

        let mut section_bytes = [0u8; SectionIndex::SIZE];
        io::read_at(reader, start + Header::SIZE as u64, &mut section_bytes, "section index")?;
        let section_index: SectionIndex = BinaryReader::new(&section_bytes).read_struct()?;
        validate_section_index(&header, &section_index)?;

        let level_count = geometry.level_count as usize;
        let mut index_bytes = vec![0u8; level_count * LevelIndex::SIZE];
        io::read_at(
            reader,
            start + (Header::SIZE + SectionIndex::SIZE) as u64,
            &mut index_bytes,
            "level index",
        )?;
        let mut index_reader = BinaryReader::new(&index_bytes);
        let mut level_index = Vec::with_capacity(level_count);
        for _ in 0..level_count {
            level_index.push(index_reader.read_struct::<LevelIndex>()?);
        }
        validate_level_index(&header, &geometry, &level_index)?;

        diag!(
            self.caps,
            Debug,
            "parsing {} {}x{}x{}, {} levels, {} faces, {} layers, supercompression {}",
            header.vk_format,
            header.pixel_width,
            header.pixel_height,
            header.pixel_depth,
            geometry.level_count,
            geometry.face_count,
            geometry.layer_count,
            header.supercompression_scheme
        );

        let dfd_bytes = self.read_section(
            reader,
            start,
            section_index.dfd_byte_offset as u64,
            section_index.dfd_byte_length as u64,
            "data format descriptor",
        )?;
        let dfd = DataFormatDescriptor::parse(&dfd_bytes)?;

        let kvd_bytes = self.read_section(
            reader,
            start,
            section_index.kvd_byte_offset as u64,
            section_index.kvd_byte_length as u64,
            "key/value data",
        )?;
        let kvd = KeyValueData::parse(&kvd_bytes)?;

        let sgd = if section_index.sgd_byte_length > 0 {
            self.read_section(
                reader,
                start,
                section_index.sgd_byte_offset,
                section_index.sgd_byte_length,
                "supercompression global data",
            )?
        } else {
            Vec::new()
        };
        if header.supercompression_scheme == SupercompressionScheme::BASIS_LZ {
            BasisLzGlobalData::parse(&sgd, geometry.image_count())?;
        }

        let mut levels = Vec::with_capacity(level_count);
        for (file_level, entry) in level_index.iter().enumerate() {
            let mut buffer = self.caps.allocate(entry.byte_length, "mip level")?;
            io::read_at(reader, start + entry.byte_offset, &mut buffer, "mip level")?;
            diag!(
                self.caps,
                Debug,
                "read level {} ({} bytes at {})",
                geometry.api_level(file_level),
                entry.byte_length,
                entry.byte_offset
            );
            levels.push(buffer);
        }

        self.written = Vec::new();
        self.header = header;
        self.section_index = section_index;
        self.level_index = Some(level_index);
        self.levels = Some(levels);
        self.dfd = Some(dfd);
        self.kvd = Some(kvd);
        self.sgd = sgd;
        Ok(())
    }

    fn read_section<R: Read + Seek>(
        &self,
        reader: &mut R,
        start: u64,
        offset: u64,
        length: u64,
        what: &'static str,
    ) -> Result<Vec<u8>> {
        let mut buffer = self.caps.allocate(length, what)?;
        io::read_at(reader, start + offset, &mut buffer, what)?;
        Ok(buffer)
    }

    // ---- serialization -------------------------------------------------

    /// Compute where every section and level will be written.
    pub fn layout(&self) -> Result<FileLayout> {
        let level_index = self.level_index.as_ref().ok_or(Error::LevelIndexNotAllocated)?;
        let levels = self.levels.as_ref().ok_or(Error::MipLevelArrayNotAllocated)?;
        let dfd = self.dfd.as_ref().ok_or(Error::DfdNotAllocated)?;
        dfd.check_sizes()?;
        let kvd = self
            .kvd
            .as_ref()
            .filter(|kvd| !kvd.is_empty())
            .ok_or(Error::KvdNotAllocated)?;
        let geometry = self.geometry()?;

        let lengths: Vec<(u64, u64)> = levels
            .iter()
            .zip(level_index)
            .map(|(data, entry)| {
                let length = data.len() as u64;
                if geometry.supercompressed {
                    (length, entry.uncompressed_byte_length)
                } else {
                    (length, length)
                }
            })
            .collect();

        Ok(FileLayout::compute(
            &geometry,
            dfd.compute_size(),
            kvd.compute_size(),
            self.sgd.len() as u64,
            &lengths,
        ))
    }

    /// Total size of the serialized file.
    pub fn container_size(&self) -> Result<u64> {
        Ok(self.layout()?.size)
    }

    /// Write the texture to `writer`.
    ///
    /// Section offsets are recomputed and stored back into the header's
    /// indices. Every section is checked to land where the index says it
    /// does; a mismatch aborts with [`Error::WriteOffsetMismatch`].
    pub fn serialize<W: Write + Seek>(&mut self, writer: &mut W) -> Result<()> {
        let layout = self.layout()?;
        self.section_index = layout.section_index;
        self.level_index = Some(layout.level_index.clone());

        self.write_layout(writer, &layout)?;
        self.state = TextureState::Serialized;
        Ok(())
    }

    fn write_layout<W: Write + Seek>(&self, writer: &mut W, layout: &FileLayout) -> Result<()> {
        let (Some(levels), Some(dfd), Some(kvd)) = (&self.levels, &self.dfd, &self.kvd) else {
            return Err(Error::MipLevelArrayNotAllocated);
        };
        let index = &layout.section_index;
        let start = io::tell(writer)?;

        diag!(
            self.caps,
            Debug,
            "writing DFD at {}, KVD at {}, SGD at {} ({} bytes), {} levels, {} bytes total",
            index.dfd_byte_offset,
            index.kvd_byte_offset,
            index.sgd_byte_offset,
            index.sgd_byte_length,
            levels.len(),
            layout.size
        );

        io::write_all(writer, self.header.as_bytes(), "header")?;
        io::expect_position(writer, start, Header::SIZE as u64, "section index")?;
        io::write_all(writer, index.as_bytes(), "section index")?;
        io::write_all(writer, layout.level_index.as_bytes(), "level index")?;

        io::expect_position(writer, start, index.dfd_byte_offset as u64, "data format descriptor")?;
        dfd.write_to(writer).map_err(|source| Error::IoWriteFail {
            what: "data format descriptor",
            source,
        })?;

        io::expect_position(writer, start, index.kvd_byte_offset as u64, "key/value data")?;
        kvd.write_to(writer).map_err(|source| Error::IoWriteFail {
            what: "key/value data",
            source,
        })?;

        let mut position = index.kvd_byte_offset as u64 + index.kvd_byte_length as u64;
        if index.sgd_byte_length > 0 {
            io::write_zeros(writer, index.sgd_byte_offset.saturating_sub(position), "padding")?;
            io::expect_position(writer, start, index.sgd_byte_offset, "supercompression global data")?;
            io::write_all(writer, &self.sgd, "supercompression global data")?;
            position = index.sgd_byte_offset + index.sgd_byte_length;
        }

        for (entry, data) in layout.level_index.iter().zip(levels) {
            io::write_zeros(writer, entry.byte_offset.saturating_sub(position), "padding")?;
            io::expect_position(writer, start, entry.byte_offset, "mip level")?;
            io::write_all(writer, data, "mip level")?;
            position = entry.byte_offset + entry.byte_length;
        }

        io::expect_position(writer, start, layout.size, "end of file")
    }

    // ---- supercompression and transcoding ------------------------------

    /// Supercompress every level with Zstandard or zlib.
    ///
    /// Level byte lengths shrink; uncompressed lengths are kept.
    pub fn supercompress(&mut self, scheme: SupercompressionScheme, level: i32) -> Result<()> {
        let geometry = self.geometry()?;
        if geometry.supercompressed {
            return Err(Error::Supercompressed(self.header.supercompression_scheme));
        }
        if !supercompression::is_supported(scheme) {
            return Err(Error::UnsupportedSupercompression(scheme));
        }
        let levels = self.levels.as_ref().ok_or(Error::MipLevelArrayNotAllocated)?;

        let compressed = levels
            .iter()
            .map(|data| supercompression::compress(scheme, data, level))
            .collect::<Result<Vec<_>>>()?;
        let index = compressed
            .iter()
            .zip(levels)
            .map(|(packed, data)| LevelIndex {
                byte_offset: 0,
                byte_length: packed.len() as u64,
                uncompressed_byte_length: data.len() as u64,
            })
            .collect();

        let before: usize = levels.iter().map(Vec::len).sum();
        let after: usize = compressed.iter().map(Vec::len).sum();
        diag!(self.caps, Debug, "{} supercompression: {} -> {} bytes", scheme, before, after);

        self.levels = Some(compressed);
        self.level_index = Some(index);
        self.header.supercompression_scheme = scheme;
        Ok(())
    }

    /// Store BasisLZ-encoded `levels` (API order) together with their global
    /// data, replacing any level data.
    ///
    /// The texture must have been configured with [`Format::UNDEFINED`].
    /// `global` needs one image descriptor per image, and every slice it
    /// names has to lie within its level.
    pub fn set_basis_lz(&mut self, global: &BasisLzGlobalData, levels: Vec<Vec<u8>>) -> Result<()> {
        let geometry = self.geometry()?;
        if !geometry.format.is_undefined() {
            return Err(Error::InvalidSgd(format!(
                "BasisLZ needs format UNDEFINED, not {}",
                geometry.format
            )));
        }
        if levels.len() != geometry.level_count as usize {
            return Err(Error::InvalidSgd(format!(
                "expected {} levels, got {}",
                geometry.level_count,
                levels.len()
            )));
        }
        if global.images.len() as u64 != geometry.image_count() {
            return Err(Error::InvalidSgd(format!(
                "{} image descriptors for {} images",
                global.images.len(),
                geometry.image_count()
            )));
        }
        for ((level, ..), image) in image_order(&geometry).zip(&global.images) {
            let level_length = levels[level as usize].len() as u64;
            let slices = [
                (image.rgb_slice_byte_offset, image.rgb_slice_byte_length),
                (image.alpha_slice_byte_offset, image.alpha_slice_byte_length),
            ];
            for (offset, length) in slices {
                if offset as u64 + length as u64 > level_length {
                    return Err(Error::InvalidSgd(format!(
                        "slice {}+{} outside level {} of {} bytes",
                        offset, length, level, level_length
                    )));
                }
            }
        }

        let file_order: Vec<Vec<u8>> = levels.into_iter().rev().collect();
        self.level_index = Some(
            file_order
                .iter()
                .map(|data| LevelIndex {
                    byte_offset: 0,
                    byte_length: data.len() as u64,
                    uncompressed_byte_length: 0,
                })
                .collect(),
        );
        self.levels = Some(file_order);
        self.sgd = global.to_bytes();
        self.header.supercompression_scheme = SupercompressionScheme::BASIS_LZ;
        if let Some(block) = self.dfd.as_mut().and_then(|dfd| dfd.blocks_mut().first_mut()) {
            block.header.color_model = ColorModel::ETC1S;
        }
        self.written = Vec::new();
        self.state = TextureState::Populated;

        diag!(self.caps, Debug, "stored BasisLZ data, {} bytes of global data", self.sgd.len());
        Ok(())
    }

    /// Undo Zstandard or zlib supercompression. A no-op when none is applied.
    pub fn inflate(&mut self) -> Result<()> {
        let scheme = self.header.supercompression_scheme;
        if scheme == SupercompressionScheme::NONE {
            return Ok(());
        }
        if !supercompression::is_supported(scheme) {
            return Err(Error::UnsupportedSupercompression(scheme));
        }
        let geometry = self.geometry()?;
        let levels = self.levels.as_ref().ok_or(Error::MipLevelArrayNotAllocated)?;
        let index = self.level_index.as_ref().ok_or(Error::LevelIndexNotAllocated)?;

        let inflated = levels
            .iter()
            .zip(index)
            .map(|(data, entry)| supercompression::decompress(scheme, data, entry.uncompressed_byte_length))
            .collect::<Result<Vec<_>>>()?;

        for (file_level, data) in inflated.iter().enumerate() {
            let expected = geometry.level_byte_length(geometry.api_level(file_level));
            if expected != 0 && data.len() as u64 != expected {
                return Err(Error::InvalidImageSize {
                    expected,
                    actual: data.len() as u64,
                });
            }
        }

        self.level_index = Some(
            inflated
                .iter()
                .map(|data| LevelIndex {
                    byte_offset: 0,
                    byte_length: data.len() as u64,
                    uncompressed_byte_length: data.len() as u64,
                })
                .collect(),
        );
        self.levels = Some(inflated);
        self.header.supercompression_scheme = SupercompressionScheme::NONE;
        Ok(())
    }

    /// Run `transcoder` and store its output as `target`.
    pub fn transcode_with<T: Transcoder + ?Sized>(
        &mut self,
        transcoder: &mut T,
        target: TranscodeFormat,
        srgb: bool,
    ) -> Result<()> {
        let decoded = transcoder.transcode(self, target)?;
        self.apply_transcoded(transcode_to_vk_format(target, srgb), decoded)
    }

    /// Replace all level data with decoded `levels` (API order) of `format`.
    ///
    /// Each level must be exactly the size the geometry gives for `format`.
    /// The header format and type size are updated, supercompression and its
    /// global data are dropped, and the descriptor is regenerated.
    pub fn apply_transcoded(&mut self, format: Format, levels: Vec<Vec<u8>>) -> Result<()> {
        let mut geometry = self.geometry()?;
        geometry.format = format;
        geometry.supercompressed = false;
        geometry.validate()?;

        if levels.len() != geometry.level_count as usize {
            return Err(Error::Transcode(format!(
                "expected {} levels, got {}",
                geometry.level_count,
                levels.len()
            )));
        }
        for (level, data) in levels.iter().enumerate() {
            let expected = geometry.level_byte_length(level as u32);
            if data.len() as u64 != expected {
                return Err(Error::InvalidImageSize {
                    expected,
                    actual: data.len() as u64,
                });
            }
        }

        let file_order: Vec<Vec<u8>> = levels.into_iter().rev().collect();
        self.level_index = Some(
            file_order
                .iter()
                .map(|data| LevelIndex {
                    byte_offset: 0,
                    byte_length: data.len() as u64,
                    uncompressed_byte_length: data.len() as u64,
                })
                .collect(),
        );
        self.levels = Some(file_order);
        self.header.vk_format = format;
        self.header.type_size = type_size(format);
        self.header.supercompression_scheme = SupercompressionScheme::NONE;
        self.sgd.clear();
        self.dfd = Some(DataFormatDescriptor::for_format(format));
        self.written = Vec::new();

        diag!(self.caps, Debug, "transcoded to {}", format);
        Ok(())
    }

    // ---- state and accessors -------------------------------------------

    /// Release everything and return to [`TextureState::Empty`].
    pub fn clear(&mut self) {
        self.header = Header::default();
        self.section_index = SectionIndex::default();
        self.level_index = None;
        self.levels = None;
        self.dfd = None;
        self.kvd = None;
        self.sgd = Vec::new();
        self.written = Vec::new();
        self.state = TextureState::Empty;
    }

    pub fn state(&self) -> TextureState {
        self.state
    }

    /// Shape of the texture. Fails until a format is specified or parsed.
    pub fn geometry(&self) -> Result<Geometry> {
        if self.level_index.is_none() {
            return Err(Error::LevelIndexNotAllocated);
        }
        Ok(Geometry::from_header(&self.header))
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Section index as of the last parse or serialize.
    pub fn section_index(&self) -> &SectionIndex {
        &self.section_index
    }

    /// Level index in file order. Offsets are those of the last parse or serialize.
    pub fn level_index(&self) -> &[LevelIndex] {
        self.level_index.as_deref().unwrap_or(&[])
    }

    pub fn format(&self) -> Format {
        self.header.vk_format
    }

    /// Number of mip levels; 0 before a format is specified or parsed.
    pub fn level_count(&self) -> u32 {
        self.level_index.as_ref().map_or(0, |index| index.len() as u32)
    }

    pub fn face_count(&self) -> u32 {
        self.header.effective_face_count()
    }

    pub fn layer_count(&self) -> u32 {
        self.header.effective_layer_count()
    }

    pub fn is_cubemap(&self) -> bool {
        self.header.face_count == 6
    }

    pub fn is_array(&self) -> bool {
        self.header.layer_count > 0
    }

    pub fn supercompression_scheme(&self) -> SupercompressionScheme {
        self.header.supercompression_scheme
    }

    pub fn dfd(&self) -> Option<&DataFormatDescriptor> {
        self.dfd.as_ref()
    }

    pub fn dfd_mut(&mut self) -> Option<&mut DataFormatDescriptor> {
        self.dfd.as_mut()
    }

    pub fn kvd(&self) -> Option<&KeyValueData> {
        self.kvd.as_ref()
    }

    pub fn kvd_mut(&mut self) -> Option<&mut KeyValueData> {
        self.kvd.as_mut()
    }

    /// Raw supercompression global data; empty when the section is absent.
    pub fn sgd(&self) -> &[u8] {
        &self.sgd
    }

    /// Parsed BasisLZ global data, if this is a BasisLZ texture.
    pub fn basis_global_data(&self) -> Result<Option<BasisLzGlobalData>> {
        if self.header.supercompression_scheme != SupercompressionScheme::BASIS_LZ {
            return Ok(None);
        }
        let geometry = self.geometry()?;
        BasisLzGlobalData::parse(&self.sgd, geometry.image_count()).map(Some)
    }
}

fn validate_header(header: &Header) -> Result<()> {
    if header.pixel_width == 0 {
        return Err(Error::InvalidDimensions("width is zero".to_string()));
    }
    if header.face_count != 1 && header.face_count != 6 {
        return Err(Error::InvalidDimensions(format!(
            "face count {}",
            header.face_count
        )));
    }
    let max_levels = max_level_count(header.pixel_width, header.pixel_height, header.pixel_depth);
    if header.level_count > max_levels {
        return Err(Error::InvalidDimensions(format!(
            "{} levels for a {}x{}x{} texture (at most {})",
            header.level_count, header.pixel_width, header.pixel_height, header.pixel_depth, max_levels
        )));
    }
    Geometry::from_header(header).validate()
}

fn validate_section_index(header: &Header, index: &SectionIndex) -> Result<()> {
    if index.dfd_byte_length < MIN_DFD_LENGTH {
        return Err(Error::InvalidSectionIndex {
            section: "DFD",
            offset: index.dfd_byte_offset as u64,
            length: index.dfd_byte_length as u64,
        });
    }
    if index.kvd_byte_length < MIN_KVD_LENGTH {
        return Err(Error::InvalidSectionIndex {
            section: "KVD",
            offset: index.kvd_byte_offset as u64,
            length: index.kvd_byte_length as u64,
        });
    }
    if index.sgd_byte_length > 0 && index.sgd_byte_offset % 8 != 0 {
        return Err(Error::InvalidSectionIndex {
            section: "SGD",
            offset: index.sgd_byte_offset,
            length: index.sgd_byte_length,
        });
    }
    if header.supercompression_scheme == SupercompressionScheme::BASIS_LZ && index.sgd_byte_length == 0 {
        return Err(Error::InvalidSgd("BasisLZ texture without global data".to_string()));
    }
    Ok(())
}

fn validate_level_index(header: &Header, geometry: &Geometry, index: &[LevelIndex]) -> Result<()> {
    let scheme = header.supercompression_scheme;
    for (file_level, entry) in index.iter().enumerate() {
        let level = geometry.api_level(file_level);
        if entry.byte_offset.checked_add(entry.byte_length).is_none() {
            return Err(Error::InvalidLevelIndexEntry {
                level,
                reason: format!("offset {} + length {} overflows", entry.byte_offset, entry.byte_length),
            });
        }

        let expected = geometry.level_byte_length(level);
        let declared = if scheme == SupercompressionScheme::NONE {
            if entry.uncompressed_byte_length != entry.byte_length {
                return Err(Error::InvalidLevelIndexEntry {
                    level,
                    reason: format!(
                        "uncompressed length {} differs from length {} without supercompression",
                        entry.uncompressed_byte_length, entry.byte_length
                    ),
                });
            }
            entry.byte_length
        } else if scheme == SupercompressionScheme::ZSTANDARD || scheme == SupercompressionScheme::ZLIB {
            entry.uncompressed_byte_length
        } else {
            continue;
        };

        // Formats without a size (e.g. UASTC under UNDEFINED) cannot be checked.
        if expected != 0 && declared != expected {
            return Err(Error::InvalidLevelIndexEntry {
                level,
                reason: format!("length {}, expected {}", declared, expected),
            });
        }
    }
    Ok(())
}

/// Number of (level, layer, face) images.
fn image_slots(geometry: &Geometry) -> Result<usize> {
    (geometry.level_count as u64)
        .checked_mul(geometry.layer_count as u64)
        .and_then(|count| count.checked_mul(geometry.face_count as u64))
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| Error::InvalidDimensions("image count overflows".to_string()))
}

fn image_slot(geometry: &Geometry, level: u32, face: u32, layer: u32) -> u64 {
    ((level as u64) * geometry.layer_count as u64 + layer as u64) * geometry.face_count as u64 + face as u64
}

/// Images in BasisLZ descriptor order: level, layer, face, depth slice.
fn image_order(geometry: &Geometry) -> impl Iterator<Item = (u32, u32, u32, u32)> + '_ {
    (0..geometry.level_count).flat_map(move |level| {
        (0..geometry.layer_count).flat_map(move |layer| {
            (0..geometry.face_count).flat_map(move |face| {
                (0..geometry.depth_slices(level)).map(move |slice| (level, layer, face, slice))
            })
        })
    })
}
