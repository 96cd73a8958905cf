//! Khronos Data Format Descriptor (DFD).
//!
//! The DFD section is a `u32` total size followed by one or more descriptor
//! blocks. Each block is a 24-byte header and a run of 16-byte samples, one
//! per contiguous bit range of the texel.

use std::io::Write;
use std::ops::BitOr;

use byteorder::{LittleEndian, WriteBytesExt};
use ktxkit_common::BinaryReader;
use ktxkit_format::{is_float, is_signed, Channel, ChannelLayout, Compression, Format, FormatInfo, Numeric};

use crate::{Error, Result};

/// Descriptor block vendor (17 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VendorId(pub u32);

impl VendorId {
    pub const KHRONOS: Self = Self(0);
}

/// Descriptor block type (15 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DescriptorType(pub u16);

impl DescriptorType {
    pub const BASIC_FORMAT: Self = Self(0);
    pub const ADDITIONAL_PLANES: Self = Self(0x6001);
    pub const ADDITIONAL_DIMENSIONS: Self = Self(0x6002);
}

/// Data Format specification revision a block conforms to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VersionNumber(pub u16);

impl VersionNumber {
    pub const V1_1: Self = Self(0);
    pub const V1_2: Self = Self(1);
    pub const V1_3: Self = Self(2);
    pub const LATEST: Self = Self::V1_3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorModel(pub u8);

impl ColorModel {
    pub const UNSPECIFIED: Self = Self(0);
    pub const RGBSDA: Self = Self(1);
    pub const YUVSDA: Self = Self(2);
    pub const YIQSDA: Self = Self(3);
    pub const LABSDA: Self = Self(4);
    pub const CMYKA: Self = Self(5);
    pub const XYZW: Self = Self(6);
    pub const HSVA_ANG: Self = Self(7);
    pub const HSLA_ANG: Self = Self(8);
    pub const HSVA_HEX: Self = Self(9);
    pub const HSLA_HEX: Self = Self(10);
    pub const YCGCOA: Self = Self(11);
    pub const YCCBCCRC: Self = Self(12);
    pub const ICTCP: Self = Self(13);
    pub const CIEXYZ: Self = Self(14);
    pub const CIEXYY: Self = Self(15);
    pub const BC1A: Self = Self(128);
    pub const BC2: Self = Self(129);
    pub const BC3: Self = Self(130);
    pub const BC4: Self = Self(131);
    pub const BC5: Self = Self(132);
    pub const BC6H: Self = Self(133);
    pub const BC7: Self = Self(134);
    pub const ETC1: Self = Self(160);
    pub const ETC2: Self = Self(161);
    pub const ASTC: Self = Self(162);
    pub const ETC1S: Self = Self(163);
    pub const PVRTC: Self = Self(164);
    pub const PVRTC2: Self = Self(165);

    /// The model describing block-compressed data of `compression`.
    pub const fn for_compression(compression: Compression) -> Self {
        match compression {
            Compression::Bc1 => Self::BC1A,
            Compression::Bc2 => Self::BC2,
            Compression::Bc3 => Self::BC3,
            Compression::Bc4 => Self::BC4,
            Compression::Bc5 => Self::BC5,
            Compression::Bc6h => Self::BC6H,
            Compression::Bc7 => Self::BC7,
            Compression::Etc2 | Compression::Eac => Self::ETC2,
            Compression::Astc => Self::ASTC,
            Compression::Pvrtc => Self::PVRTC,
            Compression::Pvrtc2 => Self::PVRTC2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorPrimaries(pub u8);

impl ColorPrimaries {
    pub const UNSPECIFIED: Self = Self(0);
    pub const BT709: Self = Self(1);
    pub const SRGB: Self = Self::BT709;
    pub const BT601_EBU: Self = Self(2);
    pub const BT601_SMPTE: Self = Self(3);
    pub const BT2020: Self = Self(4);
    pub const CIEXYZ: Self = Self(5);
    pub const ACES: Self = Self(6);
    pub const ACESCC: Self = Self(7);
    pub const NTSC1953: Self = Self(8);
    pub const PAL525: Self = Self(9);
    pub const DISPLAYP3: Self = Self(10);
    pub const ADOBERGB: Self = Self(11);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransferFunction(pub u8);

impl TransferFunction {
    pub const UNSPECIFIED: Self = Self(0);
    pub const LINEAR: Self = Self(1);
    pub const SRGB: Self = Self(2);
    pub const ITU: Self = Self(3);
    pub const NTSC: Self = Self(4);
    pub const SLOG: Self = Self(5);
    pub const SLOG2: Self = Self(6);
    pub const BT1886: Self = Self(7);
    pub const HLG_OETF: Self = Self(8);
    pub const HLG_EOTF: Self = Self(9);
    pub const PQ_EOTF: Self = Self(10);
    pub const PQ_OETF: Self = Self(11);
    pub const DCIP3: Self = Self(12);
    pub const PAL_OETF: Self = Self(13);
    pub const PAL625_EOTF: Self = Self(14);
    pub const ST240: Self = Self(15);
    pub const ACESCC: Self = Self(16);
    pub const ACESCCT: Self = Self(17);
    pub const ADOBERGB: Self = Self(18);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AlphaFlags(pub u8);

impl AlphaFlags {
    pub const STRAIGHT: Self = Self(0);
    pub const PREMULTIPLIED: Self = Self(1);
}

/// Qualifier bits stored in the high nibble of a sample's channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SampleQualifiers(pub u8);

impl SampleQualifiers {
    pub const NONE: Self = Self(0);
    pub const LINEAR: Self = Self(1 << 4);
    pub const EXPONENT: Self = Self(1 << 5);
    pub const SIGNED: Self = Self(1 << 6);
    pub const FLOAT: Self = Self(1 << 7);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SampleQualifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Channel identifiers of the RGBSDA color model.
pub mod channel {
    pub const RED: u8 = 0;
    pub const GREEN: u8 = 1;
    pub const BLUE: u8 = 2;
    pub const STENCIL: u8 = 13;
    pub const DEPTH: u8 = 14;
    pub const ALPHA: u8 = 15;
}

/// The fixed 24-byte header of a descriptor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub vendor_id: VendorId,
    pub descriptor_type: DescriptorType,
    pub version_number: VersionNumber,
    /// Byte size of the block including samples. Recomputed when the block is
    /// appended or serialized.
    pub descriptor_block_size: u16,
    pub color_model: ColorModel,
    pub color_primaries: ColorPrimaries,
    pub transfer_function: TransferFunction,
    pub flags: AlphaFlags,
    /// Texel block extent minus one, per dimension.
    pub texel_block_dimension: [u8; 4],
    pub bytes_plane: [u8; 8],
}

impl BlockHeader {
    pub const SIZE: usize = 24;

    /// Decode the six little-endian words of a block header.
    pub fn from_words(words: [u32; 6]) -> Self {
        let plane_low = words[4].to_le_bytes();
        let plane_high = words[5].to_le_bytes();
        Self {
            vendor_id: VendorId(words[0] & 0x1_FFFF),
            descriptor_type: DescriptorType((words[0] >> 17) as u16),
            version_number: VersionNumber(words[1] as u16),
            descriptor_block_size: (words[1] >> 16) as u16,
            color_model: ColorModel(words[2] as u8),
            color_primaries: ColorPrimaries((words[2] >> 8) as u8),
            transfer_function: TransferFunction((words[2] >> 16) as u8),
            flags: AlphaFlags((words[2] >> 24) as u8),
            texel_block_dimension: words[3].to_le_bytes(),
            bytes_plane: [
                plane_low[0],
                plane_low[1],
                plane_low[2],
                plane_low[3],
                plane_high[0],
                plane_high[1],
                plane_high[2],
                plane_high[3],
            ],
        }
    }

    pub fn to_words(&self) -> [u32; 6] {
        let plane = self.bytes_plane;
        [
            (self.vendor_id.0 & 0x1_FFFF) | ((self.descriptor_type.0 as u32) << 17),
            self.version_number.0 as u32 | ((self.descriptor_block_size as u32) << 16),
            self.color_model.0 as u32
                | (self.color_primaries.0 as u32) << 8
                | (self.transfer_function.0 as u32) << 16
                | (self.flags.0 as u32) << 24,
            u32::from_le_bytes(self.texel_block_dimension),
            u32::from_le_bytes([plane[0], plane[1], plane[2], plane[3]]),
            u32::from_le_bytes([plane[4], plane[5], plane[6], plane[7]]),
        ]
    }

    /// Texel block extent in texels, per dimension.
    pub fn texel_block_extent(&self) -> [u32; 4] {
        self.texel_block_dimension.map(|d| d as u32 + 1)
    }
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            vendor_id: VendorId::KHRONOS,
            descriptor_type: DescriptorType::BASIC_FORMAT,
            version_number: VersionNumber::LATEST,
            descriptor_block_size: Self::SIZE as u16,
            color_model: ColorModel::UNSPECIFIED,
            color_primaries: ColorPrimaries::UNSPECIFIED,
            transfer_function: TransferFunction::LINEAR,
            flags: AlphaFlags::STRAIGHT,
            texel_block_dimension: [0; 4],
            bytes_plane: [0; 8],
        }
    }
}

/// One contiguous bit range of a texel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub bit_offset: u16,
    /// Bit count minus one.
    pub bit_length: u8,
    /// Channel id in the low nibble, [`SampleQualifiers`] in the high nibble.
    pub channel_type: u8,
    pub sample_position: [u8; 4],
    pub lower: u32,
    pub upper: u32,
}

impl Sample {
    pub const SIZE: usize = 16;

    pub fn from_words(words: [u32; 4]) -> Self {
        Self {
            bit_offset: words[0] as u16,
            bit_length: (words[0] >> 16) as u8,
            channel_type: (words[0] >> 24) as u8,
            sample_position: words[1].to_le_bytes(),
            lower: words[2],
            upper: words[3],
        }
    }

    pub fn to_words(&self) -> [u32; 4] {
        [
            self.bit_offset as u32 | (self.bit_length as u32) << 16 | (self.channel_type as u32) << 24,
            u32::from_le_bytes(self.sample_position),
            self.lower,
            self.upper,
        ]
    }

    pub fn channel_id(&self) -> u8 {
        self.channel_type & 0x0F
    }

    pub fn qualifiers(&self) -> SampleQualifiers {
        SampleQualifiers(self.channel_type & 0xF0)
    }

    /// Number of bits covered.
    pub fn bit_count(&self) -> u32 {
        self.bit_length as u32 + 1
    }
}

/// A descriptor block and its samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub samples: Vec<Sample>,
}

impl Block {
    /// Most samples a block can hold with its size in a `u16`.
    pub const MAX_SAMPLES: usize = (u16::MAX as usize - BlockHeader::SIZE) / Sample::SIZE;

    pub fn byte_size(&self) -> usize {
        BlockHeader::SIZE + self.samples.len() * Sample::SIZE
    }

    fn words(&self) -> [u32; 6] {
        let mut header = self.header;
        header.descriptor_block_size = self.byte_size() as u16;
        header.to_words()
    }
}

/// The data format descriptor section: an ordered chain of blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFormatDescriptor {
    blocks: Vec<Block>,
}

impl Default for DataFormatDescriptor {
    /// A single basic block with default fields and no samples.
    fn default() -> Self {
        Self {
            blocks: vec![Block {
                header: BlockHeader::default(),
                samples: Vec::new(),
            }],
        }
    }
}

impl DataFormatDescriptor {
    /// Descriptor with no blocks.
    pub fn empty() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Build a basic descriptor for `format` from the format table.
    ///
    /// Formats without a table entry (including `UNDEFINED`) get the default
    /// descriptor.
    pub fn for_format(format: Format) -> Self {
        let Some(info) = format.info() else {
            return Self::default();
        };

        let mut header = BlockHeader {
            color_model: match info.compression {
                Some(compression) => ColorModel::for_compression(compression),
                None => ColorModel::RGBSDA,
            },
            color_primaries: ColorPrimaries::BT709,
            transfer_function: if info.numeric == Numeric::Srgb {
                TransferFunction::SRGB
            } else {
                TransferFunction::LINEAR
            },
            ..BlockHeader::default()
        };
        if let Some(block) = info.block {
            header.texel_block_dimension = [(block.width - 1) as u8, (block.height - 1) as u8, 0, 0];
        }
        header.bytes_plane[0] = info.byte_size as u8;

        let samples = if info.compression.is_some() {
            vec![compressed_sample(format, &info)]
        } else {
            texel_samples(format, &info)
        };

        let mut dfd = Self::empty();
        dfd.push(header, samples);
        dfd
    }

    /// Append a block at the end of the chain.
    ///
    /// Fails with [`Error::InvalidDfd`] if the block would hold more than
    /// [`Block::MAX_SAMPLES`] samples.
    pub fn append(&mut self, header: BlockHeader, samples: &[Sample]) -> Result<()> {
        if samples.len() > Block::MAX_SAMPLES {
            return Err(Error::InvalidDfd(format!(
                "{} samples in one block, at most {}",
                samples.len(),
                Block::MAX_SAMPLES
            )));
        }
        self.push(header, samples.to_vec());
        Ok(())
    }

    fn push(&mut self, mut header: BlockHeader, samples: Vec<Sample>) {
        header.descriptor_block_size = (BlockHeader::SIZE + samples.len() * Sample::SIZE) as u16;
        self.blocks.push(Block { header, samples });
    }

    /// Check that every block size fits its `u16` field and the whole
    /// descriptor fits `totalSize`. Blocks edited through
    /// [`blocks_mut`](Self::blocks_mut) can break either.
    pub fn check_sizes(&self) -> Result<()> {
        if let Some((index, block)) = self
            .blocks
            .iter()
            .enumerate()
            .find(|(_, block)| block.samples.len() > Block::MAX_SAMPLES)
        {
            return Err(Error::InvalidDfd(format!(
                "block {} has {} samples, at most {}",
                index,
                block.samples.len(),
                Block::MAX_SAMPLES
            )));
        }
        let total = self
            .blocks
            .iter()
            .try_fold(4u64, |total, block| total.checked_add(block.byte_size() as u64))
            .filter(|&total| total <= u32::MAX as u64);
        if total.is_none() {
            return Err(Error::InvalidDfd("descriptor larger than 4 GiB".to_string()));
        }
        Ok(())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// The first Khronos basic format block, if any.
    pub fn basic(&self) -> Option<&Block> {
        self.blocks.iter().find(|block| {
            block.header.vendor_id == VendorId::KHRONOS
                && block.header.descriptor_type == DescriptorType::BASIC_FORMAT
        })
    }

    /// Serialized byte size including the leading `totalSize` word.
    pub fn compute_size(&self) -> u32 {
        let blocks: usize = self.blocks.iter().map(Block::byte_size).sum();
        (4 + blocks) as u32
    }

    /// Parse a complete DFD section.
    ///
    /// `data` must be exactly the section: its leading `totalSize` has to
    /// match `data.len()` and the blocks have to consume it exactly.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let total_size = reader.read_u32().map_err(malformed)?;
        if total_size as usize != data.len() {
            return Err(Error::InvalidDfd(format!(
                "total size {} does not match section length {}",
                total_size,
                data.len()
            )));
        }

        let mut blocks = Vec::new();
        while !reader.is_empty() {
            let words = reader.read_u32_array::<6>().map_err(malformed)?;
            let header = BlockHeader::from_words(words);

            let block_size = header.descriptor_block_size as usize;
            if block_size < BlockHeader::SIZE || (block_size - BlockHeader::SIZE) % Sample::SIZE != 0 {
                return Err(Error::InvalidDfd(format!(
                    "block {} has size {}",
                    blocks.len(),
                    block_size
                )));
            }

            let sample_count = (block_size - BlockHeader::SIZE) / Sample::SIZE;
            let mut samples = Vec::with_capacity(sample_count.min(reader.remaining() / Sample::SIZE));
            for _ in 0..sample_count {
                let words = reader.read_u32_array::<4>().map_err(malformed)?;
                samples.push(Sample::from_words(words));
            }
            blocks.push(Block { header, samples });
        }

        if blocks.is_empty() {
            return Err(Error::InvalidDfd("no descriptor blocks".to_string()));
        }
        Ok(Self { blocks })
    }

    /// Write `totalSize` followed by every block in chain order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.compute_size())?;
        for block in &self.blocks {
            for word in block.words() {
                writer.write_u32::<LittleEndian>(word)?;
            }
            for sample in &block.samples {
                for word in sample.to_words() {
                    writer.write_u32::<LittleEndian>(word)?;
                }
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.compute_size() as usize);
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut bytes);
        bytes
    }
}

fn malformed(error: ktxkit_common::Error) -> Error {
    Error::InvalidDfd(error.to_string())
}

/// Sample bounds for a channel of `bits` bits.
fn sample_range(numeric: Numeric, bits: u32) -> (u32, u32) {
    const ONE: u32 = 0x3F80_0000;
    const MINUS_ONE: u32 = 0xBF80_0000;

    match numeric {
        Numeric::Unorm | Numeric::Srgb => (0, u32::MAX >> 32u32.saturating_sub(bits)),
        Numeric::Snorm => {
            let magnitude = u32::MAX >> 33u32.saturating_sub(bits).min(31);
            ((magnitude as i32).wrapping_neg() as u32, magnitude)
        }
        Numeric::Uint | Numeric::Sint => (0, 1),
        Numeric::Sfloat => (MINUS_ONE, ONE),
        Numeric::Ufloat => (0, ONE),
    }
}

fn component_channel(format: Format, layout: ChannelLayout, position: u32) -> u8 {
    match format {
        Format::D16_UNORM | Format::X8_D24_UNORM_PACK32 | Format::D32_SFLOAT => return channel::DEPTH,
        Format::S8_UINT => return channel::STENCIL,
        _ => {}
    }
    [
        (Channel::Red, channel::RED),
        (Channel::Green, channel::GREEN),
        (Channel::Blue, channel::BLUE),
        (Channel::Alpha, channel::ALPHA),
    ]
    .into_iter()
    .find(|(logical, _)| layout.position(*logical) == Some(position))
    .map(|(_, id)| id)
    .unwrap_or(channel::RED)
}

fn numeric_qualifiers(format: Format) -> SampleQualifiers {
    let mut qualifiers = SampleQualifiers::NONE;
    if is_signed(format) {
        qualifiers = qualifiers | SampleQualifiers::SIGNED;
    }
    if is_float(format) {
        qualifiers = qualifiers | SampleQualifiers::FLOAT;
    }
    qualifiers
}

/// One sample per stored component. Packed formats list components from the
/// most significant bits down; byte formats from the lowest address up.
fn texel_samples(format: Format, info: &FormatInfo) -> Vec<Sample> {
    let components = info.layout.components() as usize;
    let total: u32 = info.bits[..components].iter().map(|&b| b as u32).sum();
    let qualifiers = numeric_qualifiers(format);

    let mut consumed = 0u32;
    let mut samples = Vec::with_capacity(components);
    for position in 0..components {
        let bits = info.bits[position] as u32;
        let bit_offset = if info.packed { total - consumed - bits } else { consumed };
        consumed += bits;

        let exponent = info.layout == ChannelLayout::Ebgr && position == 0;
        let mut channel_qualifiers = qualifiers;
        if exponent {
            channel_qualifiers = channel_qualifiers | SampleQualifiers::EXPONENT;
        }
        let (lower, upper) = sample_range(info.numeric, bits);

        samples.push(Sample {
            bit_offset: bit_offset as u16,
            bit_length: (bits - 1) as u8,
            channel_type: component_channel(format, info.layout, position as u32) | channel_qualifiers.0,
            sample_position: [0; 4],
            lower,
            upper,
        });
    }
    samples
}

fn compressed_sample(format: Format, info: &FormatInfo) -> Sample {
    Sample {
        bit_offset: 0,
        bit_length: (info.byte_size * 8 - 1) as u8,
        channel_type: numeric_qualifiers(format).0,
        sample_position: [0; 4],
        lower: 0,
        upper: u32::MAX,
    }
}
