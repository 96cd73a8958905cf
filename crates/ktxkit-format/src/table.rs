//! Pure per-format queries.
//!
//! Every function here is total: an unknown or table-less format yields 0,
//! `false` or `None` instead of an error.

use crate::info::{BlockExtent, Channel, Compression, Numeric};
use crate::Format;

/// Bytes per texel, or per block for block-compressed formats. 0 if unknown.
pub const fn byte_size(format: Format) -> u32 {
    match format.info() {
        Some(info) => info.byte_size,
        None => 0,
    }
}

/// The KTX `typeSize` header field for `format`.
///
/// `UNDEFINED` reports 1, as Basis Universal payloads require.
pub const fn type_size(format: Format) -> u32 {
    if format.is_undefined() {
        return 1;
    }
    match format.info() {
        Some(info) => info.type_size,
        None => 0,
    }
}

/// Block footprint of a block-compressed format.
pub const fn block_extent(format: Format) -> Option<BlockExtent> {
    match format.info() {
        Some(info) => info.block,
        None => None,
    }
}

/// `(block width, block height)` if `format` is block-compressed.
pub const fn is_block_compressed(format: Format) -> Option<(u32, u32)> {
    match block_extent(format) {
        Some(extent) => Some((extent.width, extent.height)),
        None => None,
    }
}

pub const fn is_compressed(format: Format) -> bool {
    block_extent(format).is_some()
}

/// Compression family of a block-compressed format.
pub const fn compression(format: Format) -> Option<Compression> {
    match format.info() {
        Some(info) => info.compression,
        None => None,
    }
}

/// Number of color/alpha channels. A shared exponent is not a channel.
pub const fn channel_count(format: Format) -> u32 {
    match format.info() {
        Some(info) => info.layout.channels(),
        None => 0,
    }
}

/// Bit width of the component at `index`, counted in the order the format
/// name spells them (`A2R10G10B10` has 2 bits at index 0).
///
/// Unused padding bits follow the real components, so the depth of
/// `X8_D24_UNORM_PACK32` is at index 0 and its `X8` at index 1.
///
/// Returns 0 for compressed formats and out-of-range indices.
pub const fn channel_bit_width(format: Format, index: u32) -> u32 {
    match format.info() {
        Some(info) if index < 4 => info.bits[index as usize] as u32,
        _ => 0,
    }
}

/// Storage position of a logical channel within a texel.
pub const fn channel_index(format: Format, channel: Channel) -> Option<u32> {
    match format.info() {
        Some(info) => info.layout.position(channel),
        None => None,
    }
}

const fn numeric(format: Format) -> Option<Numeric> {
    match format.info() {
        Some(info) => Some(info.numeric),
        None => None,
    }
}

pub const fn is_float(format: Format) -> bool {
    matches!(numeric(format), Some(Numeric::Ufloat | Numeric::Sfloat))
}

pub const fn is_signed(format: Format) -> bool {
    matches!(
        numeric(format),
        Some(Numeric::Snorm | Numeric::Sint | Numeric::Sfloat)
    )
}

/// Whether stored integers map onto `[0, 1]` or `[-1, 1]`. sRGB formats count.
pub const fn is_normalized(format: Format) -> bool {
    matches!(
        numeric(format),
        Some(Numeric::Unorm | Numeric::Snorm | Numeric::Srgb)
    )
}

pub const fn is_srgb(format: Format) -> bool {
    matches!(numeric(format), Some(Numeric::Srgb))
}

pub const fn is_packed(format: Format) -> bool {
    match format.info() {
        Some(info) => info.packed,
        None => false,
    }
}

impl Format {
    #[inline]
    pub const fn byte_size(self) -> u32 {
        byte_size(self)
    }

    #[inline]
    pub const fn type_size(self) -> u32 {
        type_size(self)
    }

    #[inline]
    pub const fn block_extent(self) -> Option<BlockExtent> {
        block_extent(self)
    }

    #[inline]
    pub const fn is_compressed(self) -> bool {
        is_compressed(self)
    }

    #[inline]
    pub const fn is_srgb(self) -> bool {
        is_srgb(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Format::R8_UNORM, 1)]
    #[case(Format::R8G8B8_SRGB, 3)]
    #[case(Format::R8G8B8A8_UNORM, 4)]
    #[case(Format::R16G16B16A16_SFLOAT, 8)]
    #[case(Format::R32G32B32_SFLOAT, 12)]
    #[case(Format::R64G64B64A64_SFLOAT, 32)]
    #[case(Format::A2B10G10R10_UNORM_PACK32, 4)]
    #[case(Format::D16_UNORM, 2)]
    #[case(Format::BC1_RGB_UNORM_BLOCK, 8)]
    #[case(Format::BC7_SRGB_BLOCK, 16)]
    #[case(Format::EAC_R11_UNORM_BLOCK, 8)]
    #[case(Format::ASTC_12x12_SRGB_BLOCK, 16)]
    #[case(Format::PVRTC1_2BPP_UNORM_BLOCK_IMG, 8)]
    #[case(Format::UNDEFINED, 0)]
    #[case(Format(11), 0)]
    fn test_byte_size(#[case] format: Format, #[case] expected: u32) {
        assert_eq!(byte_size(format), expected);
    }

    #[rstest]
    #[case(Format::R8G8B8A8_UNORM, 1)]
    #[case(Format::R16G16_SFLOAT, 2)]
    #[case(Format::R5G6B5_UNORM_PACK16, 2)]
    #[case(Format::E5B9G9R9_UFLOAT_PACK32, 4)]
    #[case(Format::BC3_UNORM_BLOCK, 0)]
    #[case(Format::UNDEFINED, 1)]
    fn test_type_size(#[case] format: Format, #[case] expected: u32) {
        assert_eq!(type_size(format), expected);
    }

    #[rstest]
    #[case(Format::BC1_RGBA_SRGB_BLOCK, Some((4, 4)))]
    #[case(Format::ASTC_10x6_UNORM_BLOCK, Some((10, 6)))]
    #[case(Format::PVRTC2_2BPP_SRGB_BLOCK_IMG, Some((8, 4)))]
    #[case(Format::R8G8B8A8_UNORM, None)]
    #[case(Format(9999), None)]
    fn test_block_compressed(#[case] format: Format, #[case] expected: Option<(u32, u32)>) {
        assert_eq!(is_block_compressed(format), expected);
        assert_eq!(is_compressed(format), expected.is_some());
    }

    #[test]
    fn test_channel_bits_follow_name_order() {
        assert_eq!(channel_bit_width(Format::A2R10G10B10_UNORM_PACK32, 0), 2);
        assert_eq!(channel_bit_width(Format::A2R10G10B10_UNORM_PACK32, 1), 10);
        assert_eq!(channel_bit_width(Format::B10G11R11_UFLOAT_PACK32, 0), 10);
        assert_eq!(channel_bit_width(Format::B10G11R11_UFLOAT_PACK32, 2), 11);
        assert_eq!(channel_bit_width(Format::R5G6B5_UNORM_PACK16, 1), 6);
        assert_eq!(channel_bit_width(Format::R5G6B5_UNORM_PACK16, 3), 0);
        assert_eq!(channel_bit_width(Format::R8G8B8A8_UNORM, 7), 0);
        assert_eq!(channel_bit_width(Format::BC7_UNORM_BLOCK, 0), 0);
        assert_eq!(channel_bit_width(Format::X8_D24_UNORM_PACK32, 0), 24);
        assert_eq!(channel_bit_width(Format::X8_D24_UNORM_PACK32, 1), 8);
        assert_eq!(channel_count(Format::X8_D24_UNORM_PACK32), 1);
    }

    #[test]
    fn test_channel_count() {
        assert_eq!(channel_count(Format::R8_UNORM), 1);
        assert_eq!(channel_count(Format::B8G8R8_SRGB), 3);
        assert_eq!(channel_count(Format::E5B9G9R9_UFLOAT_PACK32), 3);
        assert_eq!(channel_count(Format::BC5_UNORM_BLOCK), 2);
        assert_eq!(channel_count(Format::UNDEFINED), 0);
    }

    #[test]
    fn test_channel_index() {
        assert_eq!(channel_index(Format::B8G8R8A8_UNORM, Channel::Red), Some(2));
        assert_eq!(channel_index(Format::B8G8R8A8_UNORM, Channel::Blue), Some(0));
        assert_eq!(
            channel_index(Format::A2R10G10B10_UNORM_PACK32, Channel::Blue),
            Some(3)
        );
        assert_eq!(channel_index(Format::R8G8_UNORM, Channel::Alpha), None);
    }

    #[rstest]
    #[case(Format::R8G8B8A8_UNORM, false, false, true, false)]
    #[case(Format::R8G8B8A8_SNORM, false, true, true, false)]
    #[case(Format::R8G8B8A8_SRGB, false, false, true, true)]
    #[case(Format::R32_SINT, false, true, false, false)]
    #[case(Format::A2B10G10R10_UINT_PACK32, false, false, false, false)]
    #[case(Format::R16_SFLOAT, true, true, false, false)]
    #[case(Format::B10G11R11_UFLOAT_PACK32, true, false, false, false)]
    #[case(Format::BC6H_SFLOAT_BLOCK, true, true, false, false)]
    #[case(Format(9999), false, false, false, false)]
    fn test_numeric_flags(
        #[case] format: Format,
        #[case] float: bool,
        #[case] signed: bool,
        #[case] normalized: bool,
        #[case] srgb: bool,
    ) {
        assert_eq!(is_float(format), float);
        assert_eq!(is_signed(format), signed);
        assert_eq!(is_normalized(format), normalized);
        assert_eq!(is_srgb(format), srgb);
    }

    #[test]
    fn test_packed() {
        assert!(is_packed(Format::R4G4_UNORM_PACK8));
        assert!(is_packed(Format::A8B8G8R8_SRGB_PACK32));
        assert!(!is_packed(Format::R8G8B8A8_UNORM));
        assert!(!is_packed(Format::BC1_RGB_UNORM_BLOCK));
    }
}
