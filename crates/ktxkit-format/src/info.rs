//! Static per-format metadata.
//!
//! [`Format::info`] is the single lookup every query in [`crate::table`] is
//! derived from. Formats without an entry (unknown enumerants, scaled formats
//! KTX2 prohibits, `UNDEFINED`) return `None`.

use crate::Format;

/// Logical color channel, used to locate a channel within a texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

/// Order of the components of a texel, as spelled by the format name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    R,
    Rg,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
    Argb,
    Abgr,
    /// Shared exponent followed by blue, green, red.
    Ebgr,
}

impl ChannelLayout {
    /// Number of stored components, including a shared exponent.
    pub const fn components(self) -> u32 {
        match self {
            Self::R => 1,
            Self::Rg => 2,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra | Self::Argb | Self::Abgr | Self::Ebgr => 4,
        }
    }

    /// Number of color/alpha channels.
    pub const fn channels(self) -> u32 {
        match self {
            Self::Ebgr => 3,
            other => other.components(),
        }
    }

    /// Storage position of `channel`, or `None` if the layout lacks it.
    pub const fn position(self, channel: Channel) -> Option<u32> {
        use Channel::*;
        match (self, channel) {
            (Self::R, Red) => Some(0),
            (Self::Rg, Red) => Some(0),
            (Self::Rg, Green) => Some(1),
            (Self::Rgb | Self::Rgba, Red) => Some(0),
            (Self::Rgb | Self::Rgba, Green) => Some(1),
            (Self::Rgb | Self::Rgba, Blue) => Some(2),
            (Self::Rgba, Alpha) => Some(3),
            (Self::Bgr | Self::Bgra, Blue) => Some(0),
            (Self::Bgr | Self::Bgra, Green) => Some(1),
            (Self::Bgr | Self::Bgra, Red) => Some(2),
            (Self::Bgra, Alpha) => Some(3),
            (Self::Argb, Alpha) => Some(0),
            (Self::Argb, Red) => Some(1),
            (Self::Argb, Green) => Some(2),
            (Self::Argb, Blue) => Some(3),
            (Self::Abgr, Alpha) => Some(0),
            (Self::Abgr | Self::Ebgr, Blue) => Some(1),
            (Self::Abgr | Self::Ebgr, Green) => Some(2),
            (Self::Abgr | Self::Ebgr, Red) => Some(3),
            _ => None,
        }
    }
}

/// Numeric interpretation of the stored channel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Numeric {
    Unorm,
    Snorm,
    Uint,
    Sint,
    Ufloat,
    Sfloat,
    Srgb,
}

/// Block compression family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    Bc1,
    Bc2,
    Bc3,
    Bc4,
    Bc5,
    Bc6h,
    Bc7,
    Etc2,
    Eac,
    Astc,
    Pvrtc,
    Pvrtc2,
}

/// Texel block footprint of a block-compressed format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockExtent {
    pub width: u32,
    pub height: u32,
}

/// Static description of a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Bytes per texel, or per block for compressed formats.
    pub byte_size: u32,
    /// KTX `typeSize`: bytes per channel, the packed word size for packed
    /// formats, 0 for block-compressed formats.
    pub type_size: u32,
    pub layout: ChannelLayout,
    /// Bit width of each stored component in name order; zero past the last
    /// component and for compressed formats.
    pub bits: [u8; 4],
    pub numeric: Numeric,
    pub packed: bool,
    pub compression: Option<Compression>,
    pub block: Option<BlockExtent>,
}

const fn plain(layout: ChannelLayout, bits: u8, numeric: Numeric) -> FormatInfo {
    let components = layout.components();
    let mut widths = [0u8; 4];
    let mut i = 0;
    while i < components as usize {
        widths[i] = bits;
        i += 1;
    }
    FormatInfo {
        byte_size: components * bits as u32 / 8,
        type_size: bits as u32 / 8,
        layout,
        bits: widths,
        numeric,
        packed: false,
        compression: None,
        block: None,
    }
}

const fn packed(layout: ChannelLayout, bits: [u8; 4], numeric: Numeric) -> FormatInfo {
    let total = bits[0] as u32 + bits[1] as u32 + bits[2] as u32 + bits[3] as u32;
    FormatInfo {
        byte_size: total / 8,
        type_size: total / 8,
        layout,
        bits,
        numeric,
        packed: true,
        compression: None,
        block: None,
    }
}

const fn block(
    compression: Compression,
    layout: ChannelLayout,
    width: u32,
    height: u32,
    byte_size: u32,
    numeric: Numeric,
) -> FormatInfo {
    FormatInfo {
        byte_size,
        type_size: 0,
        layout,
        bits: [0; 4],
        numeric,
        packed: false,
        compression: Some(compression),
        block: Some(BlockExtent { width, height }),
    }
}

impl Format {
    /// Look up the static description of this format.
    pub const fn info(self) -> Option<FormatInfo> {
        use ChannelLayout::*;
        use Compression::*;
        use Numeric::*;

        let info = match self {
            Self::R4G4_UNORM_PACK8 => packed(Rg, [4, 4, 0, 0], Unorm),
            Self::R4G4B4A4_UNORM_PACK16 => packed(Rgba, [4, 4, 4, 4], Unorm),
            Self::B4G4R4A4_UNORM_PACK16 => packed(Bgra, [4, 4, 4, 4], Unorm),
            Self::R5G6B5_UNORM_PACK16 => packed(Rgb, [5, 6, 5, 0], Unorm),
            Self::B5G6R5_UNORM_PACK16 => packed(Bgr, [5, 6, 5, 0], Unorm),
            Self::R5G5B5A1_UNORM_PACK16 => packed(Rgba, [5, 5, 5, 1], Unorm),
            Self::B5G5R5A1_UNORM_PACK16 => packed(Bgra, [5, 5, 5, 1], Unorm),
            Self::A1R5G5B5_UNORM_PACK16 => packed(Argb, [1, 5, 5, 5], Unorm),

            Self::R8_UNORM => plain(R, 8, Unorm),
            Self::R8_SNORM => plain(R, 8, Snorm),
            Self::R8_UINT => plain(R, 8, Uint),
            Self::R8_SINT => plain(R, 8, Sint),
            Self::R8_SRGB => plain(R, 8, Srgb),
            Self::R8G8_UNORM => plain(Rg, 8, Unorm),
            Self::R8G8_SNORM => plain(Rg, 8, Snorm),
            Self::R8G8_UINT => plain(Rg, 8, Uint),
            Self::R8G8_SINT => plain(Rg, 8, Sint),
            Self::R8G8_SRGB => plain(Rg, 8, Srgb),
            Self::R8G8B8_UNORM => plain(Rgb, 8, Unorm),
            Self::R8G8B8_SNORM => plain(Rgb, 8, Snorm),
            Self::R8G8B8_UINT => plain(Rgb, 8, Uint),
            Self::R8G8B8_SINT => plain(Rgb, 8, Sint),
            Self::R8G8B8_SRGB => plain(Rgb, 8, Srgb),
            Self::B8G8R8_UNORM => plain(Bgr, 8, Unorm),
            Self::B8G8R8_SNORM => plain(Bgr, 8, Snorm),
            Self::B8G8R8_UINT => plain(Bgr, 8, Uint),
            Self::B8G8R8_SINT => plain(Bgr, 8, Sint),
            Self::B8G8R8_SRGB => plain(Bgr, 8, Srgb),
            Self::R8G8B8A8_UNORM => plain(Rgba, 8, Unorm),
            Self::R8G8B8A8_SNORM => plain(Rgba, 8, Snorm),
            Self::R8G8B8A8_UINT => plain(Rgba, 8, Uint),
            Self::R8G8B8A8_SINT => plain(Rgba, 8, Sint),
            Self::R8G8B8A8_SRGB => plain(Rgba, 8, Srgb),
            Self::B8G8R8A8_UNORM => plain(Bgra, 8, Unorm),
            Self::B8G8R8A8_SNORM => plain(Bgra, 8, Snorm),
            Self::B8G8R8A8_UINT => plain(Bgra, 8, Uint),
            Self::B8G8R8A8_SINT => plain(Bgra, 8, Sint),
            Self::B8G8R8A8_SRGB => plain(Bgra, 8, Srgb),

            Self::A8B8G8R8_UNORM_PACK32 => packed(Abgr, [8, 8, 8, 8], Unorm),
            Self::A8B8G8R8_SNORM_PACK32 => packed(Abgr, [8, 8, 8, 8], Snorm),
            Self::A8B8G8R8_UINT_PACK32 => packed(Abgr, [8, 8, 8, 8], Uint),
            Self::A8B8G8R8_SINT_PACK32 => packed(Abgr, [8, 8, 8, 8], Sint),
            Self::A8B8G8R8_SRGB_PACK32 => packed(Abgr, [8, 8, 8, 8], Srgb),
            Self::A2R10G10B10_UNORM_PACK32 => packed(Argb, [2, 10, 10, 10], Unorm),
            Self::A2R10G10B10_SNORM_PACK32 => packed(Argb, [2, 10, 10, 10], Snorm),
            Self::A2R10G10B10_UINT_PACK32 => packed(Argb, [2, 10, 10, 10], Uint),
            Self::A2R10G10B10_SINT_PACK32 => packed(Argb, [2, 10, 10, 10], Sint),
            Self::A2B10G10R10_UNORM_PACK32 => packed(Abgr, [2, 10, 10, 10], Unorm),
            Self::A2B10G10R10_SNORM_PACK32 => packed(Abgr, [2, 10, 10, 10], Snorm),
            Self::A2B10G10R10_UINT_PACK32 => packed(Abgr, [2, 10, 10, 10], Uint),
            Self::A2B10G10R10_SINT_PACK32 => packed(Abgr, [2, 10, 10, 10], Sint),

            Self::R16_UNORM => plain(R, 16, Unorm),
            Self::R16_SNORM => plain(R, 16, Snorm),
            Self::R16_UINT => plain(R, 16, Uint),
            Self::R16_SINT => plain(R, 16, Sint),
            Self::R16_SFLOAT => plain(R, 16, Sfloat),
            Self::R16G16_UNORM => plain(Rg, 16, Unorm),
            Self::R16G16_SNORM => plain(Rg, 16, Snorm),
            Self::R16G16_UINT => plain(Rg, 16, Uint),
            Self::R16G16_SINT => plain(Rg, 16, Sint),
            Self::R16G16_SFLOAT => plain(Rg, 16, Sfloat),
            Self::R16G16B16_UNORM => plain(Rgb, 16, Unorm),
            Self::R16G16B16_SNORM => plain(Rgb, 16, Snorm),
            Self::R16G16B16_UINT => plain(Rgb, 16, Uint),
            Self::R16G16B16_SINT => plain(Rgb, 16, Sint),
            Self::R16G16B16_SFLOAT => plain(Rgb, 16, Sfloat),
            Self::R16G16B16A16_UNORM => plain(Rgba, 16, Unorm),
            Self::R16G16B16A16_SNORM => plain(Rgba, 16, Snorm),
            Self::R16G16B16A16_UINT => plain(Rgba, 16, Uint),
            Self::R16G16B16A16_SINT => plain(Rgba, 16, Sint),
            Self::R16G16B16A16_SFLOAT => plain(Rgba, 16, Sfloat),

            Self::R32_UINT => plain(R, 32, Uint),
            Self::R32_SINT => plain(R, 32, Sint),
            Self::R32_SFLOAT => plain(R, 32, Sfloat),
            Self::R32G32_UINT => plain(Rg, 32, Uint),
            Self::R32G32_SINT => plain(Rg, 32, Sint),
            Self::R32G32_SFLOAT => plain(Rg, 32, Sfloat),
            Self::R32G32B32_UINT => plain(Rgb, 32, Uint),
            Self::R32G32B32_SINT => plain(Rgb, 32, Sint),
            Self::R32G32B32_SFLOAT => plain(Rgb, 32, Sfloat),
            Self::R32G32B32A32_UINT => plain(Rgba, 32, Uint),
            Self::R32G32B32A32_SINT => plain(Rgba, 32, Sint),
            Self::R32G32B32A32_SFLOAT => plain(Rgba, 32, Sfloat),

            Self::R64_UINT => plain(R, 64, Uint),
            Self::R64_SINT => plain(R, 64, Sint),
            Self::R64_SFLOAT => plain(R, 64, Sfloat),
            Self::R64G64_UINT => plain(Rg, 64, Uint),
            Self::R64G64_SINT => plain(Rg, 64, Sint),
            Self::R64G64_SFLOAT => plain(Rg, 64, Sfloat),
            Self::R64G64B64_UINT => plain(Rgb, 64, Uint),
            Self::R64G64B64_SINT => plain(Rgb, 64, Sint),
            Self::R64G64B64_SFLOAT => plain(Rgb, 64, Sfloat),
            Self::R64G64B64A64_UINT => plain(Rgba, 64, Uint),
            Self::R64G64B64A64_SINT => plain(Rgba, 64, Sint),
            Self::R64G64B64A64_SFLOAT => plain(Rgba, 64, Sfloat),

            Self::B10G11R11_UFLOAT_PACK32 => packed(Bgr, [10, 11, 11, 0], Ufloat),
            Self::E5B9G9R9_UFLOAT_PACK32 => packed(Ebgr, [5, 9, 9, 9], Ufloat),

            // Depth and stencil occupy the first component.
            Self::D16_UNORM => plain(R, 16, Unorm),
            // Padding after the depth bits.
            Self::X8_D24_UNORM_PACK32 => packed(R, [24, 8, 0, 0], Unorm),
            Self::D32_SFLOAT => plain(R, 32, Sfloat),
            Self::S8_UINT => plain(R, 8, Uint),

            Self::BC1_RGB_UNORM_BLOCK => block(Bc1, Rgb, 4, 4, 8, Unorm),
            Self::BC1_RGB_SRGB_BLOCK => block(Bc1, Rgb, 4, 4, 8, Srgb),
            Self::BC1_RGBA_UNORM_BLOCK => block(Bc1, Rgba, 4, 4, 8, Unorm),
            Self::BC1_RGBA_SRGB_BLOCK => block(Bc1, Rgba, 4, 4, 8, Srgb),
            Self::BC2_UNORM_BLOCK => block(Bc2, Rgba, 4, 4, 16, Unorm),
            Self::BC2_SRGB_BLOCK => block(Bc2, Rgba, 4, 4, 16, Srgb),
            Self::BC3_UNORM_BLOCK => block(Bc3, Rgba, 4, 4, 16, Unorm),
            Self::BC3_SRGB_BLOCK => block(Bc3, Rgba, 4, 4, 16, Srgb),
            Self::BC4_UNORM_BLOCK => block(Bc4, R, 4, 4, 8, Unorm),
            Self::BC4_SNORM_BLOCK => block(Bc4, R, 4, 4, 8, Snorm),
            Self::BC5_UNORM_BLOCK => block(Bc5, Rg, 4, 4, 16, Unorm),
            Self::BC5_SNORM_BLOCK => block(Bc5, Rg, 4, 4, 16, Snorm),
            Self::BC6H_UFLOAT_BLOCK => block(Bc6h, Rgb, 4, 4, 16, Ufloat),
            Self::BC6H_SFLOAT_BLOCK => block(Bc6h, Rgb, 4, 4, 16, Sfloat),
            Self::BC7_UNORM_BLOCK => block(Bc7, Rgba, 4, 4, 16, Unorm),
            Self::BC7_SRGB_BLOCK => block(Bc7, Rgba, 4, 4, 16, Srgb),

            Self::ETC2_R8G8B8_UNORM_BLOCK => block(Etc2, Rgb, 4, 4, 8, Unorm),
            Self::ETC2_R8G8B8_SRGB_BLOCK => block(Etc2, Rgb, 4, 4, 8, Srgb),
            Self::ETC2_R8G8B8A1_UNORM_BLOCK => block(Etc2, Rgba, 4, 4, 8, Unorm),
            Self::ETC2_R8G8B8A1_SRGB_BLOCK => block(Etc2, Rgba, 4, 4, 8, Srgb),
            Self::ETC2_R8G8B8A8_UNORM_BLOCK => block(Etc2, Rgba, 4, 4, 16, Unorm),
            Self::ETC2_R8G8B8A8_SRGB_BLOCK => block(Etc2, Rgba, 4, 4, 16, Srgb),
            Self::EAC_R11_UNORM_BLOCK => block(Eac, R, 4, 4, 8, Unorm),
            Self::EAC_R11_SNORM_BLOCK => block(Eac, R, 4, 4, 8, Snorm),
            Self::EAC_R11G11_UNORM_BLOCK => block(Eac, Rg, 4, 4, 16, Unorm),
            Self::EAC_R11G11_SNORM_BLOCK => block(Eac, Rg, 4, 4, 16, Snorm),

            Self::ASTC_4x4_UNORM_BLOCK => block(Astc, Rgba, 4, 4, 16, Unorm),
            Self::ASTC_4x4_SRGB_BLOCK => block(Astc, Rgba, 4, 4, 16, Srgb),
            Self::ASTC_5x4_UNORM_BLOCK => block(Astc, Rgba, 5, 4, 16, Unorm),
            Self::ASTC_5x4_SRGB_BLOCK => block(Astc, Rgba, 5, 4, 16, Srgb),
            Self::ASTC_5x5_UNORM_BLOCK => block(Astc, Rgba, 5, 5, 16, Unorm),
            Self::ASTC_5x5_SRGB_BLOCK => block(Astc, Rgba, 5, 5, 16, Srgb),
            Self::ASTC_6x5_UNORM_BLOCK => block(Astc, Rgba, 6, 5, 16, Unorm),
            Self::ASTC_6x5_SRGB_BLOCK => block(Astc, Rgba, 6, 5, 16, Srgb),
            Self::ASTC_6x6_UNORM_BLOCK => block(Astc, Rgba, 6, 6, 16, Unorm),
            Self::ASTC_6x6_SRGB_BLOCK => block(Astc, Rgba, 6, 6, 16, Srgb),
            Self::ASTC_8x5_UNORM_BLOCK => block(Astc, Rgba, 8, 5, 16, Unorm),
            Self::ASTC_8x5_SRGB_BLOCK => block(Astc, Rgba, 8, 5, 16, Srgb),
            Self::ASTC_8x6_UNORM_BLOCK => block(Astc, Rgba, 8, 6, 16, Unorm),
            Self::ASTC_8x6_SRGB_BLOCK => block(Astc, Rgba, 8, 6, 16, Srgb),
            Self::ASTC_8x8_UNORM_BLOCK => block(Astc, Rgba, 8, 8, 16, Unorm),
            Self::ASTC_8x8_SRGB_BLOCK => block(Astc, Rgba, 8, 8, 16, Srgb),
            Self::ASTC_10x5_UNORM_BLOCK => block(Astc, Rgba, 10, 5, 16, Unorm),
            Self::ASTC_10x5_SRGB_BLOCK => block(Astc, Rgba, 10, 5, 16, Srgb),
            Self::ASTC_10x6_UNORM_BLOCK => block(Astc, Rgba, 10, 6, 16, Unorm),
            Self::ASTC_10x6_SRGB_BLOCK => block(Astc, Rgba, 10, 6, 16, Srgb),
            Self::ASTC_10x8_UNORM_BLOCK => block(Astc, Rgba, 10, 8, 16, Unorm),
            Self::ASTC_10x8_SRGB_BLOCK => block(Astc, Rgba, 10, 8, 16, Srgb),
            Self::ASTC_10x10_UNORM_BLOCK => block(Astc, Rgba, 10, 10, 16, Unorm),
            Self::ASTC_10x10_SRGB_BLOCK => block(Astc, Rgba, 10, 10, 16, Srgb),
            Self::ASTC_12x10_UNORM_BLOCK => block(Astc, Rgba, 12, 10, 16, Unorm),
            Self::ASTC_12x10_SRGB_BLOCK => block(Astc, Rgba, 12, 10, 16, Srgb),
            Self::ASTC_12x12_UNORM_BLOCK => block(Astc, Rgba, 12, 12, 16, Unorm),
            Self::ASTC_12x12_SRGB_BLOCK => block(Astc, Rgba, 12, 12, 16, Srgb),

            Self::PVRTC1_2BPP_UNORM_BLOCK_IMG => block(Pvrtc, Rgba, 8, 4, 8, Unorm),
            Self::PVRTC1_4BPP_UNORM_BLOCK_IMG => block(Pvrtc, Rgba, 4, 4, 8, Unorm),
            Self::PVRTC2_2BPP_UNORM_BLOCK_IMG => block(Pvrtc2, Rgba, 8, 4, 8, Unorm),
            Self::PVRTC2_4BPP_UNORM_BLOCK_IMG => block(Pvrtc2, Rgba, 4, 4, 8, Unorm),
            Self::PVRTC1_2BPP_SRGB_BLOCK_IMG => block(Pvrtc, Rgba, 8, 4, 8, Srgb),
            Self::PVRTC1_4BPP_SRGB_BLOCK_IMG => block(Pvrtc, Rgba, 4, 4, 8, Srgb),
            Self::PVRTC2_2BPP_SRGB_BLOCK_IMG => block(Pvrtc2, Rgba, 8, 4, 8, Srgb),
            Self::PVRTC2_4BPP_SRGB_BLOCK_IMG => block(Pvrtc2, Rgba, 4, 4, 8, Srgb),

            _ => return None,
        };

        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_named_format_with_info_has_a_size() {
        for value in 0u32..=200 {
            let format = Format(value);
            if let Some(info) = format.info() {
                assert!(info.byte_size > 0, "{:?}", format);
                assert!(format.name().is_some(), "{:?}", format);
            }
        }
    }

    #[test]
    fn test_layout_positions() {
        assert_eq!(ChannelLayout::Bgra.position(Channel::Red), Some(2));
        assert_eq!(ChannelLayout::Abgr.position(Channel::Red), Some(3));
        assert_eq!(ChannelLayout::Argb.position(Channel::Alpha), Some(0));
        assert_eq!(ChannelLayout::Rg.position(Channel::Blue), None);
        assert_eq!(ChannelLayout::Ebgr.position(Channel::Alpha), None);
        assert_eq!(ChannelLayout::Ebgr.channels(), 3);
    }

    #[test]
    fn test_packed_sizes() {
        assert_eq!(Format::R4G4_UNORM_PACK8.info().unwrap().byte_size, 1);
        assert_eq!(Format::R5G6B5_UNORM_PACK16.info().unwrap().byte_size, 2);
        assert_eq!(Format::E5B9G9R9_UFLOAT_PACK32.info().unwrap().byte_size, 4);
        assert_eq!(Format::X8_D24_UNORM_PACK32.info().unwrap().type_size, 4);
    }
}
