//! Target formats offered by Basis Universal transcoders.

use crate::Format;

/// A transcoder output format, numbered like libktx's `ktx_transcode_fmt_e`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum TranscodeFormat {
    Etc1Rgb = 0,
    Etc2Rgba = 1,
    Bc1Rgb = 2,
    Bc3Rgba = 3,
    Bc4R = 4,
    Bc5Rg = 5,
    Bc7Rgba = 6,
    Pvrtc1_4Rgb = 8,
    Pvrtc1_4Rgba = 9,
    Astc4x4Rgba = 10,
    Rgba32 = 13,
    Rgb565 = 14,
    Bgr565 = 15,
    Rgba4444 = 16,
    Pvrtc2_4Rgb = 18,
    Pvrtc2_4Rgba = 19,
    Etc2EacR11 = 20,
    Etc2EacRg11 = 21,
}

impl TranscodeFormat {
    pub const ALL: [Self; 18] = [
        Self::Etc1Rgb,
        Self::Etc2Rgba,
        Self::Bc1Rgb,
        Self::Bc3Rgba,
        Self::Bc4R,
        Self::Bc5Rg,
        Self::Bc7Rgba,
        Self::Pvrtc1_4Rgb,
        Self::Pvrtc1_4Rgba,
        Self::Astc4x4Rgba,
        Self::Rgba32,
        Self::Rgb565,
        Self::Bgr565,
        Self::Rgba4444,
        Self::Pvrtc2_4Rgb,
        Self::Pvrtc2_4Rgba,
        Self::Etc2EacR11,
        Self::Etc2EacRg11,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|format| *format as u32 == value)
    }

    /// Whether the output carries an alpha channel.
    pub const fn has_alpha(self) -> bool {
        matches!(
            self,
            Self::Etc2Rgba
                | Self::Bc3Rgba
                | Self::Bc7Rgba
                | Self::Pvrtc1_4Rgba
                | Self::Astc4x4Rgba
                | Self::Rgba32
                | Self::Rgba4444
                | Self::Pvrtc2_4Rgba
        )
    }
}

/// The `vkFormat` a texture carries after transcoding to `format`.
///
/// `srgb` selects the sRGB variant where one exists. Single and dual channel
/// targets and the 16-bit packed targets have none and ignore it.
pub const fn transcode_to_vk_format(format: TranscodeFormat, srgb: bool) -> Format {
    use TranscodeFormat::*;

    let (linear, encoded) = match format {
        // ETC1 is a subset of ETC2 RGB.
        Etc1Rgb => (Format::ETC2_R8G8B8_UNORM_BLOCK, Format::ETC2_R8G8B8_SRGB_BLOCK),
        Etc2Rgba => (Format::ETC2_R8G8B8A8_UNORM_BLOCK, Format::ETC2_R8G8B8A8_SRGB_BLOCK),
        Bc1Rgb => (Format::BC1_RGB_UNORM_BLOCK, Format::BC1_RGB_SRGB_BLOCK),
        Bc3Rgba => (Format::BC3_UNORM_BLOCK, Format::BC3_SRGB_BLOCK),
        Bc4R => (Format::BC4_UNORM_BLOCK, Format::BC4_UNORM_BLOCK),
        Bc5Rg => (Format::BC5_UNORM_BLOCK, Format::BC5_UNORM_BLOCK),
        Bc7Rgba => (Format::BC7_UNORM_BLOCK, Format::BC7_SRGB_BLOCK),
        Pvrtc1_4Rgb | Pvrtc1_4Rgba => (
            Format::PVRTC1_4BPP_UNORM_BLOCK_IMG,
            Format::PVRTC1_4BPP_SRGB_BLOCK_IMG,
        ),
        Astc4x4Rgba => (Format::ASTC_4x4_UNORM_BLOCK, Format::ASTC_4x4_SRGB_BLOCK),
        Rgba32 => (Format::R8G8B8A8_UNORM, Format::R8G8B8A8_SRGB),
        Rgb565 => (Format::R5G6B5_UNORM_PACK16, Format::R5G6B5_UNORM_PACK16),
        Bgr565 => (Format::B5G6R5_UNORM_PACK16, Format::B5G6R5_UNORM_PACK16),
        Rgba4444 => (Format::R4G4B4A4_UNORM_PACK16, Format::R4G4B4A4_UNORM_PACK16),
        Pvrtc2_4Rgb | Pvrtc2_4Rgba => (
            Format::PVRTC2_4BPP_UNORM_BLOCK_IMG,
            Format::PVRTC2_4BPP_SRGB_BLOCK_IMG,
        ),
        Etc2EacR11 => (Format::EAC_R11_UNORM_BLOCK, Format::EAC_R11_UNORM_BLOCK),
        Etc2EacRg11 => (Format::EAC_R11G11_UNORM_BLOCK, Format::EAC_R11G11_UNORM_BLOCK),
    };

    if srgb {
        encoded
    } else {
        linear
    }
}
