//! Vulkan pixel format metadata for KTX2 textures.
//!
//! KTX2 identifies texel formats by their `VkFormat` enumerant. This crate
//! provides:
//! - [`Format`] - an open newtype over the enumerant with named constants
//! - [`FormatInfo`] - static per-format layout (texel/block size, channel
//!   order and widths, numeric class, block footprint)
//! - pure queries over that table ([`byte_size`], [`channel_count`],
//!   [`is_block_compressed`], ...), total over every `u32`
//! - [`TranscodeFormat`] - Basis Universal transcoder targets
//!
//! # Example
//!
//! ```
//! use ktxkit_format::{byte_size, is_block_compressed, Format};
//!
//! assert_eq!(byte_size(Format::R8G8B8A8_UNORM), 4);
//! assert_eq!(is_block_compressed(Format::ASTC_6x5_SRGB_BLOCK), Some((6, 5)));
//! assert_eq!(byte_size(Format(11)), 0); // scaled formats are not KTX2 formats
//! ```

mod format;
mod info;
mod table;
mod transcode;

pub use format::Format;
pub use info::{BlockExtent, Channel, ChannelLayout, Compression, FormatInfo, Numeric};
pub use table::{
    block_extent, byte_size, channel_bit_width, channel_count, channel_index, compression,
    is_block_compressed, is_compressed, is_float, is_normalized, is_packed, is_signed, is_srgb,
    type_size,
};
pub use transcode::{transcode_to_vk_format, TranscodeFormat};
