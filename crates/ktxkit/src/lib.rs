//! ktxkit - KTX2 texture container library.
//!
//! This crate provides a unified interface to the ktxkit crates.
//!
//! # Crates
//!
//! - [`ktxkit_common`] - Common utilities (binary reading, alignment)
//! - [`ktxkit_format`] - Vulkan format table and transcode targets
//! - [`ktxkit_ktx2`] - KTX2 container parsing, writing and supercompression
//!
//! # Example
//!
//! ```no_run
//! use ktxkit::prelude::*;
//!
//! let mut texture = Ktx2Texture::default();
//! texture.specify_format(Format::R8G8B8A8_SRGB, 256, 256, 9, 1, 0, 1)?;
//! texture.allocate_image_storage()?;
//!
//! for level in 0..texture.level_count() {
//!     let size = texture.geometry()?.face_byte_size(level) as usize;
//!     texture.set_image(&vec![0x7F; size], level, 0, 0)?;
//! }
//!
//! texture.supercompress(SupercompressionScheme::ZSTANDARD, 3)?;
//! texture.write_to_file("gray.ktx2")?;
//! # Ok::<(), ktxkit::ktx2::Error>(())
//! ```

// Re-export all sub-crates
pub use ktxkit_common as common;
pub use ktxkit_format as format;
pub use ktxkit_ktx2 as ktx2;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use ktxkit_common::BinaryReader;
    pub use ktxkit_format::{Format, FormatInfo, TranscodeFormat};
    pub use ktxkit_ktx2::{
        Capabilities, DataFormatDescriptor, Geometry, Ktx2Texture, KeyValueData,
        SupercompressionScheme, TextureState, Transcoder,
    };
}

// Re-export commonly used types at the crate root
pub use ktxkit_ktx2::{Error, Ktx2Texture, Result};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
