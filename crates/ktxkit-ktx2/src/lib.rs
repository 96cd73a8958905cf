//! KTX2 texture container reading and writing.
//!
//! A KTX2 file is laid out as:
//! - a 48-byte header naming the Vulkan format and texture extent,
//! - a section index locating the data format descriptor (DFD), key/value
//!   data (KVD) and optional supercompression global data (SGD),
//! - one level index entry per mip level,
//! - the DFD, KVD and SGD sections,
//! - level data, smallest mip level first.
//!
//! [`Ktx2Texture`] owns all of these. It can be built from scratch with
//! [`Ktx2Texture::specify_format`], read with [`Ktx2Texture::parse`], and
//! written with [`Ktx2Texture::serialize`]. Zstandard and zlib
//! supercompression are handled in-crate; BasisLZ and UASTC payloads are
//! handed to an external [`Transcoder`].
//!
//! # Example
//!
//! ```no_run
//! use ktxkit_ktx2::{Ktx2Texture, SupercompressionScheme};
//!
//! let mut texture = Ktx2Texture::open("albedo.ktx2")?;
//! println!(
//!     "{} {}x{}, {} levels",
//!     texture.format(),
//!     texture.header().pixel_width,
//!     texture.header().pixel_height,
//!     texture.level_count()
//! );
//!
//! texture.inflate()?;
//! let base = texture.image(0, 0, 0)?;
//! println!("base level: {} bytes", base.len());
//!
//! texture.supercompress(SupercompressionScheme::ZSTANDARD, 19)?;
//! texture.write_to_file("albedo.zstd.ktx2")?;
//! # Ok::<(), ktxkit_ktx2::Error>(())
//! ```

mod basis;
pub mod dfd;
mod error;
pub mod geometry;
mod header;
mod io;
pub mod kvd;
mod layout;
pub mod supercompression;
mod texture;
mod transcode;

pub use basis::{BasisLzGlobalData, BasisLzHeader, BasisLzImageDesc};
pub use dfd::DataFormatDescriptor;
pub use error::{Error, Result};
pub use geometry::Geometry;
pub use header::{Header, LevelIndex, SectionIndex, SupercompressionScheme, KTX2_MAGIC};
pub use io::{Allocator, Capabilities, HeapAllocator, LogHook};
pub use kvd::KeyValueData;
pub use layout::{FileLayout, SGD_ALIGNMENT};
pub use texture::{Ktx2Texture, TextureState};
pub use transcode::{ImageSlice, Transcoder};

pub use ktxkit_format::{Format, TranscodeFormat};
