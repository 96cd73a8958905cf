//! Hooks for external Basis Universal transcoders.

use ktxkit_format::TranscodeFormat;

use crate::{Ktx2Texture, Result};

/// A transcoder engine.
///
/// Implementations decode the texture's level data (addressed through
/// [`Ktx2Texture::image_slices`], [`Ktx2Texture::level_data`] and, for
/// BasisLZ, [`Ktx2Texture::basis_global_data`]) into `target` and return one
/// buffer per mip level, API order (index 0 is the full-resolution level).
/// Each buffer holds the level's images laid out as the container stores
/// them: layers outermost, then faces.
pub trait Transcoder {
    fn transcode(&mut self, texture: &Ktx2Texture, target: TranscodeFormat) -> Result<Vec<Vec<u8>>>;
}

impl<F> Transcoder for F
where
    F: FnMut(&Ktx2Texture, TranscodeFormat) -> Result<Vec<Vec<u8>>>,
{
    fn transcode(&mut self, texture: &Ktx2Texture, target: TranscodeFormat) -> Result<Vec<Vec<u8>>> {
        self(texture, target)
    }
}

/// Location of one image (a single depth slice of a face of a layer) inside
/// its level's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSlice {
    pub level: u32,
    pub layer: u32,
    pub face: u32,
    pub depth_slice: u32,
    /// Offset from the start of the level's data.
    pub byte_offset: u64,
    pub byte_length: u64,
    /// Separate alpha slice of a BasisLZ image, as `(offset, length)`.
    pub alpha: Option<(u64, u64)>,
    /// BasisLZ image flags; 0 otherwise.
    pub flags: u32,
}
