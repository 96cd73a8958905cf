//! Zstandard and zlib supercompression of level data.
//!
//! Each codec is behind a cargo feature (`zstd`, `zlib`, both on by default).
//! A scheme without a compiled codec fails with
//! [`Error::UnsupportedSupercompression`]. BasisLZ is never handled here: its
//! payload can only be decoded by a transcoder.

use crate::{Error, Result, SupercompressionScheme};

/// Default level used by [`crate::Ktx2Texture::supercompress`] callers that
/// have no preference.
pub const DEFAULT_LEVEL: i32 = 3;

/// Whether `scheme` can be compressed and decompressed by this build.
pub fn is_supported(scheme: SupercompressionScheme) -> bool {
    match scheme {
        SupercompressionScheme::ZSTANDARD => cfg!(feature = "zstd"),
        SupercompressionScheme::ZLIB => cfg!(feature = "zlib"),
        _ => false,
    }
}

/// Compress one level's data.
///
/// `level` is the codec's compression level; zlib clamps it to `0..=9`.
pub fn compress(scheme: SupercompressionScheme, data: &[u8], level: i32) -> Result<Vec<u8>> {
    match scheme {
        #[cfg(feature = "zstd")]
        SupercompressionScheme::ZSTANDARD => {
            zstd::encode_all(data, level).map_err(|e| Error::Supercompression(e.to_string()))
        }
        #[cfg(feature = "zlib")]
        SupercompressionScheme::ZLIB => compress_zlib(data, level),
        _ => Err(Error::UnsupportedSupercompression(scheme)),
    }
}

/// Decompress one level's data, checking it inflates to `expected_size` bytes.
pub fn decompress(scheme: SupercompressionScheme, data: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    let output = match scheme {
        #[cfg(feature = "zstd")]
        SupercompressionScheme::ZSTANDARD => decompress_zstd(data, expected_size)?,
        #[cfg(feature = "zlib")]
        SupercompressionScheme::ZLIB => decompress_zlib(data, expected_size)?,
        _ => return Err(Error::UnsupportedSupercompression(scheme)),
    };

    if output.len() as u64 != expected_size {
        return Err(Error::Supercompression(format!(
            "level inflated to {} bytes, expected {}",
            output.len(),
            expected_size
        )));
    }
    Ok(output)
}

/// Empty buffer with room for `expected_size` bytes, which comes from the
/// file and is not trusted.
#[cfg(any(feature = "zstd", feature = "zlib"))]
fn output_buffer(expected_size: u64) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    usize::try_from(expected_size)
        .ok()
        .and_then(|size| output.try_reserve_exact(size).ok())
        .ok_or(Error::AllocationFailed {
            what: "inflated level",
            size: expected_size,
        })?;
    Ok(output)
}

#[cfg(feature = "zstd")]
fn decompress_zstd(data: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    use std::io::Read;

    let decoder = zstd::Decoder::new(data).map_err(|e| Error::Supercompression(e.to_string()))?;
    let mut output = output_buffer(expected_size)?;
    // One byte past the expected size is enough to detect oversized output.
    decoder
        .take(expected_size.saturating_add(1))
        .read_to_end(&mut output)
        .map_err(|e| Error::Supercompression(e.to_string()))?;
    Ok(output)
}

#[cfg(feature = "zlib")]
fn compress_zlib(data: &[u8], level: i32) -> Result<Vec<u8>> {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.clamp(0, 9) as u32));
    encoder
        .write_all(data)
        .map_err(|e| Error::Supercompression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::Supercompression(e.to_string()))
}

#[cfg(feature = "zlib")]
fn decompress_zlib(data: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    use std::io::Read;

    use flate2::read::ZlibDecoder;

    let mut output = output_buffer(expected_size)?;
    ZlibDecoder::new(data)
        .take(expected_size.saturating_add(1))
        .read_to_end(&mut output)
        .map_err(|e| Error::Supercompression(e.to_string()))?;
    Ok(output)
}
