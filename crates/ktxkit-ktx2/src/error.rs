//! Error types for KTX2 handling.

use thiserror::Error;

use crate::SupercompressionScheme;

/// Errors that can occur when reading, writing or editing a KTX2 texture.
#[derive(Debug, Error)]
pub enum Error {
    /// A read returned fewer bytes than requested.
    #[error("failed to read {what} ({needed} bytes at offset {offset}): {source}")]
    IoReadFail {
        what: &'static str,
        offset: u64,
        needed: u64,
        #[source]
        source: std::io::Error,
    },

    /// The underlying stream rejected a write.
    #[error("failed to write {what}: {source}")]
    IoWriteFail {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Seeking or querying the stream position failed.
    #[error("failed to seek to offset {offset}: {source}")]
    SeekFail {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Serialization reached a section at a different offset than the one
    /// recorded for it in the header.
    #[error("{what} written at offset {actual}, expected {expected}")]
    WriteOffsetMismatch {
        what: &'static str,
        expected: u64,
        actual: u64,
    },

    /// The file does not start with the KTX2 identifier.
    #[error("invalid KTX2 identifier: {0:02x?}")]
    InvalidIdentifier([u8; 12]),

    /// A section offset or length is out of range.
    #[error("invalid {section} section: offset {offset}, length {length}")]
    InvalidSectionIndex {
        section: &'static str,
        offset: u64,
        length: u64,
    },

    /// A level index entry disagrees with the texture geometry.
    #[error("invalid level index entry {level}: {reason}")]
    InvalidLevelIndexEntry { level: u32, reason: String },

    /// Malformed data format descriptor.
    #[error("invalid data format descriptor: {0}")]
    InvalidDfd(String),

    /// Malformed key/value data.
    #[error("invalid key/value data: {0}")]
    InvalidKvd(String),

    /// Malformed supercompression global data.
    #[error("invalid supercompression global data: {0}")]
    InvalidSgd(String),

    /// Image byte size does not match the size derived from format and level.
    #[error("invalid image size: expected {expected} bytes, got {actual}")]
    InvalidImageSize { expected: u64, actual: u64 },

    #[error("mip level {level} out of range (level count {count})")]
    InvalidLevelIndex { level: u32, count: u32 },

    #[error("face {face} out of range (face count {count})")]
    InvalidFaceIndex { face: u32, count: u32 },

    #[error("layer {layer} out of range (layer count {count})")]
    InvalidLayerIndex { layer: u32, count: u32 },

    /// Texture dimensions or counts the container cannot represent.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// No format has been specified or parsed yet.
    #[error("level index not allocated")]
    LevelIndexNotAllocated,

    /// Image storage has not been allocated yet.
    #[error("mip level array not allocated")]
    MipLevelArrayNotAllocated,

    #[error("data format descriptor not allocated")]
    DfdNotAllocated,

    #[error("key/value data not allocated")]
    KvdNotAllocated,

    /// The allocator could not provide a buffer.
    #[error("failed to allocate {size} bytes for {what}")]
    AllocationFailed { what: &'static str, size: u64 },

    /// No codec for this scheme is compiled in.
    #[error("unsupported supercompression scheme {0}")]
    UnsupportedSupercompression(SupercompressionScheme),

    /// Image data is supercompressed and cannot be addressed per image.
    #[error("level data is supercompressed with {0}; inflate or transcode it first")]
    Supercompressed(SupercompressionScheme),

    /// Compression or decompression of level data failed.
    #[error("supercompression error: {0}")]
    Supercompression(String),

    /// A transcoder reported failure or returned unusable data.
    #[error("transcode error: {0}")]
    Transcode(String),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] ktxkit_common::Error),
}

impl Error {
    /// Whether this error originated in the underlying stream.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::IoReadFail { .. }
                | Self::IoWriteFail { .. }
                | Self::SeekFail { .. }
                | Self::WriteOffsetMismatch { .. }
        )
    }
}

/// Result type for KTX2 operations.
pub type Result<T> = std::result::Result<T, Error>;
