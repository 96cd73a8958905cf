//! Capabilities injected into a texture: buffer allocation, diagnostics,
//! and stream helpers mapping `std::io` failures onto [`Error`].

use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::{Error, Result};

/// Source of zero-filled byte buffers for image and section storage.
pub trait Allocator {
    /// Allocate `size` zeroed bytes, or `None` if the request cannot be met.
    fn allocate(&self, size: usize) -> Option<Vec<u8>>;
}

/// Allocator backed by the global heap.
///
/// Fails instead of aborting when the heap cannot satisfy a request, and
/// optionally enforces a per-buffer limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator {
    limit: Option<usize>,
}

impl HeapAllocator {
    pub const fn new() -> Self {
        Self { limit: None }
    }

    /// Refuse any single buffer larger than `limit` bytes.
    pub const fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

impl Allocator for HeapAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        if self.limit.is_some_and(|limit| size > limit) {
            return None;
        }
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).ok()?;
        buffer.resize(size, 0);
        Some(buffer)
    }
}

/// Optional diagnostic callback. Receives fully formatted messages.
pub type LogHook = Box<dyn Fn(&str)>;

/// The allocator and log hook a texture works with.
pub struct Capabilities {
    allocator: Box<dyn Allocator>,
    log: Option<LogHook>,
}

impl Capabilities {
    pub fn new(allocator: Box<dyn Allocator>) -> Self {
        Self { allocator, log: None }
    }

    pub fn with_allocator<A: Allocator + 'static>(mut self, allocator: A) -> Self {
        self.allocator = Box::new(allocator);
        self
    }

    /// Forward diagnostics to `hook` in addition to the `log` facade.
    pub fn with_log<F: Fn(&str) + 'static>(mut self, hook: F) -> Self {
        self.log = Some(Box::new(hook));
        self
    }

    /// Allocate a buffer for `what`, failing with [`Error::AllocationFailed`].
    pub fn allocate(&self, size: u64, what: &'static str) -> Result<Vec<u8>> {
        usize::try_from(size)
            .ok()
            .and_then(|size| self.allocator.allocate(size))
            .filter(|buffer| buffer.len() as u64 == size)
            .ok_or(Error::AllocationFailed { what, size })
    }

    pub(crate) fn emit(&self, level: log::Level, args: fmt::Arguments<'_>) {
        if let Some(hook) = &self.log {
            hook(&args.to_string());
        }
        log::log!(level, "{}", args);
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new(Box::new(HeapAllocator::new()))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("log", &self.log.is_some())
            .finish_non_exhaustive()
    }
}

/// Emit a diagnostic through a [`Capabilities`] value.
macro_rules! diag {
    ($caps:expr, $level:ident, $($arg:tt)+) => {
        $caps.emit(log::Level::$level, format_args!($($arg)+))
    };
}
pub(crate) use diag;

/// Current stream position.
pub(crate) fn tell<S: Seek>(stream: &mut S) -> Result<u64> {
    stream
        .stream_position()
        .map_err(|source| Error::SeekFail { offset: 0, source })
}

/// Seek to an absolute position.
pub(crate) fn seek_to<S: Seek>(stream: &mut S, offset: u64) -> Result<()> {
    match stream.seek(SeekFrom::Start(offset)) {
        Ok(position) if position == offset => Ok(()),
        Ok(position) => Err(Error::SeekFail {
            offset,
            source: std::io::Error::other(format!("stream landed at {}", position)),
        }),
        Err(source) => Err(Error::SeekFail { offset, source }),
    }
}

/// Fill `buffer` from `offset`, failing with [`Error::IoReadFail`] on a short read.
pub(crate) fn read_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    buffer: &mut [u8],
    what: &'static str,
) -> Result<()> {
    seek_to(reader, offset)?;
    reader.read_exact(buffer).map_err(|source| Error::IoReadFail {
        what,
        offset,
        needed: buffer.len() as u64,
        source,
    })
}

pub(crate) fn write_all<W: Write>(writer: &mut W, data: &[u8], what: &'static str) -> Result<()> {
    writer
        .write_all(data)
        .map_err(|source| Error::IoWriteFail { what, source })
}

/// Write `count` zero bytes.
pub(crate) fn write_zeros<W: Write>(writer: &mut W, count: u64, what: &'static str) -> Result<()> {
    std::io::copy(&mut std::io::repeat(0).take(count), writer)
        .map(|_| ())
        .map_err(|source| Error::IoWriteFail { what, source })
}

/// Check the writer is at `start + expected`.
pub(crate) fn expect_position<W: Seek>(
    writer: &mut W,
    start: u64,
    expected: u64,
    what: &'static str,
) -> Result<()> {
    let actual = tell(writer)?.saturating_sub(start);
    if actual != expected {
        return Err(Error::WriteOffsetMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
