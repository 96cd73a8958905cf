//! Common utilities for ktxkit.
//!
//! This crate provides foundational types and utilities used across all ktxkit crates:
//!
//! - [`BinaryReader`] - Zero-copy little-endian reading from byte slices
//! - [`align`] - Padding and alignment arithmetic shared by every section of a KTX2 file
//! - [`Error`] - Errors raised while decoding raw bytes

mod error;
mod reader;

pub mod align;

pub use error::{Error, Result};
pub use reader::BinaryReader;
