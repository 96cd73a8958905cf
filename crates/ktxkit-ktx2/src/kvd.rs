//! Key/value metadata.
//!
//! Each entry on disk is a `u32` byte length, the key, a NUL, the value, and
//! zero padding up to the next 4-byte boundary. The padding is not part of the
//! entry and is never stored.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use ktxkit_common::{align, BinaryReader};
use log::warn;

use crate::{Error, Result};

/// Image orientation, e.g. `"rd"` for right/down.
pub const KEY_ORIENTATION: &str = "KTXorientation";
/// Name and version of the tool that wrote the file.
pub const KEY_WRITER: &str = "KTXwriter";
pub const KEY_SWIZZLE: &str = "KTXswizzle";

/// Value written under [`KEY_WRITER`] by default.
pub const WRITER: &str = concat!("ktxkit v", env!("CARGO_PKG_VERSION"));

/// Smallest valid entry payload: a one-byte key and its terminator.
const MIN_ENTRY_LENGTH: usize = 2;

/// One key/value pair, stored as `key NUL value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    data: Vec<u8>,
    key_length: usize,
}

impl Entry {
    /// Build an entry from a key and a value.
    ///
    /// The key must be non-empty and free of NUL bytes. String values should
    /// carry their own trailing NUL.
    pub fn new(key: &str, value: &[u8]) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::InvalidKvd("entry has an empty key".to_string()));
        }
        if key.as_bytes().contains(&0) {
            return Err(Error::InvalidKvd(format!("key {:?} contains a NUL byte", key)));
        }
        Ok(Self::from_parts(key, value))
    }

    fn from_parts(key: &str, value: &[u8]) -> Self {
        let mut data = Vec::with_capacity(key.len() + 1 + value.len());
        data.extend_from_slice(key.as_bytes());
        data.push(0);
        data.extend_from_slice(value);
        Self {
            data,
            key_length: key.len(),
        }
    }

    /// Wrap a raw `key NUL value` payload. The key must be UTF-8.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let key = BinaryReader::new(&data)
            .read_cstring()
            .map_err(|e| Error::InvalidKvd(format!("entry key: {}", e)))?;
        if key.is_empty() {
            return Err(Error::InvalidKvd("entry has an empty key".to_string()));
        }
        let key_length = key.len();
        Ok(Self { data, key_length })
    }

    /// Length of the key in bytes, excluding its NUL.
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Length of the value in bytes.
    pub fn value_length(&self) -> usize {
        self.data.len() - self.key_length - 1
    }

    pub fn key_bytes(&self) -> &[u8] {
        &self.data[..self.key_length]
    }

    /// The key, if it is valid UTF-8.
    pub fn key(&self) -> Option<&str> {
        std::str::from_utf8(self.key_bytes()).ok()
    }

    pub fn value(&self) -> &[u8] {
        &self.data[self.key_length + 1..]
    }

    /// The value as a string, without its trailing NUL.
    pub fn value_str(&self) -> Option<&str> {
        let value = self.value();
        let value = value.strip_suffix(b"\0").unwrap_or(value);
        std::str::from_utf8(value).ok()
    }

    /// The stored `key NUL value` payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes the entry takes on disk: length prefix, payload and padding.
    pub fn serialized_size(&self) -> u32 {
        let unpadded = 4 + self.data.len() as u64;
        (unpadded + align::padding(unpadded, 4) as u64) as u32
    }
}

/// The key/value data section: an ordered chain of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueData {
    entries: Vec<Entry>,
}

impl Default for KeyValueData {
    /// A single [`KEY_WRITER`] entry naming this library.
    fn default() -> Self {
        let mut value = WRITER.as_bytes().to_vec();
        value.push(0);
        Self {
            entries: vec![Entry::from_parts(KEY_WRITER, &value)],
        }
    }
}

impl KeyValueData {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry. Fails on an empty key or one containing NUL.
    pub fn add_entry(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.push(Entry::new(key, value)?);
        Ok(())
    }

    /// Append a string entry, NUL-terminating the value.
    pub fn add_str(&mut self, key: &str, value: &str) -> Result<()> {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        self.add_entry(key, &bytes)
    }

    /// Value of the first entry with `key`.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|entry| entry.key_bytes() == key.as_bytes())
            .map(Entry::value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key_bytes() == key.as_bytes())
            .and_then(Entry::value_str)
    }

    /// Remove and return the first entry with `key`.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.key_bytes() == key.as_bytes())?;
        Some(self.entries.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialized byte size: every entry with its length prefix and padding.
    pub fn compute_size(&self) -> u32 {
        self.entries.iter().map(Entry::serialized_size).sum()
    }

    /// Parse a complete KVD section of `data.len()` bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let mut entries = Vec::new();

        while !reader.is_empty() {
            let start = reader.position();
            let length = reader.read_u32().map_err(|e| malformed(start, e))? as usize;
            if length < MIN_ENTRY_LENGTH {
                return Err(Error::InvalidKvd(format!(
                    "entry at offset {} has length {}",
                    start, length
                )));
            }
            let payload = reader.read_bytes(length).map_err(|e| malformed(start, e))?;
            entries.push(Entry::from_bytes(payload.to_vec())?);

            let padding = align::padding(reader.position() as u64, 4) as usize;
            if padding > reader.remaining() {
                warn!(
                    "key/value entry at offset {} is missing {} padding bytes",
                    start,
                    padding - reader.remaining()
                );
            }
            reader.align_to(4);
        }

        Ok(Self { entries })
    }

    /// Write every entry with its length prefix and padding.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            let payload = entry.as_bytes();
            writer.write_u32::<LittleEndian>(payload.len() as u32)?;
            writer.write_all(payload)?;
            let padding = align::padding(4 + payload.len() as u64, 4) as usize;
            writer.write_all(&[0u8; 3][..padding])?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.compute_size() as usize);
        let _ = self.write_to(&mut bytes);
        bytes
    }
}

impl<'a> IntoIterator for &'a KeyValueData {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn malformed(offset: usize, error: ktxkit_common::Error) -> Error {
    Error::InvalidKvd(format!("entry at offset {}: {}", offset, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_split() {
        let entry = Entry::new(KEY_ORIENTATION, b"rd\0").unwrap();
        assert_eq!(entry.key_length(), 14);
        assert_eq!(entry.value_length(), 3);
        assert_eq!(entry.key(), Some("KTXorientation"));
        assert_eq!(entry.value(), b"rd\0");
        assert_eq!(entry.value_str(), Some("rd"));
        // 4 + 14 + 1 + 3 = 22, padded to 24.
        assert_eq!(entry.serialized_size(), 24);
    }

    #[test]
    fn test_default_has_writer() {
        let kvd = KeyValueData::default();
        assert_eq!(kvd.len(), 1);
        assert_eq!(kvd.get_str(KEY_WRITER), Some(WRITER));
    }

    #[test]
    fn test_get_and_remove() {
        let mut kvd = KeyValueData::empty();
        kvd.add_entry("a", b"1").unwrap();
        kvd.add_str(KEY_SWIZZLE, "rgba").unwrap();
        kvd.add_entry("a", b"2").unwrap();

        assert_eq!(kvd.get("a"), Some(&b"1"[..]));
        assert_eq!(kvd.get_str(KEY_SWIZZLE), Some("rgba"));
        assert_eq!(kvd.get("missing"), None);

        let removed = kvd.remove("a").unwrap();
        assert_eq!(removed.value(), b"1");
        assert_eq!(kvd.get("a"), Some(&b"2"[..]));
        assert_eq!(kvd.len(), 2);
    }

    #[test]
    fn test_serialize_then_parse() {
        let mut kvd = KeyValueData::default();
        kvd.add_str(KEY_ORIENTATION, "rd").unwrap();
        kvd.add_entry("bin", &[1, 2, 3, 4]).unwrap();

        let bytes = kvd.to_bytes();
        assert_eq!(bytes.len() as u32, kvd.compute_size());
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(KeyValueData::parse(&bytes).unwrap(), kvd);
    }

    #[test]
    fn test_parse_tolerates_missing_final_padding() {
        let mut kvd = KeyValueData::empty();
        kvd.add_entry("k", b"v").unwrap();
        let bytes = kvd.to_bytes();
        // 4 + 3 bytes of payload, 1 byte of padding.
        assert_eq!(bytes.len(), 8);
        assert_eq!(KeyValueData::parse(&bytes[..7]).unwrap(), kvd);
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        // Length runs past the section.
        let mut data = 10u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"key\0");
        assert!(matches!(KeyValueData::parse(&data), Err(Error::InvalidKvd(_))));

        // Too short to hold a key.
        let data = [1u8, 0, 0, 0, b'k', 0, 0, 0];
        assert!(matches!(KeyValueData::parse(&data), Err(Error::InvalidKvd(_))));

        // No terminator.
        let data = [2u8, 0, 0, 0, b'k', b'v', 0, 0];
        assert!(matches!(KeyValueData::parse(&data), Err(Error::InvalidKvd(_))));

        // Truncated length prefix.
        assert!(matches!(KeyValueData::parse(&[4, 0]), Err(Error::InvalidKvd(_))));
    }

    #[test]
    fn test_rejects_keys_that_cannot_be_read_back() {
        let mut kvd = KeyValueData::empty();
        assert!(matches!(kvd.add_entry("", b"v"), Err(Error::InvalidKvd(_))));
        assert!(matches!(kvd.add_str("a\0b", "v"), Err(Error::InvalidKvd(_))));
        assert!(matches!(Entry::new("", b""), Err(Error::InvalidKvd(_))));
        assert!(kvd.is_empty());

        kvd.add_entry("k", b"").unwrap();
        assert_eq!(KeyValueData::parse(&kvd.to_bytes()).unwrap(), kvd);
    }

    #[test]
    fn test_parse_rejects_non_utf8_key() {
        let data = [3u8, 0, 0, 0, 0xFF, 0, b'v', 0];
        assert!(matches!(KeyValueData::parse(&data), Err(Error::InvalidKvd(_))));
    }
}
