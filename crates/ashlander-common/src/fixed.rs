//! Text stored in NUL-padded fields of a fixed width.

use std::fmt;
use std::io::{self, Write};
use std::ops::Deref;

use crate::{latin1, BinaryReader, Result, WriteExt};

/// Text in a field of exactly `N` bytes, terminated and padded with NULs.
///
/// The bytes after the terminator are not always zero in shipped files.
/// When they are not, the field is kept as read and written back unchanged
/// until the text is replaced with [`set`](Self::set).
#[derive(Clone, Default)]
pub struct FixedString<const N: usize> {
    text: String,
    raw: Option<Box<[u8; N]>>,
}

impl<const N: usize> FixedString<N> {
    /// Width of the field on disk.
    pub const WIDTH: usize = N;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: None,
        }
    }

    /// Read one field of `N` bytes.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let field = reader.read_bytes(N)?;
        let text = latin1::decode(latin1::until_nul(field));
        let raw = if field == &padded::<N>(&text)[..] {
            None
        } else {
            let mut kept = Box::new([0u8; N]);
            kept.copy_from_slice(field);
            Some(kept)
        };
        Ok(Self { text, raw })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Replace the text. Any padding kept from disk is dropped.
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.raw = None;
    }

    /// Whether the field was read with non-zero padding and is kept verbatim.
    pub fn keeps_padding(&self) -> bool {
        self.raw.is_some()
    }

    /// The bytes [`write`](Self::write) produces.
    pub fn to_bytes(&self) -> [u8; N] {
        match &self.raw {
            Some(raw) => **raw,
            None => padded(&self.text),
        }
    }

    /// Write the field. Text longer than `N - 1` bytes is truncated with a
    /// warning.
    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        match &self.raw {
            Some(raw) => out.write_all(&raw[..]),
            None => out.write_fixed_string(&self.text, N),
        }
    }
}

fn padded<const N: usize>(text: &str) -> [u8; N] {
    let encoded = latin1::encode(text);
    let keep = encoded.len().min(N.saturating_sub(1));
    let mut field = [0u8; N];
    field[..keep].copy_from_slice(&encoded[..keep]);
    field
}

// Two fields are equal when they hold the same text and write the same bytes.
impl<const N: usize> PartialEq for FixedString<N> {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.to_bytes() == other.to_bytes()
    }
}

impl<const N: usize> Eq for FixedString<N> {}

impl<const N: usize> PartialEq<str> for FixedString<N> {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl<const N: usize> PartialEq<&str> for FixedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl<const N: usize> Deref for FixedString<N> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl<const N: usize> AsRef<str> for FixedString<N> {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl<const N: usize> From<&str> for FixedString<N> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl<const N: usize> From<String> for FixedString<N> {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl<const N: usize> fmt::Debug for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.text, f)
    }
}

impl<const N: usize> fmt::Display for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(feature = "serde")]
impl<const N: usize> serde::Serialize for FixedString<N> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Id = FixedString<8>;

    fn read(bytes: &[u8]) -> Id {
        Id::read(&mut BinaryReader::new(bytes)).unwrap()
    }

    fn written(id: &Id) -> Vec<u8> {
        let mut out = Vec::new();
        id.write(&mut out).unwrap();
        out
    }

    #[test]
    fn test_zero_padding_is_not_kept() {
        let id = read(b"gold\0\0\0\0");
        assert_eq!(id, "gold");
        assert!(!id.keeps_padding());
        assert_eq!(id, Id::new("gold"));
        assert_eq!(written(&id), b"gold\0\0\0\0");
    }

    #[test]
    fn test_stray_padding_survives() {
        let raw = b"gold\0\xAB\xAB\xAB";
        let id = read(raw);
        assert_eq!(id.as_str(), "gold");
        assert!(id.keeps_padding());
        assert_eq!(written(&id), raw);
        assert_eq!(&id.to_bytes(), raw);
        assert_ne!(id, Id::new("gold"));
    }

    #[test]
    fn test_set_drops_padding() {
        let mut id = read(b"gold\0\xAB\xAB\xAB");
        id.set("iron");
        assert!(!id.keeps_padding());
        assert_eq!(written(&id), b"iron\0\0\0\0");
    }

    #[test]
    fn test_field_without_terminator_survives() {
        let id = read(b"abcdefgh");
        assert_eq!(id, "abcdefgh");
        assert!(id.keeps_padding());
        assert_eq!(written(&id), b"abcdefgh");
    }

    #[test]
    fn test_short_input() {
        assert!(Id::read(&mut BinaryReader::new(b"gold")).is_err());
    }
}
