//! Four-character type codes.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// A four-byte type code identifying a record or subrecord (`NPC_`, `NAME`, ...).
///
/// Tags compare by exact byte equality; no case folding is applied.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(transparent)]
pub struct Tag([u8; 4]);

impl Tag {
    /// Size of a tag on disk.
    pub const SIZE: usize = 4;

    /// Create a tag from its four bytes.
    #[inline]
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    /// Create a tag from the first four bytes of a slice.
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.get(..4).map(|b| Self([b[0], b[1], b[2], b[3]]))
    }

    /// Raw bytes of the tag.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl PartialEq<[u8; 4]> for Tag {
    fn eq(&self, other: &[u8; 4]) -> bool {
        &self.0 == other
    }
}

impl PartialEq<&[u8; 4]> for Tag {
    fn eq(&self, other: &&[u8; 4]) -> bool {
        &self.0 == *other
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02X}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Tag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_escapes_non_printable() {
        assert_eq!(Tag::new(b"NPC_").to_string(), "NPC_");
        assert_eq!(Tag::new(b"AI_\x01").to_string(), "AI_\\x01");
    }

    #[test]
    fn test_exact_comparison() {
        assert_eq!(Tag::new(b"NAME"), *b"NAME");
        assert_ne!(Tag::new(b"NAME"), *b"name");
        assert_eq!(Tag::from_slice(b"CNDTxx"), Some(Tag::new(b"CNDT")));
        assert_eq!(Tag::from_slice(b"CND"), None);
    }
}
