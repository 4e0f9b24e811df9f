//! The 16-byte record header.

use std::io::Write;

use ashlander_common::{BinaryReader, Tag};
use zerocopy::byteorder::little_endian::{I32, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Result;

/// On-disk record header layout.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
struct RawRecordHeader {
    tag: Tag,
    payload_size: U32,
    flags_a: I32,
    flags_b: I32,
}

/// Header preceding every top-level record.
///
/// `payload_size` counts the bytes after the header. The two flag words are
/// opaque to the codec and written back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record type.
    pub tag: Tag,
    /// Size of the payload that follows.
    pub payload_size: u32,
    /// First flag word (unused by the game, preserved).
    pub flags_a: i32,
    /// Second flag word (deleted, persistent, blocked, ...).
    pub flags_b: i32,
    /// Absolute offset of the header in the source buffer.
    pub offset: usize,
}

impl RecordHeader {
    /// Size of the header on disk.
    pub const SIZE: usize = 16;

    /// Deleted-record bit in [`flags_b`](Self::flags_b).
    pub const FLAG_DELETED: i32 = 0x0020;
    /// Persistent-reference bit.
    pub const FLAG_PERSISTENT: i32 = 0x0400;
    /// Blocked bit.
    pub const FLAG_BLOCKED: i32 = 0x2000;

    /// Build a header for writing.
    pub fn new(tag: Tag, payload_size: u32, flags_a: i32, flags_b: i32) -> Self {
        Self {
            tag,
            payload_size,
            flags_a,
            flags_b,
            offset: 0,
        }
    }

    /// Read a header, leaving the reader at the start of the payload.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let raw: RawRecordHeader = reader.read_struct()?;
        Ok(Self {
            tag: raw.tag,
            payload_size: raw.payload_size.get(),
            flags_a: raw.flags_a.get(),
            flags_b: raw.flags_b.get(),
            offset,
        })
    }

    /// Split off the payload as a reader bounded to exactly `payload_size` bytes.
    pub fn payload<'a>(&self, reader: &mut BinaryReader<'a>) -> Result<BinaryReader<'a>> {
        Ok(reader.sub_reader(self.payload_size as usize)?)
    }

    /// Skip the payload without parsing it.
    pub fn skip(&self, reader: &mut BinaryReader<'_>) -> Result<()> {
        Ok(reader.skip(self.payload_size as usize)?)
    }

    /// Write the header.
    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        let raw = RawRecordHeader {
            tag: self.tag,
            payload_size: U32::new(self.payload_size),
            flags_a: I32::new(self.flags_a),
            flags_b: I32::new(self.flags_b),
        };
        out.write_all(raw.as_bytes())?;
        Ok(())
    }

    /// Whether the deleted bit is set.
    pub fn is_deleted(&self) -> bool {
        self.flags_b & Self::FLAG_DELETED != 0
    }

    /// Whether the persistent bit is set.
    pub fn is_persistent(&self) -> bool {
        self.flags_b & Self::FLAG_PERSISTENT != 0
    }

    /// Whether the blocked bit is set.
    pub fn is_blocked(&self) -> bool {
        self.flags_b & Self::FLAG_BLOCKED != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_header_layout() {
        assert_eq!(std::mem::size_of::<RawRecordHeader>(), RecordHeader::SIZE);
    }

    #[test]
    fn test_read_header() {
        let data = b"NPC_\xF7\0\0\0\x01\0\0\0\0\x04\0\0rest";
        let mut reader = BinaryReader::with_base(data, 32);
        let header = RecordHeader::read(&mut reader).unwrap();

        assert_eq!(header.tag, Tag::new(b"NPC_"));
        assert_eq!(header.payload_size, 0xF7);
        assert_eq!(header.flags_a, 1);
        assert_eq!(header.flags_b, 0x400);
        assert_eq!(header.offset, 32);
        assert!(header.is_persistent());
        assert!(!header.is_deleted());
        assert_eq!(reader.position(), 16);
    }

    #[test]
    fn test_header_cut_short() {
        let mut reader = BinaryReader::new(b"NPC_\xF7\0");
        assert!(matches!(
            RecordHeader::read(&mut reader),
            Err(Error::Truncated { needed: 16, available: 6, .. })
        ));
    }

    #[test]
    fn test_payload_longer_than_buffer() {
        let data = b"STAT\x20\0\0\0\0\0\0\0\0\0\0\0NAME";
        let mut reader = BinaryReader::new(data);
        let header = RecordHeader::read(&mut reader).unwrap();
        assert!(matches!(
            header.payload(&mut reader),
            Err(Error::Truncated { needed: 0x20, available: 4, .. })
        ));
    }

    #[test]
    fn test_write_header() {
        let header = RecordHeader::new(Tag::new(b"CREA"), 300, 0, 0x2000);
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        assert_eq!(out, b"CREA\x2C\x01\0\0\0\0\0\0\0\x20\0\0");
    }
}
