//! The `TES3` record that opens every plugin and master file.

use std::io::Write;

use ashlander_common::{BinaryReader, FixedString, LittleEndian, Tag, WriteBytesExt};

use super::same_float;
use crate::header::RecordHeader;
use crate::record::Record;
use crate::subrecord::{LengthField, StringLimit, SubrecordReader, Wide};
use crate::{tags, Error, Result};

/// A master file the plugin depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MasterFile {
    pub name: String,
    /// Size of the master in bytes when the plugin was saved.
    pub size: u64,
}

/// File header (`TES3` record).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileHeader {
    pub version: f32,
    /// 1 for masters, 0 for plugins.
    pub file_flag: u32,
    pub author: FixedString<32>,
    pub description: FixedString<256>,
    /// Number of records following the header.
    pub record_count: u32,
    pub masters: Vec<MasterFile>,
    pub flags_a: i32,
    pub flags_b: i32,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            version: Self::DEFAULT_VERSION,
            file_flag: 0,
            author: FixedString::default(),
            description: FixedString::default(),
            record_count: 0,
            masters: Vec::new(),
            flags_a: 0,
            flags_b: 0,
        }
    }
}

impl PartialEq for FileHeader {
    fn eq(&self, other: &Self) -> bool {
        same_float(self.version, other.version)
            && self.file_flag == other.file_flag
            && self.author == other.author
            && self.description == other.description
            && self.record_count == other.record_count
            && self.masters == other.masters
            && self.flags_a == other.flags_a
            && self.flags_b == other.flags_b
    }
}

impl FileHeader {
    pub const DEFAULT_VERSION: f32 = 1.2;
    pub const HEDR_SIZE: usize = 300;
    pub const AUTHOR_WIDTH: usize = 32;
    pub const DESCRIPTION_WIDTH: usize = 256;
    /// Smallest payload that can hold a `HEDR` subrecord.
    pub const MIN_PAYLOAD: usize = Wide::HEADER_SIZE + Self::HEDR_SIZE;

    /// Whether the file is a master (`.esm`).
    pub fn is_master(&self) -> bool {
        self.file_flag & 1 != 0
    }

    pub fn add_master(&mut self, name: impl Into<String>, size: u64) {
        self.masters.push(MasterFile {
            name: name.into(),
            size,
        });
    }
}

impl Record for FileHeader {
    fn tag(&self) -> Tag {
        tags::TES3
    }

    fn record_id(&self) -> &str {
        ""
    }

    fn header_flags(&self) -> (i32, i32) {
        (self.flags_a, self.flags_b)
    }

    fn read(header: &RecordHeader, payload: BinaryReader<'_>) -> Result<Self> {
        if payload.len() < Self::MIN_PAYLOAD {
            return Err(Error::InvalidLength {
                offset: header.offset,
                tag: tags::TES3,
                expected: format!("at least {}", Self::MIN_PAYLOAD),
                actual: payload.len(),
            });
        }

        let mut reader = SubrecordReader::<Wide>::new(payload);
        let mut hedr = reader.read_fixed(tags::HEDR, Self::HEDR_SIZE)?;
        let version = hedr.read_f32()?;
        let file_flag = hedr.read_u32()?;
        let author = FixedString::read(&mut hedr)?;
        let description = FixedString::read(&mut hedr)?;
        let record_count = hedr.read_u32()?;

        let mut masters = Vec::new();
        while !reader.is_empty() {
            let name = reader.read_string_expected(tags::MAST, StringLimit::Short)?;
            let size = reader.read_fixed(tags::DATA, 8)?.read_u64()?;
            masters.push(MasterFile { name, size });
        }
        reader.finish(tags::TES3, header.offset)?;

        Ok(Self {
            version,
            file_flag,
            author,
            description,
            record_count,
            masters,
            flags_a: header.flags_a,
            flags_b: header.flags_b,
        })
    }

    fn payload_size(&self) -> usize {
        Wide::size_of(Self::HEDR_SIZE)
            + self
                .masters
                .iter()
                .map(|m| Wide::size_of_string(&m.name) + Wide::size_of(8))
                .sum::<usize>()
    }

    fn write_payload<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        Wide::write_header(out, tags::HEDR, Self::HEDR_SIZE)?;
        out.write_f32::<LittleEndian>(self.version)?;
        out.write_u32::<LittleEndian>(self.file_flag)?;
        self.author.write(out)?;
        self.description.write(out)?;
        out.write_u32::<LittleEndian>(self.record_count)?;

        for master in &self.masters {
            Wide::write_string(out, tags::MAST, &master.name)?;
            Wide::write_header(out, tags::DATA, 8)?;
            out.write_u64::<LittleEndian>(master.size)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Result<FileHeader> {
        let mut reader = BinaryReader::new(bytes);
        let header = RecordHeader::read(&mut reader)?;
        let payload = header.payload(&mut reader)?;
        FileHeader::read(&header, payload)
    }

    #[test]
    fn test_defaults() {
        let header = FileHeader::default();
        assert_eq!(header.version, 1.2);
        assert_eq!(header.record_count, 0);
        assert!(!header.is_master());
        assert_eq!(header.total_size(), RecordHeader::SIZE + 308);
    }

    #[test]
    fn test_round_trip_with_masters() {
        let mut header = FileHeader {
            file_flag: 0,
            author: "Bethesda".into(),
            description: "Balmora expansion".into(),
            record_count: 42,
            ..Default::default()
        };
        header.add_master("Morrowind.esm", 79_837_557);
        header.add_master("Tribunal.esm", 4_565_686);

        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), header.total_size());
        assert_eq!(&bytes[..4], b"TES3");

        let back = parse(&bytes).unwrap();
        assert_eq!(back, header);
        assert_eq!(back.masters[1].name, "Tribunal.esm");
        assert_eq!(back.masters[1].size, 4_565_686);
    }

    #[test]
    fn test_long_description_is_truncated() {
        let header = FileHeader {
            description: "x".repeat(300).into(),
            ..Default::default()
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        let back = parse(&bytes).unwrap();
        assert_eq!(back.description.len(), 255);
    }

    #[test]
    fn test_stray_description_bytes_survive() {
        let mut bytes = Vec::new();
        FileHeader {
            description: "Main game".into(),
            ..Default::default()
        }
        .write(&mut bytes)
        .unwrap();
        // Leftover text after the terminator, as old editors leave it.
        let at = RecordHeader::SIZE + 8 + 8 + FileHeader::AUTHOR_WIDTH + 10;
        bytes[at..at + 4].copy_from_slice(b"junk");

        let header = parse(&bytes).unwrap();
        assert_eq!(header.description, "Main game");
        assert!(header.description.keeps_padding());
        let mut again = Vec::new();
        header.write(&mut again).unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn test_payload_too_small() {
        let mut bytes = Vec::new();
        RecordHeader::new(tags::TES3, 100, 0, 0)
            .write(&mut bytes)
            .unwrap();
        bytes.extend_from_slice(&[0u8; 100]);
        assert!(matches!(
            parse(&bytes),
            Err(Error::InvalidLength { actual: 100, .. })
        ));
    }

    #[test]
    fn test_master_without_size() {
        let mut header = FileHeader::default();
        header.add_master("Morrowind.esm", 1);
        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        // Rename the DATA tag that follows MAST.
        let pos = bytes.windows(4).rposition(|w| w == b"DATA").unwrap();
        bytes[pos..pos + 4].copy_from_slice(b"MAST");
        assert!(matches!(
            parse(&bytes),
            Err(Error::UnexpectedTag { found, .. }) if found == tags::MAST
        ));
    }
}
