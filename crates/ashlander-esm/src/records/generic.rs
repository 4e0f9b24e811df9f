//! Records kept as raw subrecords.
//!
//! Anything the codec does not model field by field is stored as a
//! [`GenericRecord`]: the subrecords are held verbatim so writing the record
//! back reproduces the input byte for byte. Only the identifier is decoded,
//! following the record type's [`KeyRule`].

use std::io::Write;

use ashlander_common::{latin1, BinaryReader, Tag};

use crate::header::RecordHeader;
use crate::record::Record;
use crate::subrecord::{LengthField, StringLimit, Subrecord, SubrecordReader, Wide};
use crate::{tags, Error, Result};

/// How the identifier of a generic record is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    /// The first `NAME` subrecord, bounded by the given limit.
    Name(StringLimit),
    /// The `INDX` subrecord, a little-endian `i32` rendered as decimal
    /// (skills, magic effects).
    Index,
    /// The 32-byte name at the start of `SCHD` (scripts).
    ScriptHeader,
    /// The `INAM` subrecord (dialogue responses).
    InfoId,
    /// The `INTV` grid coordinates (landscape).
    LandGrid,
    /// `NAME` for interior cells, the `DATA` grid for exterior ones.
    Cell,
    /// The `DATA` grid for exterior pathgrids, whose `NAME` is a region
    /// name shared by many cells or empty; `NAME` for interior ones.
    PathGrid,
}

/// Flag in a cell's `DATA` marking it as interior.
const CELL_INTERIOR: u32 = 0x01;

/// Width of the script name at the start of `SCHD`.
const SCRIPT_NAME_WIDTH: usize = 32;

impl KeyRule {
    /// Rule for a record type.
    pub fn for_tag(tag: Tag) -> Self {
        match tag {
            t if t == tags::GMST => KeyRule::Name(StringLimit::Long),
            t if t == tags::SKIL || t == tags::MGEF => KeyRule::Index,
            t if t == tags::SCPT => KeyRule::ScriptHeader,
            t if t == tags::INFO => KeyRule::InfoId,
            t if t == tags::LAND => KeyRule::LandGrid,
            t if t == tags::CELL => KeyRule::Cell,
            t if t == tags::PGRD => KeyRule::PathGrid,
            _ => KeyRule::Name(StringLimit::Short),
        }
    }

    /// Decode the identifier from a record's subrecords.
    fn extract(self, record: Tag, subrecords: &[Subrecord<'_>]) -> Result<String> {
        let find = |tag: Tag| {
            subrecords
                .iter()
                .find(|sub| sub.tag == tag)
                .ok_or(Error::MissingSubrecord { record, tag })
        };

        match self {
            KeyRule::Name(limit) => find(tags::NAME)?.string(limit),
            KeyRule::Index => Ok(find(tags::INDX)?.fixed(4)?.read_i32()?.to_string()),
            KeyRule::ScriptHeader => {
                let sub = find(tags::SCHD)?;
                if sub.len() < SCRIPT_NAME_WIDTH {
                    return Err(Error::InvalidLength {
                        offset: sub.offset,
                        tag: sub.tag,
                        expected: format!("at least {}", SCRIPT_NAME_WIDTH),
                        actual: sub.len(),
                    });
                }
                Ok(latin1::decode(latin1::until_nul(
                    &sub.data[..SCRIPT_NAME_WIDTH],
                )))
            }
            KeyRule::InfoId => find(tags::INAM)?.string(StringLimit::Short),
            KeyRule::LandGrid => {
                let mut r = find(tags::INTV)?.fixed(8)?;
                Ok(grid_key(r.read_i32()?, r.read_i32()?))
            }
            KeyRule::Cell => {
                let mut r = find(tags::DATA)?.fixed(12)?;
                let flags = r.read_u32()?;
                let (x, y) = (r.read_i32()?, r.read_i32()?);
                if flags & CELL_INTERIOR != 0 {
                    find(tags::NAME)?.string(StringLimit::Short)
                } else {
                    Ok(grid_key(x, y))
                }
            }
            KeyRule::PathGrid => {
                // DATA: grid x, grid y, granularity, point count.
                let mut r = find(tags::DATA)?.fixed(12)?;
                let (x, y) = (r.read_i32()?, r.read_i32()?);
                let name = match find(tags::NAME) {
                    Ok(sub) => sub.string(StringLimit::Short)?,
                    Err(_) => String::new(),
                };
                if name.is_empty() || x != 0 || y != 0 {
                    Ok(grid_key(x, y))
                } else {
                    Ok(name)
                }
            }
        }
    }
}

/// Identifier of an exterior cell, landscape or pathgrid record.
pub(crate) fn grid_key(x: i32, y: i32) -> String {
    format!("#{},{}", x, y)
}

/// A subrecord held verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RawSubrecord {
    pub tag: Tag,
    pub data: Vec<u8>,
}

impl RawSubrecord {
    pub fn new(tag: Tag, data: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            data: data.into(),
        }
    }

    /// A NUL-terminated string subrecord.
    pub fn string(tag: Tag, text: &str) -> Self {
        let mut data = latin1::encode(text).into_owned();
        data.push(0);
        Self { tag, data }
    }

    /// The payload read as text up to the first NUL.
    pub fn text(&self) -> String {
        latin1::decode(latin1::until_nul(&self.data))
    }
}

/// A record stored as its raw subrecords plus a decoded identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GenericRecord {
    pub tag: Tag,
    pub id: String,
    pub flags_a: i32,
    pub flags_b: i32,
    pub subrecords: Vec<RawSubrecord>,
    /// Dialogue topic an `INFO` record belongs to, set while loading.
    pub parent_topic: Option<String>,
}

impl GenericRecord {
    /// Build a record from subrecords, decoding the identifier the way a
    /// loaded record would be.
    pub fn new(tag: Tag, subrecords: Vec<RawSubrecord>) -> Result<Self> {
        let borrowed: Vec<Subrecord<'_>> = subrecords
            .iter()
            .map(|raw| Subrecord::detached(raw.tag, &raw.data))
            .collect();
        let id = KeyRule::for_tag(tag).extract(tag, &borrowed)?;
        Ok(Self {
            tag,
            id,
            flags_a: 0,
            flags_b: 0,
            subrecords,
            parent_topic: None,
        })
    }

    /// First subrecord with the given tag.
    pub fn subrecord(&self, tag: Tag) -> Option<&RawSubrecord> {
        self.subrecords.iter().find(|sub| sub.tag == tag)
    }

    /// Whether the header marks the record as deleted.
    pub fn is_deleted(&self) -> bool {
        self.flags_b & RecordHeader::FLAG_DELETED != 0
    }
}

impl Record for GenericRecord {
    fn tag(&self) -> Tag {
        self.tag
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn header_flags(&self) -> (i32, i32) {
        (self.flags_a, self.flags_b)
    }

    fn read(header: &RecordHeader, payload: BinaryReader<'_>) -> Result<Self> {
        let reader = SubrecordReader::<Wide>::new(payload);
        let subrecords = reader.collect::<Result<Vec<_>>>()?;
        let id = KeyRule::for_tag(header.tag).extract(header.tag, &subrecords)?;

        Ok(Self {
            tag: header.tag,
            id,
            flags_a: header.flags_a,
            flags_b: header.flags_b,
            subrecords: subrecords
                .iter()
                .map(|sub| RawSubrecord::new(sub.tag, sub.data))
                .collect(),
            parent_topic: None,
        })
    }

    fn payload_size(&self) -> usize {
        self.subrecords
            .iter()
            .map(|sub| Wide::size_of(sub.data.len()))
            .sum()
    }

    fn write_payload<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        for sub in &self.subrecords {
            Wide::write(out, sub.tag, &sub.data)?;
        }
        Ok(())
    }
}
