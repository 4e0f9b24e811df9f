//! The tag-length-value subrecord protocol.
//!
//! Every record payload is a run of subrecords: a four-byte [`Tag`], a
//! little-endian length, then that many payload bytes. Morrowind files use a
//! 32-bit length ([`Wide`]); later engines use a 16-bit one ([`Narrow`]).
//! The width is a type parameter, so a record type picks its family at
//! compile time and no code path has to sniff it.

use std::fmt;
use std::io::{self, Write};
use std::marker::PhantomData;

use ashlander_common::{latin1, BinaryReader, LittleEndian, Tag, WriteBytesExt, WriteExt};

use crate::{Error, Result};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Wide {}
    impl Sealed for super::Narrow {}
}

/// Width of the length field in a subrecord header.
pub trait LengthField: sealed::Sealed {
    /// Size of the length field in bytes.
    const WIDTH: usize;
    /// Largest payload the length field can describe.
    const MAX: usize;
    /// Size of tag plus length field.
    const HEADER_SIZE: usize = Tag::SIZE + Self::WIDTH;

    /// Read a length field.
    fn read_length(reader: &mut BinaryReader<'_>) -> Result<usize>;

    /// Write a length field.
    fn write_length<W: Write + ?Sized>(out: &mut W, length: usize) -> io::Result<()>;

    /// On-disk size of a subrecord with `payload_len` payload bytes.
    #[inline]
    fn size_of(payload_len: usize) -> usize {
        Self::HEADER_SIZE + payload_len
    }

    /// On-disk size of a NUL-terminated string subrecord.
    #[inline]
    fn size_of_string(text: &str) -> usize {
        Self::size_of(latin1::encoded_len(text) + 1)
    }

    /// Write a subrecord header announcing `length` payload bytes.
    fn write_header<W: Write + ?Sized>(out: &mut W, tag: Tag, length: usize) -> Result<()> {
        if length > Self::MAX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} payload of {} bytes exceeds {}", tag, length, Self::MAX),
            )
            .into());
        }
        out.write_tag(tag)?;
        Self::write_length(out, length)?;
        Ok(())
    }

    /// Write a complete subrecord.
    fn write<W: Write + ?Sized>(out: &mut W, tag: Tag, payload: &[u8]) -> Result<()> {
        Self::write_header(out, tag, payload.len())?;
        out.write_all(payload)?;
        Ok(())
    }

    /// Write a string subrecord; the length includes the terminating NUL.
    fn write_string<W: Write + ?Sized>(out: &mut W, tag: Tag, text: &str) -> Result<()> {
        Self::write_header(out, tag, latin1::encoded_len(text) + 1)?;
        out.write_zstring(text)?;
        Ok(())
    }
}

/// 32-bit length field (Morrowind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wide;

/// 16-bit length field (later engines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Narrow;

impl LengthField for Wide {
    const WIDTH: usize = 4;
    const MAX: usize = u32::MAX as usize;

    #[inline]
    fn read_length(reader: &mut BinaryReader<'_>) -> Result<usize> {
        Ok(reader.read_u32()? as usize)
    }

    #[inline]
    fn write_length<W: Write + ?Sized>(out: &mut W, length: usize) -> io::Result<()> {
        out.write_u32::<LittleEndian>(length as u32)
    }
}

impl LengthField for Narrow {
    const WIDTH: usize = 2;
    const MAX: usize = u16::MAX as usize;

    #[inline]
    fn read_length(reader: &mut BinaryReader<'_>) -> Result<usize> {
        Ok(reader.read_u16()? as usize)
    }

    #[inline]
    fn write_length<W: Write + ?Sized>(out: &mut W, length: usize) -> io::Result<()> {
        out.write_u16::<LittleEndian>(length as u16)
    }
}

/// Ceiling on the declared length of a string subrecord, terminator included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringLimit {
    /// Identifiers, names, paths.
    Short,
    /// Game setting names and values.
    Long,
}

impl StringLimit {
    /// The limit in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            StringLimit::Short => 255,
            StringLimit::Long => 511,
        }
    }
}

/// A subrecord borrowed from the input buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Subrecord<'a> {
    /// Type code.
    pub tag: Tag,
    /// Payload bytes, header excluded.
    pub data: &'a [u8],
    /// Absolute offset of the subrecord header.
    pub offset: usize,
    header_size: usize,
}

impl<'a> Subrecord<'a> {
    /// A view over bytes that did not come from a buffer, e.g. an owned
    /// subrecord being inspected. Offsets start at zero.
    pub(crate) fn detached(tag: Tag, data: &'a [u8]) -> Self {
        Self {
            tag,
            data,
            offset: 0,
            header_size: Wide::HEADER_SIZE,
        }
    }

    /// Absolute offset of the first payload byte.
    #[inline]
    pub fn payload_offset(&self) -> usize {
        self.offset + self.header_size
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A reader over the payload that reports absolute offsets.
    pub fn reader(&self) -> BinaryReader<'a> {
        BinaryReader::with_base(self.data, self.payload_offset())
    }

    /// A reader over the payload, after checking it is exactly `len` bytes.
    pub fn fixed(&self, len: usize) -> Result<BinaryReader<'a>> {
        if self.data.len() != len {
            return Err(Error::InvalidLength {
                offset: self.offset,
                tag: self.tag,
                expected: len.to_string(),
                actual: self.data.len(),
            });
        }
        Ok(self.reader())
    }

    /// The payload read as text up to the first NUL.
    pub fn text(&self) -> String {
        latin1::decode(latin1::until_nul(self.data))
    }

    /// The payload as text, after checking its length against `limit`.
    pub fn string(&self, limit: StringLimit) -> Result<String> {
        check_limit(self.tag, self.data.len(), self.offset, limit)?;
        Ok(self.text())
    }
}

fn check_limit(tag: Tag, length: usize, offset: usize, limit: StringLimit) -> Result<()> {
    if length > limit.bytes() {
        return Err(Error::OversizedField {
            offset,
            tag,
            length,
            limit: limit.bytes(),
        });
    }
    Ok(())
}

impl fmt::Debug for Subrecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subrecord")
            .field("tag", &self.tag)
            .field("len", &self.data.len())
            .field("offset", &self.offset)
            .finish()
    }
}

/// Sequential subrecord reader over one record payload.
///
/// On success each read advances by exactly header size plus payload length.
/// After an error the position is unspecified and the record parse must be
/// abandoned.
#[derive(Debug, Clone)]
pub struct SubrecordReader<'a, L: LengthField = Wide> {
    reader: BinaryReader<'a>,
    _length: PhantomData<L>,
}

impl<'a, L: LengthField> SubrecordReader<'a, L> {
    /// Read subrecords from a bounded payload reader.
    pub fn new(reader: BinaryReader<'a>) -> Self {
        Self {
            reader,
            _length: PhantomData,
        }
    }

    /// Absolute offset of the next subrecord.
    #[inline]
    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.reader.position()
    }

    /// Whether the whole payload has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }

    /// Tag of the next subrecord, without consuming it.
    pub fn peek_tag(&self) -> Result<Tag> {
        Ok(self.reader.peek_tag()?)
    }

    fn read_header(&mut self) -> Result<(Tag, usize, usize)> {
        let offset = self.reader.offset();
        let tag = self.reader.read_tag()?;
        let length = L::read_length(&mut self.reader)?;
        Ok((tag, length, offset))
    }

    fn read_payload(&mut self, tag: Tag, length: usize, offset: usize) -> Result<Subrecord<'a>> {
        let data = self.reader.read_bytes(length)?;
        Ok(Subrecord {
            tag,
            data,
            offset,
            header_size: L::HEADER_SIZE,
        })
    }

    /// Read the next subrecord, whatever its tag.
    pub fn read_subrecord(&mut self) -> Result<Subrecord<'a>> {
        let (tag, length, offset) = self.read_header()?;
        self.read_payload(tag, length, offset)
    }

    /// Read the next subrecord, which must carry `tag`.
    pub fn read_expected(&mut self, tag: Tag) -> Result<Subrecord<'a>> {
        let (found, length, offset) = self.read_header()?;
        if found != tag {
            return Err(Error::expected_tag(offset, tag, found));
        }
        self.read_payload(found, length, offset)
    }

    /// Read the next subrecord, rejecting a declared length above `limit`
    /// before the payload is touched.
    pub fn read_limited(&mut self, limit: StringLimit) -> Result<Subrecord<'a>> {
        let (tag, length, offset) = self.read_header()?;
        check_limit(tag, length, offset, limit)?;
        self.read_payload(tag, length, offset)
    }

    /// Read the next subrecord as a string, enforcing `limit` before the
    /// payload is touched.
    pub fn read_string(&mut self, limit: StringLimit) -> Result<(Tag, String)> {
        let sub = self.read_limited(limit)?;
        Ok((sub.tag, sub.text()))
    }

    /// Read the next subrecord as a string; it must carry `tag`.
    pub fn read_string_expected(&mut self, tag: Tag, limit: StringLimit) -> Result<String> {
        let (found, length, offset) = self.read_header()?;
        if found != tag {
            return Err(Error::expected_tag(offset, tag, found));
        }
        check_limit(tag, length, offset, limit)?;
        Ok(self.read_payload(found, length, offset)?.text())
    }

    /// Read the next subrecord, which must carry `tag` and be exactly `len` bytes.
    pub fn read_fixed(&mut self, tag: Tag, len: usize) -> Result<BinaryReader<'a>> {
        self.read_expected(tag)?.fixed(len)
    }

    /// Confirm the payload was consumed exactly.
    pub fn finish(&self, record: Tag, record_offset: usize) -> Result<()> {
        if !self.reader.is_empty() {
            return Err(Error::SizeMismatch {
                offset: record_offset,
                tag: record,
                declared: self.reader.len(),
                consumed: self.reader.position(),
            });
        }
        Ok(())
    }
}

impl<'a, L: LengthField> Iterator for SubrecordReader<'a, L> {
    type Item = Result<Subrecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.is_empty() {
            return None;
        }
        let item = self.read_subrecord();
        if item.is_err() {
            // Position is unspecified after a failure; stop iterating.
            self.reader = BinaryReader::with_base(&[], self.reader.offset());
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(data: &[u8]) -> SubrecordReader<'_, Wide> {
        SubrecordReader::new(BinaryReader::new(data))
    }

    #[test]
    fn test_read_wide_subrecord() {
        let data = b"NAME\x06\0\0\0Vivec\0FLAG\x04\0\0\0\x01\0\0\0";
        let mut reader = wide(data);

        let name = reader.read_subrecord().unwrap();
        assert_eq!(name.tag, Tag::new(b"NAME"));
        assert_eq!(name.text(), "Vivec");
        assert_eq!(reader.consumed(), 14);

        let mut flag = reader.read_fixed(Tag::new(b"FLAG"), 4).unwrap();
        assert_eq!(flag.read_u32().unwrap(), 1);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_narrow_subrecord() {
        let data = b"EDID\x04\0Foo\0";
        let mut reader: SubrecordReader<'_, Narrow> = SubrecordReader::new(BinaryReader::new(data));

        let text = reader
            .read_string_expected(Tag::new(b"EDID"), StringLimit::Short)
            .unwrap();
        assert_eq!(text, "Foo");
        assert_eq!(reader.consumed(), 6 + 4);
    }

    #[test]
    fn test_write_narrow_subrecord() {
        let mut out = Vec::new();
        Narrow::write_string(&mut out, Tag::new(b"EDID"), "Foo").unwrap();
        assert_eq!(out, b"EDID\x04\0Foo\0");
        assert_eq!(Narrow::size_of_string("Foo"), out.len());

        let too_big = vec![0u8; 70_000];
        assert!(Narrow::write(&mut Vec::new(), Tag::new(b"DATA"), &too_big).is_err());
        assert!(Wide::write(&mut Vec::new(), Tag::new(b"DATA"), &too_big).is_ok());
    }

    #[test]
    fn test_string_length_includes_terminator() {
        let mut out = Vec::new();
        Wide::write_string(&mut out, Tag::new(b"RNAM"), "Breton").unwrap();
        assert_eq!(out, b"RNAM\x07\0\0\0Breton\0");
        assert_eq!(Wide::size_of_string("Breton"), 15);
    }

    #[test]
    fn test_truncated_tag() {
        let mut reader = wide(b"NAM");
        assert!(matches!(reader.read_subrecord(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_truncated_length() {
        let mut reader = wide(b"NAME\x05\0");
        assert!(matches!(reader.read_subrecord(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_truncated_payload() {
        let mut reader = wide(b"NAME\x10\0\0\0short\0");
        match reader.read_subrecord() {
            Err(Error::Truncated {
                offset,
                needed,
                available,
            }) => {
                assert_eq!(offset, 8);
                assert_eq!(needed, 16);
                assert_eq!(available, 6);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_string_is_rejected_before_payload() {
        // Declared length is over the limit and the payload is absent.
        let mut reader = wide(b"NAME\x10\x01\0\0");
        match reader.read_string(StringLimit::Short) {
            Err(Error::OversizedField { length, limit, .. }) => {
                assert_eq!(length, 0x110);
                assert_eq!(limit, 255);
            }
            other => panic!("expected OversizedField, got {:?}", other),
        }
    }

    #[test]
    fn test_long_limit_allows_511() {
        let mut data = b"STRV\xFF\x01\0\0".to_vec();
        data.extend(std::iter::repeat(b'a').take(510));
        data.push(0);
        let mut reader = wide(&data);
        let (_, text) = reader.read_string(StringLimit::Long).unwrap();
        assert_eq!(text.len(), 510);
    }

    #[test]
    fn test_unexpected_tag() {
        let mut reader = wide(b"FAIL\x01\0\0\0\0");
        match reader.read_expected(Tag::new(b"NAME")) {
            Err(Error::UnexpectedTag {
                offset,
                expected,
                found,
            }) => {
                assert_eq!(offset, 0);
                assert_eq!(expected, "NAME");
                assert_eq!(found, Tag::new(b"FAIL"));
            }
            other => panic!("expected UnexpectedTag, got {:?}", other),
        }
    }

    #[test]
    fn test_fixed_length_mismatch() {
        let mut reader = wide(b"FLAG\x02\0\0\0\x01\0");
        assert!(matches!(
            reader.read_fixed(Tag::new(b"FLAG"), 4),
            Err(Error::InvalidLength { actual: 2, .. })
        ));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let data = b"NAME\x02\0\0\0a\0XXXX\xFF\0\0\0";
        let items: Vec<_> = wide(data).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn test_finish_reports_leftover() {
        let data = b"NAME\x02\0\0\0a\0\0\0";
        let mut reader = wide(data);
        reader.read_subrecord().unwrap();
        assert!(matches!(
            reader.finish(Tag::new(b"STAT"), 0),
            Err(Error::SizeMismatch {
                declared: 12,
                consumed: 10,
                ..
            })
        ));
    }
}
