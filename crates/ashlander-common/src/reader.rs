//! Binary reader for zero-copy parsing of byte slices.
//!
//! [`BinaryReader`] is a cursor over a byte slice. A reader can hand out a
//! bounded child reader for a length-prefixed region; the child cannot read
//! past that region, and it keeps reporting offsets relative to the start of
//! the original buffer so errors point at the right place in the file.

use zerocopy::FromBytes;

use crate::{latin1, Error, Result, Tag};

/// A binary reader that provides zero-copy reading from a byte slice.
///
/// # Example
///
/// ```
/// use ashlander_common::BinaryReader;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_u32().unwrap(), 0x04030201);
/// let mut rest = reader.sub_reader(4).unwrap();
/// assert_eq!(rest.offset(), 4);
/// assert_eq!(rest.read_u16().unwrap(), 0x0605);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
    base: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a new reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            base: 0,
        }
    }

    /// Create a reader whose first byte sits at absolute offset `base`.
    #[inline]
    pub const fn with_base(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            position: 0,
            base,
        }
    }

    /// Current position relative to the start of this reader.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Current position relative to the start of the outermost buffer.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.base + self.position
    }

    /// Total length of the readable region.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Skip `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Remaining bytes as a slice.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                offset: self.offset(),
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a fixed-size byte array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Split off the next `length` bytes as a bounded reader and advance past them.
    pub fn sub_reader(&mut self, length: usize) -> Result<BinaryReader<'a>> {
        let base = self.offset();
        let bytes = self.read_bytes(length)?;
        Ok(BinaryReader::with_base(bytes, base))
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|b| b as i8)
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Read a little-endian i16.
    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read a little-endian u64.
    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Read a little-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read a four-byte tag.
    #[inline]
    pub fn read_tag(&mut self) -> Result<Tag> {
        self.read_array().map(Tag::from)
    }

    /// Peek at the next tag without advancing.
    #[inline]
    pub fn peek_tag(&self) -> Result<Tag> {
        self.peek_bytes(Tag::SIZE)
            .map(|b| Tag::new(&[b[0], b[1], b[2], b[3]]))
    }

    /// Read `length` bytes of text, stopping at the first NUL.
    ///
    /// The full `length` bytes are consumed regardless of where the NUL sits.
    pub fn read_zstring(&mut self, length: usize) -> Result<String> {
        let bytes = self.read_bytes(length)?;
        Ok(latin1::decode(latin1::until_nul(bytes)))
    }

    /// Read a struct using zerocopy.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let offset = self.offset();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            offset,
            needed: size,
            available: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01u8, 0x02, 0x03, 0x04, // u32: 0x04030201
            0xFF, 0xFF, // i16: -1
            0x00, 0x00, 0x80, 0x3F, // f32: 1.0
        ];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u32().unwrap(), 0x04030201);
        assert_eq!(reader.read_i16().unwrap(), -1);
        assert_eq!(reader.read_f32().unwrap(), 1.0);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_zstring_consumes_whole_field() {
        let data = b"abc\0junk!";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.read_zstring(8).unwrap(), "abc");
        assert_eq!(reader.position(), 8);
        assert_eq!(reader.read_u8().unwrap(), b'!');
    }

    #[test]
    fn test_sub_reader_is_bounded() {
        let data = [0u8; 16];
        let mut reader = BinaryReader::with_base(&data, 100);
        reader.skip(4).unwrap();

        let mut child = reader.sub_reader(6).unwrap();
        assert_eq!(child.offset(), 104);
        child.read_u32().unwrap();

        match child.read_u32() {
            Err(Error::UnexpectedEof {
                offset,
                needed,
                available,
            }) => {
                assert_eq!(offset, 108);
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected EOF, got {:?}", other),
        }
        assert_eq!(reader.offset(), 110);
    }

    #[test]
    fn test_peek_tag_does_not_advance() {
        let data = b"NAME\x05\0\0\0";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.peek_tag().unwrap(), Tag::new(b"NAME"));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_tag().unwrap(), Tag::new(b"NAME"));
        assert_eq!(reader.read_u32().unwrap(), 5);
    }

    #[test]
    fn test_eof_error() {
        let data = [0x01, 0x02];
        let mut reader = BinaryReader::new(&data);

        assert!(reader.read_u32().is_err());
        assert_eq!(reader.position(), 0);
    }
}
