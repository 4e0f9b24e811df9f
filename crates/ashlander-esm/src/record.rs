//! The interface every storable record type implements.

use std::fmt;
use std::io::Write;

use ashlander_common::{BinaryReader, CountingWriter, Tag};

use crate::header::RecordHeader;
use crate::Result;

/// A top-level record that can be parsed from and written back to a file.
pub trait Record: Clone + PartialEq + fmt::Debug {
    /// Record type of this instance.
    fn tag(&self) -> Tag;

    /// Identifier the record is stored under.
    fn record_id(&self) -> &str;

    /// The two header flag words, written back unchanged.
    fn header_flags(&self) -> (i32, i32);

    /// Parse a record from its header and bounded payload.
    ///
    /// Implementations must consume the payload exactly.
    fn read(header: &RecordHeader, payload: BinaryReader<'_>) -> Result<Self>;

    /// Payload size in bytes, computed without writing.
    fn payload_size(&self) -> usize;

    /// Write the payload, i.e. everything after the record header.
    fn write_payload<W: Write + ?Sized>(&self, out: &mut W) -> Result<()>;

    /// Write header and payload.
    fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        let size = self.payload_size();
        let (flags_a, flags_b) = self.header_flags();
        RecordHeader::new(self.tag(), size as u32, flags_a, flags_b).write(out)?;

        let mut counted = CountingWriter::new(out);
        self.write_payload(&mut counted)?;
        debug_assert_eq!(
            counted.count(),
            size as u64,
            "{} {:?}: size calculation disagrees with writer",
            self.tag(),
            self.record_id()
        );
        Ok(())
    }

    /// Total bytes including the record header.
    fn total_size(&self) -> usize {
        RecordHeader::SIZE + self.payload_size()
    }
}
