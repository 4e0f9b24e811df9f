//! Error types for ESM parsing and writing.

use ashlander_common::Tag;
use thiserror::Error;

/// Errors that can occur when reading or writing ESM/ESP data.
///
/// Offsets are absolute positions in the loaded buffer.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Not enough bytes left for a header or payload.
    #[error("truncated data at offset {offset:#x}: needed {needed} bytes but only {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A tag did not match anything legal at that parse position.
    #[error("unexpected tag at offset {offset:#x}: expected {expected}, found {found}")]
    UnexpectedTag {
        offset: usize,
        expected: String,
        found: Tag,
    },

    /// A string subrecord declared a length above its ceiling.
    #[error("{tag} at offset {offset:#x} declares {length} bytes, limit is {limit}")]
    OversizedField {
        offset: usize,
        tag: Tag,
        length: usize,
        limit: usize,
    },

    /// A subrecord that may occur once occurred again.
    #[error("duplicate {tag} subrecord at offset {offset:#x} in {record} record")]
    DuplicateSubrecord {
        offset: usize,
        record: Tag,
        tag: Tag,
    },

    /// A subrecord appeared somewhere it is not legal (e.g. `CNDT` without a
    /// preceding escort or follow package).
    #[error("{tag} at offset {offset:#x} cannot follow {previous}")]
    MisplacedSubrecord {
        offset: usize,
        tag: Tag,
        previous: Tag,
    },

    /// A record with an empty identifier, which no store can key.
    #[error("{tag} record has an empty identifier")]
    EmptyIdentifier { tag: Tag },

    /// A required subrecord never appeared.
    #[error("{record} record is missing its {tag} subrecord")]
    MissingSubrecord { record: Tag, tag: Tag },

    /// A fixed-shape subrecord had the wrong size.
    #[error("{tag} at offset {offset:#x} is {actual} bytes, expected {expected}")]
    InvalidLength {
        offset: usize,
        tag: Tag,
        expected: String,
        actual: usize,
    },

    /// A record's subrecords did not add up to its declared size.
    #[error("{tag} record at offset {offset:#x} declares {declared} bytes but its subrecords use {consumed}")]
    SizeMismatch {
        offset: usize,
        tag: Tag,
        declared: usize,
        consumed: usize,
    },

    /// A top-level record type nobody handles.
    #[error("unknown record type {tag} at offset {offset:#x}")]
    UnknownRecordType { offset: usize, tag: Tag },

    /// The file does not begin with a TES3 header.
    #[error("not a TES3 file: found {found} where TES3 was expected")]
    InvalidMagic { found: Tag },

    /// Lookup of a record that is not in the store.
    #[error("record not found: {id}")]
    NotFound { id: String },

    /// Loading was cancelled between records.
    #[error("load cancelled at offset {offset:#x}")]
    Cancelled { offset: usize },
}

impl Error {
    /// A specific tag was required but another one was found.
    pub(crate) fn expected_tag(offset: usize, expected: Tag, found: Tag) -> Self {
        Error::UnexpectedTag {
            offset,
            expected: expected.to_string(),
            found,
        }
    }

    /// A tag that has no meaning inside a record of type `record`.
    pub(crate) fn foreign_subrecord(offset: usize, record: Tag, found: Tag) -> Self {
        Error::UnexpectedTag {
            offset,
            expected: format!("a {} subrecord", record),
            found,
        }
    }

    /// Whether the error ends the whole load rather than a single record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::UnknownRecordType { .. }
                | Error::InvalidMagic { .. }
                | Error::Cancelled { .. }
        )
    }
}

impl From<ashlander_common::Error> for Error {
    fn from(err: ashlander_common::Error) -> Self {
        match err {
            ashlander_common::Error::UnexpectedEof {
                offset,
                needed,
                available,
            } => Error::Truncated {
                offset,
                needed,
                available,
            },
            ashlander_common::Error::Io(e) => Error::Io(e),
        }
    }
}

/// Result type for ESM operations.
pub type Result<T> = std::result::Result<T, Error>;
