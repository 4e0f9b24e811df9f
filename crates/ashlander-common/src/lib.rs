//! Common utilities for Ashlander.
//!
//! This crate provides the foundational types used by the record codec:
//!
//! - [`BinaryReader`] - Zero-copy, bounds-checked reading from byte slices
//! - [`WriteExt`] - Tag and string writers over any [`std::io::Write`]
//! - [`Tag`] - Four-character record and subrecord type codes
//! - [`FixedString`] - NUL-padded text fields that keep stray padding
//! - [`latin1`] - Lossless single-byte text conversion

mod error;
mod fixed;
mod reader;
mod tag;
mod writer;

pub mod latin1;

pub use error::{Error, Result};
pub use fixed::FixedString;
pub use reader::BinaryReader;
pub use tag::Tag;
pub use writer::{CountingWriter, WriteExt};

/// Re-export byteorder for the integer writers.
pub use byteorder::{LittleEndian, WriteBytesExt};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
