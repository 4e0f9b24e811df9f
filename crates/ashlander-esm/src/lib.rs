//! Morrowind ESM/ESP (TES3) record codec.
//!
//! Plugin and master files are a `TES3` header record followed by a flat
//! run of top-level records. Each record is a 16-byte [`RecordHeader`] and a
//! payload of tag-length-value [subrecords](subrecord).
//!
//! # Structure
//!
//! - [`subrecord`] - The TLV protocol, generic over the length width
//! - [`RecordHeader`] - The fixed record header
//! - [`records`] - Typed NPC and creature records, raw records for the rest
//! - [`RecordStore`] - Records keyed by identifier, merged on load
//! - [`Router`] - Reads one record and sends it to its store, or skips it
//! - [`load_file`] / [`save_file`] - Whole-file I/O over a [`Registry`]
//!
//! # Example
//!
//! ```no_run
//! use ashlander_esm::{load_file, save_file, Registry};
//!
//! let mut registry = Registry::new();
//! let report = load_file("Morrowind.esm", &mut registry)?;
//! println!("{} records, {} failed", report.records, report.failures.len());
//!
//! let fargoth = registry.npcs.get("fargoth")?;
//! println!("{} carries {} items", fargoth.record_id, fargoth.actor.items.len());
//!
//! save_file("Copy.esm", &registry)?;
//! # Ok::<(), ashlander_esm::Error>(())
//! ```

mod error;
mod file;
mod header;
mod record;
mod registry;
mod router;
mod store;

pub mod records;
pub mod subrecord;
pub mod tags;

pub use error::{Error, Result};
pub use file::{load_file, load_file_with, save_file, write_to, LoadOptions, LoadReport, Loader};
pub use header::RecordHeader;
pub use record::Record;
pub use registry::{key_case_for, Registry};
pub use router::{
    Dispatch, DispatchTable, FullRouter, RecordFailure, RecordKind, Router, ScriptRouter,
};
pub use store::{legacy_code_of, KeyCase, LoadOutcome, RecordStore};

// Re-export commonly used types at crate root
pub use records::{CreatureRecord, FileHeader, GenericRecord, NpcRecord};
pub use subrecord::{LengthField, Narrow, StringLimit, Subrecord, SubrecordReader, Wide};
