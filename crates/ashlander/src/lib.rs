//! Ashlander - Morrowind game data library.
//!
//! This crate provides a unified interface to the Ashlander library crates
//! for reading, merging and writing Morrowind master and plugin files.
//!
//! # Crates
//!
//! - [`ashlander_common`] - Binary reading and writing, tags, Latin-1 text
//! - [`ashlander_esm`] - TES3 records, stores, routers and file I/O
//!
//! # Example
//!
//! ```no_run
//! use ashlander::prelude::*;
//!
//! let mut registry = Registry::new();
//! for file in ["Morrowind.esm", "Tribunal.esm", "MyMod.esp"] {
//!     let report = load_file(file, &mut registry)?;
//!     println!("{}: {} changed", file, report.changes());
//! }
//!
//! for npc in &registry.npcs {
//!     if npc.actor.is_trainer() {
//!         println!("{} trains", npc.record_id);
//!     }
//! }
//! # Ok::<(), ashlander::esm::Error>(())
//! ```

pub use ashlander_common as common;
pub use ashlander_esm as esm;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use ashlander_common::{BinaryReader, Tag};
    pub use ashlander_esm::records::{
        ActorCore, AiData, AiPackage, CreatureRecord, FileHeader, GenericRecord, NpcRecord,
    };
    pub use ashlander_esm::{
        load_file, load_file_with, save_file, FullRouter, LoadOptions, LoadOutcome, LoadReport,
        Loader, Record, RecordStore, Registry, Router, ScriptRouter,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
