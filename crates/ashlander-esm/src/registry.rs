//! All record stores for one loaded data set.

use std::collections::BTreeMap;

use ashlander_common::Tag;

use crate::records::{CreatureRecord, FileHeader, GenericRecord, NpcRecord};
use crate::store::{KeyCase, LoadOutcome, RecordStore};
use crate::{tags, Result};

/// The record stores a load fills and a save drains.
///
/// NPCs and creatures have typed stores; every other record type gets a
/// [`GenericRecord`] store, created the first time a record of that type is
/// merged.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Header of the most recently loaded file.
    pub header: Option<FileHeader>,
    pub npcs: RecordStore<NpcRecord>,
    pub creatures: RecordStore<CreatureRecord>,
    generic: BTreeMap<Tag, RecordStore<GenericRecord>>,
}

/// Identifier comparison policy for a generic record type.
///
/// Game settings and dialogue responses are looked up by exact identifier;
/// everything else ignores ASCII case, as the engine does.
pub fn key_case_for(tag: Tag) -> KeyCase {
    if tag == tags::GMST || tag == tags::INFO {
        KeyCase::Sensitive
    } else {
        KeyCase::Insensitive
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store for a generic record type, if any record of it was merged.
    pub fn generic(&self, tag: Tag) -> Option<&RecordStore<GenericRecord>> {
        self.generic.get(&tag)
    }

    /// Store for a generic record type, created on first use.
    pub fn generic_mut(&mut self, tag: Tag) -> &mut RecordStore<GenericRecord> {
        self.generic
            .entry(tag)
            .or_insert_with(|| RecordStore::new(key_case_for(tag)))
    }

    /// Generic stores in ascending tag order.
    pub fn generic_stores(&self) -> impl Iterator<Item = (Tag, &RecordStore<GenericRecord>)> {
        self.generic.iter().map(|(tag, store)| (*tag, store))
    }

    /// Merge a generic record into the store for its type.
    pub fn merge_generic(&mut self, record: GenericRecord) -> Result<LoadOutcome> {
        self.generic_mut(record.tag).merge(record)
    }

    /// Number of records of one type.
    pub fn count(&self, tag: Tag) -> usize {
        if tag == tags::NPC_ {
            self.npcs.len()
        } else if tag == tags::CREA {
            self.creatures.len()
        } else {
            self.generic.get(&tag).map_or(0, RecordStore::len)
        }
    }

    /// Record count per non-empty store, in ascending tag order.
    pub fn store_counts(&self) -> Vec<(Tag, usize)> {
        let mut counts: Vec<(Tag, usize)> = self
            .generic
            .iter()
            .map(|(tag, store)| (*tag, store.len()))
            .chain([(tags::NPC_, self.npcs.len()), (tags::CREA, self.creatures.len())])
            .filter(|(_, len)| *len > 0)
            .collect();
        counts.sort_by_key(|(tag, _)| *tag);
        counts
    }

    /// Records across all stores, header excluded.
    pub fn total_records(&self) -> usize {
        self.npcs.len()
            + self.creatures.len()
            + self.generic.values().map(RecordStore::len).sum::<usize>()
    }

    /// Drop every record and the header.
    pub fn clear_all(&mut self) {
        self.header = None;
        self.npcs.clear();
        self.creatures.clear();
        self.generic.clear();
    }
}
