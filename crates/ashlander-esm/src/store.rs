//! Keyed record collections with merge-on-load semantics.

use std::borrow::Cow;
use std::fmt;
use std::io::Write;

use indexmap::map::Entry;
use indexmap::IndexMap;
use crate::record::Record;
use crate::{Error, Result};

/// How identifiers are compared within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// ASCII case is ignored (`Fargoth` and `fargoth` are the same record).
    #[default]
    Insensitive,
    /// Identifiers compare byte for byte.
    Sensitive,
}

impl KeyCase {
    fn normalize<'a>(self, id: &'a str) -> Cow<'a, str> {
        match self {
            KeyCase::Sensitive => Cow::Borrowed(id),
            KeyCase::Insensitive if id.bytes().any(|b| b.is_ascii_uppercase()) => {
                Cow::Owned(id.to_ascii_lowercase())
            }
            KeyCase::Insensitive => Cow::Borrowed(id),
        }
    }
}

/// Effect of merging one parsed record into a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOutcome {
    /// No record with that identifier existed.
    Inserted,
    /// An identical record was already present.
    Unchanged,
    /// A different record with that identifier was replaced.
    Updated,
}

impl LoadOutcome {
    /// Whether the store content changed.
    pub fn is_change(self) -> bool {
        !matches!(self, LoadOutcome::Unchanged)
    }

    /// The older integer encoding: 1 for a change, 0 for none.
    pub fn legacy_code(self) -> i32 {
        if self.is_change() {
            1
        } else {
            0
        }
    }
}

/// The older integer encoding of a load step: -1 on error, otherwise
/// [`LoadOutcome::legacy_code`].
pub fn legacy_code_of(result: &Result<LoadOutcome>) -> i32 {
    match result {
        Ok(outcome) => outcome.legacy_code(),
        Err(_) => -1,
    }
}

/// Records of one type keyed by identifier, iterated in insertion order.
#[derive(Clone)]
pub struct RecordStore<R> {
    records: IndexMap<String, R>,
    key_case: KeyCase,
}

impl<R> Default for RecordStore<R> {
    fn default() -> Self {
        Self::new(KeyCase::default())
    }
}

impl<R: fmt::Debug> fmt::Debug for RecordStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("key_case", &self.key_case)
            .field("len", &self.records.len())
            .finish()
    }
}

impl<R> RecordStore<R> {
    pub fn new(key_case: KeyCase) -> Self {
        Self {
            records: IndexMap::new(),
            key_case,
        }
    }

    pub fn key_case(&self) -> KeyCase {
        self.key_case
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has(&self, id: &str) -> bool {
        self.records.contains_key(self.key_case.normalize(id).as_ref())
    }

    pub fn find(&self, id: &str) -> Option<&R> {
        self.records.get(self.key_case.normalize(id).as_ref())
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut R> {
        let key = self.key_case.normalize(id);
        self.records.get_mut(key.as_ref())
    }

    /// Look up a record, failing with [`Error::NotFound`] if it is absent.
    pub fn get(&self, id: &str) -> Result<&R> {
        self.find(id).ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    /// Remove a record. Remaining records keep their order.
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let key = self.key_case.normalize(id);
        self.records.shift_remove(key.as_ref())
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &R> + '_ {
        self.records.values()
    }
}

impl<R: Record> RecordStore<R> {
    /// Insert or replace a record, returning the one it displaced.
    ///
    /// Fails with [`Error::EmptyIdentifier`] if the record has no identifier.
    pub fn add(&mut self, record: R) -> Result<Option<R>> {
        let key = self.key_for(&record)?;
        Ok(self.records.insert(key, record))
    }

    /// Merge a freshly parsed record.
    ///
    /// A replaced record keeps its position in iteration order. A record
    /// without an identifier is refused with [`Error::EmptyIdentifier`] and
    /// the store is left as it was.
    pub fn merge(&mut self, record: R) -> Result<LoadOutcome> {
        let key = self.key_for(&record)?;
        Ok(match self.records.entry(key) {
            Entry::Occupied(slot) if *slot.get() == record => LoadOutcome::Unchanged,
            Entry::Occupied(mut slot) => {
                slot.insert(record);
                LoadOutcome::Updated
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                LoadOutcome::Inserted
            }
        })
    }

    fn key_for(&self, record: &R) -> Result<String> {
        match record.record_id() {
            "" => Err(Error::EmptyIdentifier { tag: record.tag() }),
            id => Ok(self.key_case.normalize(id).into_owned()),
        }
    }

    /// Write every record in order and return how many were written.
    pub fn save_all<W: Write + ?Sized>(&self, out: &mut W) -> Result<usize> {
        for record in self.records.values() {
            record.write(out)?;
        }
        Ok(self.records.len())
    }

    /// Bytes [`save_all`](Self::save_all) would write.
    pub fn encoded_size(&self) -> usize {
        self.records.values().map(Record::total_size).sum()
    }
}

impl<'a, R> IntoIterator for &'a RecordStore<R> {
    type Item = &'a R;
    type IntoIter = indexmap::map::Values<'a, String, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}
