//! Routing top-level records to their parsers and stores.
//!
//! A router reads one record header, decides from the tag what to do with
//! the record and either parses it into the [`Registry`] or skips it. The
//! header is always read first, so the payload extent is known before any
//! parsing starts and a record that fails to parse can be stepped over.

use ashlander_common::{BinaryReader, Tag};
use tracing::{debug, warn};

use crate::header::RecordHeader;
use crate::record::Record;
use crate::records::{CreatureRecord, GenericRecord, KeyRule, NpcRecord};
use crate::registry::Registry;
use crate::store::LoadOutcome;
use crate::{tags, Error, Result};

/// How a record type is parsed and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Npc,
    Creature,
    Generic(KeyRule),
}

/// Every top-level record type a Morrowind data file may contain, after the
/// `TES3` header.
const KNOWN_TAGS: [Tag; 42] = [
    tags::ACTI,
    tags::ALCH,
    tags::APPA,
    tags::ARMO,
    tags::BODY,
    tags::BOOK,
    tags::BSGN,
    tags::CELL,
    tags::CLAS,
    tags::CLOT,
    tags::CONT,
    tags::CREA,
    tags::DIAL,
    tags::DOOR,
    tags::ENCH,
    tags::FACT,
    tags::GLOB,
    tags::GMST,
    tags::INFO,
    tags::INGR,
    tags::LAND,
    tags::LEVC,
    tags::LEVI,
    tags::LIGH,
    tags::LOCK,
    tags::LTEX,
    tags::MGEF,
    tags::MISC,
    tags::NPC_,
    tags::PGRD,
    tags::PROB,
    tags::RACE,
    tags::REGN,
    tags::REPA,
    tags::SCPT,
    tags::SKIL,
    tags::SNDG,
    tags::SOUN,
    tags::SPEL,
    tags::SSCR,
    tags::STAT,
    tags::WEAP,
];

/// Record types script compilation needs to resolve identifiers.
const SCRIPT_TAGS: [Tag; 7] = [
    tags::NPC_,
    tags::CREA,
    tags::ACTI,
    tags::CONT,
    tags::STAT,
    tags::GLOB,
    tags::SCPT,
];

/// The closed mapping from record tag to [`RecordKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchTable;

impl DispatchTable {
    /// Kind of a record type, or `None` for a tag no Morrowind file uses.
    pub fn kind(tag: Tag) -> Option<RecordKind> {
        if tag == tags::NPC_ {
            Some(RecordKind::Npc)
        } else if tag == tags::CREA {
            Some(RecordKind::Creature)
        } else if KNOWN_TAGS.contains(&tag) {
            Some(RecordKind::Generic(KeyRule::for_tag(tag)))
        } else {
            None
        }
    }

    /// All known record tags, ascending.
    pub fn tags() -> &'static [Tag] {
        &KNOWN_TAGS
    }
}

/// A record that could not be parsed. The load continues after it.
#[derive(Debug)]
pub struct RecordFailure {
    /// Offset of the record header.
    pub offset: usize,
    pub tag: Tag,
    pub error: Error,
}

/// What happened to one top-level record.
#[derive(Debug)]
pub enum Dispatch {
    /// Parsed and merged.
    Loaded { tag: Tag, outcome: LoadOutcome },
    /// Not wanted by this router; the payload was stepped over.
    Skipped { tag: Tag },
    /// Parsing failed; the store is untouched.
    Failed(RecordFailure),
}

/// Processes one top-level record at a time.
pub trait Router {
    /// Read the record at the reader's position and route it.
    ///
    /// On `Ok` the reader is positioned after the record, whatever happened
    /// to it. An `Err` is fatal to the load: an unknown record type or a
    /// header or payload running past the end of the buffer.
    fn process_next_record(
        &mut self,
        reader: &mut BinaryReader<'_>,
        registry: &mut Registry,
    ) -> Result<Dispatch>;
}

/// Loads every known record type.
#[derive(Debug, Clone, Default)]
pub struct FullRouter {
    topics: TopicTracker,
}

impl FullRouter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Router for FullRouter {
    fn process_next_record(
        &mut self,
        reader: &mut BinaryReader<'_>,
        registry: &mut Registry,
    ) -> Result<Dispatch> {
        route(reader, registry, &mut self.topics, |_| true)
    }
}

/// Loads only what script compilation needs and skips everything else.
#[derive(Debug, Clone, Default)]
pub struct ScriptRouter {
    topics: TopicTracker,
}

impl ScriptRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether records of this type are loaded.
    pub fn wants(tag: Tag) -> bool {
        SCRIPT_TAGS.contains(&tag)
    }
}

impl Router for ScriptRouter {
    fn process_next_record(
        &mut self,
        reader: &mut BinaryReader<'_>,
        registry: &mut Registry,
    ) -> Result<Dispatch> {
        route(reader, registry, &mut self.topics, Self::wants)
    }
}

/// Remembers the most recent dialogue topic so responses can be tied to it.
#[derive(Debug, Clone, Default)]
struct TopicTracker {
    current: Option<String>,
}

fn route(
    reader: &mut BinaryReader<'_>,
    registry: &mut Registry,
    topics: &mut TopicTracker,
    wanted: impl Fn(Tag) -> bool,
) -> Result<Dispatch> {
    let header = RecordHeader::read(reader)?;
    let kind = DispatchTable::kind(header.tag).ok_or(Error::UnknownRecordType {
        offset: header.offset,
        tag: header.tag,
    })?;
    let payload = header.payload(reader)?;

    if !wanted(header.tag) {
        debug!(tag = %header.tag, offset = header.offset, "skipping record");
        return Ok(Dispatch::Skipped { tag: header.tag });
    }

    let outcome = match kind {
        RecordKind::Npc => {
            NpcRecord::read(&header, payload).and_then(|r| registry.npcs.merge(r))
        }
        RecordKind::Creature => {
            CreatureRecord::read(&header, payload).and_then(|r| registry.creatures.merge(r))
        }
        RecordKind::Generic(_) => match GenericRecord::read(&header, payload) {
            Ok(mut record) => {
                if record.tag == tags::DIAL {
                    topics.current = (!record.id.is_empty()).then(|| record.id.clone());
                } else if record.tag == tags::INFO {
                    record.parent_topic = topics.current.clone();
                }
                registry.merge_generic(record)
            }
            Err(error) => {
                if header.tag == tags::DIAL {
                    topics.current = None;
                }
                Err(error)
            }
        },
    };

    match outcome {
        Ok(outcome) => Ok(Dispatch::Loaded {
            tag: header.tag,
            outcome,
        }),
        Err(error) => {
            warn!(tag = %header.tag, offset = header.offset, %error, "record skipped");
            Ok(Dispatch::Failed(RecordFailure {
                offset: header.offset,
                tag: header.tag,
                error,
            }))
        }
    }
}
