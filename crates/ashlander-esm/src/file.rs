//! Loading and saving whole plugin files.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use ashlander_common::{BinaryReader, Tag};
use memmap2::Mmap;
use tracing::{debug, info, warn};

use crate::header::RecordHeader;
use crate::record::Record;
use crate::records::{FileHeader, GenericRecord};
use crate::registry::Registry;
use crate::router::{Dispatch, FullRouter, RecordFailure, Router};
use crate::store::LoadOutcome;
use crate::{tags, Error, Result};

/// Settings for a load.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Fail on the first record that cannot be parsed instead of recording
    /// it in [`LoadReport::failures`] and moving on.
    pub strict: bool,
}

/// Summary of one load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub inserted: usize,
    pub unchanged: usize,
    pub updated: usize,
    /// Records the router did not want.
    pub skipped: usize,
    /// Top-level records seen after the header.
    pub records: usize,
    /// Records that failed to parse, in file order.
    pub failures: Vec<RecordFailure>,
}

impl LoadReport {
    /// Records that changed a store.
    pub fn changes(&self) -> usize {
        self.inserted + self.updated
    }

    fn count(&mut self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Inserted => self.inserted += 1,
            LoadOutcome::Unchanged => self.unchanged += 1,
            LoadOutcome::Updated => self.updated += 1,
        }
    }
}

/// Drives a [`Router`] over a complete file image.
#[derive(Debug, Clone, Copy, Default)]
pub struct Loader<'c> {
    options: LoadOptions,
    cancel: Option<&'c AtomicBool>,
}

impl<'c> Loader<'c> {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Stop the load with [`Error::Cancelled`] once `flag` is set. The flag
    /// is checked between records.
    pub fn with_cancel(mut self, flag: &'c AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Load a file image into `registry`.
    ///
    /// The buffer must start with a `TES3` header. Records merged before a
    /// fatal error stay in the registry.
    pub fn load<R: Router + ?Sized>(
        &self,
        data: &[u8],
        registry: &mut Registry,
        router: &mut R,
    ) -> Result<LoadReport> {
        let mut reader = BinaryReader::new(data);
        let header = RecordHeader::read(&mut reader)?;
        if header.tag != tags::TES3 {
            return Err(Error::InvalidMagic { found: header.tag });
        }
        let payload = header.payload(&mut reader)?;
        let file_header = FileHeader::read(&header, payload)?;
        debug!(
            version = file_header.version,
            records = file_header.record_count,
            masters = file_header.masters.len(),
            "read file header"
        );
        registry.header = Some(file_header);

        let mut report = LoadReport::default();
        while !reader.is_empty() {
            if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(Error::Cancelled {
                    offset: reader.offset(),
                });
            }

            report.records += 1;
            match router.process_next_record(&mut reader, registry)? {
                Dispatch::Loaded { outcome, .. } => report.count(outcome),
                Dispatch::Skipped { .. } => report.skipped += 1,
                Dispatch::Failed(failure) if self.options.strict => return Err(failure.error),
                Dispatch::Failed(failure) => report.failures.push(failure),
            }
        }

        info!(
            records = report.records,
            inserted = report.inserted,
            unchanged = report.unchanged,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failures.len(),
            "load finished"
        );
        Ok(report)
    }

    /// Map a file and load it.
    pub fn load_file<R: Router + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        registry: &mut Registry,
        router: &mut R,
    ) -> Result<LoadReport> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Error::Truncated {
                offset: 0,
                needed: RecordHeader::SIZE,
                available: 0,
            });
        }
        // SAFETY: read-only map, dropped before returning.
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(path = %path.display(), size = mmap.len(), "loading");
        self.load(&mmap, registry, router)
    }
}

/// Load every known record type from a file.
pub fn load_file(path: impl AsRef<Path>, registry: &mut Registry) -> Result<LoadReport> {
    load_file_with(path, registry, &mut FullRouter::new())
}

/// Load a file through the given router.
pub fn load_file_with<R: Router + ?Sized>(
    path: impl AsRef<Path>,
    registry: &mut Registry,
    router: &mut R,
) -> Result<LoadReport> {
    Loader::default().load_file(path, registry, router)
}

/// Save the registry, replacing `path` only once the write succeeded.
///
/// The data is written to `<path>.tmp` first and renamed over the target.
pub fn save_file(path: impl AsRef<Path>, registry: &Registry) -> Result<()> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    let result = File::create(&temp_path)
        .map_err(Error::from)
        .and_then(|file| {
            let mut out = BufWriter::new(file);
            write_to(&mut out, registry)?;
            out.flush()?;
            Ok(())
        });
    if let Err(error) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }

    fs::rename(&temp_path, path)?;
    info!(path = %path.display(), records = registry.total_records(), "saved");
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write the registry as a complete file: header, then records.
///
/// Game settings come first, then the other stores in ascending tag order.
/// Dialogue responses are written right after their topic. The header's
/// record count is set to the number of records written.
pub fn write_to<W: Write + ?Sized>(out: &mut W, registry: &Registry) -> Result<()> {
    let mut header = registry.header.clone().unwrap_or_default();
    header.record_count = u32::try_from(registry.total_records()).unwrap_or(u32::MAX);
    header.write(out)?;

    let mut order: Vec<Tag> = registry
        .generic_stores()
        .map(|(tag, _)| tag)
        .filter(|tag| *tag != tags::GMST && *tag != tags::INFO)
        .chain([tags::NPC_, tags::CREA])
        .collect();
    order.sort();

    let mut written = 0;
    if let Some(settings) = registry.generic(tags::GMST) {
        written += settings.save_all(out)?;
    }
    for tag in order {
        written += if tag == tags::NPC_ {
            registry.npcs.save_all(out)?
        } else if tag == tags::CREA {
            registry.creatures.save_all(out)?
        } else if tag == tags::DIAL {
            write_dialogue(out, registry)?
        } else {
            registry.generic(tag).map_or(Ok(0), |store| store.save_all(out))?
        };
    }
    if registry.generic(tags::DIAL).is_none() {
        written += write_dialogue(out, registry)?;
    }

    debug_assert_eq!(written, registry.total_records());
    Ok(())
}

/// Write topics, each followed by its responses. Responses whose topic is
/// not in the registry go last, in load order.
fn write_dialogue<W: Write + ?Sized>(out: &mut W, registry: &Registry) -> Result<usize> {
    let topic_of = |info: &GenericRecord| {
        info.parent_topic
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase()
    };

    let mut by_topic: HashMap<String, Vec<&GenericRecord>> = HashMap::new();
    if let Some(infos) = registry.generic(tags::INFO) {
        for info in infos {
            by_topic.entry(topic_of(info)).or_default().push(info);
        }
    }

    let mut written = 0;
    let mut placed = HashSet::new();
    if let Some(topics) = registry.generic(tags::DIAL) {
        for topic in topics {
            topic.write(out)?;
            written += 1;
            let key = topic.id.to_ascii_lowercase();
            for info in by_topic.get(&key).into_iter().flatten() {
                info.write(out)?;
                written += 1;
            }
            placed.insert(key);
        }
    }

    if let Some(infos) = registry.generic(tags::INFO) {
        let orphans: Vec<&GenericRecord> = infos
            .iter()
            .filter(|info| !placed.contains(&topic_of(*info)))
            .collect();
        if !orphans.is_empty() {
            warn!(count = orphans.len(), "dialogue responses without a known topic");
        }
        for info in orphans {
            info.write(out)?;
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{NpcRecord, RawSubrecord};
    use crate::subrecord::{LengthField, Wide};

    fn file_image(registry: &Registry) -> Vec<u8> {
        let mut out = Vec::new();
        write_to(&mut out, registry).unwrap();
        out
    }

    fn named(tag: Tag, id: &str) -> GenericRecord {
        GenericRecord::new(tag, vec![RawSubrecord::string(tags::NAME, id)]).unwrap()
    }

    fn info(id: &str, topic: Option<&str>) -> GenericRecord {
        let mut record =
            GenericRecord::new(tags::INFO, vec![RawSubrecord::string(tags::INAM, id)]).unwrap();
        record.parent_topic = topic.map(str::to_string);
        record
    }

    fn tag_sequence(bytes: &[u8]) -> Vec<(Tag, String)> {
        let mut reader = BinaryReader::new(bytes);
        let mut seen = Vec::new();
        while !reader.is_empty() {
            let header = RecordHeader::read(&mut reader).unwrap();
            let payload = header.payload(&mut reader).unwrap();
            let id = if header.tag == tags::TES3 {
                String::new()
            } else if header.tag == tags::NPC_ {
                NpcRecord::read(&header, payload).unwrap().record_id
            } else {
                GenericRecord::read(&header, payload).unwrap().id
            };
            seen.push((header.tag, id));
        }
        seen
    }

    #[test]
    fn test_empty_registry_writes_header_only() {
        let bytes = file_image(&Registry::new());
        assert_eq!(bytes.len(), RecordHeader::SIZE + FileHeader::MIN_PAYLOAD);

        let mut registry = Registry::new();
        let report = Loader::default()
            .load(&bytes, &mut registry, &mut FullRouter::new())
            .unwrap();
        assert_eq!(report.records, 0);
        assert_eq!(registry.header.unwrap().record_count, 0);
    }

    #[test]
    fn test_save_order() {
        let mut registry = Registry::new();
        registry.merge_generic(named(tags::STAT, "rock")).unwrap();
        registry.merge_generic(named(tags::DIAL, "Background")).unwrap();
        registry.merge_generic(info("3", None)).unwrap();
        registry.merge_generic(info("1", Some("background"))).unwrap();
        registry.merge_generic(named(tags::GMST, "sMonthMorningstar")).unwrap();
        registry.merge_generic(named(tags::ACTI, "sign")).unwrap();
        registry.merge_generic(named(tags::DIAL, "Rumors")).unwrap();
        registry.merge_generic(info("2", Some("Rumors"))).unwrap();
        registry.npcs.merge(NpcRecord::new("fargoth")).unwrap();

        let order: Vec<_> = tag_sequence(&file_image(&registry))
            .into_iter()
            .map(|(tag, id)| format!("{}:{}", tag, id))
            .collect();
        assert_eq!(
            order,
            [
                "TES3:",
                "GMST:sMonthMorningstar",
                "ACTI:sign",
                "DIAL:Background",
                "INFO:1",
                "DIAL:Rumors",
                "INFO:2",
                "INFO:3",
                "NPC_:fargoth",
                "STAT:rock",
            ]
        );
    }

    #[test]
    fn test_record_count_is_updated() {
        let mut registry = Registry::new();
        registry.header = Some(FileHeader {
            record_count: 999,
            ..Default::default()
        });
        registry.merge_generic(named(tags::STAT, "a")).unwrap();
        registry.merge_generic(named(tags::STAT, "b")).unwrap();

        let bytes = file_image(&registry);
        let mut loaded = Registry::new();
        Loader::default()
            .load(&bytes, &mut loaded, &mut FullRouter::new())
            .unwrap();
        assert_eq!(loaded.header.unwrap().record_count, 2);
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = Vec::new();
        named(tags::STAT, "a").write(&mut bytes).unwrap();
        let err = Loader::default()
            .load(&bytes, &mut Registry::new(), &mut FullRouter::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { found } if found == tags::STAT));
    }

    #[test]
    fn test_cancel_between_records() {
        let mut registry = Registry::new();
        registry.merge_generic(named(tags::STAT, "a")).unwrap();
        let bytes = file_image(&registry);

        let flag = AtomicBool::new(true);
        let err = Loader::default()
            .with_cancel(&flag)
            .load(&bytes, &mut Registry::new(), &mut FullRouter::new())
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_strict_mode() {
        let mut bytes = file_image(&Registry::new());
        let mut payload = Vec::new();
        Wide::write_string(&mut payload, tags::MODL, "x.nif").unwrap();
        RecordHeader::new(tags::STAT, payload.len() as u32, 0, 0)
            .write(&mut bytes)
            .unwrap();
        bytes.extend(payload);

        let report = Loader::default()
            .load(&bytes, &mut Registry::new(), &mut FullRouter::new())
            .unwrap();
        assert_eq!(report.failures.len(), 1);

        let strict = Loader::new(LoadOptions { strict: true });
        let err = strict
            .load(&bytes, &mut Registry::new(), &mut FullRouter::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingSubrecord { .. }));
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path_for(Path::new("/data/mod.esp")),
            PathBuf::from("/data/mod.esp.tmp")
        );
    }
}
