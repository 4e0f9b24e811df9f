//! Non-player character records (`NPC_`).

use std::io::Write;

use ashlander_common::{BinaryReader, LittleEndian, Tag, WriteBytesExt};

use super::actor::ActorCore;
use crate::header::RecordHeader;
use crate::record::Record;
use crate::subrecord::{LengthField, StringLimit, Subrecord, SubrecordReader, Wide};
use crate::{tags, Error, Result};

/// Bits of [`NpcRecord::flags`].
pub mod npc_flags {
    pub const FEMALE: u32 = 0x0001;
    pub const ESSENTIAL: u32 = 0x0002;
    pub const RESPAWN: u32 = 0x0004;
    pub const AUTO_CALC: u32 = 0x0010;
    pub const WHITE_BLOOD: u32 = 0x0400;
    pub const GOLD_BLOOD: u32 = 0x0800;
}

/// Statistics of an NPC whose attributes and skills are stored explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FullNpcStats {
    pub level: i16,
    /// Strength, intelligence, willpower, agility, speed, endurance,
    /// personality, luck.
    pub attributes: [u8; 8],
    pub skills: [u8; 27],
    pub reputation: u8,
    pub health: i16,
    pub spell_points: i16,
    pub fatigue: i16,
    pub disposition: u8,
    pub faction_id: u8,
    pub rank: u8,
    pub unknown1: u8,
    pub gold: i32,
}

impl Default for FullNpcStats {
    fn default() -> Self {
        Self {
            level: 1,
            attributes: [0; 8],
            skills: [0; 27],
            reputation: 0,
            health: 0,
            spell_points: 0,
            fatigue: 0,
            disposition: 0,
            faction_id: 0,
            rank: 0,
            unknown1: 0,
            gold: 0,
        }
    }
}

/// NPC statistics (`NPDT`), in one of its two on-disk sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NpcStats {
    /// 12-byte form used by auto-calculated NPCs.
    Compact {
        level: i16,
        disposition: u8,
        faction_id: u8,
        rank: u8,
        unknown1: u8,
        unknown2: u8,
        unknown3: u8,
        gold: i32,
    },
    /// 52-byte form with explicit attributes and skills.
    Full(FullNpcStats),
}

impl Default for NpcStats {
    fn default() -> Self {
        NpcStats::Compact {
            level: 1,
            disposition: 0,
            faction_id: 0,
            rank: 0,
            unknown1: 0,
            unknown2: 0,
            unknown3: 0,
            gold: 0,
        }
    }
}

impl NpcStats {
    pub const COMPACT_SIZE: usize = 12;
    pub const FULL_SIZE: usize = 52;

    pub fn level(&self) -> i16 {
        match self {
            NpcStats::Compact { level, .. } => *level,
            NpcStats::Full(stats) => stats.level,
        }
    }

    pub fn disposition(&self) -> u8 {
        match self {
            NpcStats::Compact { disposition, .. } => *disposition,
            NpcStats::Full(stats) => stats.disposition,
        }
    }

    pub fn gold(&self) -> i32 {
        match self {
            NpcStats::Compact { gold, .. } => *gold,
            NpcStats::Full(stats) => stats.gold,
        }
    }

    /// Payload size of the `NPDT` subrecord.
    pub fn size(&self) -> usize {
        match self {
            NpcStats::Compact { .. } => Self::COMPACT_SIZE,
            NpcStats::Full(_) => Self::FULL_SIZE,
        }
    }

    fn read(sub: &Subrecord<'_>) -> Result<Self> {
        let mut r = sub.reader();
        match sub.len() {
            Self::COMPACT_SIZE => Ok(NpcStats::Compact {
                level: r.read_i16()?,
                disposition: r.read_u8()?,
                faction_id: r.read_u8()?,
                rank: r.read_u8()?,
                unknown1: r.read_u8()?,
                unknown2: r.read_u8()?,
                unknown3: r.read_u8()?,
                gold: r.read_i32()?,
            }),
            Self::FULL_SIZE => Ok(NpcStats::Full(FullNpcStats {
                level: r.read_i16()?,
                attributes: r.read_array()?,
                skills: r.read_array()?,
                reputation: r.read_u8()?,
                health: r.read_i16()?,
                spell_points: r.read_i16()?,
                fatigue: r.read_i16()?,
                disposition: r.read_u8()?,
                faction_id: r.read_u8()?,
                rank: r.read_u8()?,
                unknown1: r.read_u8()?,
                gold: r.read_i32()?,
            })),
            actual => Err(Error::InvalidLength {
                offset: sub.offset,
                tag: sub.tag,
                expected: format!("{} or {}", Self::COMPACT_SIZE, Self::FULL_SIZE),
                actual,
            }),
        }
    }

    fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        Wide::write_header(out, tags::NPDT, self.size())?;
        match self {
            NpcStats::Compact {
                level,
                disposition,
                faction_id,
                rank,
                unknown1,
                unknown2,
                unknown3,
                gold,
            } => {
                out.write_i16::<LittleEndian>(*level)?;
                out.write_all(&[
                    *disposition,
                    *faction_id,
                    *rank,
                    *unknown1,
                    *unknown2,
                    *unknown3,
                ])?;
                out.write_i32::<LittleEndian>(*gold)?;
            }
            NpcStats::Full(s) => {
                out.write_i16::<LittleEndian>(s.level)?;
                out.write_all(&s.attributes)?;
                out.write_all(&s.skills)?;
                out.write_u8(s.reputation)?;
                out.write_i16::<LittleEndian>(s.health)?;
                out.write_i16::<LittleEndian>(s.spell_points)?;
                out.write_i16::<LittleEndian>(s.fatigue)?;
                out.write_all(&[s.disposition, s.faction_id, s.rank, s.unknown1])?;
                out.write_i32::<LittleEndian>(s.gold)?;
            }
        }
        Ok(())
    }
}

/// A non-player character.
///
/// The optional strings (`model`, `name`, `script`) are written only when
/// present, so a present but empty one survives a round trip.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NpcRecord {
    pub record_id: String,
    pub model: Option<String>,
    pub name: Option<String>,
    pub race: String,
    pub class: String,
    pub faction: String,
    pub head: String,
    pub hair: String,
    pub script: Option<String>,
    pub stats: NpcStats,
    /// See [`npc_flags`].
    pub flags: u32,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub actor: ActorCore,
    pub flags_a: i32,
    pub flags_b: i32,
}

impl NpcRecord {
    /// Create an NPC with the required identifiers and default statistics.
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            ..Default::default()
        }
    }

    pub fn is_female(&self) -> bool {
        self.flags & npc_flags::FEMALE != 0
    }

    pub fn is_essential(&self) -> bool {
        self.flags & npc_flags::ESSENTIAL != 0
    }

    pub fn respawns(&self) -> bool {
        self.flags & npc_flags::RESPAWN != 0
    }

    pub fn auto_calc_stats(&self) -> bool {
        self.flags & npc_flags::AUTO_CALC != 0
    }

    pub fn has_white_blood(&self) -> bool {
        self.flags & npc_flags::WHITE_BLOOD != 0
    }

    pub fn has_gold_blood(&self) -> bool {
        self.flags & npc_flags::GOLD_BLOOD != 0
    }
}

/// Fields collected while reading the unordered block before `FLAG`.
#[derive(Default)]
struct CoreFields {
    model: Option<String>,
    name: Option<String>,
    race: Option<String>,
    class: Option<String>,
    faction: Option<String>,
    head: Option<String>,
    hair: Option<String>,
    script: Option<String>,
    stats: Option<NpcStats>,
}

fn store_once(slot: &mut Option<String>, sub: &Subrecord<'_>) -> Result<()> {
    if slot.is_some() {
        return Err(Error::DuplicateSubrecord {
            offset: sub.offset,
            record: tags::NPC_,
            tag: sub.tag,
        });
    }
    *slot = Some(sub.string(StringLimit::Short)?);
    Ok(())
}

fn is_identity_string(tag: Tag) -> bool {
    [
        tags::MODL,
        tags::FNAM,
        tags::RNAM,
        tags::CNAM,
        tags::ANAM,
        tags::BNAM,
        tags::KNAM,
        tags::SCRI,
    ]
    .contains(&tag)
}

fn required(slot: Option<String>, tag: Tag) -> Result<String> {
    slot.ok_or(Error::MissingSubrecord {
        record: tags::NPC_,
        tag,
    })
}

impl Record for NpcRecord {
    fn tag(&self) -> Tag {
        tags::NPC_
    }

    fn record_id(&self) -> &str {
        &self.record_id
    }

    fn header_flags(&self) -> (i32, i32) {
        (self.flags_a, self.flags_b)
    }

    fn read(header: &RecordHeader, payload: BinaryReader<'_>) -> Result<Self> {
        let mut reader = SubrecordReader::<Wide>::new(payload);
        let record_id = reader.read_string_expected(tags::NAME, StringLimit::Short)?;

        // The identity block may come in any order; FLAG closes it.
        let mut core = CoreFields::default();
        let flag = loop {
            let sub = if is_identity_string(reader.peek_tag()?) {
                reader.read_limited(StringLimit::Short)?
            } else {
                reader.read_subrecord()?
            };
            match sub.tag {
                t if t == tags::FLAG => break sub,
                t if t == tags::MODL => store_once(&mut core.model, &sub)?,
                t if t == tags::FNAM => store_once(&mut core.name, &sub)?,
                t if t == tags::RNAM => store_once(&mut core.race, &sub)?,
                t if t == tags::CNAM => store_once(&mut core.class, &sub)?,
                t if t == tags::ANAM => store_once(&mut core.faction, &sub)?,
                t if t == tags::BNAM => store_once(&mut core.head, &sub)?,
                t if t == tags::KNAM => store_once(&mut core.hair, &sub)?,
                t if t == tags::SCRI => store_once(&mut core.script, &sub)?,
                t if t == tags::NPDT => {
                    if core.stats.is_some() {
                        return Err(Error::DuplicateSubrecord {
                            offset: sub.offset,
                            record: tags::NPC_,
                            tag: t,
                        });
                    }
                    core.stats = Some(NpcStats::read(&sub)?);
                }
                found => {
                    return Err(Error::UnexpectedTag {
                        offset: sub.offset,
                        expected: "one of ANAM, BNAM, CNAM, FNAM, KNAM, MODL, NPDT, RNAM, SCRI, FLAG"
                            .into(),
                        found,
                    })
                }
            }
        };
        let flags = flag.fixed(4)?.read_u32()?;

        let actor = ActorCore::read_sequence(&mut reader, tags::NPC_, tags::FLAG, |_| Ok(false))?;
        reader.finish(tags::NPC_, header.offset)?;

        Ok(Self {
            record_id,
            model: core.model,
            name: core.name,
            race: required(core.race, tags::RNAM)?,
            class: required(core.class, tags::CNAM)?,
            faction: required(core.faction, tags::ANAM)?,
            head: required(core.head, tags::BNAM)?,
            hair: required(core.hair, tags::KNAM)?,
            script: core.script,
            stats: core.stats.ok_or(Error::MissingSubrecord {
                record: tags::NPC_,
                tag: tags::NPDT,
            })?,
            flags,
            actor,
            flags_a: header.flags_a,
            flags_b: header.flags_b,
        })
    }

    fn payload_size(&self) -> usize {
        let mut size = Wide::size_of_string(&self.record_id)
            + Wide::size_of_string(&self.race)
            + Wide::size_of_string(&self.class)
            + Wide::size_of_string(&self.faction)
            + Wide::size_of_string(&self.head)
            + Wide::size_of_string(&self.hair)
            + Wide::size_of(self.stats.size())
            + Wide::size_of(4);
        for optional in [&self.model, &self.name, &self.script].into_iter().flatten() {
            size += Wide::size_of_string(optional);
        }
        size + self.actor.size()
    }

    fn write_payload<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        Wide::write_string(out, tags::NAME, &self.record_id)?;
        if let Some(model) = &self.model {
            Wide::write_string(out, tags::MODL, model)?;
        }
        if let Some(name) = &self.name {
            Wide::write_string(out, tags::FNAM, name)?;
        }
        Wide::write_string(out, tags::RNAM, &self.race)?;
        Wide::write_string(out, tags::CNAM, &self.class)?;
        Wide::write_string(out, tags::ANAM, &self.faction)?;
        Wide::write_string(out, tags::BNAM, &self.head)?;
        Wide::write_string(out, tags::KNAM, &self.hair)?;
        if let Some(script) = &self.script {
            Wide::write_string(out, tags::SCRI, script)?;
        }
        self.stats.write(out)?;
        Wide::write_header(out, tags::FLAG, 4)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        self.actor.write(out)
    }
}
