//! Creature records (`CREA`).

use std::io::Write;

use ashlander_common::{BinaryReader, LittleEndian, Tag, WriteBytesExt};

use super::actor::ActorCore;
use super::same_optional_float;
use crate::header::RecordHeader;
use crate::record::Record;
use crate::subrecord::{LengthField, StringLimit, SubrecordReader, Wide};
use crate::{tags, Error, Result};

/// Bits of [`CreatureRecord::flags`].
pub mod creature_flags {
    pub const BIPED: u32 = 0x0001;
    pub const RESPAWN: u32 = 0x0002;
    pub const WEAPON_AND_SHIELD: u32 = 0x0004;
    pub const SWIMS: u32 = 0x0010;
    pub const FLIES: u32 = 0x0020;
    pub const WALKS: u32 = 0x0040;
    pub const ESSENTIAL: u32 = 0x0080;
    pub const SKELETON_BLOOD: u32 = 0x0400;
    pub const METAL_BLOOD: u32 = 0x0800;
}

/// Creature statistics (`NPDT`, 96 bytes of little-endian `i32`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CreatureStats {
    /// 0 creature, 1 daedra, 2 undead, 3 humanoid.
    pub creature_type: i32,
    pub level: i32,
    /// Strength, intelligence, willpower, agility, speed, endurance,
    /// personality, luck.
    pub attributes: [i32; 8],
    pub health: i32,
    pub spell_points: i32,
    pub fatigue: i32,
    pub soul: i32,
    pub combat: i32,
    pub magic: i32,
    pub stealth: i32,
    /// Min/max damage for each of the three attacks.
    pub attacks: [[i32; 2]; 3],
    pub gold: i32,
}

impl CreatureStats {
    pub const SIZE: usize = 96;

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        let creature_type = r.read_i32()?;
        let level = r.read_i32()?;
        let mut attributes = [0i32; 8];
        for value in &mut attributes {
            *value = r.read_i32()?;
        }
        let health = r.read_i32()?;
        let spell_points = r.read_i32()?;
        let fatigue = r.read_i32()?;
        let soul = r.read_i32()?;
        let combat = r.read_i32()?;
        let magic = r.read_i32()?;
        let stealth = r.read_i32()?;
        let mut attacks = [[0i32; 2]; 3];
        for attack in &mut attacks {
            attack[0] = r.read_i32()?;
            attack[1] = r.read_i32()?;
        }
        Ok(Self {
            creature_type,
            level,
            attributes,
            health,
            spell_points,
            fatigue,
            soul,
            combat,
            magic,
            stealth,
            attacks,
            gold: r.read_i32()?,
        })
    }

    fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        Wide::write_header(out, tags::NPDT, Self::SIZE)?;
        let head = [self.creature_type, self.level];
        let middle = [
            self.health,
            self.spell_points,
            self.fatigue,
            self.soul,
            self.combat,
            self.magic,
            self.stealth,
        ];
        let values = head
            .iter()
            .chain(&self.attributes)
            .chain(&middle)
            .chain(self.attacks.iter().flatten())
            .chain(std::iter::once(&self.gold));
        for &value in values {
            out.write_i32::<LittleEndian>(value)?;
        }
        Ok(())
    }
}

/// A creature.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CreatureRecord {
    pub record_id: String,
    pub model: String,
    /// Creature whose sounds this one borrows (`CNAM`).
    pub sound_gen: Option<String>,
    pub name: String,
    pub script: Option<String>,
    pub stats: CreatureStats,
    /// See [`creature_flags`].
    pub flags: u32,
    /// Render scale (`XSCL`); the game uses 1.0 when absent.
    pub scale: Option<f32>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub actor: ActorCore,
    pub flags_a: i32,
    pub flags_b: i32,
}

impl PartialEq for CreatureRecord {
    fn eq(&self, other: &Self) -> bool {
        self.record_id == other.record_id
            && self.model == other.model
            && self.sound_gen == other.sound_gen
            && self.name == other.name
            && self.script == other.script
            && self.stats == other.stats
            && self.flags == other.flags
            && same_optional_float(self.scale, other.scale)
            && self.actor == other.actor
            && self.flags_a == other.flags_a
            && self.flags_b == other.flags_b
    }
}

impl CreatureRecord {
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            ..Default::default()
        }
    }

    pub fn is_biped(&self) -> bool {
        self.flags & creature_flags::BIPED != 0
    }

    pub fn respawns(&self) -> bool {
        self.flags & creature_flags::RESPAWN != 0
    }

    pub fn has_weapon_and_shield(&self) -> bool {
        self.flags & creature_flags::WEAPON_AND_SHIELD != 0
    }

    pub fn swims(&self) -> bool {
        self.flags & creature_flags::SWIMS != 0
    }

    pub fn flies(&self) -> bool {
        self.flags & creature_flags::FLIES != 0
    }

    pub fn walks(&self) -> bool {
        self.flags & creature_flags::WALKS != 0
    }

    pub fn is_essential(&self) -> bool {
        self.flags & creature_flags::ESSENTIAL != 0
    }

    /// Scale the creature is rendered at.
    pub fn render_scale(&self) -> f32 {
        self.scale.unwrap_or(1.0)
    }
}

impl Record for CreatureRecord {
    fn tag(&self) -> Tag {
        tags::CREA
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
        let model = reader.read_string_expected(tags::MODL, StringLimit::Short)?;

        let sound_gen = if reader.peek_tag()? == tags::CNAM {
            Some(reader.read_string_expected(tags::CNAM, StringLimit::Short)?)
        } else {
            None
        };
        let name = reader.read_string_expected(tags::FNAM, StringLimit::Short)?;
        let script = if reader.peek_tag()? == tags::SCRI {
            Some(reader.read_string_expected(tags::SCRI, StringLimit::Short)?)
        } else {
            None
        };

        let stats = CreatureStats::read(&mut reader.read_fixed(tags::NPDT, CreatureStats::SIZE)?)?;
        let flags = reader.read_fixed(tags::FLAG, 4)?.read_u32()?;

        let mut scale: Option<f32> = None;
        let actor = ActorCore::read_sequence(&mut reader, tags::CREA, tags::FLAG, |sub| {
            if sub.tag != tags::XSCL {
                return Ok(false);
            }
            if scale.is_some() {
                return Err(Error::DuplicateSubrecord {
                    offset: sub.offset,
                    record: tags::CREA,
                    tag: tags::XSCL,
                });
            }
            scale = Some(sub.fixed(4)?.read_f32()?);
            Ok(true)
        })?;
        reader.finish(tags::CREA, header.offset)?;

        Ok(Self {
            record_id,
            model,
            sound_gen,
            name,
            script,
            stats,
            flags,
            scale,
            actor,
            flags_a: header.flags_a,
            flags_b: header.flags_b,
        })
    }

    fn payload_size(&self) -> usize {
        let mut size = Wide::size_of_string(&self.record_id)
            + Wide::size_of_string(&self.model)
            + Wide::size_of_string(&self.name)
            + Wide::size_of(CreatureStats::SIZE)
            + Wide::size_of(4);
        if let Some(sound_gen) = &self.sound_gen {
            size += Wide::size_of_string(sound_gen);
        }
        if let Some(script) = &self.script {
            size += Wide::size_of_string(script);
        }
        if self.scale.is_some() {
            size += Wide::size_of(4);
        }
        size + self.actor.size()
    }

    fn write_payload<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        Wide::write_string(out, tags::NAME, &self.record_id)?;
        Wide::write_string(out, tags::MODL, &self.model)?;
        if let Some(sound_gen) = &self.sound_gen {
            Wide::write_string(out, tags::CNAM, sound_gen)?;
        }
        Wide::write_string(out, tags::FNAM, &self.name)?;
        if let Some(script) = &self.script {
            Wide::write_string(out, tags::SCRI, script)?;
        }
        self.stats.write(out)?;
        Wide::write_header(out, tags::FLAG, 4)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        if let Some(scale) = self.scale {
            Wide::write_header(out, tags::XSCL, 4)?;
            out.write_f32::<LittleEndian>(scale)?;
        }
        self.actor.write(out)
    }
}
