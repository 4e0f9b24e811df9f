//! AI parameters and AI packages carried by actors.

use std::io::Write;

use ashlander_common::{BinaryReader, LittleEndian, Tag, WriteBytesExt, WriteExt};

use super::{same_floats, FixedId};
use crate::subrecord::{LengthField, Subrecord, Wide};
use crate::{tags, Result};

/// Service bits of [`AiData::flags`].
pub mod services {
    pub const WEAPON: u32 = 0x00001;
    pub const ARMOR: u32 = 0x00002;
    pub const CLOTHING: u32 = 0x00004;
    pub const BOOKS: u32 = 0x00008;
    pub const INGREDIENTS: u32 = 0x00010;
    pub const PICKS: u32 = 0x00020;
    pub const PROBES: u32 = 0x00040;
    pub const LIGHTS: u32 = 0x00080;
    pub const APPARATUS: u32 = 0x00100;
    pub const REPAIR_ITEMS: u32 = 0x00200;
    pub const MISC: u32 = 0x00400;
    pub const SPELLS: u32 = 0x00800;
    pub const MAGIC_ITEMS: u32 = 0x01000;
    pub const POTIONS: u32 = 0x02000;
    pub const TRAINING: u32 = 0x04000;
    pub const SPELLMAKING: u32 = 0x08000;
    pub const ENCHANTING: u32 = 0x10000;
    pub const REPAIR: u32 = 0x20000;
}

/// AI parameters (`AIDT`, 12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AiData {
    pub hello: u8,
    pub unknown1: u8,
    pub fight: u8,
    pub flee: u8,
    pub alarm: u8,
    pub unknown2: u8,
    pub unknown3: u8,
    pub unknown4: u8,
    /// Services offered, see [`services`].
    pub flags: u32,
}

impl AiData {
    pub const SIZE: usize = 12;

    pub(crate) fn read(sub: &Subrecord<'_>) -> Result<Self> {
        let mut r = sub.fixed(Self::SIZE)?;
        Ok(Self {
            hello: r.read_u8()?,
            unknown1: r.read_u8()?,
            fight: r.read_u8()?,
            flee: r.read_u8()?,
            alarm: r.read_u8()?,
            unknown2: r.read_u8()?,
            unknown3: r.read_u8()?,
            unknown4: r.read_u8()?,
            flags: r.read_u32()?,
        })
    }

    pub(crate) fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        Wide::write_header(out, tags::AIDT, Self::SIZE)?;
        out.write_all(&[
            self.hello,
            self.unknown1,
            self.fight,
            self.flee,
            self.alarm,
            self.unknown2,
            self.unknown3,
            self.unknown4,
        ])?;
        out.write_u32::<LittleEndian>(self.flags)?;
        Ok(())
    }

    /// Whether any of `bits` is offered.
    pub fn offers(&self, bits: u32) -> bool {
        self.flags & bits != 0
    }
}

/// Activate a target (`AI_A`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ActivatePackage {
    pub target_id: FixedId,
    pub reset: u8,
}

/// Escort or follow a target (`AI_E` / `AI_F`, optionally followed by `CNDT`).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EscortFollowPackage {
    pub position: [f32; 3],
    pub duration: i16,
    pub target_id: FixedId,
    pub reset: i16,
    /// Cell the package applies in (`CNDT`).
    pub cell_name: Option<String>,
}

/// Travel to a point (`AI_T`).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TravelPackage {
    pub position: [f32; 3],
    pub reset: i32,
}

/// Wander around (`AI_W`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WanderPackage {
    pub distance: i16,
    pub duration: i16,
    pub time_of_day: u8,
    pub idles: [u8; 8],
    pub reset: u8,
}

// Float coordinates compare NaN-equal so a reloaded record is recognised as
// unchanged even when it carries NaN positions.
impl PartialEq for EscortFollowPackage {
    fn eq(&self, other: &Self) -> bool {
        same_floats(&self.position, &other.position)
            && self.duration == other.duration
            && self.target_id == other.target_id
            && self.reset == other.reset
            && self.cell_name == other.cell_name
    }
}

impl PartialEq for TravelPackage {
    fn eq(&self, other: &Self) -> bool {
        same_floats(&self.position, &other.position) && self.reset == other.reset
    }
}

/// One AI behaviour of an actor.
///
/// Packages are kept in file order; equality is positional.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AiPackage {
    Activate(ActivatePackage),
    Escort(EscortFollowPackage),
    Follow(EscortFollowPackage),
    Travel(TravelPackage),
    Wander(WanderPackage),
}

impl AiPackage {
    const ACTIVATE_SIZE: usize = 33;
    const ESCORT_FOLLOW_SIZE: usize = 48;
    const TRAVEL_SIZE: usize = 16;
    const WANDER_SIZE: usize = 14;

    /// Whether `tag` introduces a package.
    pub fn is_package_tag(tag: Tag) -> bool {
        tag == tags::AI_A
            || tag == tags::AI_E
            || tag == tags::AI_F
            || tag == tags::AI_T
            || tag == tags::AI_W
    }

    /// Subrecord tag of this package.
    pub fn tag(&self) -> Tag {
        match self {
            AiPackage::Activate(_) => tags::AI_A,
            AiPackage::Escort(_) => tags::AI_E,
            AiPackage::Follow(_) => tags::AI_F,
            AiPackage::Travel(_) => tags::AI_T,
            AiPackage::Wander(_) => tags::AI_W,
        }
    }

    /// Short name for display.
    pub fn kind(&self) -> &'static str {
        match self {
            AiPackage::Activate(_) => "activate",
            AiPackage::Escort(_) => "escort",
            AiPackage::Follow(_) => "follow",
            AiPackage::Travel(_) => "travel",
            AiPackage::Wander(_) => "wander",
        }
    }

    /// The escort/follow payload, if this is one.
    pub fn escort_follow_mut(&mut self) -> Option<&mut EscortFollowPackage> {
        match self {
            AiPackage::Escort(p) | AiPackage::Follow(p) => Some(p),
            _ => None,
        }
    }

    /// Decode a package subrecord. The caller has checked the tag with
    /// [`is_package_tag`](Self::is_package_tag).
    pub(crate) fn read(sub: &Subrecord<'_>) -> Result<Self> {
        match sub.tag {
            t if t == tags::AI_A => {
                let mut r = sub.fixed(Self::ACTIVATE_SIZE)?;
                Ok(AiPackage::Activate(ActivatePackage {
                    target_id: FixedId::read(&mut r)?,
                    reset: r.read_u8()?,
                }))
            }
            t if t == tags::AI_E || t == tags::AI_F => {
                let mut r = sub.fixed(Self::ESCORT_FOLLOW_SIZE)?;
                let package = EscortFollowPackage {
                    position: read_vec3(&mut r)?,
                    duration: r.read_i16()?,
                    target_id: FixedId::read(&mut r)?,
                    reset: r.read_i16()?,
                    cell_name: None,
                };
                Ok(if t == tags::AI_E {
                    AiPackage::Escort(package)
                } else {
                    AiPackage::Follow(package)
                })
            }
            t if t == tags::AI_T => {
                let mut r = sub.fixed(Self::TRAVEL_SIZE)?;
                Ok(AiPackage::Travel(TravelPackage {
                    position: read_vec3(&mut r)?,
                    reset: r.read_i32()?,
                }))
            }
            _ => {
                let mut r = sub.fixed(Self::WANDER_SIZE)?;
                Ok(AiPackage::Wander(WanderPackage {
                    distance: r.read_i16()?,
                    duration: r.read_i16()?,
                    time_of_day: r.read_u8()?,
                    idles: r.read_array()?,
                    reset: r.read_u8()?,
                }))
            }
        }
    }

    /// Bytes this package occupies on disk, `CNDT` included.
    pub fn size(&self) -> usize {
        match self {
            AiPackage::Activate(_) => Wide::size_of(Self::ACTIVATE_SIZE),
            AiPackage::Escort(p) | AiPackage::Follow(p) => {
                let mut size = Wide::size_of(Self::ESCORT_FOLLOW_SIZE);
                if let Some(cell) = &p.cell_name {
                    size += Wide::size_of_string(cell);
                }
                size
            }
            AiPackage::Travel(_) => Wide::size_of(Self::TRAVEL_SIZE),
            AiPackage::Wander(_) => Wide::size_of(Self::WANDER_SIZE),
        }
    }

    pub(crate) fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        match self {
            AiPackage::Activate(p) => {
                Wide::write_header(out, tags::AI_A, Self::ACTIVATE_SIZE)?;
                p.target_id.write(out)?;
                out.write_u8(p.reset)?;
            }
            AiPackage::Escort(p) | AiPackage::Follow(p) => {
                Wide::write_header(out, self.tag(), Self::ESCORT_FOLLOW_SIZE)?;
                out.write_vec3(&p.position)?;
                out.write_i16::<LittleEndian>(p.duration)?;
                p.target_id.write(out)?;
                out.write_i16::<LittleEndian>(p.reset)?;
                if let Some(cell) = &p.cell_name {
                    Wide::write_string(out, tags::CNDT, cell)?;
                }
            }
            AiPackage::Travel(p) => {
                Wide::write_header(out, tags::AI_T, Self::TRAVEL_SIZE)?;
                out.write_vec3(&p.position)?;
                out.write_i32::<LittleEndian>(p.reset)?;
            }
            AiPackage::Wander(p) => {
                Wide::write_header(out, tags::AI_W, Self::WANDER_SIZE)?;
                out.write_i16::<LittleEndian>(p.distance)?;
                out.write_i16::<LittleEndian>(p.duration)?;
                out.write_u8(p.time_of_day)?;
                out.write_all(&p.idles)?;
                out.write_u8(p.reset)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn read_vec3(r: &mut BinaryReader<'_>) -> Result<[f32; 3]> {
    Ok([r.read_f32()?, r.read_f32()?, r.read_f32()?])
}
