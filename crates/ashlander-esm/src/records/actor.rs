//! The part of NPC and creature records after their fixed fields: inventory,
//! spells, AI parameters, AI packages and travel destinations.

use std::io::Write;

use ashlander_common::{LittleEndian, Tag, WriteBytesExt, WriteExt};

use super::ai::{read_vec3, services, AiData, AiPackage};
use super::{same_floats, FixedId};
use crate::subrecord::{LengthField, StringLimit, Subrecord, SubrecordReader, Wide};
use crate::{tags, Error, Result};

/// An inventory entry (`NPCO`, 36 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ItemStack {
    pub count: i32,
    pub item_id: FixedId,
}

impl ItemStack {
    pub const SIZE: usize = 36;

    pub fn new(count: i32, item_id: impl Into<String>) -> Self {
        Self {
            count,
            item_id: FixedId::new(item_id),
        }
    }

    fn read(sub: &Subrecord<'_>) -> Result<Self> {
        let mut r = sub.fixed(Self::SIZE)?;
        Ok(Self {
            count: r.read_i32()?,
            item_id: FixedId::read(&mut r)?,
        })
    }

    fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        Wide::write_header(out, tags::NPCO, Self::SIZE)?;
        out.write_i32::<LittleEndian>(self.count)?;
        self.item_id.write(out)?;
        Ok(())
    }
}

/// A travel service destination (`DODT`, optionally followed by `DNAM`).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TravelDestination {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    /// Interior cell name (`DNAM`); exterior destinations have none.
    pub cell_name: Option<String>,
}

impl TravelDestination {
    pub const SIZE: usize = 24;

    fn read(sub: &Subrecord<'_>) -> Result<Self> {
        let mut r = sub.fixed(Self::SIZE)?;
        Ok(Self {
            position: read_vec3(&mut r)?,
            rotation: read_vec3(&mut r)?,
            cell_name: None,
        })
    }

    fn size(&self) -> usize {
        let mut size = Wide::size_of(Self::SIZE);
        if let Some(cell) = &self.cell_name {
            size += Wide::size_of_string(cell);
        }
        size
    }

    fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        Wide::write_header(out, tags::DODT, Self::SIZE)?;
        out.write_vec3(&self.position)?;
        out.write_vec3(&self.rotation)?;
        if let Some(cell) = &self.cell_name {
            Wide::write_string(out, tags::DNAM, cell)?;
        }
        Ok(())
    }
}

impl PartialEq for TravelDestination {
    fn eq(&self, other: &Self) -> bool {
        same_floats(&self.position, &other.position)
            && same_floats(&self.rotation, &other.rotation)
            && self.cell_name == other.cell_name
    }
}

/// Inventory, spells and AI shared by NPCs and creatures.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ActorCore {
    pub items: Vec<ItemStack>,
    pub spells: Vec<FixedId>,
    pub ai_data: Option<AiData>,
    pub ai_packages: Vec<AiPackage>,
    pub destinations: Vec<TravelDestination>,
}

impl ActorCore {
    /// Offers training.
    pub fn is_trainer(&self) -> bool {
        self.offers(services::TRAINING)
    }

    /// Offers enchanting.
    pub fn is_enchanter(&self) -> bool {
        self.offers(services::ENCHANTING)
    }

    /// Offers spellmaking.
    pub fn is_spellmaker(&self) -> bool {
        self.offers(services::SPELLMAKING)
    }

    /// Offers repairs.
    pub fn does_repair(&self) -> bool {
        self.offers(services::REPAIR)
    }

    fn offers(&self, bits: u32) -> bool {
        self.ai_data.is_some_and(|data| data.offers(bits))
    }

    /// Parse the optional subrecord sequence up to the end of the payload.
    ///
    /// `after` is the tag of the last fixed subrecord, used when reporting a
    /// misplaced `CNDT` or `DNAM` at the very start. Tags the sequence does not
    /// know are offered to `extension`, which returns `Ok(true)` if it
    /// consumed them.
    pub(crate) fn read_sequence<'a, F>(
        reader: &mut SubrecordReader<'a>,
        record: Tag,
        after: Tag,
        mut extension: F,
    ) -> Result<Self>
    where
        F: FnMut(&Subrecord<'a>) -> Result<bool>,
    {
        let mut core = ActorCore::default();
        let mut previous = after;
        let mut pending: Option<TravelDestination> = None;

        while !reader.is_empty() {
            let next = reader.peek_tag()?;
            let sub = if next == tags::CNDT || next == tags::DNAM {
                reader.read_limited(StringLimit::Short)?
            } else {
                reader.read_subrecord()?
            };
            let tag = sub.tag;

            if tag == tags::NPCO {
                core.items.push(ItemStack::read(&sub)?);
            } else if tag == tags::NPCS {
                let mut r = sub.fixed(FixedId::WIDTH)?;
                core.spells.push(FixedId::read(&mut r)?);
            } else if tag == tags::AIDT {
                if core.ai_data.is_some() {
                    return Err(Error::DuplicateSubrecord {
                        offset: sub.offset,
                        record,
                        tag,
                    });
                }
                core.ai_data = Some(AiData::read(&sub)?);
            } else if AiPackage::is_package_tag(tag) {
                core.ai_packages.push(AiPackage::read(&sub)?);
            } else if tag == tags::CNDT {
                let target = if previous == tags::AI_E || previous == tags::AI_F {
                    core.ai_packages
                        .last_mut()
                        .and_then(AiPackage::escort_follow_mut)
                } else {
                    None
                };
                match target {
                    Some(package) => package.cell_name = Some(sub.string(StringLimit::Short)?),
                    None => {
                        return Err(Error::MisplacedSubrecord {
                            offset: sub.offset,
                            tag,
                            previous,
                        })
                    }
                }
            } else if tag == tags::DODT {
                if let Some(done) = pending.take() {
                    core.destinations.push(done);
                }
                pending = Some(TravelDestination::read(&sub)?);
            } else if tag == tags::DNAM {
                match pending.take() {
                    Some(mut destination) if previous == tags::DODT => {
                        destination.cell_name = Some(sub.string(StringLimit::Short)?);
                        core.destinations.push(destination);
                    }
                    _ => {
                        return Err(Error::MisplacedSubrecord {
                            offset: sub.offset,
                            tag,
                            previous,
                        })
                    }
                }
            } else if !extension(&sub)? {
                return Err(Error::foreign_subrecord(sub.offset, record, tag));
            }

            previous = tag;
        }

        if let Some(done) = pending {
            core.destinations.push(done);
        }
        Ok(core)
    }

    /// Bytes the sequence occupies on disk.
    pub fn size(&self) -> usize {
        let mut size = self.items.len() * Wide::size_of(ItemStack::SIZE)
            + self.spells.len() * Wide::size_of(FixedId::WIDTH);
        if self.ai_data.is_some() {
            size += Wide::size_of(AiData::SIZE);
        }
        size += self.ai_packages.iter().map(AiPackage::size).sum::<usize>();
        size += self
            .destinations
            .iter()
            .map(TravelDestination::size)
            .sum::<usize>();
        size
    }

    /// Write items, spells, AI data, packages and destinations in that order.
    pub(crate) fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        for item in &self.items {
            item.write(out)?;
        }
        for spell in &self.spells {
            Wide::write_header(out, tags::NPCS, FixedId::WIDTH)?;
            spell.write(out)?;
        }
        if let Some(data) = &self.ai_data {
            data.write(out)?;
        }
        for package in &self.ai_packages {
            package.write(out)?;
        }
        for destination in &self.destinations {
            destination.write(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ai::{EscortFollowPackage, WanderPackage};
    use ashlander_common::BinaryReader;

    const RECORD: Tag = tags::NPC_;

    fn parse(bytes: &[u8]) -> Result<ActorCore> {
        let mut reader = SubrecordReader::new(BinaryReader::new(bytes));
        ActorCore::read_sequence(&mut reader, RECORD, tags::FLAG, |_| Ok(false))
    }

    fn encode(core: &ActorCore) -> Vec<u8> {
        let mut out = Vec::new();
        core.write(&mut out).unwrap();
        assert_eq!(out.len(), core.size());
        out
    }

    fn sample() -> ActorCore {
        ActorCore {
            items: vec![ItemStack::new(3, "potion_cure_common_01")],
            spells: vec!["shield".into(), "fireball".into()],
            ai_data: Some(AiData {
                hello: 30,
                fight: 30,
                flee: 20,
                flags: services::TRAINING | services::SPELLS,
                ..Default::default()
            }),
            ai_packages: vec![
                AiPackage::Follow(EscortFollowPackage {
                    position: [10.0, -20.0, 5.5],
                    duration: 12,
                    target_id: "player".into(),
                    reset: 1,
                    cell_name: Some("Vivec, Arena".into()),
                }),
                AiPackage::Wander(WanderPackage {
                    distance: 512,
                    duration: 5,
                    idles: [60, 20, 10, 0, 0, 0, 0, 0],
                    ..Default::default()
                }),
            ],
            destinations: vec![
                TravelDestination {
                    position: [1.0, 2.0, 3.0],
                    rotation: [0.0, 0.0, 1.5],
                    cell_name: None,
                },
                TravelDestination {
                    position: [4.0, 5.0, 6.0],
                    rotation: [0.0, 0.0, 0.0],
                    cell_name: Some("Ebonheart, Grand Council Chambers".into()),
                },
            ],
        }
    }

    #[test]
    fn test_sequence_round_trip() {
        let core = sample();
        let bytes = encode(&core);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed, core);
        assert!(parsed.is_trainer());
        assert!(!parsed.is_enchanter());
        assert_eq!(encode(&parsed), bytes);
    }

    #[test]
    fn test_empty_sequence() {
        let core = parse(b"").unwrap();
        assert_eq!(core, ActorCore::default());
        assert!(!core.is_trainer());
        assert!(!core.does_repair());
        assert!(!core.is_spellmaker());
    }

    #[test]
    fn test_pending_destination_finalised_by_next_dodt() {
        let mut bytes = Vec::new();
        for _ in 0..2 {
            Wide::write(&mut bytes, tags::DODT, &[0u8; 24]).unwrap();
        }
        Wide::write_string(&mut bytes, tags::DNAM, "Caldera").unwrap();
        let core = parse(&bytes).unwrap();

        assert_eq!(core.destinations.len(), 2);
        assert_eq!(core.destinations[0].cell_name, None);
        assert_eq!(core.destinations[1].cell_name.as_deref(), Some("Caldera"));
    }

    #[test]
    fn test_empty_cell_names_survive() {
        let mut bytes = Vec::new();
        Wide::write(&mut bytes, tags::AI_F, &[0u8; 48]).unwrap();
        Wide::write(&mut bytes, tags::CNDT, b"\0").unwrap();
        Wide::write(&mut bytes, tags::DODT, &[0u8; 24]).unwrap();
        Wide::write(&mut bytes, tags::DNAM, b"\0").unwrap();
        let core = parse(&bytes).unwrap();

        match &core.ai_packages[0] {
            AiPackage::Follow(p) => assert_eq!(p.cell_name.as_deref(), Some("")),
            other => panic!("expected follow, got {:?}", other),
        }
        assert_eq!(core.destinations[0].cell_name.as_deref(), Some(""));
        assert_eq!(encode(&core), bytes);
    }

    #[test]
    fn test_id_padding_survives() {
        let mut item = 7i32.to_le_bytes().to_vec();
        item.extend_from_slice(b"gold_001\0");
        item.resize(36, 0xAB);
        let mut spell = b"shield\0".to_vec();
        spell.resize(32, 0x5C);

        let mut bytes = Vec::new();
        Wide::write(&mut bytes, tags::NPCO, &item).unwrap();
        Wide::write(&mut bytes, tags::NPCS, &spell).unwrap();
        let core = parse(&bytes).unwrap();

        assert_eq!(core.items[0].item_id, "gold_001");
        assert_eq!(core.spells[0], "shield");
        assert_ne!(core.items[0], ItemStack::new(7, "gold_001"));
        assert_eq!(encode(&core), bytes);

        let mut edited = core.clone();
        edited.items[0].item_id.set("gold_005");
        let reparsed = parse(&encode(&edited)).unwrap();
        assert_eq!(reparsed.items[0], ItemStack::new(7, "gold_005"));
    }

    #[test]
    fn test_duplicate_aidt() {
        let mut bytes = Vec::new();
        Wide::write(&mut bytes, tags::AIDT, &[0u8; 12]).unwrap();
        Wide::write(&mut bytes, tags::AIDT, &[0u8; 12]).unwrap();
        assert!(matches!(
            parse(&bytes),
            Err(Error::DuplicateSubrecord { tag, offset: 20, .. }) if tag == tags::AIDT
        ));
    }

    #[test]
    fn test_cndt_after_wander_is_misplaced() {
        let mut bytes = Vec::new();
        Wide::write(&mut bytes, tags::AI_W, &[0u8; 14]).unwrap();
        Wide::write_string(&mut bytes, tags::CNDT, "Balmora").unwrap();
        assert!(matches!(
            parse(&bytes),
            Err(Error::MisplacedSubrecord { tag, previous, .. })
                if tag == tags::CNDT && previous == tags::AI_W
        ));
    }

    #[test]
    fn test_cndt_at_start_is_misplaced() {
        let mut bytes = Vec::new();
        Wide::write_string(&mut bytes, tags::CNDT, "Balmora").unwrap();
        assert!(matches!(
            parse(&bytes),
            Err(Error::MisplacedSubrecord { previous, .. }) if previous == tags::FLAG
        ));
    }

    #[test]
    fn test_dnam_without_dodt_is_misplaced() {
        let mut bytes = Vec::new();
        Wide::write_string(&mut bytes, tags::DNAM, "Caldera").unwrap();
        assert!(matches!(
            parse(&bytes),
            Err(Error::MisplacedSubrecord { tag, .. }) if tag == tags::DNAM
        ));
    }

    #[test]
    fn test_dnam_must_directly_follow_dodt() {
        let mut bytes = Vec::new();
        Wide::write(&mut bytes, tags::DODT, &[0u8; 24]).unwrap();
        Wide::write(&mut bytes, tags::NPCS, &[0u8; 32]).unwrap();
        Wide::write_string(&mut bytes, tags::DNAM, "Caldera").unwrap();
        assert!(matches!(
            parse(&bytes),
            Err(Error::MisplacedSubrecord { previous, .. }) if previous == tags::NPCS
        ));
    }

    #[test]
    fn test_unknown_tag_aborts() {
        let mut bytes = Vec::new();
        Wide::write(&mut bytes, Tag::new(b"XXXX"), &[0u8; 4]).unwrap();
        assert!(matches!(
            parse(&bytes),
            Err(Error::UnexpectedTag { found, .. }) if found == Tag::new(b"XXXX")
        ));
    }

    #[test]
    fn test_extension_consumes_tags() {
        let mut bytes = Vec::new();
        Wide::write(&mut bytes, tags::XSCL, &1.5f32.to_le_bytes()).unwrap();
        let mut seen = 0;
        let mut reader = SubrecordReader::new(BinaryReader::new(&bytes));
        let core = ActorCore::read_sequence(&mut reader, tags::CREA, tags::FLAG, |sub| {
            seen += 1;
            Ok(sub.tag == tags::XSCL)
        })
        .unwrap();
        assert_eq!(seen, 1);
        assert_eq!(core, ActorCore::default());
    }

    #[test]
    fn test_overlong_subrecord_is_truncated() {
        let mut bytes = Vec::new();
        Wide::write(&mut bytes, tags::NPCS, &[0u8; 32]).unwrap();
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(parse(&bytes), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = sample();
        let mut copy = original.clone();
        if let Some(package) = copy.ai_packages[0].escort_follow_mut() {
            package.cell_name = Some("Elsewhere".into());
        }
        assert_ne!(copy, original);
        assert_eq!(
            original.ai_packages[0],
            sample().ai_packages[0],
            "mutating a clone must not touch the source"
        );
    }
}
