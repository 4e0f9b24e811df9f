//! Record types.
//!
//! Actors ([`NpcRecord`], [`CreatureRecord`]) are fully modelled. Every other
//! record type is carried as a [`GenericRecord`], which keeps its subrecords
//! verbatim.

mod actor;
mod ai;
mod creature;
mod file_header;
mod generic;
mod npc;

pub use actor::{ActorCore, ItemStack, TravelDestination};
pub use ai::{
    services, ActivatePackage, AiData, AiPackage, EscortFollowPackage, TravelPackage,
    WanderPackage,
};
pub use creature::{creature_flags, CreatureRecord, CreatureStats};
pub use file_header::{FileHeader, MasterFile};
pub use generic::{GenericRecord, KeyRule, RawSubrecord};
pub use npc::{npc_flags, FullNpcStats, NpcRecord, NpcStats};

/// A 32-byte identifier field (inventory items, spells, AI targets).
pub type FixedId = ashlander_common::FixedString<32>;

/// Compare floats so that NaN equals NaN.
pub(crate) fn same_float(a: f32, b: f32) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

pub(crate) fn same_optional_float(a: Option<f32>, b: Option<f32>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_float(a, b),
        (a, b) => a.is_none() && b.is_none(),
    }
}

pub(crate) fn same_floats(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| same_float(x, y))
}
