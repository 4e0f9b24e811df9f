//! Record and subrecord type codes.

use ashlander_common::Tag;

// File header
pub const TES3: Tag = Tag::new(b"TES3");
pub const HEDR: Tag = Tag::new(b"HEDR");
pub const MAST: Tag = Tag::new(b"MAST");
pub const DATA: Tag = Tag::new(b"DATA");

// Top-level record types
pub const ACTI: Tag = Tag::new(b"ACTI");
pub const ALCH: Tag = Tag::new(b"ALCH");
pub const APPA: Tag = Tag::new(b"APPA");
pub const ARMO: Tag = Tag::new(b"ARMO");
pub const BODY: Tag = Tag::new(b"BODY");
pub const BOOK: Tag = Tag::new(b"BOOK");
pub const BSGN: Tag = Tag::new(b"BSGN");
pub const CELL: Tag = Tag::new(b"CELL");
pub const CLAS: Tag = Tag::new(b"CLAS");
pub const CLOT: Tag = Tag::new(b"CLOT");
pub const CONT: Tag = Tag::new(b"CONT");
pub const CREA: Tag = Tag::new(b"CREA");
pub const DIAL: Tag = Tag::new(b"DIAL");
pub const DOOR: Tag = Tag::new(b"DOOR");
pub const ENCH: Tag = Tag::new(b"ENCH");
pub const FACT: Tag = Tag::new(b"FACT");
pub const GLOB: Tag = Tag::new(b"GLOB");
pub const GMST: Tag = Tag::new(b"GMST");
pub const INFO: Tag = Tag::new(b"INFO");
pub const INGR: Tag = Tag::new(b"INGR");
pub const LAND: Tag = Tag::new(b"LAND");
pub const LEVC: Tag = Tag::new(b"LEVC");
pub const LEVI: Tag = Tag::new(b"LEVI");
pub const LIGH: Tag = Tag::new(b"LIGH");
pub const LOCK: Tag = Tag::new(b"LOCK");
pub const LTEX: Tag = Tag::new(b"LTEX");
pub const MGEF: Tag = Tag::new(b"MGEF");
pub const MISC: Tag = Tag::new(b"MISC");
pub const NPC_: Tag = Tag::new(b"NPC_");
pub const PGRD: Tag = Tag::new(b"PGRD");
pub const PROB: Tag = Tag::new(b"PROB");
pub const RACE: Tag = Tag::new(b"RACE");
pub const REGN: Tag = Tag::new(b"REGN");
pub const REPA: Tag = Tag::new(b"REPA");
pub const SCPT: Tag = Tag::new(b"SCPT");
pub const SKIL: Tag = Tag::new(b"SKIL");
pub const SNDG: Tag = Tag::new(b"SNDG");
pub const SOUN: Tag = Tag::new(b"SOUN");
pub const SPEL: Tag = Tag::new(b"SPEL");
pub const SSCR: Tag = Tag::new(b"SSCR");
pub const STAT: Tag = Tag::new(b"STAT");
pub const WEAP: Tag = Tag::new(b"WEAP");

// Common subrecords
pub const NAME: Tag = Tag::new(b"NAME");
pub const FNAM: Tag = Tag::new(b"FNAM");
pub const MODL: Tag = Tag::new(b"MODL");
pub const SCRI: Tag = Tag::new(b"SCRI");
pub const FLAG: Tag = Tag::new(b"FLAG");
pub const INDX: Tag = Tag::new(b"INDX");
pub const INAM: Tag = Tag::new(b"INAM");
pub const INTV: Tag = Tag::new(b"INTV");
pub const SCHD: Tag = Tag::new(b"SCHD");

// Actor subrecords
pub const RNAM: Tag = Tag::new(b"RNAM");
pub const CNAM: Tag = Tag::new(b"CNAM");
pub const ANAM: Tag = Tag::new(b"ANAM");
pub const BNAM: Tag = Tag::new(b"BNAM");
pub const KNAM: Tag = Tag::new(b"KNAM");
pub const NPDT: Tag = Tag::new(b"NPDT");
pub const NPCO: Tag = Tag::new(b"NPCO");
pub const NPCS: Tag = Tag::new(b"NPCS");
pub const AIDT: Tag = Tag::new(b"AIDT");
pub const AI_A: Tag = Tag::new(b"AI_A");
pub const AI_E: Tag = Tag::new(b"AI_E");
pub const AI_F: Tag = Tag::new(b"AI_F");
pub const AI_T: Tag = Tag::new(b"AI_T");
pub const AI_W: Tag = Tag::new(b"AI_W");
pub const CNDT: Tag = Tag::new(b"CNDT");
pub const DODT: Tag = Tag::new(b"DODT");
pub const DNAM: Tag = Tag::new(b"DNAM");
pub const XSCL: Tag = Tag::new(b"XSCL");
