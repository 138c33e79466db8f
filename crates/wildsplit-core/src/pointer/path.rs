use std::fmt;

use crate::error::Result;
use crate::memory::ReadMemory;
use crate::pointer::{CollectionLayout, TrackedValue};

/// Resolved location of a tracked value
///
/// `base` is the absolute address of a static field slot. Reading walks the offsets: each one
/// dereferences the current address and adds the offset. The value itself sits at the final
/// address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerPath {
    value: TrackedValue,
    base: u64,
    offsets: Vec<u64>,
}

impl PointerPath {
    pub fn new(value: TrackedValue, base: u64, offsets: Vec<u64>) -> Self {
        Self {
            value,
            base,
            offsets,
        }
    }

    pub fn value(&self) -> TrackedValue {
        self.value
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Current address of the value.
    ///
    /// Objects move and get replaced while the game runs, so this is re-evaluated on every
    /// read instead of being cached.
    pub fn address<R: ReadMemory + ?Sized>(&self, reader: &R) -> Result<u64> {
        let mut address = self.base;
        for offset in &self.offsets {
            address = reader.read_ptr(address)?.wrapping_add(*offset);
        }
        Ok(address)
    }

    /// Read the pointer stored at the end of the path.
    pub fn read_ptr<R: ReadMemory + ?Sized>(&self, reader: &R) -> Result<u64> {
        reader.read_ptr(self.address(reader)?)
    }
}

impl fmt::Display for PointerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: 0x{:X}", self.value, self.base)?;
        for offset in &self.offsets {
            write!(f, " -> +0x{:X}", offset)?;
        }
        Ok(())
    }
}

/// Every tracked value, resolved for one attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub scene_loaded: PointerPath,
    pub settings_data: PointerPath,
    pub screen_fade_alpha: PointerPath,
    pub save_data: PointerPath,
    pub spritelings: PointerPath,
    pub master_inventory: PointerPath,
    pub collections: CollectionLayout,
}

impl ResolvedPaths {
    pub fn iter(&self) -> impl Iterator<Item = &PointerPath> {
        [
            &self.scene_loaded,
            &self.settings_data,
            &self.screen_fade_alpha,
            &self.save_data,
            &self.spritelings,
            &self.master_inventory,
        ]
        .into_iter()
    }
}
