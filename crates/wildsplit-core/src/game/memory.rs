//! Typed view of the game for one attach
//!
//! [`GameMemory`] owns the resolved paths and the per-tick cells. The run state it reports
//! into (discovered items, save records and save slots) is owned by the caller, because it
//! outlives a single attach.

use tracing::trace;

use crate::error::{Error, Result};
use crate::game::cell::MemoryCell;
use crate::game::detector::{DiscoveredItemSet, SaveRecord, SaveRecordMap};
use crate::game::slots::{SaveSlots, SlotEvents};
use crate::memory::ReadMemory;
use crate::pointer::{CollectionLayout, ResolvedPaths};

/// Save data key the game sets once the ending dialogue has played
pub const END_KEY: &str = "hasSeenNWW - Wake Goes Home (NC.DialogueTrees.DialogueTree)0SS";

/// Fade opacity of a fully black screen
const FADE_OPAQUE: f32 = 1.0;

pub struct GameMemory {
    paths: ResolvedPaths,
    scene_loaded: MemoryCell<bool>,
    screen_fade_alpha: MemoryCell<f32>,
    settings: MemoryCell<u64>,
    save_data: MemoryCell<u64>,
    spritelings: MemoryCell<u64>,
    inventory: MemoryCell<u64>,
}

impl GameMemory {
    pub fn new(paths: ResolvedPaths) -> Self {
        Self {
            paths,
            scene_loaded: MemoryCell::new(),
            screen_fade_alpha: MemoryCell::new(),
            settings: MemoryCell::new(),
            save_data: MemoryCell::new(),
            spritelings: MemoryCell::new(),
            inventory: MemoryCell::new(),
        }
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    fn collections(&self) -> &CollectionLayout {
        &self.paths.collections
    }

    /// Read every cell once. Object handles that cannot be reached read as null.
    pub fn refresh<R: ReadMemory + ?Sized>(&mut self, reader: &R) {
        let paths = &self.paths;
        self.scene_loaded.refresh(reader, &paths.scene_loaded);
        self.screen_fade_alpha
            .refresh(reader, &paths.screen_fade_alpha);

        for (cell, path) in [
            (&mut self.settings, &paths.settings_data),
            (&mut self.save_data, &paths.save_data),
            (&mut self.spritelings, &paths.spritelings),
            (&mut self.inventory, &paths.master_inventory),
        ] {
            let handle = path
                .address(reader)
                .and_then(|address| reader.read_u64(address));
            if let Err(e) = &handle {
                trace!("{} unreachable: {}", path.value(), e);
            }
            cell.advance(handle.unwrap_or_default());
        }
    }

    pub fn scene_loaded(&self) -> &MemoryCell<bool> {
        &self.scene_loaded
    }

    pub fn screen_fade_alpha(&self) -> &MemoryCell<f32> {
        &self.screen_fade_alpha
    }

    pub fn is_loading(&self) -> bool {
        !self.scene_loaded.current()
    }

    /// Ending dialogue seen and the screen just faded to black.
    pub fn is_game_finished(&self, records: &SaveRecordMap) -> bool {
        records.contains_key(END_KEY) && self.screen_fade_alpha.became(FADE_OPAQUE)
    }

    /// Compare the save slots against `slots` (see [`SaveSlots::poll`]).
    pub fn poll_save_slots<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        slots: &mut SaveSlots,
        now: i64,
    ) -> SlotEvents {
        match self.settings.current() {
            0 => SlotEvents::default(),
            settings => slots.poll(reader, settings, &self.collections().save_slots, now),
        }
    }

    /// Spriteling types acquired since the last complete scan.
    pub fn new_spritelings<'a, R: ReadMemory + ?Sized>(
        &self,
        reader: &'a R,
        seen: &'a mut DiscoveredItemSet<i32>,
    ) -> Result<impl Iterator<Item = Result<i32>> + use<'a, R>> {
        let list = non_null(self.spritelings.current())?;
        let layout = self.collections();
        let count = read_count(reader, list + layout.list.size, layout.max_collection_len)?;

        let items_field = list + layout.list.items;
        let data = layout.list.array_data;
        let stride = layout.spriteling_stride;
        let mut items = None;

        Ok(seen.scan(count, move |i| {
            let items = cached_ptr(reader, &mut items, items_field)?;
            reader.read_i32(items + data + stride * i as u64)
        }))
    }

    /// Names of inventory items added since the last complete scan.
    pub fn new_inventory_items<'a, R: ReadMemory + ?Sized>(
        &self,
        reader: &'a R,
        seen: &'a mut DiscoveredItemSet<String>,
    ) -> Result<impl Iterator<Item = Result<String>> + use<'a, R>> {
        let list = non_null(self.inventory.current())?;
        let layout = self.collections();
        let count = read_count(reader, list + layout.list.size, layout.max_collection_len)?;

        let items_field = list + layout.list.items;
        let data = layout.list.array_data;
        let stride = layout.inventory_stride;
        let name_field = layout.inventory_item_name;
        let string = layout.string;
        let mut items = None;

        Ok(seen.scan(count, move |i| {
            let items = cached_ptr(reader, &mut items, items_field)?;
            let item = reader.read_ptr(items + data + stride * i as u64)?;
            let name = reader.read_ptr(item + name_field)?;
            reader.read_managed_string(name, &string)
        }))
    }

    /// Save data records added or changed since the last complete scan.
    pub fn changed_save_data<'a, R: ReadMemory + ?Sized>(
        &self,
        reader: &'a R,
        records: &'a mut SaveRecordMap,
    ) -> Result<impl Iterator<Item = Result<SaveRecord>> + use<'a, R>> {
        let dictionary = non_null(self.save_data.current())?;
        let layout = self.collections();
        let dict = layout.dictionary;
        let version = reader.read_i32(dictionary + dict.version)?;
        let count = read_count(reader, dictionary + dict.count, layout.max_collection_len)?;

        let entries_field = dictionary + dict.entries;
        let string = layout.string;
        let mut entries = None;

        Ok(records.scan(version, count, move |i| {
            let entries = cached_ptr(reader, &mut entries, entries_field)?;
            let entry = entries + dict.array_data + dict.entry_stride * i as u64;

            let key = match reader.read_u64(entry + dict.entry_key)? {
                0 => return Ok(None),
                key => reader.read_managed_string(key, &string)?,
            };
            let value = match reader.read_u64(entry + dict.entry_value)? {
                0 => String::new(),
                value => reader.read_managed_string(value, &string)?,
            };
            Ok(Some(SaveRecord { key, value }))
        }))
    }
}

fn non_null(handle: u64) -> Result<u64> {
    match handle {
        0 => Err(Error::NullPointer { address: 0 }),
        handle => Ok(handle),
    }
}

/// Element count of a collection, rejecting values no live collection could have.
fn read_count<R: ReadMemory + ?Sized>(reader: &R, address: u64, max: usize) -> Result<usize> {
    let count = reader.read_i32(address)?;
    if count < 0 || count as usize > max {
        return Err(Error::InvalidLength {
            address,
            length: count as i64,
        });
    }
    Ok(count as usize)
}

/// Backing array pointer, read on first use so an unchanged collection costs no read.
fn cached_ptr<R: ReadMemory + ?Sized>(
    reader: &R,
    cache: &mut Option<u64>,
    address: u64,
) -> Result<u64> {
    match *cache {
        Some(ptr) => Ok(ptr),
        None => Ok(*cache.insert(reader.read_ptr(address)?)),
    }
}
