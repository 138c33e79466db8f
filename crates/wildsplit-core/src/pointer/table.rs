//! Layout table: where each tracked value lives in the game's object graph
//!
//! The table is pure data. A game update that moves a field is fixed by editing the JSON
//! form of the table (see [`load_layout`]), not the resolver.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::memory::layout::{self, PTR};

/// Values the splitter reads from the game
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackedValue {
    /// `bool` set once a scene finished loading
    SceneLoaded,
    /// `SettingsData` instance, root of the save slot records
    SettingsData,
    /// `float` opacity of the screen fade overlay
    ScreenFadeAlpha,
    /// `Dictionary<string, string>` of variable save data
    SaveData,
    /// `List<Spriteling>` of acquired spriteling types
    Spritelings,
    /// `List<Item>` of the master inventory
    MasterInventory,
}

impl TrackedValue {
    pub const ALL: [TrackedValue; 6] = [
        TrackedValue::SceneLoaded,
        TrackedValue::SettingsData,
        TrackedValue::ScreenFadeAlpha,
        TrackedValue::SaveData,
        TrackedValue::Spritelings,
        TrackedValue::MasterInventory,
    ];
}

/// One hop after the static field has been dereferenced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathStep {
    /// Instance field, offset looked up in the runtime metadata
    Field { class: String, field: String },
    /// Fixed byte offset
    Offset { offset: u64 },
}

impl PathStep {
    pub fn field(class: &str, field: &str) -> Self {
        Self::Field {
            class: class.to_string(),
            field: field.to_string(),
        }
    }

    pub fn offset(offset: u64) -> Self {
        Self::Offset { offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub value: TrackedValue,
    /// Class owning the static field the path starts from
    pub class: String,
    pub static_field: String,
    #[serde(default)]
    pub steps: Vec<PathStep>,
}

impl LayoutEntry {
    fn new(value: TrackedValue, class: &str, static_field: &str, steps: Vec<PathStep>) -> Self {
        Self {
            value,
            class: class.to_string(),
            static_field: static_field.to_string(),
            steps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringLayout {
    pub length: u64,
    pub chars: u64,
    pub max_length: usize,
}

impl Default for StringLayout {
    fn default() -> Self {
        Self {
            length: layout::string::LENGTH,
            chars: layout::string::CHARS,
            max_length: layout::string::MAX_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListLayout {
    pub items: u64,
    pub size: u64,
    /// First element inside the backing array
    pub array_data: u64,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            items: layout::list::ITEMS,
            size: layout::list::SIZE,
            array_data: layout::array::DATA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryLayout {
    pub entries: u64,
    pub count: u64,
    pub version: u64,
    pub array_data: u64,
    pub entry_stride: u64,
    pub entry_key: u64,
    pub entry_value: u64,
}

impl Default for DictionaryLayout {
    fn default() -> Self {
        Self {
            entries: layout::dictionary::ENTRIES,
            count: layout::dictionary::COUNT,
            version: layout::dictionary::VERSION,
            array_data: layout::array::DATA,
            entry_stride: layout::dictionary::ENTRY_STRIDE,
            entry_key: layout::dictionary::ENTRY_KEY,
            entry_value: layout::dictionary::ENTRY_VALUE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSlotLayout {
    pub count: usize,
    pub chain: Vec<u64>,
    pub array_data: u64,
    pub stride: u64,
    pub elapsed: u64,
    pub save_time: u64,
}

impl Default for SaveSlotLayout {
    fn default() -> Self {
        Self {
            count: layout::save_slot::COUNT,
            chain: layout::save_slot::CHAIN.to_vec(),
            array_data: layout::save_slot::ARRAY_DATA,
            stride: layout::save_slot::STRIDE,
            elapsed: layout::save_slot::ELAPSED,
            save_time: layout::save_slot::SAVE_TIME,
        }
    }
}

impl SaveSlotLayout {
    /// Offsets from the settings instance to a field of slot `index`.
    pub fn field_chain(&self, index: usize, field: u64) -> Vec<u64> {
        let mut chain = self.chain.clone();
        chain.push(self.array_data + self.stride * index as u64);
        chain.push(field);
        chain
    }
}

/// Mono collection internals, as byte offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionLayout {
    pub string: StringLayout,
    pub list: ListLayout,
    pub dictionary: DictionaryLayout,
    pub save_slots: SaveSlotLayout,
    /// Size of one spriteling id in its list (a 32-bit enum)
    pub spriteling_stride: u64,
    /// Size of one inventory reference in its list
    pub inventory_stride: u64,
    /// Name string field of an inventory item
    pub inventory_item_name: u64,
    pub max_collection_len: usize,
}

impl Default for CollectionLayout {
    fn default() -> Self {
        Self {
            string: StringLayout::default(),
            list: ListLayout::default(),
            dictionary: DictionaryLayout::default(),
            save_slots: SaveSlotLayout::default(),
            spriteling_stride: 4,
            inventory_stride: PTR,
            inventory_item_name: 0x10,
            max_collection_len: layout::limits::MAX_COLLECTION_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTable {
    pub version: String,
    pub entries: Vec<LayoutEntry>,
    #[serde(default)]
    pub collections: CollectionLayout,
}

impl LayoutTable {
    /// Table for the current Steam build of the game
    pub fn builtin() -> Self {
        use TrackedValue::*;

        let entries = vec![
            LayoutEntry::new(
                SceneLoaded,
                "BSceneManager",
                "<SceneLoadingFinished>k__BackingField",
                vec![],
            ),
            LayoutEntry::new(SettingsData, "SettingsData", "Instance", vec![]),
            LayoutEntry::new(
                ScreenFadeAlpha,
                "BScreenFade",
                "<Instance>k__BackingField",
                vec![
                    PathStep::field("BScreenFade", "backing"),
                    PathStep::offset(layout::screen_fade::ALPHA),
                ],
            ),
            LayoutEntry::new(
                SaveData,
                "PlayerData",
                "Instance",
                vec![
                    PathStep::field("PlayerData", "VariableSaveData"),
                    PathStep::offset(0x10),
                    PathStep::offset(0x10),
                ],
            ),
            LayoutEntry::new(
                Spritelings,
                "PlayerData",
                "Instance",
                vec![PathStep::field("PlayerData", "AcquiredSpritelingTypes")],
            ),
            LayoutEntry::new(
                MasterInventory,
                "PlayerData",
                "Instance",
                vec![
                    PathStep::field("PlayerData", "MasterInventory"),
                    PathStep::offset(0x10),
                ],
            ),
        ];

        Self {
            version: "builtin".to_string(),
            entries,
            collections: CollectionLayout::default(),
        }
    }

    pub fn entry(&self, value: TrackedValue) -> Option<&LayoutEntry> {
        self.entries.iter().find(|entry| entry.value == value)
    }

    /// Every tracked value must have exactly one entry.
    pub fn validate(&self) -> Result<()> {
        for value in TrackedValue::ALL {
            let count = self.entries.iter().filter(|e| e.value == value).count();
            if count != 1 {
                return Err(Error::InvalidConfig(format!(
                    "layout table {} has {} entries for {}",
                    self.version, count, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<LayoutTable> {
    let content = fs::read_to_string(&path)?;
    let table: LayoutTable = serde_json::from_str(&content)?;
    table.validate()?;
    Ok(table)
}

pub fn save_layout<P: AsRef<Path>>(path: P, table: &LayoutTable) -> Result<()> {
    let content = serde_json::to_string_pretty(table)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_table_is_complete() {
        let table = LayoutTable::builtin();
        table.validate().unwrap();
        assert_eq!(table.entries.len(), TrackedValue::ALL.len());
    }

    #[test]
    fn test_validate_rejects_missing_entry() {
        let mut table = LayoutTable::builtin();
        table.entries.retain(|e| e.value != TrackedValue::SaveData);
        assert!(matches!(table.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_save_and_load_layout() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut table = LayoutTable::builtin();
        table.version = "1.0.12".to_string();
        table.collections.inventory_item_name = 0x18;

        save_layout(temp_file.path(), &table).unwrap();
        let loaded = load_layout(temp_file.path()).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_collections_default_when_omitted() {
        let json = r#"{
            "version": "partial",
            "entries": [
                {"value": "scene_loaded", "class": "BSceneManager", "static_field": "Loaded"},
                {"value": "settings_data", "class": "SettingsData", "static_field": "Instance"},
                {"value": "screen_fade_alpha", "class": "BScreenFade", "static_field": "Instance",
                 "steps": [{"kind": "field", "class": "BScreenFade", "field": "backing"},
                           {"kind": "offset", "offset": 116}]},
                {"value": "save_data", "class": "PlayerData", "static_field": "Instance"},
                {"value": "spritelings", "class": "PlayerData", "static_field": "Instance"},
                {"value": "master_inventory", "class": "PlayerData", "static_field": "Instance"}
            ]
        }"#;
        let table: LayoutTable = serde_json::from_str(json).unwrap();
        table.validate().unwrap();
        assert_eq!(table.collections, CollectionLayout::default());
        assert_eq!(
            table.entry(TrackedValue::ScreenFadeAlpha).unwrap().steps[1],
            PathStep::offset(0x74)
        );
    }

    #[test]
    fn test_save_slot_field_chain() {
        let slots = SaveSlotLayout::default();
        assert_eq!(slots.field_chain(0, slots.save_time), vec![0x10, 0x10, 0x20, 0x28]);
        assert_eq!(slots.field_chain(2, slots.elapsed), vec![0x10, 0x10, 0x30, 0x20]);
    }

    #[test]
    fn test_tracked_value_names() {
        assert_eq!(TrackedValue::ScreenFadeAlpha.to_string(), "screen_fade_alpha");
        assert_eq!(
            "master_inventory".parse::<TrackedValue>().unwrap(),
            TrackedValue::MasterInventory
        );
    }
}
