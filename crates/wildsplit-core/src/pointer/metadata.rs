//! Runtime metadata: class static data and field offsets
//!
//! The splitter never walks Mono's class tables itself. It asks a [`RuntimeMetadata`]
//! implementation, which for the CLI is a [`MetadataSnapshot`] dumped once per game build and
//! bound to the live process by [`ProcessMetadata`].

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::ReadMemory;

pub trait RuntimeMetadata {
    /// Address of the static field storage of `class`.
    fn static_data(&self, class: &str) -> Result<u64>;

    /// Byte offset of `field` inside `class` (static fields: inside its static storage).
    fn field_offset(&self, class: &str, field: &str) -> Result<u64>;
}

/// Pointer path from a module base to a class's static storage
///
/// Every offset is added and then dereferenced, so the last hop yields the storage address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRoot {
    pub module: String,
    pub offsets: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSnapshot {
    #[serde(default)]
    pub static_root: Option<StaticRoot>,
    #[serde(default)]
    pub fields: HashMap<String, u64>,
}

/// Class metadata for one game build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub version: String,
    pub classes: HashMap<String, ClassSnapshot>,
}

impl MetadataSnapshot {
    pub fn class(&self, class: &str) -> Result<&ClassSnapshot> {
        self.classes
            .get(class)
            .ok_or_else(|| Error::ClassNotFound(class.to_string()))
    }

    /// Modules referenced by static roots, sorted and deduplicated.
    pub fn modules(&self) -> Vec<String> {
        self.classes
            .values()
            .filter_map(|c| c.static_root.as_ref())
            .map(|root| root.module.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn field_offset(&self, class: &str, field: &str) -> Result<u64> {
        self.class(class)?
            .fields
            .get(field)
            .copied()
            .ok_or_else(|| Error::FieldNotFound {
                class: class.to_string(),
                field: field.to_string(),
            })
    }
}

pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<MetadataSnapshot> {
    let content = fs::read_to_string(&path)?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

pub fn save_metadata<P: AsRef<Path>>(path: P, snapshot: &MetadataSnapshot) -> Result<()> {
    let content = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, content)?;
    Ok(())
}

/// A snapshot bound to a live process
pub struct ProcessMetadata<R> {
    snapshot: MetadataSnapshot,
    reader: R,
    module_bases: HashMap<String, u64>,
}

impl<R: ReadMemory> ProcessMetadata<R> {
    /// `module_bases` maps each name from [`MetadataSnapshot::modules`] to its load address.
    pub fn new(snapshot: MetadataSnapshot, reader: R, module_bases: HashMap<String, u64>) -> Self {
        Self {
            snapshot,
            reader,
            module_bases,
        }
    }
}

impl<R: ReadMemory> RuntimeMetadata for ProcessMetadata<R> {
    fn static_data(&self, class: &str) -> Result<u64> {
        let root = self
            .snapshot
            .class(class)?
            .static_root
            .as_ref()
            .ok_or_else(|| Error::ClassNotFound(format!("{} has no static root", class)))?;
        let mut address = *self
            .module_bases
            .get(&root.module)
            .ok_or_else(|| Error::ModuleNotFound(root.module.clone()))?;

        for offset in &root.offsets {
            address = self.reader.read_ptr(address.wrapping_add(*offset))?;
        }
        debug!("{} static data at 0x{:X}", class, address);
        Ok(address)
    }

    fn field_offset(&self, class: &str, field: &str) -> Result<u64> {
        self.snapshot.field_offset(class, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;
    use tempfile::NamedTempFile;

    fn sample_snapshot() -> MetadataSnapshot {
        let mut classes = HashMap::new();
        classes.insert(
            "PlayerData".to_string(),
            ClassSnapshot {
                static_root: Some(StaticRoot {
                    module: "mono-2.0-bdwgc.dll".to_string(),
                    offsets: vec![0x7280F8, 0xB8],
                }),
                fields: HashMap::from([
                    ("Instance".to_string(), 0x0),
                    ("MasterInventory".to_string(), 0x48),
                ]),
            },
        );
        classes.insert(
            "BScreenFade".to_string(),
            ClassSnapshot {
                static_root: None,
                fields: HashMap::from([("backing".to_string(), 0x18)]),
            },
        );
        MetadataSnapshot {
            version: "1.0.12".to_string(),
            classes,
        }
    }

    #[test]
    fn test_field_offset_lookup() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.field_offset("PlayerData", "MasterInventory").unwrap(), 0x48);
        assert!(matches!(
            snapshot.field_offset("PlayerData", "Missing"),
            Err(Error::FieldNotFound { .. })
        ));
        assert!(matches!(
            snapshot.field_offset("Nope", "Instance"),
            Err(Error::ClassNotFound(_))
        ));
    }

    #[test]
    fn test_modules_are_deduplicated() {
        assert_eq!(sample_snapshot().modules(), vec!["mono-2.0-bdwgc.dll".to_string()]);
    }

    #[test]
    fn test_process_metadata_static_data() {
        // module 0x10000 + 0x7280F8 -> 0x50000; 0x50000 + 0xB8 -> static storage 0x60000
        let reader = MockMemoryBuilder::new()
            .write_u64(0x10000 + 0x7280F8, 0x50000)
            .write_u64(0x50000 + 0xB8, 0x60000)
            .build();
        let metadata = ProcessMetadata::new(
            sample_snapshot(),
            reader,
            HashMap::from([("mono-2.0-bdwgc.dll".to_string(), 0x10000)]),
        );

        assert_eq!(metadata.static_data("PlayerData").unwrap(), 0x60000);
        assert!(metadata.static_data("BScreenFade").is_err());
    }

    #[test]
    fn test_process_metadata_class_not_initialized() {
        let reader = MockMemoryBuilder::new()
            .write_u64(0x10000 + 0x7280F8, 0x50000)
            .write_u64(0x50000 + 0xB8, 0)
            .build();
        let metadata = ProcessMetadata::new(
            sample_snapshot(),
            reader,
            HashMap::from([("mono-2.0-bdwgc.dll".to_string(), 0x10000)]),
        );

        let err = metadata.static_data("PlayerData").unwrap_err();
        assert!(err.is_metadata_missing());
    }

    #[test]
    fn test_process_metadata_missing_module() {
        let metadata = ProcessMetadata::new(
            sample_snapshot(),
            MockMemoryBuilder::new().build(),
            HashMap::new(),
        );
        assert!(matches!(
            metadata.static_data("PlayerData"),
            Err(Error::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_save_and_load_metadata() {
        let temp_file = NamedTempFile::new().unwrap();
        let snapshot = sample_snapshot();
        save_metadata(temp_file.path(), &snapshot).unwrap();
        assert_eq!(load_metadata(temp_file.path()).unwrap(), snapshot);
    }
}
