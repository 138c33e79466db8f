//! Split configuration and the per-run checklist built from it

mod checklist;

pub use checklist::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, Result};

/// Kind of progress event a split waits for
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
pub enum Category {
    /// A spriteling type joined the party; label is the type name
    Spriteling,
    /// An item entered the master inventory; label is the item name
    Inventory,
    /// A save data variable was set; label is the key, plus `_<number>` for numeric values
    SaveData,
    /// The ending played; no label
    End,
}

impl Category {
    pub fn needs_label(self) -> bool {
        self != Category::End
    }
}

/// One configured split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEntry {
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SplitEntry {
    pub fn new(category: Category, label: &str) -> Self {
        Self {
            category,
            label: Some(label.to_string()),
        }
    }

    pub fn end() -> Self {
        Self {
            category: Category::End,
            label: None,
        }
    }
}

/// User settings of the splitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterSettings {
    /// Start the timer when a new save is created
    pub start: bool,
    /// Reset the timer when a save is deleted
    pub reset: bool,
    /// Splits in run order
    pub splits: Vec<SplitEntry>,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self {
            start: true,
            reset: true,
            splits: Vec::new(),
        }
    }
}

impl SplitterSettings {
    /// Every split except `End` needs a non-empty label.
    pub fn validate(&self) -> Result<()> {
        for (index, entry) in self.splits.iter().enumerate() {
            let labeled = entry.label.as_deref().is_some_and(|label| !label.is_empty());
            if entry.category.needs_label() && !labeled {
                return Err(Error::InvalidConfig(format!(
                    "split {} ({}) has no label",
                    index + 1,
                    entry.category
                )));
            }
        }
        Ok(())
    }
}
