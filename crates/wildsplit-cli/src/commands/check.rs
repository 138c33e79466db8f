//! Settings check command.

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use wildsplit_core::{Category, RemainingDictionary, Spriteling, SplitterSettings, load_layout};

use crate::settings::load_settings;

/// Validate the split settings (and a layout table, if given) and print the checklist.
pub fn run(splits: &Path, layout: Option<&Path>) -> Result<()> {
    let settings = load_settings(splits)?;
    if let Some(path) = layout {
        let table = load_layout(path)?;
        println!("Layout {} is valid", table.version);
    }

    println!(
        "Start on new save: {}, reset on deleted save: {}",
        settings.start, settings.reset
    );
    for (index, entry) in settings.splits.iter().enumerate() {
        println!(
            "{:>3}. {:<10} {}",
            index + 1,
            entry.category.to_string().cyan(),
            entry.label.as_deref().unwrap_or("-")
        );
    }

    for warning in warnings(&settings) {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }

    let mut checklist = RemainingDictionary::new();
    checklist.setup(&settings);
    println!("{} splits", checklist.remaining_count());
    Ok(())
}

/// Settings that parse but can never split as written.
fn warnings(settings: &SplitterSettings) -> Vec<String> {
    settings
        .splits
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let label = entry.label.as_deref()?;
            match entry.category {
                Category::Spriteling
                    if label.parse::<Spriteling>().is_err() && label.parse::<i32>().is_err() =>
                {
                    Some(format!("split {}: unknown spriteling {}", index + 1, label))
                }
                Category::End => Some(format!(
                    "split {}: label {} is ignored for the ending",
                    index + 1,
                    label
                )),
                _ => None,
            }
        })
        .collect()
}
