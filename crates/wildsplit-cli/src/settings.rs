//! Split settings file
//!
//! ```toml
//! start = true
//! reset = true
//!
//! [[splits]]
//! category = "spriteling"
//! label = "Twigling"
//!
//! [[splits]]
//! category = "end"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use wildsplit_core::SplitterSettings;

pub fn load_settings(path: &Path) -> Result<SplitterSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read split settings {}", path.display()))?;
    parse_settings(&content).with_context(|| format!("Invalid split settings {}", path.display()))
}

pub fn parse_settings(content: &str) -> Result<SplitterSettings> {
    let settings: SplitterSettings = toml::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wildsplit_core::{Category, SplitEntry};

    #[test]
    fn test_parse_full_settings() {
        let settings = parse_settings(
            r#"
            start = false

            [[splits]]
            category = "spriteling"
            label = "Twigling"

            [[splits]]
            category = "save_data"
            label = "questStage_2"

            [[splits]]
            category = "end"
            "#,
        )
        .unwrap();

        assert!(!settings.start);
        assert!(settings.reset);
        assert_eq!(
            settings.splits,
            vec![
                SplitEntry::new(Category::Spriteling, "Twigling"),
                SplitEntry::new(Category::SaveData, "questStage_2"),
                SplitEntry::end(),
            ]
        );
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert!(settings.start);
        assert!(settings.splits.is_empty());
    }

    #[test]
    fn test_missing_label_is_rejected() {
        let result = parse_settings(
            r#"
            [[splits]]
            category = "inventory"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result = parse_settings(
            r#"
            [[splits]]
            category = "boss"
            label = "Wolf"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "reset = false").unwrap();
        writeln!(file, "[[splits]]").unwrap();
        writeln!(file, "category = \"end\"").unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert!(!settings.reset);
        assert_eq!(settings.splits.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_settings(Path::new("does-not-exist.toml")).is_err());
    }
}
