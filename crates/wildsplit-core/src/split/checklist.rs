use std::collections::{HashMap, VecDeque};

use tracing::{debug, info};

use crate::split::{Category, SplitterSettings};

/// Splits still to come in the current run, one queue per category
///
/// Only the front of a queue can be satisfied, so the labels of a category are consumed in
/// the configured order. Categories that were not configured have no queue at all.
#[derive(Debug, Clone, Default)]
pub struct RemainingDictionary {
    queues: HashMap<Category, VecDeque<String>>,
    remaining: usize,
}

impl RemainingDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every queue from `settings`.
    pub fn setup(&mut self, settings: &SplitterSettings) {
        self.queues.clear();
        for entry in &settings.splits {
            self.queues
                .entry(entry.category)
                .or_default()
                .push_back(entry.label.clone().unwrap_or_default());
        }
        self.remaining = settings.splits.len();
        debug!("Split checklist set up with {} splits", self.remaining);
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.queues.contains_key(&category)
    }

    /// Try to consume the next split of `category`.
    ///
    /// Labeled categories need a label equal to the front of the queue. Label-less ones
    /// ([`Category::End`]) take `None` and consume any pending split. Nothing changes on failure.
    pub fn split(&mut self, category: Category, label: Option<&str>) -> bool {
        let Some(queue) = self.queues.get_mut(&category) else {
            return false;
        };
        let matched = match (queue.front(), label) {
            (Some(front), Some(label)) => category.needs_label() && front == label,
            (Some(_), None) => !category.needs_label(),
            (None, _) => false,
        };
        if !matched {
            return false;
        }

        queue.pop_front();
        self.remaining -= 1;
        info!(
            "Split {} {} ({} remaining)",
            category,
            label.unwrap_or_default(),
            self.remaining
        );
        true
    }

    pub fn remaining_count(&self) -> usize {
        self.remaining
    }

    /// Pending labels of `category`, next one first.
    pub fn pending(&self, category: Category) -> impl Iterator<Item = &str> {
        self.queues
            .get(&category)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::SplitEntry;

    fn settings() -> SplitterSettings {
        SplitterSettings {
            splits: vec![
                SplitEntry::new(Category::Spriteling, "Twigling"),
                SplitEntry::new(Category::Inventory, "Dowsing Rod"),
                SplitEntry::new(Category::Spriteling, "Emberling"),
                SplitEntry::new(Category::SaveData, "questStage_2"),
                SplitEntry::end(),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_setup_counts_every_split() {
        let mut checklist = RemainingDictionary::new();
        checklist.setup(&settings());
        assert_eq!(checklist.remaining_count(), 5);
        assert!(checklist.has_category(Category::End));
        assert_eq!(
            checklist.pending(Category::Spriteling).collect::<Vec<_>>(),
            vec!["Twigling", "Emberling"]
        );
    }

    #[test]
    fn test_only_front_label_matches() {
        let mut checklist = RemainingDictionary::new();
        checklist.setup(&settings());

        assert!(!checklist.split(Category::Spriteling, Some("Emberling")));
        assert_eq!(checklist.remaining_count(), 5);

        assert!(checklist.split(Category::Spriteling, Some("Twigling")));
        assert!(checklist.split(Category::Spriteling, Some("Emberling")));
        assert_eq!(checklist.remaining_count(), 3);
        assert!(!checklist.split(Category::Spriteling, Some("Emberling")));
    }

    #[test]
    fn test_unconfigured_category() {
        let mut checklist = RemainingDictionary::new();
        checklist.setup(&SplitterSettings {
            splits: vec![SplitEntry::new(Category::Inventory, "Dowsing Rod")],
            ..Default::default()
        });
        assert!(!checklist.has_category(Category::SaveData));
        assert!(!checklist.split(Category::SaveData, Some("Dowsing Rod")));
        assert_eq!(checklist.remaining_count(), 1);
    }

    #[test]
    fn test_label_less_split() {
        let mut checklist = RemainingDictionary::new();
        checklist.setup(&settings());
        assert!(checklist.split(Category::End, None));
        assert!(!checklist.split(Category::End, None));
        assert_eq!(checklist.remaining_count(), 4);
    }

    #[test]
    fn test_label_required_where_configured() {
        let mut checklist = RemainingDictionary::new();
        checklist.setup(&settings());

        assert!(!checklist.split(Category::Spriteling, None));
        assert!(!checklist.split(Category::SaveData, None));
        assert!(!checklist.split(Category::End, Some("")));
        assert_eq!(checklist.remaining_count(), 5);
        assert_eq!(
            checklist.pending(Category::Spriteling).collect::<Vec<_>>(),
            vec!["Twigling", "Emberling"]
        );
    }

    #[test]
    fn test_consume_all_in_order() {
        let mut checklist = RemainingDictionary::new();
        checklist.setup(&settings());
        for entry in settings().splits {
            assert!(checklist.split(entry.category, entry.label.as_deref()));
        }
        assert_eq!(checklist.remaining_count(), 0);
    }

    #[test]
    fn test_setup_again_restores_everything() {
        let mut checklist = RemainingDictionary::new();
        checklist.setup(&settings());
        checklist.split(Category::End, None);
        checklist.setup(&settings());
        assert_eq!(checklist.remaining_count(), 5);
        assert!(checklist.split(Category::End, None));
    }
}
