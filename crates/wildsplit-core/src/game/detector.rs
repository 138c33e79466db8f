//! Change detection over growable collections in the game heap
//!
//! Each tracked collection is summarized by a cheap stamp (its element count, or the
//! dictionary's version counter). A scan only walks the elements when the stamp differs from
//! the one remembered after the last complete scan. The remembered stamp is written when a
//! scan is drained to the end, so a scan cut short by a split, a read error or a detach is
//! simply redone on a later tick.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use tracing::warn;

use crate::error::Result;

/// Identifiers seen during the current run, plus the stamp of the last complete scan
#[derive(Debug, Clone)]
pub struct DiscoveredItemSet<K> {
    items: HashSet<K>,
    stamp: Option<i32>,
}

impl<K> Default for DiscoveredItemSet<K> {
    fn default() -> Self {
        Self {
            items: HashSet::new(),
            stamp: None,
        }
    }
}

impl<K: Eq + Hash + Clone> DiscoveredItemSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &K) -> bool {
        self.items.contains(item)
    }

    pub fn stamp(&self) -> Option<i32> {
        self.stamp
    }

    /// Forget everything, including the stamp, so the next scan walks the whole collection.
    pub fn clear(&mut self) {
        self.items.clear();
        self.stamp = None;
    }

    /// Scan a list whose current element count is `count`.
    ///
    /// `read(i)` reads element `i`. Unchanged counts give an empty scan without calling
    /// `read`. A count below the remembered one is not supported: it is logged and gives an
    /// empty scan that leaves the set and its stamp untouched.
    pub fn scan<F>(&mut self, count: usize, read: F) -> ItemScan<'_, K, F>
    where
        F: FnMut(usize) -> Result<K>,
    {
        let stamp = count as i32;
        let walk = match self.stamp {
            Some(remembered) if remembered == stamp => false,
            Some(remembered) if remembered > stamp => {
                warn!(
                    "Tracked collection shrank from {} to {} elements, ignoring",
                    remembered, stamp
                );
                false
            }
            _ => true,
        };

        ItemScan {
            set: self,
            read,
            index: 0,
            count: if walk { count } else { 0 },
            stamp,
            done: !walk,
        }
    }
}

/// Lazy scan yielding items not seen before, in collection order
pub struct ItemScan<'a, K, F> {
    set: &'a mut DiscoveredItemSet<K>,
    read: F,
    index: usize,
    count: usize,
    stamp: i32,
    done: bool,
}

impl<K, F> Iterator for ItemScan<'_, K, F>
where
    K: Eq + Hash + Clone,
    F: FnMut(usize) -> Result<K>,
{
    type Item = Result<K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while self.index < self.count {
            let index = self.index;
            self.index += 1;
            match (self.read)(index) {
                Ok(item) => {
                    if self.set.items.insert(item.clone()) {
                        return Some(Ok(item));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.done = true;
        self.set.stamp = Some(self.stamp);
        None
    }
}

/// One key/value pair of the game's variable save data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRecord {
    pub key: String,
    pub value: String,
}

impl SaveRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Split label for this record.
    ///
    /// Numeric values are part of the label (`"key_3"`), anything else is just the key.
    pub fn label(&self) -> String {
        match self.value.trim().parse::<f32>() {
            Ok(number) if number.is_finite() => format!("{}_{}", self.key, number),
            _ => self.key.clone(),
        }
    }
}

/// Save data seen during the current run, plus the dictionary version of the last complete scan
#[derive(Debug, Clone, Default)]
pub struct SaveRecordMap {
    records: HashMap<String, String>,
    version: Option<i32>,
}

impl SaveRecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.version = None;
    }

    /// Store a record; returns whether it was new or its value changed.
    fn record(&mut self, record: &SaveRecord) -> bool {
        match self.records.get_mut(&record.key) {
            Some(value) if *value == record.value => false,
            Some(value) => {
                value.clone_from(&record.value);
                true
            }
            None => {
                self.records
                    .insert(record.key.clone(), record.value.clone());
                true
            }
        }
    }

    /// Scan a dictionary at `version` holding `count` entry slots.
    ///
    /// `read(i)` reads entry `i`, returning `None` for an empty slot. Any version difference
    /// counts as a change; an unchanged version gives an empty scan without calling `read`.
    pub fn scan<F>(&mut self, version: i32, count: usize, read: F) -> RecordScan<'_, F>
    where
        F: FnMut(usize) -> Result<Option<SaveRecord>>,
    {
        let walk = self.version != Some(version);
        RecordScan {
            map: self,
            read,
            index: 0,
            count: if walk { count } else { 0 },
            version,
            done: !walk,
        }
    }
}

/// Lazy scan yielding records that are new or whose value changed, in entry order
pub struct RecordScan<'a, F> {
    map: &'a mut SaveRecordMap,
    read: F,
    index: usize,
    count: usize,
    version: i32,
    done: bool,
}

impl<F> Iterator for RecordScan<'_, F>
where
    F: FnMut(usize) -> Result<Option<SaveRecord>>,
{
    type Item = Result<SaveRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while self.index < self.count {
            let index = self.index;
            self.index += 1;
            match (self.read)(index) {
                Ok(Some(record)) => {
                    if self.map.record(&record) {
                        return Some(Ok(record));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.done = true;
        self.map.version = Some(self.version);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;

    fn list_reader(items: &[i32]) -> impl FnMut(usize) -> Result<i32> + '_ {
        move |i| Ok(items[i])
    }

    #[test]
    fn test_scan_yields_only_new_items_in_order() {
        let mut set = DiscoveredItemSet::new();
        let first: Vec<i32> = set.scan(2, list_reader(&[3, 1])).map(Result::unwrap).collect();
        assert_eq!(first, vec![3, 1]);
        assert_eq!(set.stamp(), Some(2));

        let second: Vec<i32> = set
            .scan(4, list_reader(&[3, 1, 1, 5]))
            .map(Result::unwrap)
            .collect();
        assert_eq!(second, vec![5]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.stamp(), Some(4));
    }

    #[test]
    fn test_unchanged_stamp_reads_nothing() {
        let mut set = DiscoveredItemSet::new();
        set.scan(1, list_reader(&[2])).for_each(drop);

        let calls = Cell::new(0);
        let scan = set.scan(1, |i| {
            calls.set(calls.get() + 1);
            Ok([2][i])
        });
        assert_eq!(scan.count(), 0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_early_stop_keeps_old_stamp_and_resumes() {
        let mut set = DiscoveredItemSet::new();
        let items = [1, 2, 3];

        let mut scan = set.scan(3, list_reader(&items));
        assert_eq!(scan.next().unwrap().unwrap(), 1);
        drop(scan);
        assert_eq!(set.stamp(), None);

        let rest: Vec<i32> = set.scan(3, list_reader(&items)).map(Result::unwrap).collect();
        assert_eq!(rest, vec![2, 3]);
        assert_eq!(set.stamp(), Some(3));
    }

    #[test]
    fn test_read_error_fuses_and_retries_later() {
        let mut set = DiscoveredItemSet::new();
        let mut scan = set.scan(2, |i| {
            if i == 1 {
                Err(Error::NullPointer { address: 0x20 })
            } else {
                Ok(7)
            }
        });
        assert_eq!(scan.next().unwrap().unwrap(), 7);
        assert!(scan.next().unwrap().is_err());
        assert!(scan.next().is_none());
        drop(scan);
        assert_eq!(set.stamp(), None);

        let retried: Vec<i32> = set.scan(2, list_reader(&[7, 8])).map(Result::unwrap).collect();
        assert_eq!(retried, vec![8]);
    }

    #[test]
    fn test_shrink_is_ignored() {
        let mut set = DiscoveredItemSet::new();
        set.scan(3, list_reader(&[1, 2, 3])).for_each(drop);

        let calls = Cell::new(0);
        let yielded = set
            .scan(1, |_| {
                calls.set(calls.get() + 1);
                Ok(9)
            })
            .count();
        assert_eq!(yielded, 0);
        assert_eq!(calls.get(), 0);
        assert_eq!(set.len(), 3);
        assert_eq!(set.stamp(), Some(3));
    }

    #[test]
    fn test_clear_forgets_stamp() {
        let mut set = DiscoveredItemSet::new();
        set.scan(1, list_reader(&[4])).for_each(drop);
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.stamp(), None);

        let again: Vec<i32> = set.scan(1, list_reader(&[4])).map(Result::unwrap).collect();
        assert_eq!(again, vec![4]);
    }

    #[test]
    fn test_record_scan_new_and_changed() {
        let mut map = SaveRecordMap::new();
        let v1 = [
            Some(SaveRecord::new("a", "1")),
            None,
            Some(SaveRecord::new("b", "x")),
        ];
        let first: Vec<SaveRecord> = map
            .scan(5, 3, |i| Ok(v1[i].clone()))
            .map(Result::unwrap)
            .collect();
        assert_eq!(first.len(), 2);
        assert_eq!(map.version(), Some(5));

        let v2 = [Some(SaveRecord::new("a", "2")), Some(SaveRecord::new("b", "x"))];
        let second: Vec<SaveRecord> = map
            .scan(6, 2, |i| Ok(v2[i].clone()))
            .map(Result::unwrap)
            .collect();
        assert_eq!(second, vec![SaveRecord::new("a", "2")]);
        assert_eq!(map.get("a"), Some("2"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_record_scan_same_version_reads_nothing() {
        let mut map = SaveRecordMap::new();
        map.scan(1, 1, |_| Ok(Some(SaveRecord::new("a", "1"))))
            .for_each(drop);

        let calls = Cell::new(0);
        let yielded = map
            .scan(1, 1, |_| {
                calls.set(calls.get() + 1);
                Ok(Some(SaveRecord::new("a", "2")))
            })
            .count();
        assert_eq!(yielded, 0);
        assert_eq!(calls.get(), 0);
        assert_eq!(map.get("a"), Some("1"));
    }

    #[test]
    fn test_record_label() {
        assert_eq!(SaveRecord::new("hasTalkedToFrank", "True").label(), "hasTalkedToFrank");
        assert_eq!(SaveRecord::new("questStage", "3").label(), "questStage_3");
        assert_eq!(SaveRecord::new("questStage", "2.5").label(), "questStage_2.5");
        assert_eq!(SaveRecord::new("questStage", " 1.0 ").label(), "questStage_1");
        assert_eq!(SaveRecord::new("odd", "NaN").label(), "odd");
        assert_eq!(SaveRecord::new("empty", "").label(), "empty");
    }
}
