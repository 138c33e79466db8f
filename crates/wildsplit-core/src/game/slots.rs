//! Save slot tracking
//!
//! The settings object keeps one record per save slot with the time the slot was last written
//! (`DateTime.Now` ticks) and the play time stored in it. A fresh game writes its slot right
//! away with almost no play time, which is what a run start looks like. Deleting a slot zeroes
//! its time.

use tracing::debug;

use crate::error::Result;
use crate::memory::ReadMemory;
use crate::memory::layout::timing::TICKS_PER_SECOND;
use crate::pointer::SaveSlotLayout;

/// What changed in the save slots during one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotEvents {
    /// First slot that went from empty to freshly written
    pub started: Option<usize>,
    /// First slot whose time went to zero
    pub deleted: Option<usize>,
}

impl SlotEvents {
    pub fn started(&self) -> bool {
        self.started.is_some()
    }

    pub fn deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

/// Last known save time of every slot
#[derive(Debug, Clone)]
pub struct SaveSlots {
    times: Vec<i64>,
}

impl SaveSlots {
    pub fn new(count: usize) -> Self {
        Self {
            times: vec![0; count],
        }
    }

    pub fn times(&self) -> &[i64] {
        &self.times
    }

    /// Compare every slot against its remembered time and remember the new one.
    ///
    /// `settings` is the settings instance and `now` the current local time in ticks. A slot
    /// that cannot be read is skipped and keeps its remembered time.
    pub fn poll<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        settings: u64,
        layout: &SaveSlotLayout,
        now: i64,
    ) -> SlotEvents {
        let mut events = SlotEvents::default();

        for (index, remembered) in self.times.iter_mut().enumerate() {
            let time = match read_slot_i64(reader, settings, layout, index, layout.save_time) {
                Ok(time) => time,
                Err(e) => {
                    debug!("Save slot {} unreadable: {}", index, e);
                    continue;
                }
            };
            if time == *remembered {
                continue;
            }

            let old = *remembered;
            *remembered = time;

            if time == 0 {
                debug!("Save slot {} deleted", index);
                events.deleted.get_or_insert(index);
                continue;
            }

            if old == 0 && events.started.is_none() && is_recent(time, now) {
                let elapsed = read_slot_f32(reader, settings, layout, index, layout.elapsed);
                match elapsed {
                    Ok(elapsed) if elapsed < 1.0 => {
                        debug!("Save slot {} started ({} s played)", index, elapsed);
                        events.started = Some(index);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("Save slot {} play time unreadable: {}", index, e),
                }
            }
        }

        events
    }
}

impl Default for SaveSlots {
    fn default() -> Self {
        Self::new(SaveSlotLayout::default().count)
    }
}

fn is_recent(time: i64, now: i64) -> bool {
    now.saturating_sub(time).saturating_abs() < TICKS_PER_SECOND
}

fn read_slot_i64<R: ReadMemory + ?Sized>(
    reader: &R,
    settings: u64,
    layout: &SaveSlotLayout,
    index: usize,
    field: u64,
) -> Result<i64> {
    reader.read_i64(reader.read_chain(settings, &layout.field_chain(index, field))?)
}

fn read_slot_f32<R: ReadMemory + ?Sized>(
    reader: &R,
    settings: u64,
    layout: &SaveSlotLayout,
    index: usize,
    field: u64,
) -> Result<f32> {
    reader.read_f32(reader.read_chain(settings, &layout.field_chain(index, field))?)
}
