//! Per-tick timer decisions
//!
//! [`Splitter`] is driven by a host that owns the timer and the process attachment. The host
//! calls the lifecycle hooks when the game appears or disappears and [`Splitter::update`] once
//! per tick, then applies the returned [`TimerActions`].

use chrono::Local;
use tracing::{debug, info};

use crate::error::Result;
use crate::game::{DiscoveredItemSet, GameMemory, SaveRecordMap, SaveSlots, spriteling_label};
use crate::memory::ReadMemory;
use crate::memory::layout::timing::{TICKS_PER_SECOND, UNIX_EPOCH_TICKS};
use crate::pointer::{LayoutTable, Resolution, ResolutionState, RuntimeMetadata};
use crate::split::{Category, RemainingDictionary, SplitterSettings};

/// Local wall-clock time in .NET ticks, as the game stamps its saves
pub trait Clock {
    fn now_ticks(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ticks(&self) -> i64 {
        let local = Local::now().naive_local().and_utc();
        UNIX_EPOCH_TICKS
            + local.timestamp() * TICKS_PER_SECOND
            + i64::from(local.timestamp_subsec_nanos()) / 100
    }
}

/// What the host timer should do after a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerActions {
    pub start: bool,
    pub split: bool,
    pub reset: bool,
    /// Game time should be paused
    pub is_loading: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerPhase {
    #[default]
    NotRunning,
    Running,
}

/// Split producers, in the order they are tried each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitSource {
    Spriteling,
    Inventory,
    SaveData,
}

const SPLIT_SOURCES: [SplitSource; 3] = [
    SplitSource::Spriteling,
    SplitSource::Inventory,
    SplitSource::SaveData,
];

/// Everything seen in the game since the run started
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    pub spritelings: DiscoveredItemSet<i32>,
    pub inventory: DiscoveredItemSet<String>,
    pub save_data: SaveRecordMap,
}

impl RunProgress {
    fn clear(&mut self) {
        self.spritelings.clear();
        self.inventory.clear();
        self.save_data.clear();
    }
}

struct Attachment<R> {
    reader: R,
    resolution: Resolution,
    game: Option<GameMemory>,
}

pub struct Splitter<R, C = SystemClock> {
    table: LayoutTable,
    settings: SplitterSettings,
    clock: C,
    phase: TimerPhase,
    checklist: RemainingDictionary,
    slots: SaveSlots,
    progress: RunProgress,
    attachment: Option<Attachment<R>>,
}

impl<R: ReadMemory> Splitter<R, SystemClock> {
    pub fn new(table: LayoutTable, settings: SplitterSettings) -> Self {
        Self::with_clock(table, settings, SystemClock)
    }
}

impl<R: ReadMemory, C: Clock> Splitter<R, C> {
    pub fn with_clock(table: LayoutTable, settings: SplitterSettings, clock: C) -> Self {
        let slots = SaveSlots::new(table.collections.save_slots.count);
        Self {
            table,
            settings,
            clock,
            phase: TimerPhase::NotRunning,
            checklist: RemainingDictionary::new(),
            slots,
            progress: RunProgress::default(),
            attachment: None,
        }
    }

    pub fn settings(&self) -> &SplitterSettings {
        &self.settings
    }

    /// Replace the settings; the split list takes effect on the next run start.
    pub fn set_settings(&mut self, settings: SplitterSettings) {
        self.settings = settings;
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn checklist(&self) -> &RemainingDictionary {
        &self.checklist
    }

    pub fn progress(&self) -> &RunProgress {
        &self.progress
    }

    pub fn save_slots(&self) -> &SaveSlots {
        &self.slots
    }

    /// `None` while detached.
    pub fn resolution_state(&self) -> Option<ResolutionState> {
        self.attachment
            .as_ref()
            .map(|attachment| attachment.resolution.state())
    }

    /// The game process was found; resolve pointers in the background.
    pub fn on_attach<M>(&mut self, reader: R, metadata: M)
    where
        M: RuntimeMetadata + Send + 'static,
    {
        self.on_detach();
        info!("Attached, resolving game data");
        self.attachment = Some(Attachment {
            reader,
            resolution: Resolution::spawn(self.table.clone(), metadata),
            game: None,
        });
    }

    /// The game process is gone (or resolution is to be retried); drop every path.
    pub fn on_detach(&mut self) {
        if self.attachment.take().is_some() {
            info!("Detached");
        }
    }

    /// A run started, either detected here or started by the user.
    pub fn on_start(&mut self) {
        self.progress.clear();
        self.checklist.setup(&self.settings);
        self.phase = TimerPhase::Running;
        info!(
            "Run started with {} splits",
            self.checklist.remaining_count()
        );
    }

    /// The run was reset, either detected here or by the user.
    pub fn on_reset(&mut self) {
        self.phase = TimerPhase::NotRunning;
        info!("Run reset");
    }

    /// Evaluate one tick. `None` while the game is not attached or not resolved yet.
    pub fn update(&mut self) -> Option<TimerActions> {
        let attachment = self.attachment.as_mut()?;
        if attachment.game.is_none() {
            let paths = attachment.resolution.paths()?.clone();
            attachment.game = Some(GameMemory::new(paths));
        }
        let reader = &attachment.reader;
        let game = attachment.game.as_mut()?;

        game.refresh(reader);
        let events = game.poll_save_slots(reader, &mut self.slots, self.clock.now_ticks());

        let running = self.phase == TimerPhase::Running;
        let mut actions = TimerActions {
            start: self.settings.start && !running && events.started(),
            reset: self.settings.reset && running && events.deleted(),
            is_loading: game.is_loading(),
            ..Default::default()
        };

        if running && !actions.reset && self.checklist.remaining_count() > 0 {
            actions.split = try_split(game, reader, &mut self.progress, &mut self.checklist);
        }

        if actions.start {
            self.on_start();
        }
        if actions.reset {
            self.on_reset();
        }
        Some(actions)
    }
}

/// Run the split producers in priority order; at most one split per tick.
///
/// A producer that fails to read counts as no split and the next one still runs.
fn try_split<R: ReadMemory + ?Sized>(
    game: &GameMemory,
    reader: &R,
    progress: &mut RunProgress,
    checklist: &mut RemainingDictionary,
) -> bool {
    for source in SPLIT_SOURCES {
        let result = match source {
            SplitSource::Spriteling => split_spritelings(game, reader, progress, checklist),
            SplitSource::Inventory => split_inventory(game, reader, progress, checklist),
            SplitSource::SaveData => split_save_data(game, reader, progress, checklist),
        };
        match result {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => debug!("{:?} split check skipped: {}", source, e),
        }
    }
    false
}

fn split_spritelings<R: ReadMemory + ?Sized>(
    game: &GameMemory,
    reader: &R,
    progress: &mut RunProgress,
    checklist: &mut RemainingDictionary,
) -> Result<bool> {
    if !checklist.has_category(Category::Spriteling) {
        return Ok(false);
    }
    for id in game.new_spritelings(reader, &mut progress.spritelings)? {
        let label = spriteling_label(id?);
        debug!("New spriteling {}", label);
        if checklist.split(Category::Spriteling, Some(&label)) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn split_inventory<R: ReadMemory + ?Sized>(
    game: &GameMemory,
    reader: &R,
    progress: &mut RunProgress,
    checklist: &mut RemainingDictionary,
) -> Result<bool> {
    if !checklist.has_category(Category::Inventory) {
        return Ok(false);
    }
    for item in game.new_inventory_items(reader, &mut progress.inventory)? {
        let item = item?;
        debug!("New item {}", item);
        if checklist.split(Category::Inventory, Some(&item)) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Save data splits, then the ending.
///
/// The ending shows up as a single-tick fade edge, so a failed save data scan still lets the
/// ending be checked against the records gathered so far. A save data split on the edge tick
/// uses up that tick and the ending is missed.
fn split_save_data<R: ReadMemory + ?Sized>(
    game: &GameMemory,
    reader: &R,
    progress: &mut RunProgress,
    checklist: &mut RemainingDictionary,
) -> Result<bool> {
    let has_end = checklist.has_category(Category::End);
    if !checklist.has_category(Category::SaveData) && !has_end {
        return Ok(false);
    }

    match scan_save_data(game, reader, &mut progress.save_data, checklist) {
        Ok(true) => return Ok(true),
        Ok(false) => {}
        Err(e) => debug!("Save data scan stopped: {}", e),
    }

    Ok(has_end
        && game.is_game_finished(&progress.save_data)
        && checklist.split(Category::End, None))
}

fn scan_save_data<R: ReadMemory + ?Sized>(
    game: &GameMemory,
    reader: &R,
    records: &mut SaveRecordMap,
    checklist: &mut RemainingDictionary,
) -> Result<bool> {
    for record in game.changed_save_data(reader, records)? {
        let label = record?.label();
        debug!("Save data {}", label);
        if checklist.split(Category::SaveData, Some(&label)) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::{MockMemoryBuilder, MockMemoryReader};
    use crate::split::SplitEntry;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_ticks(&self) -> i64 {
            self.0
        }
    }

    /// Metadata that never resolves anything
    struct EmptyMetadata;

    impl RuntimeMetadata for EmptyMetadata {
        fn static_data(&self, class: &str) -> Result<u64> {
            Err(Error::ClassNotFound(class.to_string()))
        }

        fn field_offset(&self, class: &str, field: &str) -> Result<u64> {
            Err(Error::FieldNotFound {
                class: class.to_string(),
                field: field.to_string(),
            })
        }
    }

    fn splitter() -> Splitter<Arc<MockMemoryReader>, FixedClock> {
        Splitter::with_clock(
            LayoutTable::builtin(),
            SplitterSettings {
                splits: vec![SplitEntry::end()],
                ..Default::default()
            },
            FixedClock(0),
        )
    }

    #[test]
    fn test_detached_update_is_not_ready() {
        let mut splitter = splitter();
        assert_eq!(splitter.resolution_state(), None);
        assert_eq!(splitter.update(), None);
    }

    #[test]
    fn test_failed_resolution_stays_not_ready() {
        let mut splitter = splitter();
        splitter.on_attach(Arc::new(MockMemoryBuilder::new().build()), EmptyMetadata);

        let deadline = Instant::now() + Duration::from_secs(5);
        while splitter.resolution_state() == Some(ResolutionState::Pending)
            && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(splitter.resolution_state(), Some(ResolutionState::Failed));
        assert_eq!(splitter.update(), None);

        splitter.on_detach();
        assert_eq!(splitter.resolution_state(), None);
    }

    #[test]
    fn test_manual_start_and_reset() {
        let mut splitter = splitter();
        splitter.on_start();
        assert_eq!(splitter.phase(), TimerPhase::Running);
        assert_eq!(splitter.checklist().remaining_count(), 1);

        splitter.on_reset();
        assert_eq!(splitter.phase(), TimerPhase::NotRunning);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01 in .NET ticks
        assert!(SystemClock.now_ticks() > 637_133_760_000_000_000);
    }
}
