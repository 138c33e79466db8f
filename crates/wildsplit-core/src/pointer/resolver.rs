//! Pointer resolution, once per attach
//!
//! [`PointerResolver`] turns the layout table into [`ResolvedPaths`] synchronously.
//! [`Resolution`] runs it on a background thread and publishes the result exactly once, so
//! the poll loop sees either every path or none of them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::pointer::{
    LayoutEntry, LayoutTable, PathStep, PointerPath, ResolvedPaths, RuntimeMetadata, TrackedValue,
};

pub struct PointerResolver<'a> {
    table: &'a LayoutTable,
}

impl<'a> PointerResolver<'a> {
    pub fn new(table: &'a LayoutTable) -> Self {
        Self { table }
    }

    /// Resolve every tracked value; the first failure aborts the whole resolution.
    pub fn resolve<M: RuntimeMetadata + ?Sized>(&self, metadata: &M) -> Result<ResolvedPaths> {
        Ok(ResolvedPaths {
            scene_loaded: self.resolve_value(metadata, TrackedValue::SceneLoaded)?,
            settings_data: self.resolve_value(metadata, TrackedValue::SettingsData)?,
            screen_fade_alpha: self.resolve_value(metadata, TrackedValue::ScreenFadeAlpha)?,
            save_data: self.resolve_value(metadata, TrackedValue::SaveData)?,
            spritelings: self.resolve_value(metadata, TrackedValue::Spritelings)?,
            master_inventory: self.resolve_value(metadata, TrackedValue::MasterInventory)?,
            collections: self.table.collections.clone(),
        })
    }

    fn resolve_value<M: RuntimeMetadata + ?Sized>(
        &self,
        metadata: &M,
        value: TrackedValue,
    ) -> Result<PointerPath> {
        let entry = self.table.entry(value).ok_or_else(|| {
            Error::InvalidConfig(format!("layout table has no entry for {}", value))
        })?;
        Self::resolve_entry(metadata, entry)
    }

    fn resolve_entry<M: RuntimeMetadata + ?Sized>(
        metadata: &M,
        entry: &LayoutEntry,
    ) -> Result<PointerPath> {
        let static_data = metadata.static_data(&entry.class)?;
        if static_data == 0 {
            return Err(Error::NullPointer { address: 0 });
        }
        let base = static_data + metadata.field_offset(&entry.class, &entry.static_field)?;

        let offsets = entry
            .steps
            .iter()
            .map(|step| match step {
                PathStep::Field { class, field } => metadata.field_offset(class, field),
                PathStep::Offset { offset } => Ok(*offset),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PointerPath::new(entry.value, base, offsets))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Pending,
    Ready,
    Failed,
}

enum Outcome {
    Ready(ResolvedPaths),
    Failed,
}

/// Background resolution for one attach
pub struct Resolution {
    outcome: Arc<OnceLock<Outcome>>,
    cancelled: Arc<AtomicBool>,
}

impl Resolution {
    /// Start resolving on a background thread.
    pub fn spawn<M>(table: LayoutTable, metadata: M) -> Self
    where
        M: RuntimeMetadata + Send + 'static,
    {
        let outcome = Arc::new(OnceLock::new());
        let cancelled = Arc::new(AtomicBool::new(false));

        let thread_outcome = Arc::clone(&outcome);
        let thread_cancelled = Arc::clone(&cancelled);
        let spawned = thread::Builder::new()
            .name("pointer-resolver".to_string())
            .spawn(move || {
                debug!("Pointer resolution started");
                let result = PointerResolver::new(&table).resolve(&metadata);
                if thread_cancelled.load(Ordering::SeqCst) {
                    debug!("Pointer resolution finished after detach, discarding");
                    return;
                }
                let published = match result {
                    Ok(paths) => {
                        for path in paths.iter() {
                            info!("{}", path);
                        }
                        Outcome::Ready(paths)
                    }
                    Err(e) if e.is_metadata_missing() => {
                        info!("Game data not loaded yet: {}", e);
                        Outcome::Failed
                    }
                    Err(e) => {
                        warn!("Pointer resolution failed: {}", e);
                        Outcome::Failed
                    }
                };
                let _ = thread_outcome.set(published);
            });

        if let Err(e) = spawned {
            warn!("Failed to spawn pointer resolution thread: {}", e);
            let _ = outcome.set(Outcome::Failed);
        }

        Self { outcome, cancelled }
    }

    pub fn state(&self) -> ResolutionState {
        match self.outcome.get() {
            None => ResolutionState::Pending,
            Some(Outcome::Ready(_)) => ResolutionState::Ready,
            Some(Outcome::Failed) => ResolutionState::Failed,
        }
    }

    /// Resolved paths, once every one of them is available.
    pub fn paths(&self) -> Option<&ResolvedPaths> {
        match self.outcome.get() {
            Some(Outcome::Ready(paths)) => Some(paths),
            _ => None,
        }
    }

    /// Stop publishing; a result that arrives later is dropped.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Drop for Resolution {
    fn drop(&mut self) {
        self.cancel();
    }
}
