//! Main tracking mode command.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info};
use wildsplit_core::memory::layout::timing::POLL_INTERVAL_MS;
use wildsplit_core::{
    LayoutTable, MemoryReader, MetadataSnapshot, ProcessMetadata, ReadMemory, ResolutionState,
    Splitter, load_layout, load_metadata,
};

use crate::input;
use crate::retry::{RESOLUTION_RETRY, wait_for_process};
use crate::settings::load_settings;
use crate::shutdown::{ShutdownSignal, StopReason};
use crate::timer::RunTimer;

pub struct TrackOptions {
    pub splits: PathBuf,
    pub metadata: PathBuf,
    pub layout: Option<PathBuf>,
    pub process: String,
}

type GameSplitter = Splitter<Arc<MemoryReader>>;

/// Run the main tracking mode
pub fn run(options: &TrackOptions) -> Result<()> {
    let settings = load_settings(&options.splits)?;
    info!(
        "Loaded {} splits from {}",
        settings.splits.len(),
        options.splits.display()
    );

    let table = match &options.layout {
        Some(path) => {
            let table = load_layout(path)?;
            info!("Loaded layout {} from {}", table.version, path.display());
            table
        }
        None => LayoutTable::builtin(),
    };
    let snapshot = load_metadata(&options.metadata).map_err(|e| {
        if e.is_not_found() {
            anyhow!(
                "Metadata snapshot {} not found; one is needed for each game build",
                options.metadata.display()
            )
        } else {
            e.into()
        }
    })?;
    info!("Loaded metadata for game version {}", snapshot.version);

    // Setup graceful shutdown handler
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_ctrlc.trigger(StopReason::Interrupted);
    })?;
    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown))?;

    let mut timer = RunTimer::new(settings.splits.len());
    let mut splitter = GameSplitter::new(table, settings);

    println!("Waiting for game... (Press Esc or q to quit)");
    while let Some(process) = wait_for_process(&options.process, &shutdown) {
        info!("Found {} (pid {})", process.info.name, process.pid());
        let reader = Arc::new(MemoryReader::new(process));

        println!("Resolving game data...");
        attach(&mut splitter, &reader, &snapshot);
        track(&mut splitter, &mut timer, &reader, &snapshot, &shutdown);
        splitter.on_detach();

        if shutdown.is_shutdown() {
            break;
        }
        println!("Game exited, waiting for it to start again...");
    }

    match shutdown.reason() {
        Some(reason) => info!("Stopped ({})", reason),
        None => info!("Stopped"),
    }
    Ok(())
}

/// Bind the metadata snapshot to the process and start resolving.
fn attach(splitter: &mut GameSplitter, reader: &Arc<MemoryReader>, snapshot: &MetadataSnapshot) {
    let mut module_bases = HashMap::new();
    for module in snapshot.modules() {
        match reader.process().module_base(&module) {
            Ok(base) => {
                debug!("{} loaded at {:#x}", module, base);
                module_bases.insert(module, base);
            }
            // Resolution fails on it and is retried
            Err(e) => debug!("Module {} not available yet: {}", module, e),
        }
    }

    let metadata = ProcessMetadata::new(snapshot.clone(), Arc::clone(reader), module_bases);
    splitter.on_attach(Arc::clone(reader), metadata);
}

/// Poll until the game exits or shutdown is requested.
fn track(
    splitter: &mut GameSplitter,
    timer: &mut RunTimer,
    reader: &Arc<MemoryReader>,
    snapshot: &MetadataSnapshot,
    shutdown: &ShutdownSignal,
) {
    let mut ready = false;

    for now in shutdown.ticks(Duration::from_millis(POLL_INTERVAL_MS)) {
        if !reader.is_alive() {
            info!("Game process exited");
            return;
        }

        if splitter.resolution_state() == Some(ResolutionState::Failed) {
            debug!(
                "Resolution failed, retrying in {}s",
                RESOLUTION_RETRY.as_secs()
            );
            if shutdown.wait(RESOLUTION_RETRY) {
                return;
            }
            attach(splitter, reader, snapshot);
            continue;
        }

        let Some(actions) = splitter.update() else {
            continue;
        };
        if !ready {
            ready = true;
            println!("Tracking");
        }

        for event in timer.apply(actions, now) {
            println!("{}", event);
        }
    }
}
