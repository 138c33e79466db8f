//! # wildsplit-core
//!
//! Core library of the autosplitter for *The Wild at Heart*.
//!
//! This crate provides:
//! - Foreign process memory reading (Windows and Linux) behind the [`ReadMemory`] trait
//! - Pointer resolution from a data-driven layout table and runtime class metadata
//! - Change detection over the game's spriteling, inventory and save data collections
//! - The ordered split checklist and the per-tick [`Splitter`]
//!
//! ## Testing
//!
//! [`MockMemoryBuilder`] lays out fake game objects at fixed addresses, so every component can
//! be exercised without a running game.

pub mod error;
pub mod game;
pub mod memory;
pub mod pointer;
pub mod split;
pub mod splitter;

pub use error::{Error, Result};
pub use game::{
    DiscoveredItemSet, END_KEY, GameMemory, MemoryCell, SaveRecord, SaveRecordMap, SaveSlots,
    SlotEvents, Spriteling, spriteling_label,
};
pub use memory::{
    MemoryReader, MockMemoryBuilder, MockMemoryReader, ProcessHandle, ProcessInfo, ReadMemory,
    decode_utf16,
};
pub use pointer::{
    CollectionLayout, LayoutTable, MetadataSnapshot, PointerPath, PointerResolver,
    ProcessMetadata, Resolution, ResolutionState, ResolvedPaths, RuntimeMetadata, TrackedValue,
    load_layout, load_metadata, save_layout, save_metadata,
};
pub use split::{Category, RemainingDictionary, SplitEntry, SplitterSettings};
pub use splitter::{Clock, RunProgress, Splitter, SystemClock, TimerActions, TimerPhase};
