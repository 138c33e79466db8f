//! Memory layout constants for the game's Mono runtime structures
//!
//! These are the built-in defaults behind [`crate::pointer::CollectionLayout`].
//! All offsets assume a 64-bit Mono runtime. Constants are organized by structure type.

/// Pointer size of the target process (8 bytes / 64-bit)
pub const PTR: u64 = 8;

/// `System.String` object
pub mod string {
    /// `int m_stringLength`
    pub const LENGTH: u64 = 0x10;
    /// First UTF-16 code unit
    pub const CHARS: u64 = 0x14;

    /// Upper bound on decoded string length (in UTF-16 units)
    pub const MAX_LENGTH: usize = 1024;
}

/// `System.Collections.Generic.List<T>` object
pub mod list {
    /// `T[] _items`
    pub const ITEMS: u64 = 0x10;
    /// `int _size`
    pub const SIZE: u64 = 0x18;
}

/// Managed array object (`T[]`)
pub mod array {
    /// First element, after the array header
    pub const DATA: u64 = 0x20;
}

/// `System.Collections.Generic.Dictionary<string, string>` object
pub mod dictionary {
    use super::PTR;

    /// `Entry[] entries`
    pub const ENTRIES: u64 = 0x18;
    /// `int count`
    pub const COUNT: u64 = 0x40;
    /// `int version`, bumped on every mutation
    pub const VERSION: u64 = 0x44;

    /// Size of one `Entry` (hashCode, next, key, value)
    pub const ENTRY_STRIDE: u64 = 0x18;
    pub const ENTRY_KEY: u64 = PTR;
    pub const ENTRY_VALUE: u64 = PTR * 2;
}

/// Save slot records reached from `SettingsData.Instance`
pub mod save_slot {
    use super::PTR;

    /// Number of save slots the game offers
    pub const COUNT: usize = 3;

    /// Pointer hops from the settings instance to the slot array
    pub const CHAIN: [u64; 2] = [0x10, 0x10];
    /// Slot `i` lives at `ARRAY_DATA + STRIDE * i` in the slot array
    pub const ARRAY_DATA: u64 = 0x20;
    pub const STRIDE: u64 = PTR;

    /// `float` play time of the slot
    pub const ELAPSED: u64 = 0x20;
    /// `long` last save time, in .NET ticks (0 for an empty slot)
    pub const SAVE_TIME: u64 = 0x28;
}

/// `BScreenFade` backing object
pub mod screen_fade {
    /// `float` opacity of the fade overlay
    pub const ALPHA: u64 = 0x74;
}

/// Sanity limits for values read out of a foreign heap
pub mod limits {
    /// Largest element count accepted for a tracked collection
    pub const MAX_COLLECTION_LEN: usize = 4096;
}

/// Timing constants for polling and attaching
pub mod timing {
    /// Interval between ticks of the main loop (ms), roughly one per frame
    pub const POLL_INTERVAL_MS: u64 = 15;

    /// Delay between process lookups while the game is not running (ms)
    pub const ATTACH_RETRY_MS: u64 = 2000;

    /// .NET ticks per second (one tick is 100ns)
    pub const TICKS_PER_SECOND: i64 = 10_000_000;

    /// .NET ticks of 1970-01-01T00:00:00
    pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
}
