//! Mock memory reader for tests
//!
//! Memory is a sparse byte map; reading any byte that was never written fails, like an
//! unmapped page would. Values can be rewritten between ticks through `&self`, so a test can
//! share one reader with a [`crate::Splitter`] and mutate "game memory" as it goes.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::memory::layout::string;

#[derive(Default)]
pub struct MockMemoryReader {
    bytes: RwLock<HashMap<u64, u8>>,
    reads: AtomicUsize,
    exited: AtomicBool,
}

impl MockMemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bytes(&self, address: u64, data: &[u8]) {
        let mut bytes = self.bytes.write().unwrap_or_else(|e| e.into_inner());
        for (i, b) in data.iter().enumerate() {
            bytes.insert(address + i as u64, *b);
        }
    }

    pub fn write_u8(&self, address: u64, value: u8) {
        self.write_bytes(address, &[value]);
    }

    pub fn write_i32(&self, address: u64, value: i32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_i64(&self, address: u64, value: i64) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_u64(&self, address: u64, value: u64) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_f32(&self, address: u64, value: f32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    /// Write a managed `System.String` object at `address`.
    pub fn write_managed_string(&self, address: u64, value: &str) {
        let units: Vec<u8> = value.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        self.write_i32(address + string::LENGTH, (units.len() / 2) as i32);
        self.write_bytes(address + string::CHARS, &units);
    }

    /// Number of `read_bytes` calls served so far (successful or not).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn reset_read_count(&self) {
        self.reads.store(0, Ordering::SeqCst);
    }

    /// Simulate the target process exiting; every later read fails.
    pub fn exit(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.exited.load(Ordering::SeqCst) {
            return Err(Error::MemoryReadFailed {
                address,
                message: "process exited".to_string(),
            });
        }

        let bytes = self.bytes.read().unwrap_or_else(|e| e.into_inner());
        (0..size as u64)
            .map(|i| {
                bytes
                    .get(&(address + i))
                    .copied()
                    .ok_or_else(|| Error::MemoryReadFailed {
                        address: address + i,
                        message: "unmapped".to_string(),
                    })
            })
            .collect()
    }

    fn is_alive(&self) -> bool {
        !self.exited.load(Ordering::SeqCst)
    }
}

/// Builder for [`MockMemoryReader`]
#[derive(Default)]
pub struct MockMemoryBuilder {
    reader: MockMemoryReader,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bytes(self, address: u64, data: &[u8]) -> Self {
        self.reader.write_bytes(address, data);
        self
    }

    pub fn write_u8(self, address: u64, value: u8) -> Self {
        self.reader.write_u8(address, value);
        self
    }

    pub fn write_i32(self, address: u64, value: i32) -> Self {
        self.reader.write_i32(address, value);
        self
    }

    pub fn write_i64(self, address: u64, value: i64) -> Self {
        self.reader.write_i64(address, value);
        self
    }

    pub fn write_u64(self, address: u64, value: u64) -> Self {
        self.reader.write_u64(address, value);
        self
    }

    pub fn write_f32(self, address: u64, value: f32) -> Self {
        self.reader.write_f32(address, value);
        self
    }

    pub fn write_managed_string(self, address: u64, value: &str) -> Self {
        self.reader.write_managed_string(address, value);
        self
    }

    pub fn build(self) -> MockMemoryReader {
        self.reader
    }
}
