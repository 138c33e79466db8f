use crate::error::Result;
use crate::memory::ReadMemory;
use crate::pointer::PointerPath;

/// Plain values a [`MemoryCell`] can hold
pub trait CellValue: Copy + PartialEq + Default {
    fn read_from<R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Result<Self>;
}

impl CellValue for bool {
    fn read_from<R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Result<Self> {
        reader.read_bool(address)
    }
}

impl CellValue for i32 {
    fn read_from<R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Result<Self> {
        reader.read_i32(address)
    }
}

impl CellValue for i64 {
    fn read_from<R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Result<Self> {
        reader.read_i64(address)
    }
}

impl CellValue for f32 {
    fn read_from<R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Result<Self> {
        reader.read_f32(address)
    }
}

/// Object handles; null is a value here, not an error
impl CellValue for u64 {
    fn read_from<R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Result<Self> {
        reader.read_u64(address)
    }
}

/// Double-buffered value read once per tick
///
/// `previous` is always what `current` was on the prior tick. Edge predicates compare the
/// two, so each one is true on exactly the tick of the transition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryCell<T> {
    previous: T,
    current: T,
}

impl<T: CellValue> MemoryCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift `current` into `previous` and store `value`.
    pub fn advance(&mut self, value: T) {
        self.previous = self.current;
        self.current = value;
    }

    /// Like [`MemoryCell::advance`], but a missing value keeps `current` as it was, so no edge
    /// can fire this tick.
    pub fn advance_or_hold(&mut self, value: Option<T>) {
        self.advance(value.unwrap_or(self.current));
    }

    /// Read the value at the end of `path`. Returns whether the read succeeded.
    pub fn refresh<R: ReadMemory + ?Sized>(&mut self, reader: &R, path: &PointerPath) -> bool {
        let value = path
            .address(reader)
            .and_then(|address| T::read_from(reader, address))
            .ok();
        let ok = value.is_some();
        self.advance_or_hold(value);
        ok
    }

    pub fn previous(&self) -> T {
        self.previous
    }

    pub fn current(&self) -> T {
        self.current
    }

    pub fn changed(&self) -> bool {
        self.previous != self.current
    }

    /// `current` is `value` and `previous` was not.
    pub fn became(&self, value: T) -> bool {
        self.current == value && self.previous != value
    }

    /// Went from the default (zero/false) to anything else.
    pub fn rose(&self) -> bool {
        self.previous == T::default() && self.current != T::default()
    }

    /// Went from anything to the default (zero/false).
    pub fn fell(&self) -> bool {
        self.previous != T::default() && self.current == T::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;
    use crate::pointer::TrackedValue;

    #[test]
    fn test_became_fires_only_on_transition() {
        let mut cell = MemoryCell::<f32>::new();
        let mut fired = Vec::new();
        for value in [0.0, 0.5, 1.0, 1.0, 0.3, 1.0] {
            cell.advance(value);
            fired.push(cell.became(1.0));
        }
        assert_eq!(fired, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn test_rose_and_fell() {
        let mut cell = MemoryCell::<i32>::new();
        cell.advance(0);
        assert!(!cell.rose());
        cell.advance(3);
        assert!(cell.rose());
        cell.advance(4);
        assert!(!cell.rose() && !cell.fell());
        assert!(cell.changed());
        cell.advance(0);
        assert!(cell.fell());
    }

    #[test]
    fn test_advance_or_hold_suppresses_edges() {
        let mut cell = MemoryCell::<bool>::new();
        cell.advance(true);
        cell.advance_or_hold(None);
        assert!(cell.current());
        assert!(cell.previous());
        assert!(!cell.changed());
    }

    #[test]
    fn test_refresh_reads_through_path() {
        let reader = MockMemoryBuilder::new().write_u8(0x1008, 1).build();
        let path = PointerPath::new(TrackedValue::SceneLoaded, 0x1008, vec![]);
        let mut cell = MemoryCell::<bool>::new();

        assert!(cell.refresh(&reader, &path));
        assert!(cell.rose());

        let missing = PointerPath::new(TrackedValue::SceneLoaded, 0x9999, vec![]);
        assert!(!cell.refresh(&reader, &missing));
        assert!(cell.current());
        assert!(!cell.changed());
    }
}
