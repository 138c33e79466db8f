use std::sync::Arc;

use encoding_rs::UTF_16LE;
use tracing::trace;

use crate::error::{Error, Result};
use crate::memory::ProcessHandle;
use crate::pointer::StringLayout;

/// Read access to the address space of the target process.
///
/// Implementors only provide [`ReadMemory::read_bytes`]; typed reads, pointer chains and
/// managed string decoding are built on top of it. All values are little-endian.
pub trait ReadMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Whether the target process is still running.
    fn is_alive(&self) -> bool {
        true
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        read_array(self, address).map(i32::from_le_bytes)
    }

    fn read_i64(&self, address: u64) -> Result<i64> {
        read_array(self, address).map(i64::from_le_bytes)
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        read_array(self, address).map(u64::from_le_bytes)
    }

    fn read_f32(&self, address: u64) -> Result<f32> {
        read_array(self, address).map(f32::from_le_bytes)
    }

    fn read_bool(&self, address: u64) -> Result<bool> {
        read_array::<1, _>(self, address).map(|b| b[0] != 0)
    }

    /// Read a pointer-sized value, rejecting null.
    fn read_ptr(&self, address: u64) -> Result<u64> {
        match self.read_u64(address)? {
            0 => Err(Error::NullPointer { address }),
            ptr => Ok(ptr),
        }
    }

    /// Follow a chain of offsets from `base`.
    ///
    /// Every offset except the last one is added and then dereferenced; the last one is only
    /// added. `read_chain(obj, &[0x10, 0x28])` is the address of field `0x28` of the object
    /// referenced by field `0x10` of `obj`.
    fn read_chain(&self, base: u64, offsets: &[u64]) -> Result<u64> {
        let Some((last, hops)) = offsets.split_last() else {
            return Ok(base);
        };
        let mut address = base;
        for offset in hops {
            address = self.read_ptr(address.wrapping_add(*offset))?;
        }
        Ok(address.wrapping_add(*last))
    }

    /// Decode a managed `System.String` from its object address.
    fn read_managed_string(&self, object: u64, layout: &StringLayout) -> Result<String> {
        let length_address = object.wrapping_add(layout.length);
        let length = self.read_i32(length_address)?;
        if length < 0 || length as usize > layout.max_length {
            return Err(Error::InvalidLength {
                address: length_address,
                length: length as i64,
            });
        }
        if length == 0 {
            return Ok(String::new());
        }

        let bytes = self.read_bytes(object.wrapping_add(layout.chars), length as usize * 2)?;
        Ok(decode_utf16(&bytes))
    }
}

fn read_array<const N: usize, R: ReadMemory + ?Sized>(reader: &R, address: u64) -> Result<[u8; N]> {
    let bytes = reader.read_bytes(address, N)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::MemoryReadFailed {
            address,
            message: format!("expected {} bytes, got {}", N, bytes.len()),
        })
}

/// Decode UTF-16LE code units as stored by the managed runtime.
///
/// Unpaired surrogates are replaced with U+FFFD.
pub fn decode_utf16(bytes: &[u8]) -> String {
    let (decoded, had_errors) = UTF_16LE.decode_without_bom_handling(bytes);
    if had_errors {
        trace!("Malformed UTF-16 in {} bytes, decoded lossily", bytes.len());
    }
    decoded.into_owned()
}

impl<R: ReadMemory + ?Sized> ReadMemory for Arc<R> {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

/// Memory reader over an opened game process
#[derive(Clone)]
pub struct MemoryReader {
    process: Arc<ProcessHandle>,
}

impl MemoryReader {
    pub fn new(process: ProcessHandle) -> Self {
        Self {
            process: Arc::new(process),
        }
    }

    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }
}

impl ReadMemory for MemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        self.process.read_into(address, &mut buffer)?;
        Ok(buffer)
    }

    fn is_alive(&self) -> bool {
        self.process.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    #[test]
    fn test_typed_reads() {
        let reader = MockMemoryBuilder::new()
            .write_i32(0x1000, -7)
            .write_i64(0x1008, 638_000_000_000_000_000)
            .write_f32(0x1010, 0.5)
            .write_u8(0x1014, 1)
            .build();

        assert_eq!(reader.read_i32(0x1000).unwrap(), -7);
        assert_eq!(reader.read_i64(0x1008).unwrap(), 638_000_000_000_000_000);
        assert_eq!(reader.read_f32(0x1010).unwrap(), 0.5);
        assert!(reader.read_bool(0x1014).unwrap());
    }

    #[test]
    fn test_read_ptr_rejects_null() {
        let reader = MockMemoryBuilder::new().write_u64(0x1000, 0).build();
        assert!(matches!(
            reader.read_ptr(0x1000),
            Err(Error::NullPointer { address: 0x1000 })
        ));
    }

    #[test]
    fn test_read_chain_derefs_all_but_last() {
        // 0x1000 +0x10 -> 0x2000, 0x2000 +0x8 -> 0x3000, then +0x28 without deref
        let reader = MockMemoryBuilder::new()
            .write_u64(0x1010, 0x2000)
            .write_u64(0x2008, 0x3000)
            .build();

        assert_eq!(reader.read_chain(0x1000, &[0x10, 0x8, 0x28]).unwrap(), 0x3028);
        assert_eq!(reader.read_chain(0x1000, &[0x4]).unwrap(), 0x1004);
        assert_eq!(reader.read_chain(0x1000, &[]).unwrap(), 0x1000);
    }

    #[test]
    fn test_read_chain_null_hop() {
        let reader = MockMemoryBuilder::new().write_u64(0x1010, 0).build();
        assert!(reader.read_chain(0x1000, &[0x10, 0x28]).is_err());
    }

    #[test]
    fn test_read_managed_string() {
        let layout = StringLayout::default();
        let reader = MockMemoryBuilder::new()
            .write_managed_string(0x5000, "Lunaling")
            .write_managed_string(0x6000, "")
            .build();

        assert_eq!(reader.read_managed_string(0x5000, &layout).unwrap(), "Lunaling");
        assert_eq!(reader.read_managed_string(0x6000, &layout).unwrap(), "");
    }

    #[test]
    fn test_read_managed_string_rejects_bad_length() {
        let layout = StringLayout::default();
        let reader = MockMemoryBuilder::new()
            .write_i32(0x5010, -1)
            .write_i32(0x6010, 1_000_000)
            .build();

        assert!(matches!(
            reader.read_managed_string(0x5000, &layout),
            Err(Error::InvalidLength { .. })
        ));
        assert!(matches!(
            reader.read_managed_string(0x6000, &layout),
            Err(Error::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_decode_utf16_non_ascii() {
        let bytes: Vec<u8> = "Émber".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        assert_eq!(decode_utf16(&bytes), "Émber");
    }

    #[test]
    fn test_decode_utf16_lone_surrogate_is_lossy() {
        let bytes = [0x41, 0x00, 0x00, 0xD8, 0x42, 0x00];
        assert_eq!(decode_utf16(&bytes), "A\u{FFFD}B");
    }
}
