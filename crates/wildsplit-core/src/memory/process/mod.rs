//! Process discovery and raw memory access
//!
//! The game ships for Windows; on Linux it usually runs under Wine/Proton, where the same
//! address space is reachable through procfs.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod win32;

#[cfg(target_os = "linux")]
use linux as platform;
#[cfg(target_os = "windows")]
use win32 as platform;

use crate::error::Result;
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
use crate::error::Error;

/// Information about a running process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// An opened game process
pub struct ProcessHandle {
    pub info: ProcessInfo,
    #[cfg(any(target_os = "linux", target_os = "windows"))]
    inner: platform::RawProcess,
}

impl ProcessHandle {
    /// Find a running process whose executable name matches `name` and open it for reading.
    ///
    /// The match ignores ASCII case and a trailing `.exe`.
    #[cfg(any(target_os = "linux", target_os = "windows"))]
    pub fn find_and_open(name: &str) -> Result<Self> {
        let (info, inner) = platform::find_and_open(name)?;
        Ok(Self { info, inner })
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    pub fn find_and_open(name: &str) -> Result<Self> {
        Err(Error::ProcessNotFound(format!(
            "{} (process access is not supported on this platform)",
            name
        )))
    }

    pub fn pid(&self) -> u32 {
        self.info.pid
    }

    /// Fill `buffer` with the bytes at `address` in the target process.
    pub fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        #[cfg(any(target_os = "linux", target_os = "windows"))]
        {
            self.inner.read_into(address, buffer)
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        {
            let _ = buffer;
            Err(Error::MemoryReadFailed {
                address,
                message: "unsupported platform".to_string(),
            })
        }
    }

    pub fn is_alive(&self) -> bool {
        #[cfg(any(target_os = "linux", target_os = "windows"))]
        {
            self.inner.is_alive()
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        {
            false
        }
    }

    /// Base address of a loaded module (e.g. `mono-2.0-bdwgc.dll`).
    pub fn module_base(&self, module: &str) -> Result<u64> {
        #[cfg(any(target_os = "linux", target_os = "windows"))]
        {
            self.inner.module_base(module)
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        {
            Err(Error::ModuleNotFound(module.to_string()))
        }
    }
}

/// Whether an executable or module file name refers to `name`.
pub(crate) fn name_matches(file_name: &str, name: &str) -> bool {
    let strip = |s: &str| -> String {
        let lower = s.to_ascii_lowercase();
        lower.strip_suffix(".exe").map(str::to_string).unwrap_or(lower)
    };
    strip(file_name) == strip(name)
}
