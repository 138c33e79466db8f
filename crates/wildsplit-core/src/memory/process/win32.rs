use std::ffi::c_void;
use std::mem::size_of;

use tracing::debug;
use windows::Win32::Foundation::{CloseHandle, HANDLE, STILL_ACTIVE};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, Module32NextW, PROCESSENTRY32W,
    Process32FirstW, Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ,
};

use super::{ProcessInfo, name_matches};
use crate::error::{Error, Result};

/// Owned process handle, stored as its raw value so the wrapper is `Send + Sync`.
pub struct RawProcess {
    pid: u32,
    handle: isize,
}

impl RawProcess {
    fn handle(&self) -> HANDLE {
        HANDLE(self.handle as *mut c_void)
    }

    pub fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        let mut read = 0usize;
        // SAFETY: the buffer is valid for `buffer.len()` writes and the handle stays open for
        // the lifetime of `self`.
        unsafe {
            ReadProcessMemory(
                self.handle(),
                address as *const c_void,
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len(),
                Some(&mut read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;

        if read != buffer.len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("partial read: {} of {} bytes", read, buffer.len()),
            });
        }
        Ok(())
    }

    pub fn is_alive(&self) -> bool {
        let mut code = 0u32;
        // SAFETY: `code` is a valid out pointer and the handle is open.
        let ok = unsafe { GetExitCodeProcess(self.handle(), &mut code) }.is_ok();
        ok && code == STILL_ACTIVE.0 as u32
    }

    pub fn module_base(&self, module: &str) -> Result<u64> {
        // SAFETY: snapshot handle is closed below; entry is sized before the first call.
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, self.pid)
                .map_err(|e| Error::ModuleNotFound(format!("{}: {}", module, e)))?;

            let mut entry = MODULEENTRY32W {
                dwSize: size_of::<MODULEENTRY32W>() as u32,
                ..Default::default()
            };
            let mut found = None;
            let mut next = Module32FirstW(snapshot, &mut entry);
            while next.is_ok() {
                if name_matches(&wide_to_string(&entry.szModule), module) {
                    found = Some(entry.modBaseAddr as u64);
                    break;
                }
                next = Module32NextW(snapshot, &mut entry);
            }
            let _ = CloseHandle(snapshot);

            found.ok_or_else(|| Error::ModuleNotFound(module.to_string()))
        }
    }
}

impl Drop for RawProcess {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by OpenProcess and is closed exactly once.
        unsafe {
            let _ = CloseHandle(self.handle());
        }
    }
}

pub fn find_and_open(name: &str) -> Result<(ProcessInfo, RawProcess)> {
    let (pid, exe_name) = find_process(name)?;

    // SAFETY: plain Win32 call; the returned handle is owned by RawProcess.
    let handle = unsafe {
        OpenProcess(PROCESS_VM_READ | PROCESS_QUERY_LIMITED_INFORMATION, false, pid)
    }
    .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;

    debug!("Opened process {} (pid {})", exe_name, pid);
    Ok((
        ProcessInfo {
            pid,
            name: exe_name,
        },
        RawProcess {
            pid,
            handle: handle.0 as isize,
        },
    ))
}

fn find_process(name: &str) -> Result<(u32, String)> {
    // SAFETY: snapshot handle is closed below; entry is sized before the first call.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(format!("{}: {}", name, e)))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        let mut found = None;
        let mut next = Process32FirstW(snapshot, &mut entry);
        while next.is_ok() {
            let exe_name = wide_to_string(&entry.szExeFile);
            if name_matches(&exe_name, name) {
                found = Some((entry.th32ProcessID, exe_name));
                break;
            }
            next = Process32NextW(snapshot, &mut entry);
        }
        let _ = CloseHandle(snapshot);

        found.ok_or_else(|| Error::ProcessNotFound(name.to_string()))
    }
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}
