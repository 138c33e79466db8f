use std::fs::{self, File};
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

use tracing::debug;

use super::{ProcessInfo, name_matches};
use crate::error::{Error, Result};

pub struct RawProcess {
    pid: u32,
    mem: File,
}

pub fn find_and_open(name: &str) -> Result<(ProcessInfo, RawProcess)> {
    for entry in fs::read_dir("/proc")? {
        let Ok(entry) = entry else { continue };
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Some(exe_name) = executable_name(pid) else {
            continue;
        };
        if !name_matches(&exe_name, name) {
            continue;
        }

        let mem = File::open(proc_path(pid, "mem"))
            .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;
        debug!("Opened /proc/{}/mem for {}", pid, exe_name);
        return Ok((
            ProcessInfo {
                pid,
                name: exe_name,
            },
            RawProcess { pid, mem },
        ));
    }

    Err(Error::ProcessNotFound(name.to_string()))
}

/// File name of the first command line argument.
///
/// Wine keeps the Windows path of the game executable there, so both separators count.
fn executable_name(pid: u32) -> Option<String> {
    let cmdline = fs::read(proc_path(pid, "cmdline")).ok()?;
    let argv0 = cmdline.split(|&b| b == 0).next()?;
    let argv0 = String::from_utf8_lossy(argv0);
    let file_name = argv0.rsplit(['/', '\\']).next()?.trim();
    if file_name.is_empty() {
        None
    } else {
        Some(file_name.to_string())
    }
}

fn proc_path(pid: u32, file: &str) -> PathBuf {
    PathBuf::from(format!("/proc/{}/{}", pid, file))
}

impl RawProcess {
    pub fn read_into(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        self.mem
            .read_exact_at(buffer, address)
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })
    }

    pub fn is_alive(&self) -> bool {
        proc_path(self.pid, "stat").exists()
    }

    pub fn module_base(&self, module: &str) -> Result<u64> {
        let maps = fs::read_to_string(proc_path(self.pid, "maps"))?;
        maps.lines()
            .find_map(|line| parse_maps_line(line, module))
            .ok_or_else(|| Error::ModuleNotFound(module.to_string()))
    }
}

/// Start address of a `/proc/<pid>/maps` line if its mapped file is `module`.
fn parse_maps_line(line: &str, module: &str) -> Option<u64> {
    // start-end perms offset dev inode path
    let mut fields = line.splitn(6, char::is_whitespace);
    let range = fields.next()?;
    let path = fields.nth(4)?.trim();
    let file_name = path.rsplit('/').next()?;
    if !name_matches(file_name, module) {
        return None;
    }
    let start = range.split('-').next()?;
    u64::from_str_radix(start, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_maps_line() {
        let line = "7f2a10000000-7f2a10001000 r--p 00000000 08:02 1234   /games/wah/MonoBleedingEdge/EmbedRuntime/mono-2.0-bdwgc.dll";
        assert_eq!(
            parse_maps_line(line, "mono-2.0-bdwgc.dll"),
            Some(0x7f2a10000000)
        );
        assert_eq!(parse_maps_line(line, "UnityPlayer.dll"), None);
    }

    #[test]
    fn test_parse_maps_line_anonymous() {
        let line = "7ffd5a1e0000-7ffd5a201000 rw-p 00000000 00:00 0";
        assert_eq!(parse_maps_line(line, "mono-2.0-bdwgc.dll"), None);
    }

    #[test]
    fn test_own_process_is_readable() {
        let value: u64 = 0xDEAD_BEEF_0BAD_F00D;
        let (_, process) = open_self();
        let mut buffer = [0u8; 8];
        process
            .read_into(&value as *const u64 as u64, &mut buffer)
            .unwrap();
        assert_eq!(u64::from_le_bytes(buffer), value);
        assert!(process.is_alive());
    }

    fn open_self() -> (u32, RawProcess) {
        let pid = std::process::id();
        let mem = File::open(proc_path(pid, "mem")).unwrap();
        (pid, RawProcess { pid, mem })
    }
}
