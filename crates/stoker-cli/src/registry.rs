use std::path::PathBuf;

use anyhow::Context;

/// File name of the instance record inside the registry directory.
const RECORD_FILE: &str = ".model_server.pid";

/// Persisted identity of the running backend instance.
///
/// The record file is the mutual-exclusion marker: at most one exists at a
/// time, holding the backend pid as plain decimal text. The directory is
/// injected so tests can point the registry at a scratch location; production
/// uses the platform temp dir.
#[derive(Debug, Clone)]
pub struct InstanceRegistry {
    dir: PathBuf,
}

impl InstanceRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Registry at the well-known production location.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.join(RECORD_FILE)
    }

    /// Pid stored in the record, or `None` when no record exists.
    ///
    /// Content that does not parse as a usable pid is an error, not a
    /// missing record.
    pub fn read_record(&self) -> anyhow::Result<Option<u32>> {
        let path = self.record_path();
        let text = match std::fs::read_to_string(&path) {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read instance record {}", path.display()));
            }
        };

        let pid = text
            .trim()
            .parse::<u32>()
            .ok()
            // A pid outside pid_t range must never reach the signal calls.
            .filter(|pid| *pid > 0 && *pid <= i32::MAX as u32)
            .with_context(|| {
                format!(
                    "malformed instance record {}: {:?}",
                    path.display(),
                    text.trim()
                )
            })?;
        Ok(Some(pid))
    }

    pub fn write_record(&self, pid: u32) -> anyhow::Result<()> {
        let path = self.record_path();
        let tmp = self.dir.join(format!("{RECORD_FILE}.tmp"));
        std::fs::write(&tmp, pid.to_string().as_bytes())
            .with_context(|| format!("write instance record {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("persist instance record {}", path.display()))?;
        Ok(())
    }

    /// Delete the record. A missing record is a no-op.
    pub fn clear_record(&self) -> anyhow::Result<()> {
        let path = self.record_path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("remove instance record {}", path.display()))
            }
        }
    }
}

/// Whether `pid` refers to a live process in the OS process table.
///
/// `EPERM` still means the process exists; `ESRCH` means it is gone.
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if rc == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

// Liveness probing is unix-only; without it every record reads as stale.
#[cfg(not(unix))]
pub fn is_alive(_pid: u32) -> bool {
    false
}

/// Ask `pid` to terminate gracefully. `Ok` means the signal was delivered,
/// not that the process has exited.
#[cfg(unix)]
pub fn terminate(pid: u32) -> std::io::Result<()> {
    if pid == 0 {
        return Err(std::io::Error::from(std::io::ErrorKind::InvalidInput));
    }
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn terminate(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}
