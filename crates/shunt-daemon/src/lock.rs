//! Singleton PID-file lock.
//!
//! Exactly one daemon instance may run per root. The lock is an
//! exclusive-create of `.shunt/shunt.pid`; a leftover file from a crashed
//! instance is detected by probing the recorded PID and taken over.

use shunt_core::paths;
use shunt_core::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// PID helpers (Unix only)
// ---------------------------------------------------------------------------

/// Returns true if the process is still alive (`kill -0 {pid}`).
pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        // TODO: Windows — use winapi or tasklist
        let _ = pid;
        false
    }
}

/// Read the PID recorded in a pid file. `None` if the file is missing or
/// does not contain a single integer.
pub fn read_pid(path: &Path) -> Option<u32> {
    let data = std::fs::read_to_string(path).ok()?;
    data.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// PidLock
// ---------------------------------------------------------------------------

/// Held lock for the single live daemon instance. Dropping it removes the
/// pid file.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
    released: bool,
}

impl PidLock {
    /// Try to become the one live instance for `root`.
    ///
    /// Returns `Ok(None)` when another live instance holds the lock — that
    /// is contention, not an error, and callers exit as a clean no-op. A
    /// stale file (recorded PID is dead) is deleted and acquisition retried
    /// once; a second collision means another instance won the race.
    pub fn acquire(root: &Path) -> Result<Option<PidLock>> {
        let path = paths::pid_path(root);
        shunt_core::io::ensure_dir(&paths::shunt_dir(root))?;

        for attempt in 0..2 {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    writeln!(file, "{}", std::process::id())?;
                    return Ok(Some(PidLock {
                        path,
                        released: false,
                    }));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if let Some(pid) = read_pid(&path) {
                        if is_pid_alive(pid) {
                            tracing::info!(pid, "another instance is already running");
                            return Ok(None);
                        }
                    }
                    if attempt == 0 {
                        tracing::warn!(path = %path.display(), "removing stale pid file");
                        let _ = std::fs::remove_file(&path);
                    } else {
                        // Someone else grabbed it between our delete and retry.
                        return Ok(None);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if !self.released {
            self.released = true;
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        self.remove();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_writes_own_pid() {
        let dir = TempDir::new().unwrap();
        let lock = PidLock::acquire(dir.path()).unwrap().unwrap();
        let recorded = read_pid(&paths::pid_path(dir.path())).unwrap();
        assert_eq!(recorded, std::process::id());
        drop(lock);
        assert!(!paths::pid_path(dir.path()).exists());
    }

    #[test]
    fn second_acquire_against_live_pid_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let _lock = PidLock::acquire(dir.path()).unwrap().unwrap();
        // The recorded PID is this test process, which is very much alive.
        assert!(PidLock::acquire(dir.path()).unwrap().is_none());
    }

    #[test]
    fn stale_pid_file_is_taken_over() {
        let dir = TempDir::new().unwrap();
        // Far beyond any real PID range, so the liveness probe fails.
        std::fs::create_dir_all(paths::shunt_dir(dir.path())).unwrap();
        std::fs::write(paths::pid_path(dir.path()), "4000000000\n").unwrap();
        let lock = PidLock::acquire(dir.path()).unwrap();
        assert!(lock.is_some());
    }

    #[test]
    fn garbage_pid_file_is_taken_over() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(paths::shunt_dir(dir.path())).unwrap();
        std::fs::write(paths::pid_path(dir.path()), "not a pid\n").unwrap();
        let lock = PidLock::acquire(dir.path()).unwrap();
        assert!(lock.is_some());
    }

    #[test]
    fn release_removes_the_file() {
        let dir = TempDir::new().unwrap();
        let lock = PidLock::acquire(dir.path()).unwrap().unwrap();
        lock.release();
        assert!(!paths::pid_path(dir.path()).exists());
        // And the lock is re-acquirable afterwards.
        assert!(PidLock::acquire(dir.path()).unwrap().is_some());
    }
}
