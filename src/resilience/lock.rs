//! Single-instance process lock
//!
//! A lock file holding the owner's PID guards the whole invocation: the
//! store is treated as single-writer, so two concurrent agents must never
//! run. A lock whose recorded owner is no longer alive is stale and gets
//! replaced. Liveness checking is isolated in `pid_is_alive` so the rest
//! of the logic stays platform-neutral.

use std::path::{Path, PathBuf};
use sysinfo::{Pid, System};

/// Filesystem lock guarding a single agent instance
pub struct ProcessLock {
    path: PathBuf,
}

impl ProcessLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let lock = Self { path: path.into() };
        if let Some(parent) = lock.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create lock directory: {}", e);
            }
        }
        lock
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Attempts to acquire the lock for the current process
    ///
    /// Returns false when another live instance holds it. A lock file
    /// with a dead or unparseable owner is treated as stale and
    /// replaced. Never panics; acquisition problems log and report
    /// failure.
    pub fn acquire(&self) -> bool {
        if self.path.exists() {
            match self.read_owner() {
                Some(pid) if pid_is_alive(pid) => {
                    tracing::warn!("Another instance is running (PID: {})", pid);
                    return false;
                }
                Some(pid) => {
                    tracing::info!("Removing stale lock file for PID {}", pid);
                    if let Err(e) = std::fs::remove_file(&self.path) {
                        tracing::error!("Failed to remove stale lock file: {}", e);
                        return false;
                    }
                }
                None => {
                    // No live owner can be identified from garbage
                    tracing::info!("Removing unreadable lock file");
                    if let Err(e) = std::fs::remove_file(&self.path) {
                        tracing::error!("Failed to remove unreadable lock file: {}", e);
                        return false;
                    }
                }
            }
        }

        let pid = std::process::id();
        match std::fs::write(&self.path, pid.to_string()) {
            Ok(()) => {
                tracing::debug!("Process lock acquired (PID: {})", pid);
                true
            }
            Err(e) => {
                tracing::error!("Failed to write lock file: {}", e);
                false
            }
        }
    }

    /// Releases the lock if present; idempotent and never fails loudly
    pub fn release(&self) {
        if self.path.exists() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => tracing::debug!("Process lock released"),
                Err(e) => tracing::warn!("Failed to release process lock: {}", e),
            }
        }
    }

    /// Acquires and wraps the lock in an RAII guard
    ///
    /// The guard releases the lock on drop, so every exit path of the
    /// caller (normal return, handled error, or panic unwind) releases
    /// it. Returns None when another instance holds the lock.
    pub fn guard(self) -> Option<LockGuard> {
        if self.acquire() {
            Some(LockGuard { lock: self })
        } else {
            None
        }
    }

    /// PID recorded in the lock file, if it parses
    pub fn read_owner(&self) -> Option<u32> {
        std::fs::read_to_string(&self.path)
            .ok()?
            .trim()
            .parse()
            .ok()
    }
}

/// RAII wrapper that releases the process lock on drop
pub struct LockGuard {
    lock: ProcessLock,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        self.lock.path()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Whether a process with the given PID is currently running
fn pid_is_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_process(Pid::from_u32(pid))
}
