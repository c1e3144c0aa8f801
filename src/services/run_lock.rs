//! Advisory run lock.
//!
//! Guards an output directory against two independent batch/UI instances
//! racing on it. Advisory only: the lock is a JSON file with the holder's
//! PID and acquisition time; a dead holder's lock is stolen with a log line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{LockError, Result};

const LOCK_FILE_NAME: &str = ".dou-robo.lock";
/// Age beyond which a lock is presumed stale on platforms without a process
/// liveness probe.
#[cfg(not(target_os = "linux"))]
const STALE_FALLBACK_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    timestamp: DateTime<Utc>,
}

/// Held lock on one output directory. Released on drop.
pub struct RunLock {
    path: PathBuf,
    pid: u32,
}

impl RunLock {
    /// Acquire the lock for `dir`, stealing it when the recorded holder is
    /// no longer alive.
    pub fn acquire(dir: &Path) -> Result<RunLock> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);

        if let Some(existing) = read_lock(&path) {
            if existing.pid != std::process::id() && process_alive(&existing) {
                return Err(LockError::Held {
                    dir: dir.display().to_string(),
                    pid: existing.pid,
                }
                .into());
            }
            warn!(
                "stealing stale lock from pid {} (acquired {})",
                existing.pid, existing.timestamp
            );
        }

        let info = LockInfo {
            pid: std::process::id(),
            timestamp: Utc::now(),
        };
        let content = serde_json::to_string(&info)?;
        std::fs::write(&path, content).map_err(|e| LockError::WriteFailed(e.to_string()))?;
        info!("run lock acquired on {}", dir.display());

        Ok(RunLock {
            path,
            pid: info.pid,
        })
    }

    fn release(&self) {
        // only remove a lock we still own
        if read_lock(&self.path).map(|i| i.pid) == Some(self.pid) {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("failed to release run lock: {e}");
            } else {
                debug!("run lock released");
            }
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn read_lock(path: &Path) -> Option<LockInfo> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(target_os = "linux")]
fn process_alive(info: &LockInfo) -> bool {
    Path::new(&format!("/proc/{}", info.pid)).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(info: &LockInfo) -> bool {
    // no cheap liveness probe here; treat fresh locks as live
    (Utc::now() - info.timestamp).num_hours() < STALE_FALLBACK_HOURS
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_and_release() {
        let dir = tempdir().unwrap();
        let lock = RunLock::acquire(dir.path()).unwrap();
        assert!(dir.path().join(LOCK_FILE_NAME).exists());
        drop(lock);
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn steals_lock_of_dead_process() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);
        // PIDs near u32::MAX are far above any real pid_max
        let dead = LockInfo {
            pid: u32::MAX - 1,
            timestamp: Utc::now(),
        };
        std::fs::write(&path, serde_json::to_string(&dead).unwrap()).unwrap();

        let lock = RunLock::acquire(dir.path()).unwrap();
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn reacquire_by_same_process_is_allowed() {
        let dir = tempdir().unwrap();
        let first = RunLock::acquire(dir.path()).unwrap();
        let second = RunLock::acquire(dir.path()).unwrap();
        drop(second);
        drop(first);
    }
}
