//! Single-flight guard for reconciliations
//!
//! One reconciliation (backup, write, test, apply, commit) runs at a time
//! per host. The guard is an exclusive advisory lock on a well-known file,
//! released when dropped.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use log::{debug, warn};

use netplan_core::{PersistenceError, Result};

/// Polling interval while the lock is contended
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct ReconcileLock {
    path: PathBuf,
    file: File,
}

impl ReconcileLock {
    /// Acquire the lock, polling until `timeout` elapses
    pub async fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistenceError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        loop {
            if let Some(lock) = Self::try_acquire(path)? {
                debug!("Acquired reconcile lock {:?}", path);
                return Ok(lock);
            }

            if Instant::now() >= deadline {
                warn!("Timed out waiting for reconcile lock {:?}", path);
                return Err(PersistenceError::Locked {
                    path: path.to_path_buf(),
                }
                .into());
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    /// Try once; `None` when another holder has it
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| PersistenceError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path: path.to_path_buf(),
                file,
            })),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(source) => Err(PersistenceError::Write {
                path: path.to_path_buf(),
                source,
            }
            .into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ReconcileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("Failed to release reconcile lock {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("netplanctl.lock");

        let held = ReconcileLock::acquire(&path, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(held.path(), path.as_path());
        assert!(ReconcileLock::try_acquire(&path).unwrap().is_none());

        drop(held);
        assert!(ReconcileLock::try_acquire(&path).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_acquire_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("netplanctl.lock");

        let _held = ReconcileLock::try_acquire(&path).unwrap().unwrap();
        let err = ReconcileLock::acquire(&path, Duration::from_millis(250))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "PersistenceError");
        assert!(err.to_string().contains("held by another process"));
    }
}
