//! Rollback checkpoint of the managed document

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use tokio::fs;

use netplan_core::{PersistenceError, Result};

/// Copy of the prior document taken before a write
#[derive(Debug, Clone)]
pub struct BackupFile {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub checksum: String,
    pub size: u64,
}

/// State of the document before a reconciliation.
///
/// With no prior document, rolling back means deleting whatever was
/// written.
#[derive(Debug)]
pub struct Checkpoint {
    target: PathBuf,
    backup: Option<BackupFile>,
}

impl Checkpoint {
    /// Copy `target` aside to `backup_path`, if it exists
    pub async fn create(target: &Path, backup_path: &Path) -> Result<Self> {
        if !fs::try_exists(target).await.unwrap_or(false) {
            debug!("No prior document at {:?}", target);
            return Ok(Self {
                target: target.to_path_buf(),
                backup: None,
            });
        }

        fs::copy(target, backup_path)
            .await
            .map_err(|source| PersistenceError::Write {
                path: backup_path.to_path_buf(),
                source,
            })?;

        let content = fs::read(backup_path)
            .await
            .map_err(|source| PersistenceError::Read {
                path: backup_path.to_path_buf(),
                source,
            })?;
        let checksum = format!("{:x}", md5::compute(&content));

        debug!("Backed up {:?} to {:?} ({})", target, backup_path, checksum);

        Ok(Self {
            target: target.to_path_buf(),
            backup: Some(BackupFile {
                original_path: target.to_path_buf(),
                backup_path: backup_path.to_path_buf(),
                checksum,
                size: content.len() as u64,
            }),
        })
    }

    pub fn has_prior_document(&self) -> bool {
        self.backup.is_some()
    }

    pub fn backup(&self) -> Option<&BackupFile> {
        self.backup.as_ref()
    }

    /// Put the target back the way it was, then drop the backup.
    ///
    /// The backup is kept when restoring fails.
    pub async fn restore(self) -> Result<()> {
        match self.backup {
            Some(ref backup) => {
                if let Err(e) = Self::restore_backup_file(backup).await {
                    error!(
                        "Restore of {:?} failed, backup kept at {:?}",
                        backup.original_path, backup.backup_path
                    );
                    return Err(e);
                }
            }
            None => Self::remove_new_document(&self.target).await?,
        }
        self.discard().await;
        Ok(())
    }

    /// Drop the backup; failures are only logged
    pub async fn discard(self) {
        let Some(backup) = self.backup else {
            return;
        };
        match fs::remove_file(&backup.backup_path).await {
            Ok(()) => debug!("Removed backup {:?}", backup.backup_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove backup {:?}: {}", backup.backup_path, e),
        }
    }

    async fn restore_backup_file(backup: &BackupFile) -> Result<()> {
        let content = fs::read(&backup.backup_path)
            .await
            .map_err(|source| PersistenceError::Read {
                path: backup.backup_path.clone(),
                source,
            })?;

        let checksum = format!("{:x}", md5::compute(&content));
        if checksum != backup.checksum {
            return Err(PersistenceError::Checksum {
                path: backup.backup_path.clone(),
            }
            .into());
        }

        fs::copy(&backup.backup_path, &backup.original_path)
            .await
            .map_err(|source| PersistenceError::Write {
                path: backup.original_path.clone(),
                source,
            })?;

        info!("Restored {:?} from backup", backup.original_path);
        Ok(())
    }

    async fn remove_new_document(target: &Path) -> Result<()> {
        match fs::remove_file(target).await {
            Ok(()) => {
                info!("Removed {:?}, no prior document existed", target);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Write {
                path: target.to_path_buf(),
                source,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_restore_prior_document() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("99-cockpit.yaml");
        let backup = dir.path().join("99-cockpit.yaml.bak");
        std::fs::write(&target, "network: {version: 2}\n").unwrap();

        let checkpoint = Checkpoint::create(&target, &backup).await.unwrap();
        assert!(checkpoint.has_prior_document());
        assert_eq!(checkpoint.backup().unwrap().size, 22);

        std::fs::write(&target, "garbage").unwrap();
        checkpoint.restore().await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "network: {version: 2}\n");
        assert!(!backup.exists());
    }

    #[tokio::test]
    async fn test_restore_without_prior_removes_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("99-cockpit.yaml");
        let backup = dir.path().join("99-cockpit.yaml.bak");

        let checkpoint = Checkpoint::create(&target, &backup).await.unwrap();
        assert!(!checkpoint.has_prior_document());

        std::fs::write(&target, "network: {version: 2}\n").unwrap();
        checkpoint.restore().await.unwrap();

        assert!(!target.exists());
        assert!(!backup.exists());
    }

    #[tokio::test]
    async fn test_corrupted_backup_is_refused() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("99-cockpit.yaml");
        let backup = dir.path().join("99-cockpit.yaml.bak");
        std::fs::write(&target, "original").unwrap();

        let checkpoint = Checkpoint::create(&target, &backup).await.unwrap();
        std::fs::write(&backup, "tampered").unwrap();
        std::fs::write(&target, "new").unwrap();

        let err = checkpoint.restore().await.unwrap_err();
        assert_eq!(err.kind(), "PersistenceError");
        assert!(err.to_string().contains("integrity"));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "tampered");
    }

    #[tokio::test]
    async fn test_failed_copy_back_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("99-cockpit.yaml");
        let backup = dir.path().join("99-cockpit.yaml.bak");
        std::fs::write(&target, "original").unwrap();

        let checkpoint = Checkpoint::create(&target, &backup).await.unwrap();
        std::fs::remove_file(&target).unwrap();
        std::fs::create_dir(&target).unwrap();

        let err = checkpoint.restore().await.unwrap_err();
        assert_eq!(err.kind(), "PersistenceError");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_discard_keeps_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("99-cockpit.yaml");
        let backup = dir.path().join("99-cockpit.yaml.bak");
        std::fs::write(&target, "original").unwrap();

        let checkpoint = Checkpoint::create(&target, &backup).await.unwrap();
        assert!(backup.exists());
        checkpoint.discard().await;

        assert!(!backup.exists());
        assert!(target.exists());
    }
}
