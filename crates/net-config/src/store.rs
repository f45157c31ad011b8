//! Persistence of the managed netplan document

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use netplan_core::{NetplanFile, NetworkDocument, PersistenceError, Result};
use netplan_validate::{NetworkValidator, Remediation};

use crate::settings::EngineSettings;

/// Mode of the managed document
pub const FILE_MODE: u32 = 0o600;

/// Mode of a newly created netplan directory
pub const DIR_MODE: u32 = 0o755;

/// Reads and writes the managed netplan document
pub struct NetplanStore {
    dir: PathBuf,
    path: PathBuf,
    renderer: String,
    validator: NetworkValidator,
}

impl NetplanStore {
    /// Create store for the configured document
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            dir: settings.netplan_dir.clone(),
            path: settings.netplan_path(),
            renderer: settings.renderer.clone(),
            validator: NetworkValidator::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn renderer(&self) -> &str {
        &self.renderer
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Load the document, or an empty one if no file exists
    pub async fn load(&self) -> Result<NetworkDocument> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{:?} does not exist, starting from an empty document", self.path);
                return Ok(NetworkDocument::new(&self.renderer));
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                }
                .into())
            }
        };

        self.parse(&self.path, &content)
    }

    /// Parse document text; blank text is an empty document with the
    /// configured renderer, same as a missing file
    pub fn parse(&self, path: &Path, content: &str) -> Result<NetworkDocument> {
        if content.trim().is_empty() {
            return Ok(NetworkDocument::new(&self.renderer));
        }

        let file: NetplanFile =
            serde_yaml::from_str(content).map_err(|e| PersistenceError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(file.network)
    }

    /// Render a document the way it is written to disk
    pub fn render(document: &NetworkDocument) -> Result<String> {
        serde_yaml::to_string(&NetplanFile {
            network: document.clone(),
        })
        .map_err(|e| PersistenceError::Serialize(e.to_string()).into())
    }

    /// Reconcile conflicts, validate and write the document.
    ///
    /// Nothing is written when conflicts survive remediation or the
    /// document is structurally invalid.
    pub async fn save(&self, document: &mut NetworkDocument) -> Result<Vec<Remediation>> {
        document.ensure_root(&self.renderer);
        let remediations = self.validator.reconcile_conflicts(document)?;
        self.validator.validate_document(document)?;

        let content = Self::render(document)?;
        self.write_atomic(content.as_bytes()).await?;

        info!("Wrote netplan configuration to {:?}", self.path);
        Ok(remediations)
    }

    /// Write raw bytes over the document: sibling temp file created 0600,
    /// synced, renamed into place, then mode re-applied
    pub async fn write_atomic(&self, content: &[u8]) -> Result<()> {
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| PersistenceError::Write { path, source }
        };

        if !fs::try_exists(&self.dir).await.unwrap_or(false) {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(DIR_MODE)
                .create(&self.dir)
                .await
                .map_err(write_err(&self.dir))?;
            debug!("Created {:?}", self.dir);
        }

        let tmp_path = self.tmp_path();
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(FILE_MODE)
            .open(&tmp_path)
            .await
            .map_err(write_err(&tmp_path))?;

        // Pre-existing temp file keeps its old mode on open
        fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(FILE_MODE))
            .await
            .map_err(write_err(&tmp_path))?;
        file.write_all(content).await.map_err(write_err(&tmp_path))?;
        file.sync_all().await.map_err(write_err(&tmp_path))?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(write_err(&self.path))?;
        fs::set_permissions(&self.path, std::fs::Permissions::from_mode(FILE_MODE))
            .await
            .map_err(write_err(&self.path))?;

        Ok(())
    }

    /// Delete the document; absence is not an error
    pub async fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Write {
                path: self.path.clone(),
                source,
            }
            .into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir.join(format!(".{}.tmp", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netplan_core::{BondConfig, BondMode, VlanConfig};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> NetplanStore {
        NetplanStore::new(&EngineSettings::default().with_netplan_dir(dir.path()))
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(!store.exists().await);
        let doc = store.load().await.unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.version, 2);
    }

    #[tokio::test]
    async fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "\n").unwrap();

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_and_missing_files_use_configured_renderer() {
        let dir = TempDir::new().unwrap();
        let mut settings = EngineSettings::default().with_netplan_dir(dir.path());
        settings.renderer = "NetworkManager".to_string();
        let store = NetplanStore::new(&settings);

        let missing = store.load().await.unwrap();
        std::fs::write(store.path(), "  \n").unwrap();
        let blank = store.load().await.unwrap();

        assert_eq!(missing.renderer, "NetworkManager");
        assert_eq!(blank, missing);
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "network: [unclosed").unwrap();

        let err = store.load().await.unwrap_err();
        assert_eq!(err.kind(), "PersistenceError");
    }

    #[tokio::test]
    async fn test_save_forces_mode_0600() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "network: {version: 2}\n").unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut doc = store.load().await.unwrap();
        store.save(&mut doc).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("etc").join("netplan");
        let store = NetplanStore::new(&EngineSettings::default().with_netplan_dir(&nested));

        store.save(&mut NetworkDocument::default()).await.unwrap();

        let mode = std::fs::metadata(&nested).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, DIR_MODE & !current_umask());
        assert!(store.exists().await);
    }

    fn current_umask() -> u32 {
        // DirBuilder honours the process umask
        let scratch = TempDir::new().unwrap();
        let path = scratch.path().join("umask");
        std::fs::DirBuilder::new().create(&path).unwrap();
        0o777 & !(std::fs::metadata(&path).unwrap().permissions().mode() & 0o777)
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut doc = NetworkDocument::default();
        doc.add_bond(
            &BondConfig::new("bond0", BondMode::Ieee8023ad)
                .with_interface("eth0")
                .with_interface("eth1"),
        )
        .unwrap();
        doc.add_vlan(&VlanConfig::new("bond0.10", "bond0").with_static_ip("10.0.10.2/24"))
            .unwrap();

        store.save(&mut doc).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, doc);

        let text = std::fs::read_to_string(store.path()).unwrap();
        let ethernets = text.find("ethernets:").unwrap();
        let vlans = text.find("vlans:").unwrap();
        let bonds = text.find("bonds:").unwrap();
        assert!(text.starts_with("network:\n  version: 2\n  renderer: networkd\n"));
        assert!(ethernets < vlans && vlans < bonds);
    }

    #[tokio::test]
    async fn test_save_remediates_vlan_on_member() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut doc = NetworkDocument::default();
        doc.add_bond(
            &BondConfig::new("bond0", BondMode::ActiveBackup)
                .with_interface("eth0")
                .with_interface("eth1"),
        )
        .unwrap();
        doc.add_vlan(&VlanConfig::new("eth0.20", "eth0")).unwrap();

        let remediations = store.save(&mut doc).await.unwrap();

        assert_eq!(remediations.len(), 1);
        let loaded = store.load().await.unwrap();
        assert!(loaded.vlans.contains_key("bond0.20"));
        assert!(!loaded.vlans.contains_key("eth0.20"));
    }

    #[tokio::test]
    async fn test_unresolved_conflict_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let yaml = r#"
network:
  version: 2
  bonds:
    bond0:
      interfaces: [eth0, eth1]
  bridges:
    br0:
      interfaces: [eth0]
"#;
        let mut doc = store.parse(store.path(), yaml).unwrap();
        let err = store.save(&mut doc).await.unwrap_err();

        assert_eq!(err.kind(), "ConflictError");
        assert!(!store.exists().await);
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.remove().await.unwrap();
        store.save(&mut NetworkDocument::default()).await.unwrap();
        store.remove().await.unwrap();
        assert!(!store.exists().await);
    }

    #[tokio::test]
    async fn test_colliding_remediation_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let yaml = r#"
network:
  version: 2
  ethernets:
    eth0: {optional: true}
    eth1: {optional: true}
  bonds:
    bond0:
      interfaces: [eth0, eth1]
  vlans:
    eth0.10:
      id: 10
      link: eth0
      addresses: [10.0.0.1/24]
    eth1.10:
      id: 10
      link: eth1
      addresses: [10.9.9.9/24]
"#;
        let mut doc = store.parse(store.path(), yaml).unwrap();
        let err = store.save(&mut doc).await.unwrap_err();

        assert_eq!(err.kind(), "ConflictError");
        assert!(err.to_string().contains("eth1"));
        assert!(!store.exists().await);
    }
}
