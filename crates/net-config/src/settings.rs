//! Engine settings
//!
//! Loaded through the `config` crate: an optional settings file layered
//! under `NETPLANCTL_*` environment variables, with built-in defaults for
//! every key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings file consulted when none is given explicitly
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/netplanctl/settings.toml";

/// Environment prefix (`NETPLANCTL_TRIAL_TIMEOUT_SECS=30`)
pub const ENV_PREFIX: &str = "NETPLANCTL";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory holding the managed document
    pub netplan_dir: PathBuf,
    /// Managed document file name
    pub file_name: String,
    /// Suffix of the transient rollback checkpoint
    pub backup_suffix: String,
    pub renderer: String,

    /// Default `netplan try` timeout
    pub trial_timeout_secs: u64,
    /// Upper bound for any single external command
    pub command_timeout_secs: u64,

    pub lock_path: PathBuf,
    pub lock_timeout_secs: u64,

    pub netplan_binary: String,
    pub ip_binary: String,
    pub status_binary: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            netplan_dir: PathBuf::from("/etc/netplan"),
            file_name: "99-cockpit.yaml".to_string(),
            backup_suffix: ".bak".to_string(),
            renderer: netplan_core::DEFAULT_RENDERER.to_string(),
            trial_timeout_secs: 10,
            command_timeout_secs: 120,
            lock_path: PathBuf::from("/run/lock/netplanctl.lock"),
            lock_timeout_secs: 30,
            netplan_binary: "netplan".to_string(),
            ip_binary: "ip".to_string(),
            status_binary: "ifconfig".to_string(),
        }
    }
}

impl EngineSettings {
    /// Load settings.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));

        let settings: EngineSettings = config::Config::builder()
            .add_source(config::File::from(file.as_path()).required(path.is_some()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        log::debug!("Loaded engine settings: {:?}", settings);
        Ok(settings)
    }

    /// Settings rooted in another directory
    pub fn with_netplan_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.netplan_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_lock_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.lock_path = path.as_ref().to_path_buf();
        self
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field: &str, reason: &str| SettingsError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.file_name.is_empty() || self.file_name.contains('/') {
            return Err(invalid("file_name", "must be a plain file name"));
        }
        if self.backup_suffix.is_empty() {
            return Err(invalid("backup_suffix", "cannot be empty"));
        }
        if self.trial_timeout_secs == 0 {
            return Err(invalid("trial_timeout_secs", "must be positive"));
        }
        if self.command_timeout_secs == 0 {
            return Err(invalid("command_timeout_secs", "must be positive"));
        }
        Ok(())
    }

    /// Full path of the managed document
    pub fn netplan_path(&self) -> PathBuf {
        self.netplan_dir.join(&self.file_name)
    }

    /// Sibling path of the rollback checkpoint
    pub fn backup_path(&self) -> PathBuf {
        self.netplan_dir
            .join(format!("{}{}", self.file_name, self.backup_suffix))
    }

    pub fn trial_timeout(&self) -> Duration {
        Duration::from_secs(self.trial_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(
            settings.netplan_path(),
            PathBuf::from("/etc/netplan/99-cockpit.yaml")
        );
        assert_eq!(
            settings.backup_path(),
            PathBuf::from("/etc/netplan/99-cockpit.yaml.bak")
        );
        assert_eq!(settings.trial_timeout(), Duration::from_secs(10));
        assert_eq!(settings.renderer, "networkd");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "netplan_dir = \"/tmp/netplan-test\"").unwrap();
        writeln!(file, "trial_timeout_secs = 25").unwrap();
        file.flush().unwrap();

        let settings = EngineSettings::load(Some(file.path())).unwrap();

        assert_eq!(settings.netplan_dir, PathBuf::from("/tmp/netplan-test"));
        assert_eq!(settings.trial_timeout_secs, 25);
        assert_eq!(settings.file_name, "99-cockpit.yaml");
        assert_eq!(settings.command_timeout_secs, 120);
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let err = EngineSettings::load(Some(Path::new("/nonexistent/netplanctl.toml")));
        assert!(matches!(err, Err(SettingsError::Load(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "file_name = \"sub/dir.yaml\"").unwrap();
        file.flush().unwrap();

        let err = EngineSettings::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("file_name"));
    }
}
