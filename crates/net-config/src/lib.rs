//! Netplan Configuration
//!
//! Persistence of the managed netplan document, engine settings and the
//! single-flight reconcile lock.

pub mod lock;
pub mod settings;
pub mod store;

pub use lock::ReconcileLock;
pub use settings::{EngineSettings, SettingsError};
pub use store::NetplanStore;
