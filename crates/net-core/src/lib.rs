//! Netplan Network Core
//!
//! Topology model of a netplan document: construct types, the
//! name-to-kind resolver, construct factories and the error taxonomy
//! shared by every crate of the engine.

pub mod bond;
pub mod bridge;
pub mod error;
pub mod interface;
pub mod kind;
pub mod topology;
pub mod types;
pub mod vlan;

pub use bond::{BondConfig, BondManager};
pub use bridge::{BridgeConfig, BridgeManager};
pub use error::{
    ApplyError, ApplyTrialError, ConflictError, InputError, NetworkError, PersistenceError,
    ValidationError,
};
pub use interface::InterfaceValidator;
pub use kind::ConstructKind;
pub use topology::{LinkState, StaticAddress};
pub use types::*;
pub use vlan::{VlanConfig, VlanManager};

/// Result type for network operations
pub type Result<T> = std::result::Result<T, NetworkError>;
