//! Bond construct management

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::interface::InterfaceValidator;
use crate::types::{BondLink, BondMode, BondParameters, LacpRate, TransmitHashPolicy, BOND_PREFIX};
use crate::Result;

/// MII monitor interval applied to balance-tlb/alb bonds when none is given
pub const DEFAULT_LB_MIIMON: u32 = 100;

/// Minimum number of member interfaces of a bond
pub const MIN_BOND_MEMBERS: usize = 2;

/// Bond creation request
#[derive(Debug, Clone)]
pub struct BondConfig {
    /// Bond name, must start with `bond`
    pub name: String,
    /// Member interfaces, in the order supplied
    pub interfaces: Vec<String>,
    /// Bonding mode
    pub mode: BondMode,
    /// MII monitoring interval; only positive values are applied
    pub miimon: Option<i64>,
    /// Preferred active member
    pub primary: Option<String>,
}

impl BondConfig {
    /// Create new bond configuration
    pub fn new(name: impl Into<String>, mode: BondMode) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
            mode,
            miimon: None,
            primary: None,
        }
    }

    /// Add bond member
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Replace the member list
    pub fn with_interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Set MII monitoring interval
    pub fn with_miimon(mut self, miimon: i64) -> Self {
        self.miimon = Some(miimon);
        self
    }

    /// Set primary member
    pub fn with_primary(mut self, primary: impl Into<String>) -> Self {
        self.primary = Some(primary.into());
        self
    }
}

/// Bond management operations
pub struct BondManager;

impl BondManager {
    /// Validate bond configuration
    pub fn validate_config(config: &BondConfig) -> Result<()> {
        InterfaceValidator::validate_prefixed_name(&config.name, BOND_PREFIX)?;

        if config.interfaces.len() < MIN_BOND_MEMBERS {
            return Err(ValidationError::TooFewMembers {
                construct: format!("Bond {}", config.name),
                required: MIN_BOND_MEMBERS,
                got: config.interfaces.len(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for member in &config.interfaces {
            InterfaceValidator::validate_name(member)?;
            if !seen.insert(member.as_str()) {
                return Err(ValidationError::DuplicateMember {
                    construct: config.name.clone(),
                    member: member.clone(),
                }
                .into());
            }
        }

        if let Some(ref primary) = config.primary {
            if !config.interfaces.contains(primary) {
                return Err(ValidationError::InvalidValue {
                    field: "primary".to_string(),
                    value: format!("{} is not a member of {}", primary, config.name),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Build the document entry, applying mode-dependent defaults
    pub fn build_link(config: &BondConfig) -> Result<BondLink> {
        Self::validate_config(config)?;

        let mut parameters = BondParameters {
            mode: Some(config.mode),
            primary: config.primary.clone(),
            ..Default::default()
        };

        if let Some(miimon) = config.miimon.filter(|m| *m > 0) {
            parameters.mii_monitor_interval = u32::try_from(miimon).ok();
        }

        match config.mode {
            BondMode::Ieee8023ad => {
                parameters.lacp_rate = Some(LacpRate::Fast);
                parameters.transmit_hash_policy = Some(TransmitHashPolicy::Layer3Plus4);
            }
            mode if mode.is_load_balancing() => {
                parameters
                    .mii_monitor_interval
                    .get_or_insert(DEFAULT_LB_MIIMON);
            }
            _ => {}
        }

        Ok(BondLink {
            interfaces: config.interfaces.clone(),
            parameters,
            settings: Default::default(),
        })
    }
}
