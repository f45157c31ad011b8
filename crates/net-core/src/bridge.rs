//! Bridge construct management

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::interface::InterfaceValidator;
use crate::types::{BridgeLink, BridgeParameters, BRIDGE_PREFIX};
use crate::Result;

/// Bridge creation request
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge name, must start with `br`
    pub name: String,
    /// Bridge ports
    pub interfaces: Vec<String>,
    /// Spanning tree; left unset when not requested
    pub stp: Option<bool>,
}

impl BridgeConfig {
    /// Create new bridge configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
            stp: None,
        }
    }

    /// Add bridge port
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Replace the port list
    pub fn with_interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Enable/disable STP
    pub fn with_stp(mut self, stp: bool) -> Self {
        self.stp = Some(stp);
        self
    }
}

/// Bridge management operations
pub struct BridgeManager;

impl BridgeManager {
    /// Validate bridge configuration
    pub fn validate_config(config: &BridgeConfig) -> Result<()> {
        InterfaceValidator::validate_prefixed_name(&config.name, BRIDGE_PREFIX)?;

        if config.interfaces.is_empty() {
            return Err(ValidationError::TooFewMembers {
                construct: format!("Bridge {}", config.name),
                required: 1,
                got: 0,
            }
            .into());
        }

        let mut seen = HashSet::new();
        for port in &config.interfaces {
            InterfaceValidator::validate_name(port)?;

            if port == &config.name {
                return Err(ValidationError::InvalidValue {
                    field: "interfaces".to_string(),
                    value: format!("bridge {} cannot contain itself", config.name),
                }
                .into());
            }

            if !seen.insert(port.as_str()) {
                return Err(ValidationError::DuplicateMember {
                    construct: config.name.clone(),
                    member: port.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Build the document entry; new bridges request DHCP
    pub fn build_link(config: &BridgeConfig) -> Result<BridgeLink> {
        Self::validate_config(config)?;

        let mut link = BridgeLink {
            interfaces: config.interfaces.clone(),
            parameters: BridgeParameters {
                stp: config.stp,
                ..Default::default()
            },
            settings: Default::default(),
        };
        link.settings.dhcp4 = Some(true);

        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_creation() {
        let config = BridgeConfig::new("br0")
            .with_interface("eth0")
            .with_interface("eth1")
            .with_stp(true);
        let link = BridgeManager::build_link(&config).unwrap();

        assert_eq!(link.interfaces, vec!["eth0", "eth1"]);
        assert_eq!(link.parameters.stp, Some(true));
        assert_eq!(link.settings.dhcp4, Some(true));
    }

    #[test]
    fn test_stp_omitted_when_not_requested() {
        let link = BridgeManager::build_link(&BridgeConfig::new("br1").with_interface("eno1")).unwrap();
        assert!(link.parameters.is_empty());

        let yaml = serde_yaml::to_string(&link).unwrap();
        assert!(!yaml.contains("parameters"));
    }

    #[test]
    fn test_bridge_validation() {
        assert!(BridgeManager::validate_config(&BridgeConfig::new("br0")).is_err());
        assert!(BridgeManager::validate_config(&BridgeConfig::new("lan0").with_interface("eth0")).is_err());
        assert!(BridgeManager::validate_config(&BridgeConfig::new("br0").with_interface("br0")).is_err());
        assert!(BridgeManager::validate_config(
            &BridgeConfig::new("br0").with_interfaces(vec!["eth0".into(), "eth0".into()])
        )
        .is_err());
    }
}
