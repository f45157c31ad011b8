//! VLAN construct management

use crate::error::ValidationError;
use crate::interface::InterfaceValidator;
use crate::kind::normalize_vlan_name;
use crate::types::VlanLink;
use crate::Result;

pub const MIN_VLAN_ID: u16 = 1;
pub const MAX_VLAN_ID: u16 = 4094;

/// Fallbacks for VLAN entries whose name carries no usable id or parent
pub const FALLBACK_VLAN_ID: u16 = 1;
pub const FALLBACK_VLAN_LINK: &str = "eth0";

/// VLAN creation request
#[derive(Debug, Clone)]
pub struct VlanConfig {
    /// VLAN name, conventionally `<parent>.<id>`
    pub name: String,
    /// VLAN tag; defaults to the numeric suffix of the name
    pub id: Option<i64>,
    /// Parent interface
    pub link: String,
    /// Static address in CIDR notation, DHCP when absent
    pub static_ip: Option<String>,
    pub gateway: Option<String>,
    pub mtu: Option<i64>,
}

impl VlanConfig {
    /// Create new VLAN configuration, normalizing `name@parent` spellings
    pub fn new(name: &str, link: impl Into<String>) -> Self {
        Self {
            name: normalize_vlan_name(name).to_string(),
            id: None,
            link: link.into(),
            static_ip: None,
            gateway: None,
            mtu: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_static_ip(mut self, address: impl Into<String>) -> Self {
        self.static_ip = Some(address.into());
        self
    }

    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = Some(gateway.into());
        self
    }

    pub fn with_mtu(mut self, mtu: i64) -> Self {
        self.mtu = Some(mtu);
        self
    }
}

/// VLAN management operations
pub struct VlanManager;

impl VlanManager {
    /// Validate VLAN tag
    pub fn validate_id(id: i64) -> Result<u16> {
        if id < MIN_VLAN_ID as i64 || id > MAX_VLAN_ID as i64 {
            return Err(ValidationError::OutOfRange {
                field: "VLAN ID".to_string(),
                value: id,
                min: MIN_VLAN_ID as i64,
                max: MAX_VLAN_ID as i64,
            }
            .into());
        }
        Ok(id as u16)
    }

    /// Parse `<parent>.<id>` into its parts
    pub fn parse_vlan_name(name: &str) -> Option<(String, u16)> {
        let (parent, tag) = name.rsplit_once('.')?;
        if parent.is_empty() {
            return None;
        }
        let tag = tag.parse::<u16>().ok()?;
        Some((parent.to_string(), tag))
    }

    /// Generate VLAN name
    pub fn generate_name(parent: &str, id: u16) -> String {
        format!("{}.{}", parent, id)
    }

    /// Validate VLAN configuration, returning the effective tag
    pub fn validate_config(config: &VlanConfig) -> Result<u16> {
        InterfaceValidator::validate_name(&config.name)?;

        let suffix = match config.name.rsplit_once('.') {
            Some((parent, suffix)) if !parent.is_empty() => suffix,
            _ => {
                return Err(ValidationError::InvalidName {
                    name: config.name.clone(),
                    reason: "VLAN name must have the form <parent>.<id>".to_string(),
                }
                .into())
            }
        };

        let suffix_id = suffix
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidName {
                name: config.name.clone(),
                reason: "VLAN id in name must be numeric".to_string(),
            })?;
        Self::validate_id(suffix_id)?;

        let id = Self::validate_id(config.id.unwrap_or(suffix_id))?;

        if config.link.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "link".to_string(),
                value: "VLAN parent interface cannot be empty".to_string(),
            }
            .into());
        }
        InterfaceValidator::validate_name(&config.link)?;

        if let Some(mtu) = config.mtu {
            InterfaceValidator::validate_mtu(mtu)?;
        }

        Ok(id)
    }

    /// Build the document entry
    pub fn build_link(config: &VlanConfig) -> Result<VlanLink> {
        let id = Self::validate_config(config)?;
        let mut link = VlanLink::new(id, config.link.clone());

        match config.static_ip.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => {
                InterfaceValidator::validate_address(address)?;
                link.settings.dhcp4 = Some(false);
                link.settings.addresses = Some(vec![address.to_string()]);

                if let Some(gateway) = config.gateway.as_deref().map(str::trim) {
                    if !gateway.is_empty() {
                        InterfaceValidator::validate_gateway(gateway)?;
                        link.settings.gateway4 = Some(gateway.to_string());
                    }
                }
            }
            _ => link.settings.dhcp4 = Some(true),
        }

        if let Some(mtu) = config.mtu {
            link.settings.mtu = Some(InterfaceValidator::validate_mtu(mtu)?);
        }

        Ok(link)
    }

    /// Best-effort entry for a VLAN known only by name
    pub fn infer_skeleton(name: &str) -> VlanLink {
        match Self::parse_vlan_name(name) {
            Some((parent, id)) => VlanLink::new(id, parent),
            None => VlanLink::new(FALLBACK_VLAN_ID, FALLBACK_VLAN_LINK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlan_name_parsing() {
        assert_eq!(
            VlanManager::parse_vlan_name("eth0.100"),
            Some(("eth0".to_string(), 100))
        );
        assert_eq!(
            VlanManager::parse_vlan_name("bond0.10"),
            Some(("bond0".to_string(), 10))
        );
        assert_eq!(VlanManager::parse_vlan_name("eth0"), None);
        assert_eq!(VlanManager::parse_vlan_name("eth0.abc"), None);
        assert_eq!(VlanManager::generate_name("eno4", 1144), "eno4.1144");
    }

    #[test]
    fn test_vlan_id_range() {
        assert!(VlanManager::validate_id(1).is_ok());
        assert!(VlanManager::validate_id(4094).is_ok());
        assert!(VlanManager::validate_id(0).is_err());
        assert!(VlanManager::validate_id(4095).is_err());
    }

    #[test]
    fn test_dhcp_when_no_static_ip() {
        let link = VlanManager::build_link(&VlanConfig::new("eth0.100", "eth0")).unwrap();
        assert_eq!(link.id, 100);
        assert_eq!(link.link, "eth0");
        assert_eq!(link.settings.dhcp4, Some(true));
        assert!(link.settings.addresses.is_none());
    }

    #[test]
    fn test_static_vlan() {
        let config = VlanConfig::new("eth0.20", "eth0")
            .with_id(20)
            .with_static_ip("10.20.0.5/24")
            .with_gateway("10.20.0.1")
            .with_mtu(1400);
        let link = VlanManager::build_link(&config).unwrap();

        assert_eq!(link.settings.dhcp4, Some(false));
        assert_eq!(link.settings.addresses, Some(vec!["10.20.0.5/24".to_string()]));
        assert_eq!(link.settings.gateway4.as_deref(), Some("10.20.0.1"));
        assert_eq!(link.settings.mtu, Some(1400));
    }

    #[test]
    fn test_invalid_vlans() {
        assert!(VlanManager::validate_config(&VlanConfig::new("vlan100", "eth0")).is_err());
        assert!(VlanManager::validate_config(&VlanConfig::new("eth0.5000", "eth0")).is_err());
        assert!(VlanManager::validate_config(&VlanConfig::new("eth0.10", "")).is_err());
        assert!(
            VlanManager::validate_config(&VlanConfig::new("eth0.10", "eth0").with_id(0)).is_err()
        );
        assert!(
            VlanManager::validate_config(&VlanConfig::new("eth0.10", "eth0").with_mtu(20)).is_err()
        );
    }

    #[test]
    fn test_at_suffix_is_normalized() {
        let config = VlanConfig::new("eno4.1144@eno4", "eno4");
        assert_eq!(config.name, "eno4.1144");
        assert_eq!(VlanManager::validate_config(&config).unwrap(), 1144);
    }

    #[test]
    fn test_skeleton_inference() {
        let link = VlanManager::infer_skeleton("eno2.300");
        assert_eq!((link.id, link.link.as_str()), (300, "eno2"));

        let link = VlanManager::infer_skeleton("weird");
        assert_eq!((link.id, link.link.as_str()), (FALLBACK_VLAN_ID, FALLBACK_VLAN_LINK));
    }
}
