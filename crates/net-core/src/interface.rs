//! Interface name and link setting validation

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::ValidationError;
use crate::types::LinkSettings;
use crate::Result;

/// Kernel limit on interface name length (IFNAMSIZ - 1)
pub const MAX_NAME_LEN: usize = 15;

pub const MIN_MTU: u32 = 68;
pub const MAX_MTU: u32 = 9000;

/// Interface validation utilities
pub struct InterfaceValidator;

impl InterfaceValidator {
    /// Validate interface name
    pub fn validate_name(name: &str) -> Result<()> {
        let invalid = |reason: &str| ValidationError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name cannot be empty").into());
        }

        if name.len() > MAX_NAME_LEN {
            return Err(invalid("name too long (max 15 characters)").into());
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(invalid("name contains invalid characters").into());
        }

        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(invalid("name must start with a letter").into());
        }

        Ok(())
    }

    /// Validate a name carrying a reserved construct prefix
    pub fn validate_prefixed_name(name: &str, prefix: &str) -> Result<()> {
        Self::validate_name(name)?;
        if !name.starts_with(prefix) {
            return Err(ValidationError::InvalidName {
                name: name.to_string(),
                reason: format!("name must start with '{}'", prefix),
            }
            .into());
        }
        Ok(())
    }

    /// MTU must be between 68 and 9000
    pub fn validate_mtu(mtu: i64) -> Result<u32> {
        if mtu < MIN_MTU as i64 || mtu > MAX_MTU as i64 {
            return Err(ValidationError::OutOfRange {
                field: "MTU".to_string(),
                value: mtu,
                min: MIN_MTU as i64,
                max: MAX_MTU as i64,
            }
            .into());
        }
        Ok(mtu as u32)
    }

    /// Validate an address in CIDR notation
    pub fn validate_address(address: &str) -> Result<IpNet> {
        address
            .trim()
            .parse::<IpNet>()
            .map_err(|_| invalid_value("address", address).into())
    }

    /// Validate a gateway address
    pub fn validate_gateway(gateway: &str) -> Result<IpAddr> {
        gateway
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| invalid_value("gateway4", gateway).into())
    }

    /// Check the address-related settings of one construct
    pub fn validate_settings(settings: &LinkSettings) -> Result<()> {
        if let Some(mtu) = settings.mtu {
            Self::validate_mtu(mtu as i64)?;
        }

        for address in settings.addresses.iter().flatten() {
            Self::validate_address(address)?;
        }

        if let Some(ref gateway) = settings.gateway4 {
            Self::validate_gateway(gateway)?;
        }

        if let Some(ref nameservers) = settings.nameservers {
            for server in &nameservers.addresses {
                server
                    .parse::<IpAddr>()
                    .map_err(|_| invalid_value("nameservers", server))?;
            }
        }

        Ok(())
    }
}

fn invalid_value(field: &str, value: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nameservers;

    #[test]
    fn test_interface_name_validation() {
        assert!(InterfaceValidator::validate_name("eth0").is_ok());
        assert!(InterfaceValidator::validate_name("enp3s0f1").is_ok());
        assert!(InterfaceValidator::validate_name("eno4.1144").is_ok());
        assert!(InterfaceValidator::validate_name("br-lan").is_ok());

        assert!(InterfaceValidator::validate_name("").is_err());
        assert!(InterfaceValidator::validate_name("0eth").is_err());
        assert!(InterfaceValidator::validate_name("eth 0").is_err());
        assert!(InterfaceValidator::validate_name("a_very_long_interface_name").is_err());
    }

    #[test]
    fn test_prefixed_names() {
        assert!(InterfaceValidator::validate_prefixed_name("bond0", "bond").is_ok());
        let err = InterfaceValidator::validate_prefixed_name("team0", "bond").unwrap_err();
        assert!(err.to_string().contains("must start with 'bond'"));
    }

    #[test]
    fn test_mtu_range() {
        assert_eq!(InterfaceValidator::validate_mtu(1500).unwrap(), 1500);
        assert_eq!(InterfaceValidator::validate_mtu(68).unwrap(), 68);
        assert_eq!(InterfaceValidator::validate_mtu(9000).unwrap(), 9000);

        let err = InterfaceValidator::validate_mtu(50).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(err.to_string().contains("between 68 and 9000"));
        assert!(InterfaceValidator::validate_mtu(9001).is_err());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = LinkSettings {
            addresses: Some(vec!["192.168.10.5/24".to_string()]),
            gateway4: Some("192.168.10.1".to_string()),
            nameservers: Some(Nameservers {
                addresses: vec!["1.1.1.1".to_string()],
                search: Vec::new(),
            }),
            ..Default::default()
        };
        assert!(InterfaceValidator::validate_settings(&settings).is_ok());

        settings.gateway4 = Some("192.168.10".to_string());
        assert!(InterfaceValidator::validate_settings(&settings).is_err());

        settings.gateway4 = None;
        settings.addresses = Some(vec!["10.0.0.1/99".to_string()]);
        assert!(InterfaceValidator::validate_settings(&settings).is_err());
    }
}
