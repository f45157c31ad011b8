//! Structural validation of a whole netplan document

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use netplan_core::error::ValidationError;
use netplan_core::{
    InterfaceValidator, LinkSettings, NetworkDocument, NetworkError, NETPLAN_VERSION,
};

/// Document keys: a netplan id, optionally with the `@parent` suffix
/// some tools report for VLANs. Ids are logical names and may exceed the
/// kernel limit when a `match` block selects the device.
static CONSTRUCT_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.:-]*(@[A-Za-z0-9_.-]+)?$")
        .expect("Invalid construct key pattern")
});

/// Syntax validator for netplan documents
pub struct SyntaxValidator {
    vlan_id_range: std::ops::RangeInclusive<u16>,
}

impl SyntaxValidator {
    /// Create new syntax validator
    pub fn new() -> Self {
        Self {
            vlan_id_range: netplan_core::vlan::MIN_VLAN_ID..=netplan_core::vlan::MAX_VLAN_ID,
        }
    }

    /// Validate a construct key
    pub fn is_valid_key(&self, key: &str) -> bool {
        CONSTRUCT_KEY_RE.is_match(key)
    }

    /// Validate complete document, collecting every problem found
    pub fn validate_document(&self, document: &NetworkDocument) -> Result<(), NetworkError> {
        let mut errors = Vec::new();

        if document.version != NETPLAN_VERSION {
            errors.push(format!(
                "Unsupported netplan version {} (expected {})",
                document.version, NETPLAN_VERSION
            ));
        }

        for (name, link) in &document.ethernets {
            self.check_key(name, &mut errors);
            self.check_settings(name, &link.settings, &mut errors);
        }

        for (name, vlan) in &document.vlans {
            self.check_key(name, &mut errors);
            if !self.vlan_id_range.contains(&vlan.id) {
                errors.push(format!(
                    "VLAN '{}': id {} outside {}-{}",
                    name,
                    vlan.id,
                    self.vlan_id_range.start(),
                    self.vlan_id_range.end()
                ));
            }
            if vlan.link.trim().is_empty() {
                errors.push(format!("VLAN '{}': link cannot be empty", name));
            }
            self.check_settings(name, &vlan.settings, &mut errors);
        }

        for (name, bond) in &document.bonds {
            self.check_key(name, &mut errors);
            self.check_members(name, &bond.interfaces, &mut errors);
            if let Some(ref primary) = bond.parameters.primary {
                if !bond.interfaces.contains(primary) {
                    errors.push(format!(
                        "Bond '{}': primary {} is not a member",
                        name, primary
                    ));
                }
            }
            self.check_settings(name, &bond.settings, &mut errors);
        }

        for (name, bridge) in &document.bridges {
            self.check_key(name, &mut errors);
            self.check_members(name, &bridge.interfaces, &mut errors);
            self.check_settings(name, &bridge.settings, &mut errors);
        }

        if !errors.is_empty() {
            return Err(ValidationError::Schema {
                message: errors.join("; "),
            }
            .into());
        }

        Ok(())
    }

    fn check_key(&self, name: &str, errors: &mut Vec<String>) {
        if !self.is_valid_key(name) {
            errors.push(format!("Invalid interface name '{}'", name));
        }
    }

    fn check_members(&self, name: &str, members: &[String], errors: &mut Vec<String>) {
        let mut seen = HashSet::new();
        for member in members {
            if !seen.insert(member.as_str()) {
                errors.push(format!("'{}': member {} listed more than once", name, member));
            }
        }
    }

    fn check_settings(&self, name: &str, settings: &LinkSettings, errors: &mut Vec<String>) {
        if let Err(e) = InterfaceValidator::validate_settings(settings) {
            errors.push(format!("'{}': {}", name, e));
        }
    }
}

impl Default for SyntaxValidator {
    fn default() -> Self {
        Self::new()
    }
}
