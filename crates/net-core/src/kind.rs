//! Construct kinds and name-to-kind resolution

use std::fmt;
use std::str::FromStr;

use crate::error::InputError;
use crate::types::{NetworkDocument, BOND_PREFIX, BRIDGE_PREFIX};

/// The four construct sections of a netplan document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    Ethernet,
    Vlan,
    Bond,
    Bridge,
}

impl ConstructKind {
    /// Section name as written in the document
    pub fn section(&self) -> &'static str {
        match self {
            ConstructKind::Ethernet => "ethernets",
            ConstructKind::Vlan => "vlans",
            ConstructKind::Bond => "bonds",
            ConstructKind::Bridge => "bridges",
        }
    }

    /// Classify a name by its shape alone.
    ///
    /// Precedence: bond prefix, bridge prefix, contains `.`, ethernet.
    /// A literal interface named `bridge.5` is therefore a bridge and
    /// `bond0.10` a bond; callers that know better pass an explicit kind.
    pub fn from_pattern(name: &str) -> Self {
        if name.starts_with(BOND_PREFIX) {
            ConstructKind::Bond
        } else if name.starts_with(BRIDGE_PREFIX) {
            ConstructKind::Bridge
        } else if name.contains('.') {
            ConstructKind::Vlan
        } else {
            ConstructKind::Ethernet
        }
    }

    /// Resolve the section a name belongs to.
    ///
    /// An explicit kind always wins, then an existing entry with that exact
    /// name, then [`ConstructKind::from_pattern`].
    pub fn resolve(
        name: &str,
        explicit: Option<ConstructKind>,
        document: &NetworkDocument,
    ) -> ConstructKind {
        if let Some(kind) = explicit {
            return kind;
        }
        document
            .kind_of(name)
            .unwrap_or_else(|| ConstructKind::from_pattern(name))
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

impl FromStr for ConstructKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethernets" | "ethernet" => Ok(ConstructKind::Ethernet),
            "vlans" | "vlan" => Ok(ConstructKind::Vlan),
            "bonds" | "bond" => Ok(ConstructKind::Bond),
            "bridges" | "bridge" => Ok(ConstructKind::Bridge),
            other => Err(InputError::UnknownSection(other.to_string())),
        }
    }
}

/// Whether a referenced name already lives in a bond, bridge or VLAN
/// namespace and must not be materialized as an ethernet
pub fn is_virtual_name(name: &str) -> bool {
    name.starts_with(BOND_PREFIX) || name.starts_with(BRIDGE_PREFIX) || name.contains('.')
}

/// Strip the `@parent` suffix live tools append to VLAN names
/// (`eno4.1144@eno4` becomes `eno4.1144`)
pub fn normalize_vlan_name(name: &str) -> &str {
    match name.split_once('@') {
        Some((base, _)) if base.contains('.') => base,
        _ => name,
    }
}

/// Every spelling a VLAN may be stored under, the given one first
pub fn vlan_name_variants(name: &str) -> Vec<String> {
    let mut variants = vec![name.to_string()];
    let normalized = normalize_vlan_name(name);

    if normalized != name {
        variants.push(normalized.to_string());
    } else if let Some((parent, _)) = name.split_once('.') {
        if !name.contains('@') && name.matches('.').count() == 1 {
            variants.push(format!("{}@{}", name, parent));
        }
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VlanLink;

    #[test]
    fn test_pattern_precedence() {
        assert_eq!(ConstructKind::from_pattern("bond0"), ConstructKind::Bond);
        assert_eq!(ConstructKind::from_pattern("br0"), ConstructKind::Bridge);
        assert_eq!(ConstructKind::from_pattern("eth0.100"), ConstructKind::Vlan);
        assert_eq!(ConstructKind::from_pattern("eno1"), ConstructKind::Ethernet);

        // Ambiguous shapes follow prefix precedence
        assert_eq!(ConstructKind::from_pattern("bridge.5"), ConstructKind::Bridge);
        assert_eq!(ConstructKind::from_pattern("bond0.10"), ConstructKind::Bond);
    }

    #[test]
    fn test_existing_entry_beats_pattern() {
        let mut doc = NetworkDocument::default();
        doc.vlans
            .insert("bond0.10".to_string(), VlanLink::new(10, "bond0"));

        assert_eq!(
            ConstructKind::resolve("bond0.10", None, &doc),
            ConstructKind::Vlan
        );
        assert_eq!(
            ConstructKind::resolve("bond0.10", Some(ConstructKind::Bond), &doc),
            ConstructKind::Bond
        );
        assert_eq!(
            ConstructKind::resolve("bond0.20", None, &doc),
            ConstructKind::Bond
        );
    }

    #[test]
    fn test_section_names() {
        assert_eq!("vlans".parse::<ConstructKind>().unwrap(), ConstructKind::Vlan);
        assert_eq!("bridge".parse::<ConstructKind>().unwrap(), ConstructKind::Bridge);
        assert!("tunnels".parse::<ConstructKind>().is_err());
        assert_eq!(ConstructKind::Bond.to_string(), "bonds");
    }

    #[test]
    fn test_vlan_name_normalization() {
        assert_eq!(normalize_vlan_name("eno4.1144@eno4"), "eno4.1144");
        assert_eq!(normalize_vlan_name("eno4.1144"), "eno4.1144");
        assert_eq!(normalize_vlan_name("veth@peer"), "veth@peer");

        assert_eq!(
            vlan_name_variants("eno4.1144@eno4"),
            vec!["eno4.1144@eno4", "eno4.1144"]
        );
        assert_eq!(
            vlan_name_variants("eno4.1144"),
            vec!["eno4.1144", "eno4.1144@eno4"]
        );
        assert_eq!(vlan_name_variants("eth0"), vec!["eth0"]);
    }

    #[test]
    fn test_virtual_names() {
        assert!(is_virtual_name("bond1"));
        assert!(is_virtual_name("br-lan"));
        assert!(is_virtual_name("eth0.5"));
        assert!(!is_virtual_name("enp3s0"));
    }
}
