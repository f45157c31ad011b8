//! Interface usage validation
//!
//! Detects interfaces referenced by more than one construct in roles that
//! cannot coexist.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use netplan_core::{NetworkDocument, BOND_PREFIX};

/// Role an interface plays inside one construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageRole {
    BondMember,
    BridgeMember,
    VlanParent,
}

/// One recorded reference to an interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub role: UsageRole,
    /// Construct holding the reference (bond, bridge or VLAN name)
    pub owner: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// VLAN parent while also a bond or bridge member
    VlanParentOfMember,
    /// Member of a bond and of a bridge
    BondAndBridgeMember,
    MultipleBonds,
    MultipleBridges,
}

/// Conflicting reuse of a single interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageConflict {
    pub interface: String,
    pub kind: ConflictKind,
    pub owners: Vec<String>,
}

impl fmt::Display for UsageConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConflictKind::VlanParentOfMember => write!(
                f,
                "Interface {} is used as both a bond/bridge member and VLAN parent",
                self.interface
            ),
            ConflictKind::BondAndBridgeMember => write!(
                f,
                "Interface {} cannot be both a bond member and bridge member",
                self.interface
            ),
            ConflictKind::MultipleBonds => write!(
                f,
                "Interface {} is a member of more than one bond: {}",
                self.interface,
                self.owners.join(", ")
            ),
            ConflictKind::MultipleBridges => write!(
                f,
                "Interface {} is a member of more than one bridge: {}",
                self.interface,
                self.owners.join(", ")
            ),
        }
    }
}

/// Usage validator for netplan documents
pub struct UsageValidator;

impl UsageValidator {
    /// Map every referenced interface to its usages, in discovery order
    /// (bond members, then bridge members, then VLAN parents)
    pub fn usage_map(document: &NetworkDocument) -> IndexMap<String, Vec<Usage>> {
        let mut usages: IndexMap<String, Vec<Usage>> = IndexMap::new();
        let mut register = |iface: &str, role: UsageRole, owner: &str| {
            usages.entry(iface.to_string()).or_default().push(Usage {
                role,
                owner: owner.to_string(),
            });
        };

        for (bond, link) in &document.bonds {
            for member in &link.interfaces {
                register(member, UsageRole::BondMember, bond);
            }
        }

        for (bridge, link) in &document.bridges {
            for member in &link.interfaces {
                register(member, UsageRole::BridgeMember, bridge);
            }
        }

        for (vlan, link) in &document.vlans {
            if !link.link.is_empty() {
                register(&link.link, UsageRole::VlanParent, vlan);
            }
        }

        usages
    }

    /// Validate interface usage, returning conflicts in discovery order.
    ///
    /// At most one conflict is reported per interface.
    pub fn validate(document: &NetworkDocument) -> Vec<UsageConflict> {
        Self::usage_map(document)
            .into_iter()
            .filter(|(_, usages)| usages.len() > 1)
            .filter_map(|(iface, usages)| Self::classify(iface, &usages))
            .collect()
    }

    fn classify(interface: String, usages: &[Usage]) -> Option<UsageConflict> {
        let owners_with = |role: UsageRole| -> Vec<String> {
            usages
                .iter()
                .filter(|u| u.role == role)
                .map(|u| u.owner.clone())
                .collect()
        };

        let bonds = owners_with(UsageRole::BondMember);
        let bridges = owners_with(UsageRole::BridgeMember);
        let vlans = owners_with(UsageRole::VlanParent);

        // A VLAN named after a bond rides on the bond, not on its raw member
        let bond_carried = vlans.iter().any(|owner| owner.starts_with(BOND_PREFIX));

        let (kind, owners) = if !vlans.is_empty()
            && (!bonds.is_empty() || !bridges.is_empty())
            && !bond_carried
        {
            let owners = usages.iter().map(|u| u.owner.clone()).collect();
            (ConflictKind::VlanParentOfMember, owners)
        } else if !bonds.is_empty() && !bridges.is_empty() {
            (ConflictKind::BondAndBridgeMember, [bonds, bridges].concat())
        } else if bonds.len() > 1 {
            (ConflictKind::MultipleBonds, bonds)
        } else if bridges.len() > 1 {
            (ConflictKind::MultipleBridges, bridges)
        } else {
            return None;
        };

        Some(UsageConflict {
            interface,
            kind,
            owners,
        })
    }
}
