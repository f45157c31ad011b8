//! Automatic remediation of VLANs mounted on bonded members

use std::collections::HashMap;

use log::{info, warn};
use serde::Serialize;

use netplan_core::{NetworkDocument, VlanManager};

/// One VLAN moved from a bond member onto the bond
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remediation {
    pub old_name: String,
    pub new_name: String,
    pub bond: String,
    /// Bond member the VLAN was attached to
    pub former_link: String,
}

/// Rewrites VLANs whose parent is a bond member to ride on the bond
pub struct AutoRemediator;

impl AutoRemediator {
    /// Map every bonded member to its owning bond
    pub fn bond_members(document: &NetworkDocument) -> HashMap<String, String> {
        document
            .bonds
            .iter()
            .flat_map(|(bond, link)| {
                link.interfaces
                    .iter()
                    .map(move |member| (member.clone(), bond.clone()))
            })
            .collect()
    }

    /// Remediate in place.
    ///
    /// Each affected VLAN is renamed to `<bond>.<id>` and linked to the bond;
    /// every other field is kept. A VLAN whose new name is already taken
    /// stays where it is, leaving its conflict unresolved.
    pub fn remediate(document: &mut NetworkDocument) -> Vec<Remediation> {
        if document.vlans.is_empty() || document.bonds.is_empty() {
            return Vec::new();
        }

        let members = Self::bond_members(document);
        let candidates: Vec<Remediation> = document
            .vlans
            .iter()
            .filter_map(|(name, vlan)| {
                members.get(&vlan.link).map(|bond| Remediation {
                    old_name: name.clone(),
                    new_name: VlanManager::generate_name(bond, vlan.id),
                    bond: bond.clone(),
                    former_link: vlan.link.clone(),
                })
            })
            .collect();

        let mut moves = Vec::with_capacity(candidates.len());
        for remediation in candidates {
            if remediation.new_name != remediation.old_name
                && document.vlans.contains_key(&remediation.new_name)
            {
                warn!(
                    "Cannot move VLAN {} to {}: name already in use",
                    remediation.old_name, remediation.new_name
                );
                continue;
            }

            if let Some(mut vlan) = document.vlans.shift_remove(&remediation.old_name) {
                vlan.link = remediation.bond.clone();
                document.vlans.insert(remediation.new_name.clone(), vlan);
                info!(
                    "Moved VLAN {} from bond member {} to {} as {}",
                    remediation.old_name,
                    remediation.former_link,
                    remediation.bond,
                    remediation.new_name
                );
                moves.push(remediation);
            }
        }

        moves
    }
}
