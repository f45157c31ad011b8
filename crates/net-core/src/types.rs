//! Core netplan document types

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Netplan schema version written into every document
pub const NETPLAN_VERSION: u8 = 2;

/// Renderer forced onto every written document
pub const DEFAULT_RENDERER: &str = "networkd";

/// Reserved name prefix of bond constructs
pub const BOND_PREFIX: &str = "bond";

/// Reserved name prefix of bridge constructs
pub const BRIDGE_PREFIX: &str = "br";

/// Keys not modelled explicitly, preserved verbatim through load/save
pub type Extras = IndexMap<String, serde_yaml::Value>;

/// On-disk wrapper, the document lives under the top-level `network` key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetplanFile {
    #[serde(default)]
    pub network: NetworkDocument,
}

/// Root of the declarative network topology.
///
/// Field declaration order is the canonical section order on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDocument {
    #[serde(default = "default_version")]
    pub version: u8,

    #[serde(default = "default_renderer")]
    pub renderer: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub ethernets: IndexMap<String, EthernetLink>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub vlans: IndexMap<String, VlanLink>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub bridges: IndexMap<String, BridgeLink>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub bonds: IndexMap<String, BondLink>,

    /// Other netplan sections (wifis, tunnels, ...)
    #[serde(flatten)]
    pub extras: Extras,
}

fn default_version() -> u8 {
    NETPLAN_VERSION
}

fn default_renderer() -> String {
    DEFAULT_RENDERER.to_string()
}

impl Default for NetworkDocument {
    fn default() -> Self {
        Self::new(DEFAULT_RENDERER)
    }
}

/// Settings shared by every construct kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp4: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp6: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway4: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Nameservers>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,

    /// Suppresses the boot-time wait for this link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    #[serde(flatten)]
    pub extras: Extras,
}

impl LinkSettings {
    /// Whether any static address is configured
    pub fn has_addresses(&self) -> bool {
        self.addresses.as_ref().is_some_and(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Nameservers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
}

/// Physical interface entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EthernetLink {
    #[serde(flatten)]
    pub settings: LinkSettings,
}

impl EthernetLink {
    /// Placeholder entry for a referenced physical interface
    pub fn optional() -> Self {
        let mut link = Self::default();
        link.settings.optional = Some(true);
        link
    }
}

/// 802.1Q VLAN on top of an ethernet or bond
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanLink {
    pub id: u16,
    pub link: String,

    #[serde(flatten)]
    pub settings: LinkSettings,
}

impl VlanLink {
    pub fn new(id: u16, link: impl Into<String>) -> Self {
        Self {
            id,
            link: link.into(),
            settings: LinkSettings::default(),
        }
    }
}

/// Link aggregation construct
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BondLink {
    #[serde(default)]
    pub interfaces: Vec<String>,

    #[serde(default, skip_serializing_if = "BondParameters::is_empty")]
    pub parameters: BondParameters,

    #[serde(flatten)]
    pub settings: LinkSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BondParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<BondMode>,

    #[serde(
        rename = "mii-monitor-interval",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mii_monitor_interval: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,

    #[serde(rename = "lacp-rate", default, skip_serializing_if = "Option::is_none")]
    pub lacp_rate: Option<LacpRate>,

    #[serde(
        rename = "transmit-hash-policy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transmit_hash_policy: Option<TransmitHashPolicy>,

    #[serde(flatten)]
    pub extras: Extras,
}

impl BondParameters {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.mii_monitor_interval.is_none()
            && self.primary.is_none()
            && self.lacp_rate.is_none()
            && self.transmit_hash_policy.is_none()
            && self.extras.is_empty()
    }
}

/// Software bridge construct
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BridgeLink {
    #[serde(default)]
    pub interfaces: Vec<String>,

    #[serde(default, skip_serializing_if = "BridgeParameters::is_empty")]
    pub parameters: BridgeParameters,

    #[serde(flatten)]
    pub settings: LinkSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BridgeParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stp: Option<bool>,

    #[serde(flatten)]
    pub extras: Extras,
}

impl BridgeParameters {
    pub fn is_empty(&self) -> bool {
        self.stp.is_none() && self.extras.is_empty()
    }
}

/// Linux bonding modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BondMode {
    #[serde(rename = "balance-rr")]
    RoundRobin,
    #[default]
    #[serde(rename = "active-backup")]
    ActiveBackup,
    #[serde(rename = "balance-xor")]
    Xor,
    #[serde(rename = "broadcast")]
    Broadcast,
    #[serde(rename = "802.3ad")]
    Ieee8023ad,
    #[serde(rename = "balance-tlb")]
    BalanceTlb,
    #[serde(rename = "balance-alb")]
    BalanceAlb,
}

impl BondMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BondMode::RoundRobin => "balance-rr",
            BondMode::ActiveBackup => "active-backup",
            BondMode::Xor => "balance-xor",
            BondMode::Broadcast => "broadcast",
            BondMode::Ieee8023ad => "802.3ad",
            BondMode::BalanceTlb => "balance-tlb",
            BondMode::BalanceAlb => "balance-alb",
        }
    }

    /// Modes that balance transmit load and default the MII monitor
    pub fn is_load_balancing(&self) -> bool {
        matches!(self, BondMode::BalanceTlb | BondMode::BalanceAlb)
    }
}

impl fmt::Display for BondMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BondMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" | "balance-rr" => Ok(BondMode::RoundRobin),
            "1" | "active-backup" => Ok(BondMode::ActiveBackup),
            "2" | "balance-xor" => Ok(BondMode::Xor),
            "3" | "broadcast" => Ok(BondMode::Broadcast),
            "4" | "802.3ad" => Ok(BondMode::Ieee8023ad),
            "5" | "balance-tlb" => Ok(BondMode::BalanceTlb),
            "6" | "balance-alb" => Ok(BondMode::BalanceAlb),
            other => Err(ValidationError::UnknownBondMode(other.to_string())),
        }
    }
}

/// LACPDU transmission rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LacpRate {
    Slow,
    Fast,
}

impl fmt::Display for LacpRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LacpRate::Slow => write!(f, "slow"),
            LacpRate::Fast => write!(f, "fast"),
        }
    }
}

/// Slave selection hash for balance-xor and 802.3ad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmitHashPolicy {
    #[serde(rename = "layer2")]
    Layer2,
    #[serde(rename = "layer2+3")]
    Layer2Plus3,
    #[serde(rename = "layer3+4")]
    Layer3Plus4,
    #[serde(rename = "encap2+3")]
    Encap2Plus3,
    #[serde(rename = "encap3+4")]
    Encap3Plus4,
}

impl fmt::Display for TransmitHashPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmitHashPolicy::Layer2 => write!(f, "layer2"),
            TransmitHashPolicy::Layer2Plus3 => write!(f, "layer2+3"),
            TransmitHashPolicy::Layer3Plus4 => write!(f, "layer3+4"),
            TransmitHashPolicy::Encap2Plus3 => write!(f, "encap2+3"),
            TransmitHashPolicy::Encap3Plus4 => write!(f, "encap3+4"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bond_mode_parsing() {
        assert_eq!("4".parse::<BondMode>().unwrap(), BondMode::Ieee8023ad);
        assert_eq!(
            "active-backup".parse::<BondMode>().unwrap(),
            BondMode::ActiveBackup
        );
        assert_eq!("balance-alb".parse::<BondMode>().unwrap().to_string(), "balance-alb");
        assert!("lacp".parse::<BondMode>().is_err());
    }

    #[test]
    fn test_canonical_section_order() {
        let mut doc = NetworkDocument::default();
        doc.bonds.insert(
            "bond0".to_string(),
            BondLink {
                interfaces: vec!["eth0".to_string(), "eth1".to_string()],
                ..Default::default()
            },
        );
        doc.ethernets.insert("eth0".to_string(), EthernetLink::optional());
        doc.vlans
            .insert("bond0.10".to_string(), VlanLink::new(10, "bond0"));

        let yaml = serde_yaml::to_string(&NetplanFile { network: doc }).unwrap();
        let order: Vec<usize> = ["version", "renderer", "ethernets", "vlans", "bonds"]
            .iter()
            .map(|key| yaml.find(&format!("  {}:", key)).unwrap())
            .collect();

        assert!(order.windows(2).all(|w| w[0] < w[1]), "{}", yaml);
        assert!(!yaml.contains("bridges"));
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let yaml = r#"
network:
  version: 2
  renderer: networkd
  ethernets:
    eno1:
      dhcp4: true
      macaddress: "aa:bb:cc:dd:ee:ff"
      routes:
        - to: default
          via: 10.0.0.1
  bonds:
    bond0:
      interfaces: [eno1, eno2]
      parameters:
        mode: 802.3ad
        lacp-rate: fast
        up-delay: 200
  wifis:
    wlan0:
      dhcp4: true
"#;
        let file: NetplanFile = serde_yaml::from_str(yaml).unwrap();
        let eno1 = &file.network.ethernets["eno1"];
        assert_eq!(eno1.settings.dhcp4, Some(true));
        assert!(eno1.settings.extras.contains_key("macaddress"));
        assert!(eno1.settings.extras.contains_key("routes"));

        let bond = &file.network.bonds["bond0"];
        assert_eq!(bond.parameters.mode, Some(BondMode::Ieee8023ad));
        assert_eq!(bond.parameters.lacp_rate, Some(LacpRate::Fast));
        assert!(bond.parameters.extras.contains_key("up-delay"));
        assert!(file.network.extras.contains_key("wifis"));

        let written = serde_yaml::to_string(&file).unwrap();
        let reread: NetplanFile = serde_yaml::from_str(&written).unwrap();
        assert_eq!(reread, file);
    }

    #[test]
    fn test_missing_network_root_loads_defaults() {
        let file: NetplanFile = serde_yaml::from_str("{}").unwrap();
        assert_eq!(file.network.version, NETPLAN_VERSION);
        assert_eq!(file.network.renderer, DEFAULT_RENDERER);
        assert!(file.network.ethernets.is_empty());
    }
}
