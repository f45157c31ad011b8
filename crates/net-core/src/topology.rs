//! Topology mutations on a loaded netplan document

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::bond::{BondConfig, BondManager};
use crate::bridge::{BridgeConfig, BridgeManager};
use crate::error::{ConflictError, InputError, ValidationError};
use crate::interface::InterfaceValidator;
use crate::kind::{is_virtual_name, normalize_vlan_name, vlan_name_variants, ConstructKind};
use crate::types::{
    BondLink, BridgeLink, EthernetLink, LinkSettings, Nameservers, NetworkDocument,
    NETPLAN_VERSION,
};
use crate::vlan::{VlanConfig, VlanManager};
use crate::Result;

/// Administrative state requested for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Up,
    Down,
}

impl FromStr for LinkState {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(LinkState::Up),
            "down" => Ok(LinkState::Down),
            other => Err(ValidationError::InvalidValue {
                field: "state".to_string(),
                value: format!("{} (must be \"up\" or \"down\")", other),
            }),
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Up => write!(f, "up"),
            LinkState::Down => write!(f, "down"),
        }
    }
}

/// Static addressing applied by [`NetworkDocument::set_ip`]
#[derive(Debug, Clone, Default)]
pub struct StaticAddress {
    /// Address in CIDR notation
    pub address: String,
    pub gateway: Option<String>,
    /// Comma separated DNS servers
    pub dns: Option<String>,
}

impl StaticAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = Some(gateway.into());
        self
    }

    pub fn with_dns(mut self, dns: impl Into<String>) -> Self {
        self.dns = Some(dns.into());
        self
    }

    fn dns_servers(&self) -> Vec<String> {
        self.dns
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl NetworkDocument {
    /// Empty document for the given renderer
    pub fn new(renderer: &str) -> Self {
        Self {
            version: NETPLAN_VERSION,
            renderer: renderer.to_string(),
            ethernets: Default::default(),
            vlans: Default::default(),
            bridges: Default::default(),
            bonds: Default::default(),
            extras: Default::default(),
        }
    }

    /// Force the fixed version and renderer
    pub fn ensure_root(&mut self, renderer: &str) {
        self.version = NETPLAN_VERSION;
        if self.renderer != renderer {
            debug!("Forcing renderer {} (was {})", renderer, self.renderer);
            self.renderer = renderer.to_string();
        }
    }

    /// Section holding an entry with exactly this name
    pub fn kind_of(&self, name: &str) -> Option<ConstructKind> {
        [
            ConstructKind::Ethernet,
            ConstructKind::Vlan,
            ConstructKind::Bond,
            ConstructKind::Bridge,
        ]
        .into_iter()
        .find(|kind| self.contains(*kind, name))
    }

    pub fn contains(&self, kind: ConstructKind, name: &str) -> bool {
        match kind {
            ConstructKind::Ethernet => self.ethernets.contains_key(name),
            ConstructKind::Vlan => self.vlans.contains_key(name),
            ConstructKind::Bond => self.bonds.contains_key(name),
            ConstructKind::Bridge => self.bridges.contains_key(name),
        }
    }

    /// Trial apply is unsupported for documents with bonds or bridges
    pub fn has_bonds_or_bridges(&self) -> bool {
        !self.bonds.is_empty() || !self.bridges.is_empty()
    }

    /// Whether no construct is declared at all
    pub fn is_empty(&self) -> bool {
        self.ethernets.is_empty()
            && self.vlans.is_empty()
            && self.bonds.is_empty()
            && self.bridges.is_empty()
    }

    /// Create an optional ethernet entry for every referenced physical name
    pub fn materialize_ethernets<'a, I>(&mut self, names: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            if is_virtual_name(name) || self.ethernets.contains_key(name) {
                continue;
            }
            debug!("Materializing ethernet {}", name);
            self.ethernets
                .insert(name.to_string(), EthernetLink::optional());
        }
    }

    /// Add or replace a bond
    pub fn add_bond(&mut self, config: &BondConfig) -> Result<()> {
        let link = BondManager::build_link(config)?;
        self.materialize_ethernets(config.interfaces.iter().map(String::as_str));
        self.bonds.insert(config.name.clone(), link);
        debug!("Added bond {} over {:?}", config.name, config.interfaces);
        Ok(())
    }

    /// Add or replace a VLAN
    pub fn add_vlan(&mut self, config: &VlanConfig) -> Result<()> {
        let link = VlanManager::build_link(config)?;
        self.materialize_ethernets([config.link.as_str()]);

        for variant in vlan_name_variants(&config.name).iter().skip(1) {
            if self.vlans.shift_remove(variant).is_some() {
                debug!("Dropped VLAN entry {} in favour of {}", variant, config.name);
            }
        }

        self.vlans.insert(config.name.clone(), link);
        debug!("Added VLAN {} on {}", config.name, config.link);
        Ok(())
    }

    /// Add or replace a bridge whose ports are not used elsewhere
    pub fn add_bridge(&mut self, config: &BridgeConfig) -> Result<()> {
        let link = BridgeManager::build_link(config)?;

        let in_use: Vec<String> = config
            .interfaces
            .iter()
            .filter(|port| self.is_port_in_use(port, &config.name))
            .cloned()
            .collect();
        if !in_use.is_empty() {
            return Err(ConflictError::InterfacesInUse {
                construct: "bridge".to_string(),
                interfaces: in_use,
            }
            .into());
        }

        self.materialize_ethernets(config.interfaces.iter().map(String::as_str));
        self.bridges.insert(config.name.clone(), link);
        debug!("Added bridge {} over {:?}", config.name, config.interfaces);
        Ok(())
    }

    fn is_port_in_use(&self, port: &str, bridge: &str) -> bool {
        self.bonds
            .values()
            .any(|bond| bond.interfaces.iter().any(|m| m == port))
            || self
                .bridges
                .iter()
                .filter(|(name, _)| name.as_str() != bridge)
                .any(|(_, br)| br.interfaces.iter().any(|m| m == port))
            || self.vlans.values().any(|vlan| vlan.link == port)
    }

    /// Strip an `@parent` suffix, migrating an entry stored under it
    fn normalize_target(&mut self, name: &str) -> String {
        let normalized = normalize_vlan_name(name);
        if normalized != name {
            if let Some(existing) = self.vlans.shift_remove(name) {
                debug!("Migrating VLAN entry {} to {}", name, normalized);
                self.vlans.insert(normalized.to_string(), existing);
            }
        }
        normalized.to_string()
    }

    /// Settings of the addressed construct, creating a skeleton entry if absent
    pub fn settings_mut(&mut self, kind: ConstructKind, name: &str) -> &mut LinkSettings {
        match kind {
            ConstructKind::Ethernet => {
                &mut self
                    .ethernets
                    .entry(name.to_string())
                    .or_insert_with(EthernetLink::optional)
                    .settings
            }
            ConstructKind::Vlan => {
                &mut self
                    .vlans
                    .entry(name.to_string())
                    .or_insert_with(|| VlanManager::infer_skeleton(name))
                    .settings
            }
            ConstructKind::Bond => {
                &mut self
                    .bonds
                    .entry(name.to_string())
                    .or_insert_with(BondLink::default)
                    .settings
            }
            ConstructKind::Bridge => {
                &mut self
                    .bridges
                    .entry(name.to_string())
                    .or_insert_with(BridgeLink::default)
                    .settings
            }
        }
    }

    fn target(&mut self, name: &str, explicit: Option<ConstructKind>) -> Result<(ConstructKind, String)> {
        if name.trim().is_empty() {
            return Err(InputError::MissingField("name".to_string()).into());
        }
        let name = self.normalize_target(name);
        let kind = ConstructKind::resolve(&name, explicit, self);
        // New entries become kernel devices
        if !self.contains(kind, &name) {
            InterfaceValidator::validate_name(&name)?;
        }
        Ok((kind, name))
    }

    /// Configure a static address on any construct
    pub fn set_ip(
        &mut self,
        name: &str,
        explicit: Option<ConstructKind>,
        address: &StaticAddress,
    ) -> Result<ConstructKind> {
        if address.address.trim().is_empty() {
            return Err(InputError::MissingField("static_ip".to_string()).into());
        }
        InterfaceValidator::validate_address(&address.address)?;
        if let Some(ref gateway) = address.gateway {
            InterfaceValidator::validate_gateway(gateway)?;
        }
        let dns = address.dns_servers();
        for server in &dns {
            InterfaceValidator::validate_gateway(server).map_err(|_| ValidationError::InvalidValue {
                field: "dns".to_string(),
                value: server.clone(),
            })?;
        }

        let (kind, name) = self.target(name, explicit)?;
        let settings = self.settings_mut(kind, &name);
        settings.dhcp4 = Some(false);
        settings.addresses = Some(vec![address.address.trim().to_string()]);
        if let Some(ref gateway) = address.gateway {
            settings.gateway4 = Some(gateway.trim().to_string());
        }
        if !dns.is_empty() {
            settings.nameservers = Some(Nameservers {
                addresses: dns,
                search: Vec::new(),
            });
        }

        debug!("Configured {} on {}/{}", address.address, kind, name);
        Ok(kind)
    }

    /// Set the MTU of any construct
    pub fn set_mtu(
        &mut self,
        name: &str,
        explicit: Option<ConstructKind>,
        mtu: i64,
    ) -> Result<ConstructKind> {
        let mtu = InterfaceValidator::validate_mtu(mtu)?;
        let (kind, name) = self.target(name, explicit)?;
        self.settings_mut(kind, &name).mtu = Some(mtu);
        debug!("Set MTU {} on {}/{}", mtu, kind, name);
        Ok(kind)
    }

    /// Mark a construct up or down in the declarative sense
    pub fn set_state(
        &mut self,
        name: &str,
        explicit: Option<ConstructKind>,
        state: LinkState,
    ) -> Result<ConstructKind> {
        let (kind, name) = self.target(name, explicit)?;
        let settings = self.settings_mut(kind, &name);

        match state {
            LinkState::Up => {
                if settings.addresses.is_none() && settings.dhcp4.is_none() {
                    settings.dhcp4 = Some(true);
                }
                settings.optional = None;
            }
            LinkState::Down => {
                settings.optional = Some(true);
                if settings.addresses.is_none() {
                    settings.dhcp4 = None;
                    settings.dhcp6 = None;
                }
            }
        }

        debug!("Set {}/{} {}", kind, name, state);
        Ok(kind)
    }

    /// Remove a construct, returning the name it was stored under
    pub fn remove(&mut self, kind: ConstructKind, name: &str) -> Result<String> {
        if name.trim().is_empty() {
            return Err(InputError::MissingField("name".to_string()).into());
        }

        let candidates = match kind {
            ConstructKind::Vlan => vlan_name_variants(name),
            _ => vec![name.to_string()],
        };

        let not_found = || -> crate::error::NetworkError {
            InputError::NotFound {
                section: kind.section().to_string(),
                name: name.to_string(),
            }
            .into()
        };

        let section_present = match kind {
            ConstructKind::Ethernet => !self.ethernets.is_empty(),
            ConstructKind::Vlan => !self.vlans.is_empty(),
            ConstructKind::Bond => !self.bonds.is_empty(),
            ConstructKind::Bridge => !self.bridges.is_empty(),
        };
        if !section_present {
            return Err(InputError::UnknownSection(kind.section().to_string()).into());
        }

        let found = candidates
            .into_iter()
            .find(|candidate| self.contains(kind, candidate))
            .ok_or_else(not_found)?;

        match kind {
            ConstructKind::Ethernet => {
                self.ethernets.shift_remove(&found);
            }
            ConstructKind::Vlan => {
                self.vlans.shift_remove(&found);
            }
            ConstructKind::Bond => {
                self.bonds.shift_remove(&found);
            }
            ConstructKind::Bridge => {
                self.bridges.shift_remove(&found);
            }
        }

        debug!("Removed {}/{}", kind, found);
        Ok(found)
    }
}
