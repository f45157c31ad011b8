//! Request contract

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use netplan_core::{
    BondConfig, BondMode, BridgeConfig, ConstructKind, InputError, LinkState, Result,
    StaticAddress, ValidationError, VlanConfig,
};

/// Actions understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddBond,
    AddVlan,
    AddBridge,
    Delete,
    SetIp,
    SetMtu,
    SetInterfaceState,
    Load,
    GetStatus,
    TryConfig,
    ApplyConfig,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::AddBond => "add_bond",
            Action::AddVlan => "add_vlan",
            Action::AddBridge => "add_bridge",
            Action::Delete => "delete",
            Action::SetIp => "set_ip",
            Action::SetMtu => "set_mtu",
            Action::SetInterfaceState => "set_interface_state",
            Action::Load => "load",
            Action::GetStatus => "get_status",
            Action::TryConfig => "try_config",
            Action::ApplyConfig => "apply_config",
        }
    }

    /// Whether the action edits the document before reconciling it
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Action::Load | Action::GetStatus | Action::TryConfig | Action::ApplyConfig
        )
    }
}

impl FromStr for Action {
    type Err = InputError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "add_bond" => Ok(Action::AddBond),
            "add_vlan" => Ok(Action::AddVlan),
            "add_bridge" => Ok(Action::AddBridge),
            "delete" | "delete_interface" => Ok(Action::Delete),
            "set_ip" => Ok(Action::SetIp),
            "set_mtu" => Ok(Action::SetMtu),
            "set_interface_state" => Ok(Action::SetInterfaceState),
            "load" | "load_netplan" => Ok(Action::Load),
            "get_status" => Ok(Action::GetStatus),
            "try_config" => Ok(Action::TryConfig),
            "apply_config" => Ok(Action::ApplyConfig),
            other => Err(InputError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request: an action and its action-specific config object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub config: Value,
}

impl Request {
    pub fn new(action: &str, config: Value) -> Self {
        Self {
            action: Some(action.to_string()),
            config,
        }
    }

    /// Parse a JSON request
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(InputError::Empty.into());
        }
        serde_json::from_str(input).map_err(|e| InputError::Malformed(e.to_string()).into())
    }

    pub fn action(&self) -> Result<Action> {
        match self.action.as_deref().map(str::trim) {
            None | Some("") => Err(InputError::MissingField("action".to_string()).into()),
            Some(action) => Ok(action.parse::<Action>()?),
        }
    }

    /// Decode the config object; a missing config is an empty one
    pub fn config<T: DeserializeOwned>(&self) -> Result<T> {
        let value = match self.config {
            Value::Null => Value::Object(Default::default()),
            ref value => value.clone(),
        };
        serde_json::from_value(value).map_err(|e| InputError::Malformed(e.to_string()).into())
    }
}

/// A field sent either as a JSON number or as text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    fn as_int(&self, field: &str) -> Result<i64> {
        match self {
            Scalar::Int(value) => Ok(*value),
            Scalar::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                ValidationError::InvalidValue {
                    field: field.to_string(),
                    value: text.clone(),
                }
                .into()
            }),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Scalar::Int(value) => value.to_string(),
            Scalar::Text(text) => text.trim().to_string(),
        }
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(InputError::MissingField(field.to_string()).into()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn explicit_kind(kind: Option<String>) -> Result<Option<ConstructKind>> {
    match non_blank(kind) {
        Some(kind) => Ok(Some(kind.trim().parse::<ConstructKind>()?)),
        None => Ok(None),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddBondRequest {
    pub name: Option<String>,
    pub mode: Option<Scalar>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    pub miimon: Option<Scalar>,
    pub primary: Option<String>,
}

impl AddBondRequest {
    pub fn into_config(self) -> Result<BondConfig> {
        let mode = match self.mode {
            Some(mode) => mode.as_text().parse::<BondMode>()?,
            None => BondMode::default(),
        };
        let mut config =
            BondConfig::new(required(self.name, "name")?, mode).with_interfaces(self.interfaces);
        if let Some(miimon) = self.miimon {
            config = config.with_miimon(miimon.as_int("miimon")?);
        }
        if let Some(primary) = non_blank(self.primary) {
            config = config.with_primary(primary);
        }
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddVlanRequest {
    pub name: Option<String>,
    pub id: Option<Scalar>,
    pub link: Option<String>,
    pub static_ip: Option<String>,
    pub gateway: Option<String>,
    pub mtu: Option<Scalar>,
}

impl AddVlanRequest {
    pub fn into_config(self) -> Result<VlanConfig> {
        let name = required(self.name, "name")?;
        let mut config = VlanConfig::new(&name, required(self.link, "link")?);

        if let Some(id) = self.id {
            config = config.with_id(id.as_int("id")?);
        }
        if let Some(address) = non_blank(self.static_ip) {
            config = config.with_static_ip(address.trim());
        }
        if let Some(gateway) = non_blank(self.gateway) {
            config = config.with_gateway(gateway.trim());
        }
        // Zero or negative means "leave unset"
        if let Some(mtu) = self.mtu {
            let mtu = mtu.as_int("mtu")?;
            if mtu > 0 {
                config = config.with_mtu(mtu);
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddBridgeRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    pub stp: Option<bool>,
}

impl AddBridgeRequest {
    pub fn into_config(self) -> Result<BridgeConfig> {
        let mut config =
            BridgeConfig::new(required(self.name, "name")?).with_interfaces(self.interfaces);
        if let Some(stp) = self.stp {
            config = config.with_stp(stp);
        }
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(rename = "type")]
    pub section: Option<String>,
    pub name: Option<String>,
}

impl DeleteRequest {
    pub fn target(self) -> Result<(ConstructKind, String)> {
        let kind = required(self.section, "type")?.parse::<ConstructKind>()?;
        Ok((kind, required(self.name, "name")?))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SetIpRequest {
    pub name: Option<String>,
    pub static_ip: Option<String>,
    pub gateway: Option<String>,
    pub dns: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl SetIpRequest {
    pub fn target(self) -> Result<(String, Option<ConstructKind>, StaticAddress)> {
        let name = required(self.name, "name")?;
        let mut address = StaticAddress::new(required(self.static_ip, "static_ip")?);
        if let Some(gateway) = non_blank(self.gateway) {
            address = address.with_gateway(gateway.trim());
        }
        if let Some(dns) = non_blank(self.dns) {
            address = address.with_dns(dns);
        }
        Ok((name, explicit_kind(self.kind)?, address))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SetMtuRequest {
    pub name: Option<String>,
    pub mtu: Option<Scalar>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl SetMtuRequest {
    pub fn target(self) -> Result<(String, Option<ConstructKind>, i64)> {
        let name = required(self.name, "name")?;
        let mtu = self
            .mtu
            .ok_or_else(|| InputError::MissingField("mtu".to_string()))?
            .as_int("mtu")?;
        Ok((name, explicit_kind(self.kind)?, mtu))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SetStateRequest {
    pub name: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl SetStateRequest {
    pub fn target(self) -> Result<(String, Option<ConstructKind>, LinkState)> {
        let name = required(self.name, "name")?;
        let state = match non_blank(self.state) {
            Some(state) => state.parse::<LinkState>()?,
            None => LinkState::default(),
        };
        Ok((name, explicit_kind(self.kind)?, state))
    }
}

/// Config of `try_config` and `apply_config`
#[derive(Debug, Default, Deserialize)]
pub struct TimeoutRequest {
    pub timeout: Option<Scalar>,
}

impl TimeoutRequest {
    /// Trial timeout in seconds, `default` when absent
    pub fn seconds(self, default: u64) -> Result<u64> {
        let Some(timeout) = self.timeout else {
            return Ok(default);
        };
        let value = timeout.as_int("timeout")?;
        u64::try_from(value)
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ValidationError::InvalidValue {
                    field: "timeout".to_string(),
                    value: value.to_string(),
                }
                .into()
            })
    }
}
