//! Live interface status

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::command::{CommandRunner, Invocation};

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+?):?\s").expect("Invalid interface header pattern"));
static FLAGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^>]*)>").expect("Invalid flags pattern"));
static MTU_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmtu[\s:]+(\d+)").expect("Invalid mtu pattern"));
static INET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^inet\s+(?:addr:)?(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})")
        .expect("Invalid inet pattern")
});
static MAC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:ether|HWaddr)\s+([0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5})")
        .expect("Invalid mac pattern")
});

/// Live state of one interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceStatus {
    pub up: bool,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

pub type StatusMap = IndexMap<String, InterfaceStatus>;

/// Reads live interface state through `ifconfig -a`
pub struct StatusProbe {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    timeout: Duration,
}

impl StatusProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            binary: binary.into(),
            timeout,
        }
    }

    /// Status of every interface; empty when the tool fails
    pub async fn probe(&self) -> StatusMap {
        let invocation = Invocation::new(self.binary.as_str(), ["-a"], self.timeout);
        let command = invocation.display();

        match self.runner.run(invocation).await {
            Ok(output) if output.success => {
                let status = Self::parse(&output.stdout);
                debug!("{} reported {} interfaces", command, status.len());
                status
            }
            Ok(output) => {
                warn!("Error getting interface status: {}", output.diagnostic(&command));
                StatusMap::new()
            }
            Err(e) => {
                warn!("Error getting interface status: {}", e);
                StatusMap::new()
            }
        }
    }

    /// Parse `ifconfig -a` output
    pub fn parse(output: &str) -> StatusMap {
        let mut interfaces = StatusMap::new();
        let mut current: Option<String> = None;

        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if !line.starts_with(char::is_whitespace) {
                let Some(caps) = HEADER_RE.captures(line) else {
                    current = None;
                    continue;
                };
                let name = caps[1].to_string();
                let flags: Vec<&str> = match FLAGS_RE.captures(line) {
                    Some(flags) => flags.get(1).map_or("", |m| m.as_str()).split(',').collect(),
                    None => line.split_whitespace().collect(),
                };

                interfaces.insert(
                    name.clone(),
                    InterfaceStatus {
                        up: flags.contains(&"UP"),
                        running: flags.contains(&"RUNNING"),
                        mtu: MTU_RE.captures(line).and_then(|c| c[1].parse().ok()),
                        ..Default::default()
                    },
                );
                current = Some(name);
                continue;
            }

            let Some(entry) = current.as_ref().and_then(|name| interfaces.get_mut(name)) else {
                continue;
            };
            let line = line.trim();

            if let Some(caps) = INET_RE.captures(line) {
                entry.ipv4 = Some(caps[1].to_string());
            } else if let Some(caps) = MAC_RE.captures(line) {
                entry.mac = Some(caps[1].to_lowercase());
            }
        }

        interfaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, MockCommandRunner};

    const IFCONFIG: &str = "\
bond0: flags=5187<UP,BROADCAST,RUNNING,MASTER,MULTICAST>  mtu 9000
        inet 10.0.10.2  netmask 255.255.255.0  broadcast 10.0.10.255
        ether 52:54:00:ab:cd:ef  txqueuelen 1000  (Ethernet)

eno4.1144: flags=4098<BROADCAST,MULTICAST>  mtu 1500
        ether 52:54:00:AA:BB:CC  txqueuelen 1000  (Ethernet)

lo: flags=73<UP,LOOPBACK,RUNNING>  mtu 65536
        inet 127.0.0.1  netmask 255.0.0.0
        loop  txqueuelen 1000  (Local Loopback)
";

    #[test]
    fn test_parse_ifconfig() {
        let status = StatusProbe::parse(IFCONFIG);

        assert_eq!(status.keys().collect::<Vec<_>>(), vec!["bond0", "eno4.1144", "lo"]);

        let bond = &status["bond0"];
        assert!(bond.up && bond.running);
        assert_eq!(bond.mtu, Some(9000));
        assert_eq!(bond.ipv4.as_deref(), Some("10.0.10.2"));
        assert_eq!(bond.mac.as_deref(), Some("52:54:00:ab:cd:ef"));

        let vlan = &status["eno4.1144"];
        assert!(!vlan.up && !vlan.running);
        assert!(vlan.ipv4.is_none());
        assert_eq!(vlan.mac.as_deref(), Some("52:54:00:aa:bb:cc"));

        assert_eq!(status["lo"].mtu, Some(65536));
        assert!(status["lo"].mac.is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let status = StatusProbe::parse("eth0: flags=4163<UP,BROADCAST,RUNNING,MULTICAST>  mtu 1500\n");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({"eth0": {"up": true, "running": true, "mtu": 1500}}));
    }

    #[tokio::test]
    async fn test_failing_probe_is_empty() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|inv| inv.program == "ifconfig" && inv.args == ["-a"])
            .returning(|_| {
                Ok(CommandOutput {
                    success: false,
                    exit_code: Some(127),
                    stderr: "ifconfig: command not found".to_string(),
                    ..Default::default()
                })
            });

        let probe = StatusProbe::new(Arc::new(mock), "ifconfig", Duration::from_secs(5));
        assert!(probe.probe().await.is_empty());
    }
}
