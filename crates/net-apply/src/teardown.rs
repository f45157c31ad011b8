//! Best-effort removal of live links

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use netplan_core::kind::vlan_name_variants;
use netplan_core::ConstructKind;

use crate::command::{CommandRunner, Invocation};
use crate::report::Warning;

/// Deletes the kernel link of a removed construct.
///
/// Never fails: the following apply reconciles the live state anyway, so
/// failures are handed back as warnings.
pub struct LinkTeardown {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    timeout: Duration,
}

impl LinkTeardown {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            binary: binary.into(),
            timeout,
        }
    }

    /// Names tried for a construct, in order
    pub fn candidates(kind: ConstructKind, name: &str) -> Vec<String> {
        match kind {
            ConstructKind::Ethernet => Vec::new(),
            ConstructKind::Vlan => vlan_name_variants(name),
            ConstructKind::Bond | ConstructKind::Bridge => vec![name.to_string()],
        }
    }

    /// `ip link delete` each candidate until one succeeds.
    ///
    /// Failed attempts become warnings only when no candidate succeeded.
    pub async fn teardown(&self, kind: ConstructKind, name: &str) -> Vec<Warning> {
        let candidates = Self::candidates(kind, name);
        if candidates.is_empty() {
            debug!("{} is physical, leaving removal to netplan apply", name);
            return Vec::new();
        }

        let mut failures = Vec::new();
        for candidate in candidates {
            let invocation = Invocation::new(
                self.binary.as_str(),
                ["link", "delete", candidate.as_str()],
                self.timeout,
            );
            let command = invocation.display();

            match self.runner.run(invocation).await {
                Ok(output) if output.success => {
                    info!("Deleted link {}", candidate);
                    return Vec::new();
                }
                Ok(output) => failures.push(Warning::new(command.clone(), output.diagnostic(&command))),
                Err(e) => failures.push(Warning::new(command, e.to_string())),
            }
        }

        for failure in &failures {
            warn!("Link teardown failed: {}", failure);
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, MockCommandRunner};
    use netplan_core::ApplyError;

    fn teardown(mock: MockCommandRunner) -> LinkTeardown {
        LinkTeardown::new(Arc::new(mock), "ip", Duration::from_secs(5))
    }

    fn failed(stderr: &str) -> CommandOutput {
        CommandOutput {
            success: false,
            exit_code: Some(1),
            stderr: stderr.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_candidates() {
        assert!(LinkTeardown::candidates(ConstructKind::Ethernet, "eth0").is_empty());
        assert_eq!(LinkTeardown::candidates(ConstructKind::Bond, "bond0"), vec!["bond0"]);
        assert_eq!(
            LinkTeardown::candidates(ConstructKind::Vlan, "eno4.1144@eno4"),
            vec!["eno4.1144@eno4", "eno4.1144"]
        );
        assert_eq!(
            LinkTeardown::candidates(ConstructKind::Vlan, "eth0.10"),
            vec!["eth0.10", "eth0.10@eth0"]
        );
    }

    #[tokio::test]
    async fn test_first_success_stops() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|inv| inv.args == ["link", "delete", "eth0.10"])
            .times(1)
            .returning(|_| {
                Ok(CommandOutput {
                    success: true,
                    exit_code: Some(0),
                    ..Default::default()
                })
            });

        assert!(teardown(mock).teardown(ConstructKind::Vlan, "eth0.10").await.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_spelling_success_has_no_warnings() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|inv| inv.args[2] == "eno4.1144@eno4")
            .returning(|_| Ok(failed("Cannot find device \"eno4.1144@eno4\"")));
        mock.expect_run()
            .withf(|inv| inv.args[2] == "eno4.1144")
            .returning(|_| {
                Ok(CommandOutput {
                    success: true,
                    ..Default::default()
                })
            });

        let warnings = teardown(mock).teardown(ConstructKind::Vlan, "eno4.1144@eno4").await;
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_all_failures_become_warnings() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|inv| inv.args[2] == "eth0.10")
            .returning(|_| Ok(failed("Cannot find device \"eth0.10\"")));
        mock.expect_run()
            .withf(|inv| inv.args[2] == "eth0.10@eth0")
            .returning(|inv| {
                Err(ApplyError::Spawn {
                    command: inv.display(),
                    message: "No such file or directory".to_string(),
                }
                .into())
            });

        let warnings = teardown(mock).teardown(ConstructKind::Vlan, "eth0.10").await;

        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].source, "ip link delete eth0.10");
        assert!(warnings[0].message.contains("Cannot find device"));
        assert!(warnings[1].message.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn test_ethernet_runs_nothing() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run().never();

        assert!(teardown(mock).teardown(ConstructKind::Ethernet, "eth0").await.is_empty());
    }
}
