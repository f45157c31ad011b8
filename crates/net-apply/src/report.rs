//! Reconciliation states and reports

use std::fmt;

use serde::Serialize;

use netplan_validate::Remediation;

/// States of one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyState {
    Idle,
    BackedUp,
    Written,
    Tested,
    Applied,
    Committed,
    RolledBack,
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplyState::Idle => "idle",
            ApplyState::BackedUp => "backed up",
            ApplyState::Written => "written",
            ApplyState::Tested => "tested",
            ApplyState::Applied => "applied",
            ApplyState::Committed => "committed",
            ApplyState::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// How the trial phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    /// `try` accepted the configuration, then `apply` confirmed it
    Tested,
    /// Bonds or bridges present; `try` cannot test them
    SkippedForBondOrBridge,
    /// `try` reverted to custom parameters; applied directly
    DirectApplyAfterRevert,
}

/// Best-effort failure that did not change the outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub source: String,
    pub message: String,
}

impl Warning {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// Result of a committed reconciliation
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub state: ApplyState,
    /// Every state entered, in order
    pub states: Vec<ApplyState>,
    pub trial: Option<TrialOutcome>,
    pub remediations: Vec<Remediation>,
    pub warnings: Vec<Warning>,
    pub duration_ms: u64,
}

impl ApplyReport {
    pub fn visited(&self, state: ApplyState) -> bool {
        self.states.contains(&state)
    }
}
