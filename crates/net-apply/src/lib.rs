//! Netplan Apply
//!
//! Command gateway for the netplan tool, transactional reconciliation with
//! rollback, best-effort link teardown and the live status probe.

pub mod command;
pub mod hints;
pub mod report;
pub mod rollback;
pub mod status;
pub mod teardown;
pub mod transaction;


pub use command::{CommandOutput, CommandRunner, Invocation, NetplanCli, SystemCommandRunner, TrialVerdict};
pub use hints::{DiagnosticClassifier, HintRule, HintTable};
pub use report::{ApplyReport, ApplyState, TrialOutcome, Warning};
pub use rollback::{BackupFile, Checkpoint};
pub use status::{InterfaceStatus, StatusMap, StatusProbe};
pub use teardown::LinkTeardown;
pub use transaction::{ApplyOrchestrator, Transaction, TRIAL_SKIPPED_WARNING};
