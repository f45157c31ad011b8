//! Validate command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use netplan_api::Engine;

use super::Outcome;

/// Dry conflict check, nothing is written
pub struct ValidateCommand {
    engine: Arc<Engine>,
}

impl ValidateCommand {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Check `file`, or the managed document when absent.
    ///
    /// Succeeds when remediation would leave no conflict.
    pub async fn execute(&self, file: Option<&Path>) -> Result<Outcome> {
        let report = self
            .engine
            .preview(file)
            .await
            .context("Failed to load network configuration")?;

        info!(
            "{} conflicts, {} remediations, {} remaining",
            report.conflicts.len(),
            report.remediations.len(),
            report.remaining.len()
        );

        let output =
            serde_json::to_string_pretty(&report).context("Failed to encode validation report")?;
        Ok(Outcome::new(output, report.is_consistent()))
    }
}
