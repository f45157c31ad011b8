//! Status command

use std::sync::Arc;

use anyhow::{Context, Result};
use netplan_api::Engine;

use super::Outcome;

/// Print live interface status as JSON
pub struct StatusCommand {
    engine: Arc<Engine>,
}

impl StatusCommand {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub async fn execute(&self) -> Result<Outcome> {
        let status = self.engine.status().await;
        let output =
            serde_json::to_string_pretty(&status).context("Failed to encode interface status")?;
        Ok(Outcome::new(output, true))
    }
}
