//! Show command

use std::sync::Arc;

use anyhow::{Context, Result};
use netplan_api::Engine;

use super::Outcome;

/// Print the managed document as YAML
pub struct ShowCommand {
    engine: Arc<Engine>,
}

impl ShowCommand {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub async fn execute(&self) -> Result<Outcome> {
        let yaml = self
            .engine
            .show()
            .await
            .context("Failed to load network configuration")?;
        Ok(Outcome::new(yaml, true))
    }
}
