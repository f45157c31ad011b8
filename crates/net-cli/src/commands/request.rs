//! Request command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::debug;
use netplan_api::Engine;
use tokio::io::AsyncReadExt;

use super::Outcome;

/// Handle one JSON request
pub struct RequestCommand {
    engine: Arc<Engine>,
}

impl RequestCommand {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Read the request from `file`, or stdin when absent
    pub async fn execute(&self, file: Option<&Path>) -> Result<Outcome> {
        let input = match file {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read request file: {}", path.display()))?,
            None => {
                let mut input = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut input)
                    .await
                    .context("Failed to read request from stdin")?;
                input
            }
        };
        debug!("Read {} bytes of request", input.len());

        Ok(self.respond(&input).await)
    }

    /// Answer raw request text
    pub async fn respond(&self, input: &str) -> Outcome {
        let response = self.engine.handle_json(input).await;
        Outcome::new(response.to_json(), response.success)
    }
}
