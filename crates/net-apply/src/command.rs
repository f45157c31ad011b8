//! Command gateway for the external network tools

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::process::Command;
use tokio::time::timeout;

use netplan_core::{ApplyError, ApplyTrialError, Result};

use crate::hints::{DiagnosticClassifier, HintTable, TIMEOUT_HINT};

/// One external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Upper bound for the whole run
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Command line as shown in logs and errors
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Diagnostic text of a failed run: stderr, or a generic message
    pub fn diagnostic(&self, command: &str) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("{} exited with code {:?}", command, self.exit_code)
        } else {
            stderr.to_string()
        }
    }
}

/// Runs external commands.
///
/// A non-zero exit is reported through [`CommandOutput::success`]; only
/// spawn failures and timeouts are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: Invocation) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, invocation: Invocation) -> Result<CommandOutput> {
        let command = invocation.display();
        let start_time = Instant::now();

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Executing {}", command);

        let result = timeout(invocation.timeout, cmd.output()).await;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let success = output.status.success();
                let exit_code = output.status.code();

                if success {
                    debug!("{} completed successfully in {}ms", command, duration_ms);
                } else {
                    warn!("{} failed with exit code {:?}: {}", command, exit_code, stderr.trim());
                }

                Ok(CommandOutput {
                    success,
                    exit_code,
                    stdout,
                    stderr,
                    duration_ms,
                })
            }
            Ok(Err(e)) => {
                error!("{} failed to execute: {}", command, e);
                Err(ApplyError::Spawn {
                    command,
                    message: e.to_string(),
                }
                .into())
            }
            Err(_) => {
                error!("{} timed out after {:?}", command, invocation.timeout);
                Err(ApplyError::Timeout {
                    command,
                    seconds: invocation.timeout.as_secs(),
                }
                .into())
            }
        }
    }
}

/// Verdict of a successful `netplan try`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialVerdict {
    /// The trial ran and was accepted
    Accepted,
    /// The tool reverted to custom parameters; a direct apply is needed
    Reverted,
}

/// The three verbs of the declarative network tool
#[derive(Clone)]
pub struct NetplanCli {
    runner: Arc<dyn CommandRunner>,
    classifier: Arc<dyn DiagnosticClassifier>,
    binary: String,
    command_timeout: Duration,
}

impl NetplanCli {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>, command_timeout: Duration) -> Self {
        Self {
            runner,
            classifier: Arc::new(HintTable::default()),
            binary: binary.into(),
            command_timeout,
        }
    }

    /// Swap the diagnostic classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn DiagnosticClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// `netplan generate`
    pub async fn generate(&self) -> Result<CommandOutput> {
        info!("Generating backend configuration");
        self.checked(&["generate"]).await
    }

    /// `netplan apply`
    pub async fn apply(&self) -> Result<CommandOutput> {
        info!("Applying configuration");
        self.checked(&["apply"]).await
    }

    /// `netplan try --timeout <secs>`.
    ///
    /// A rejected trial becomes an [`ApplyTrialError`] carrying the hint
    /// derived from its diagnostic, unless the tool reports it reverted to
    /// custom parameters.
    pub async fn try_config(&self, trial_timeout_secs: u64) -> Result<TrialVerdict> {
        info!("Testing configuration with {}s timeout", trial_timeout_secs);

        let timeout_arg = trial_timeout_secs.to_string();
        let invocation = Invocation::new(
            self.binary.as_str(),
            ["try", "--timeout", timeout_arg.as_str()],
            Duration::from_secs(trial_timeout_secs) + self.command_timeout,
        );
        let command = invocation.display();

        let output = match self.runner.run(invocation).await {
            Ok(output) => output,
            Err(netplan_core::NetworkError::Apply(ApplyError::Timeout { seconds, .. })) => {
                return Err(ApplyTrialError {
                    message: format!("{} did not finish within {}s", command, seconds),
                    hint: Some(TIMEOUT_HINT.to_string()),
                    stdout: String::new(),
                    stderr: String::new(),
                }
                .into());
            }
            Err(e) => return Err(e),
        };

        if output.success {
            debug!("{} succeeded", command);
            return Ok(TrialVerdict::Accepted);
        }

        if self.classifier.requests_direct_apply(&output.stdout, &output.stderr) {
            info!("Trial reverted to custom parameters, configuration requires direct apply");
            return Ok(TrialVerdict::Reverted);
        }

        let message = output.diagnostic(&command);
        let hint = self.classifier.classify(&output.stderr, &message);
        warn!("Configuration test failed: {}", message);

        Err(ApplyTrialError {
            message,
            hint,
            stdout: output.stdout,
            stderr: output.stderr,
        }
        .into())
    }

    async fn checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let invocation = Invocation::new(self.binary.as_str(), args.iter().copied(), self.command_timeout);
        let command = invocation.display();
        let output = self.runner.run(invocation).await?;

        if !output.success {
            return Err(ApplyError::CommandFailed {
                command,
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            }
            .into());
        }
        Ok(output)
    }
}
