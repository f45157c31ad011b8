//! Error types for network operations

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for network operations
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict error: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration test failed: {0}")]
    ApplyTrial(#[from] ApplyTrialError),

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

impl NetworkError {
    /// Stable name of the error kind, as reported to callers
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkError::Validation(_) => "ValidationError",
            NetworkError::Conflict(_) => "ConflictError",
            NetworkError::Persistence(_) => "PersistenceError",
            NetworkError::ApplyTrial(_) => "ApplyTrialError",
            NetworkError::Apply(_) => "ApplyError",
            NetworkError::Input(_) => "InputError",
        }
    }

    /// Remediation hint attached to a failed trial, if any
    pub fn hint(&self) -> Option<&str> {
        match self {
            NetworkError::ApplyTrial(err) => err.hint.as_deref(),
            _ => None,
        }
    }

    /// Raw tool output carried by the error, as `(stdout, stderr)`
    pub fn tool_output(&self) -> Option<(&str, &str)> {
        match self {
            NetworkError::ApplyTrial(err) => Some((&err.stdout, &err.stderr)),
            NetworkError::Apply(ApplyError::CommandFailed { stdout, stderr, .. }) => {
                Some((stdout, stderr))
            }
            _ => None,
        }
    }
}

/// Name, range and shape violations in constructs
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid interface name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{construct} requires at least {required} interfaces, got {got}")]
    TooFewMembers {
        construct: String,
        required: usize,
        got: usize,
    },

    #[error("Interface {member} listed more than once in {construct}")]
    DuplicateMember { construct: String, member: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unsupported bond mode: {0}")]
    UnknownBondMode(String),

    #[error("Invalid network document: {message}")]
    Schema { message: String },
}

/// Interfaces reused across constructs in conflicting roles
#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("Invalid network configuration: {}", conflicts.join("; "))]
    Unresolved { conflicts: Vec<String> },

    #[error("Cannot add {construct}: interfaces already in use: {}", interfaces.join(", "))]
    InterfacesInUse {
        construct: String,
        interfaces: Vec<String>,
    },
}

/// Storage failures of the configuration document
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize network document: {0}")]
    Serialize(String),

    #[error("Backup {path:?} failed integrity check")]
    Checksum { path: PathBuf },

    #[error("Reconcile lock {path:?} is held by another process")]
    Locked { path: PathBuf },
}

/// The external apply tool rejected the trial
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApplyTrialError {
    /// Raw diagnostic of the tool
    pub message: String,
    /// Best-effort remediation hint derived from the diagnostic
    pub hint: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

/// Failures of the generate / direct-apply steps
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{command} failed with exit code {exit_code:?}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to execute {command}: {message}")]
    Spawn { command: String, message: String },

    #[error("{command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },
}

/// Malformed or missing request fields
#[derive(Debug, Error)]
pub enum InputError {
    #[error("No input provided")]
    Empty,

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Section '{0}' not found in network configuration")]
    UnknownSection(String),

    #[error("Interface '{name}' not found in '{section}' section")]
    NotFound { section: String, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let err: NetworkError = InputError::UnknownAction("frobnicate".to_string()).into();
        assert_eq!(err.kind(), "InputError");
        assert_eq!(err.to_string(), "Input error: Unknown action: frobnicate");

        let err: NetworkError = ConflictError::Unresolved {
            conflicts: vec!["a".to_string(), "b".to_string()],
        }
        .into();
        assert_eq!(err.kind(), "ConflictError");
        assert!(err.to_string().ends_with("a; b"));
    }

    #[test]
    fn test_trial_error_exposes_hint_and_output() {
        let err: NetworkError = ApplyTrialError {
            message: "duplicate address".to_string(),
            hint: Some("fix it".to_string()),
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        }
        .into();

        assert_eq!(err.hint(), Some("fix it"));
        assert_eq!(err.tool_output(), Some(("out", "err")));
    }
}
