//! Response contract

use serde::Serialize;

use netplan_apply::{ApplyReport, StatusMap, TrialOutcome};
use netplan_core::{NetplanFile, NetworkError};
use netplan_validate::Remediation;

/// Outcome of one request. Failures are responses too, never panics or
/// process errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<NetplanFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMap>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remediations: Vec<Remediation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error kind, e.g. `ValidationError`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn from_error(err: &NetworkError) -> Self {
        let (stdout, stderr) = match err.tool_output() {
            Some((stdout, stderr)) => (Some(stdout.to_string()), Some(stderr.to_string())),
            None => (None, None),
        };

        Self {
            success: false,
            error: Some(err.to_string()),
            kind: Some(err.kind().to_string()),
            hint: err.hint().map(str::to_string),
            stdout,
            stderr,
            ..Default::default()
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_config(mut self, config: NetplanFile) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_status(mut self, status: StatusMap) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_warnings<I, W>(mut self, warnings: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: ToString,
    {
        self.warnings
            .extend(warnings.into_iter().map(|w| w.to_string()));
        self
    }

    /// Fold a committed reconciliation into the response
    pub fn with_report(mut self, report: ApplyReport) -> Self {
        self = self.with_warnings(report.warnings.iter());
        self.remediations.extend(report.remediations);
        self
    }

    /// Result string of `try_config`
    pub fn trial_result(trial: Option<TrialOutcome>) -> &'static str {
        match trial {
            Some(TrialOutcome::SkippedForBondOrBridge) => "skipped_try",
            _ => "success",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"error":"Failed to encode response: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netplan_core::{ApplyTrialError, InputError};
    use serde_json::Value;

    #[test]
    fn test_success_shape() {
        let json: Value = serde_json::from_str(&Response::ok().with_result("apply_success").to_json()).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "result": "apply_success"}));
    }

    #[test]
    fn test_trial_error_shape() {
        let err: NetworkError = ApplyTrialError {
            message: "duplicate address".to_string(),
            hint: Some("Check for duplicate IP addresses, interface names, or routes.".to_string()),
            stdout: String::new(),
            stderr: "duplicate address".to_string(),
        }
        .into();
        let response = Response::from_error(&err);

        assert!(!response.success);
        assert_eq!(response.kind.as_deref(), Some("ApplyTrialError"));
        assert_eq!(response.error.as_deref(), Some("Configuration test failed: duplicate address"));
        assert!(response.hint.is_some());
        assert_eq!(response.stderr.as_deref(), Some("duplicate address"));
    }

    #[test]
    fn test_input_error_has_no_tool_output() {
        let err: NetworkError = InputError::UnknownAction("x".to_string()).into();
        let response = Response::from_error(&err);
        let json: Value = serde_json::from_str(&response.to_json()).unwrap();

        assert_eq!(json["kind"], "InputError");
        assert!(json.get("stdout").is_none());
        assert!(json.get("hint").is_none());
    }
}
