//! Remediation hints for rejected trials
//!
//! The tool's wording is not a stable contract, so classification sits
//! behind [`DiagnosticClassifier`] and the default table can be replaced.

/// Hint attached to a trial that overran its time budget
pub const TIMEOUT_HINT: &str = "Check for syntax errors, missing fields, or network conflicts.";

/// Marker printed when a trial cannot represent the requested topology
pub const REVERT_MARKER: &str = "reverting custom parameters";

/// Maps tool diagnostics to remediation hints
pub trait DiagnosticClassifier: Send + Sync {
    /// Hint for a failed trial. `stderr` is consulted first, `fallback`
    /// (the error text) when stderr is blank.
    fn classify(&self, stderr: &str, fallback: &str) -> Option<String>;

    /// Whether the trial output asks for a direct apply instead of failing
    fn requests_direct_apply(&self, stdout: &str, stderr: &str) -> bool {
        stdout.contains(REVERT_MARKER) || stderr.contains(REVERT_MARKER)
    }
}

/// One row of a [`HintTable`]; any pattern matching selects the hint
#[derive(Debug, Clone)]
pub struct HintRule {
    pub patterns: Vec<String>,
    pub hint: String,
}

impl HintRule {
    pub fn new(patterns: &[&str], hint: &str) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            hint: hint.to_string(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| text.contains(p.as_str()))
    }
}

/// Ordered substring table, first match wins
#[derive(Debug, Clone)]
pub struct HintTable {
    rules: Vec<HintRule>,
}

impl HintTable {
    pub fn new(rules: Vec<HintRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[HintRule] {
        &self.rules
    }
}

impl Default for HintTable {
    fn default() -> Self {
        Self::new(vec![
            HintRule::new(
                &["YAML", "yaml"],
                "Check your netplan YAML syntax for errors (indentation, colons, etc.).",
            ),
            HintRule::new(
                &["duplicate"],
                "Check for duplicate IP addresses, interface names, or routes.",
            ),
            HintRule::new(
                &["missing"],
                "A required field may be missing in your netplan configuration.",
            ),
            HintRule::new(
                &["Invalid", "invalid"],
                "Check for invalid values in your netplan file (e.g., wrong IP format, device name, etc.).",
            ),
            HintRule::new(
                &["not found"],
                "A referenced device or key was not found. Check interface names and keys.",
            ),
            HintRule::new(
                &["Address already in use"],
                "The IP address you are trying to assign is already in use.",
            ),
            HintRule::new(
                &["Permission denied"],
                "You may not have permission to apply netplan. Try running as root.",
            ),
        ])
    }
}

impl DiagnosticClassifier for HintTable {
    fn classify(&self, stderr: &str, fallback: &str) -> Option<String> {
        let text = if stderr.trim().is_empty() { fallback } else { stderr };
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| rule.hint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let table = HintTable::default();
        // "invalid" and "duplicate" both present; duplicate is earlier
        let hint = table.classify("invalid config: duplicate route", "").unwrap();
        assert!(hint.starts_with("Check for duplicate"));

        let hint = table.classify("Error in network definition: yaml parse error", "").unwrap();
        assert!(hint.contains("YAML syntax"));
    }

    #[test]
    fn test_fallback_used_for_blank_stderr() {
        let table = HintTable::default();
        assert_eq!(
            table.classify("  \n", "device eth9 not found").as_deref(),
            Some("A referenced device or key was not found. Check interface names and keys.")
        );
        assert!(table.classify("", "exit code 1").is_none());
    }

    #[test]
    fn test_address_in_use_and_permission() {
        let table = HintTable::default();
        assert!(table
            .classify("RTNETLINK answers: Address already in use", "")
            .unwrap()
            .contains("already in use"));
        assert!(table
            .classify("open /etc/netplan: Permission denied", "")
            .unwrap()
            .contains("running as root"));
    }

    #[test]
    fn test_revert_marker_on_either_stream() {
        let table = HintTable::default();
        assert!(table.requests_direct_apply("reverting custom parameters for bridges", ""));
        assert!(table.requests_direct_apply("", "reverting custom parameters"));
        assert!(!table.requests_direct_apply("Reverting.", ""));
    }

    #[test]
    fn test_custom_table() {
        let table = HintTable::new(vec![HintRule::new(&["E42"], "Upgrade the tool.")]);
        assert_eq!(table.classify("E42 happened", "").as_deref(), Some("Upgrade the tool."));
        assert!(table.classify("duplicate", "").is_none());
        assert_eq!(table.rules().len(), 1);
    }
}
