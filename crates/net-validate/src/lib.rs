//! Netplan Validation
//!
//! Interface usage validation, automatic remediation of VLANs mounted on
//! bond members, and structural checks of whole documents.

pub mod remediate;
pub mod syntax;
pub mod usage;

pub use remediate::{AutoRemediator, Remediation};
pub use syntax::SyntaxValidator;
pub use usage::{ConflictKind, Usage, UsageConflict, UsageRole, UsageValidator};

use log::{info, warn};
use serde::Serialize;

use netplan_core::{ConflictError, NetworkDocument, NetworkError};

/// Outcome of a dry validation pass, nothing written
#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    /// Conflicts found in the document as given
    pub conflicts: Vec<String>,
    /// Rewrites remediation would perform
    pub remediations: Vec<Remediation>,
    /// Conflicts left after remediation
    pub remaining: Vec<String>,
}

impl ConflictReport {
    pub fn is_consistent(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Comprehensive netplan document validator
pub struct NetworkValidator {
    syntax_validator: SyntaxValidator,
}

impl NetworkValidator {
    /// Create new network validator
    pub fn new() -> Self {
        Self {
            syntax_validator: SyntaxValidator::new(),
        }
    }

    /// Structural checks of the whole document
    pub fn validate_document(&self, document: &NetworkDocument) -> Result<(), NetworkError> {
        self.syntax_validator.validate_document(document)
    }

    /// Usage conflicts as human-readable strings
    pub fn find_conflicts(&self, document: &NetworkDocument) -> Vec<String> {
        UsageValidator::validate(document)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Validate, remediate if needed, then re-validate.
    ///
    /// Fails with [`ConflictError::Unresolved`] when conflicts survive
    /// remediation; the document may have been partially rewritten then.
    pub fn reconcile_conflicts(
        &self,
        document: &mut NetworkDocument,
    ) -> Result<Vec<Remediation>, NetworkError> {
        let conflicts = self.find_conflicts(document);
        if conflicts.is_empty() {
            return Ok(Vec::new());
        }

        warn!("Interface usage conflicts found: {}", conflicts.join("; "));
        let remediations = AutoRemediator::remediate(document);

        let remaining = self.find_conflicts(document);
        if !remaining.is_empty() {
            return Err(ConflictError::Unresolved {
                conflicts: remaining,
            }
            .into());
        }

        info!(
            "Resolved {} conflict(s) with {} remediation(s)",
            conflicts.len(),
            remediations.len()
        );
        Ok(remediations)
    }

    /// Report what reconciliation would do without touching the document
    pub fn preview(&self, document: &NetworkDocument) -> ConflictReport {
        let conflicts = self.find_conflicts(document);
        if conflicts.is_empty() {
            return ConflictReport {
                conflicts,
                remediations: Vec::new(),
                remaining: Vec::new(),
            };
        }

        let mut scratch = document.clone();
        let remediations = AutoRemediator::remediate(&mut scratch);
        let remaining = self.find_conflicts(&scratch);

        ConflictReport {
            conflicts,
            remediations,
            remaining,
        }
    }
}

impl Default for NetworkValidator {
    fn default() -> Self {
        Self::new()
    }
}
