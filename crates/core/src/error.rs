//! Domain error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the pure layers.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic failures of externally supplied input.
/// Ownership, lifecycle state and storage failures belong to the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// One or more values failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Single-issue validation failure.
    pub fn validation(
        message: impl Into<String>,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Validation(ValidationErrors::new(message).with_issue(field, detail))
    }
}

/// One offending field of a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub detail: String,
}

/// Aggregate validation error: a headline plus every offending field.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("{message}: {}", render_issues(.issues))]
pub struct ValidationErrors {
    pub message: String,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            issues: Vec::new(),
        }
    }

    pub fn with_issue(mut self, field: impl Into<String>, detail: impl Into<String>) -> Self {
        self.push(field, detail);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, detail: impl Into<String>) {
        self.issues.push(ValidationIssue {
            field: field.into(),
            detail: detail.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| {
            if i.detail.is_empty() {
                i.field.clone()
            } else {
                format!("{} ({})", i.field, i.detail)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
