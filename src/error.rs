//! Error taxonomy for the workflow core.
//!
//! Remote failures live in [`crate::api::RemoteError`]. Everything here is
//! raised locally: schema validation, missing execution context, and
//! programming errors such as an unknown mode tag.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Per-field validation failures, keyed by field name.
///
/// Only the first failure for each field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = FieldError> + '_ {
        self.fields
            .iter()
            .map(|(field, message)| FieldError::new(field.clone(), message.clone()))
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Execution refused because required context is missing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("No OLT selected")]
    NoNodeSelected,

    #[error("OLT name must not be empty")]
    EmptyNodeName,

    #[error("Operator credentials are required for ticket operations")]
    MissingCredentials,

    #[error("Batch queue is empty")]
    EmptyBatch,

    #[error("No subject selected")]
    NoSubjectSelected,
}

/// Unknown or mismatched workflow mode. Not recoverable at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Unknown workflow mode '{mode}'")]
    UnknownMode { mode: String },

    #[error("Mode '{mode}' is not a {kind} workflow")]
    ModeKindMismatch { kind: String, mode: String },
}

/// Errors surfaced by the wizard controller to its caller
#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Required context is missing; the action was refused
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("Action '{action}' is not allowed while {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },

    #[error("Action '{action}' is not available in {mode} mode")]
    NotAvailable { action: &'static str, mode: String },

    #[error("Wizard is not open")]
    NotOpen,
}
