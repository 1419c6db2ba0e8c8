//! Mode strategies: which schema, defaults and backend call a wizard run uses.
//!
//! [`ModeStrategyRegistry::resolve`] is a pure function of
//! `(kind, mode, context)`. The resulting [`Strategy`] validates form values
//! and turns them into exactly one [`PreparedCall`], refusing to build a call
//! when the context lacks something the backend needs.

pub mod configuration;
mod schema;
pub mod ticket;

pub use schema::{FieldKind, FieldRule, FieldValue, FormSchema, FormValues, Refinement};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::{Collaborators, ConfigurationPayload, RemoteError, TicketPayload};
use crate::error::{ConfigurationError, PreconditionError, ValidationErrors};
use crate::queue::BatchQueueItem;
use crate::search::SearchScope;
use crate::types::{Credentials, ExistingRecord, OperationResult, Subject};

/// Family of workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Ticket,
    Configuration,
}

impl WorkflowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowKind::Ticket => "ticket",
            WorkflowKind::Configuration => "configuration",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ticket" | "tickets" => Ok(WorkflowKind::Ticket),
            "config" | "configuration" => Ok(WorkflowKind::Configuration),
            other => Err(ConfigurationError::UnknownMode {
                mode: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketMode {
    Create,
    Open,
    Forward,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationMode {
    Manual,
    Auto,
    Batch,
    Bridge,
}

/// The mode of one wizard run. Immutable for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "mode", rename_all = "snake_case")]
pub enum WorkflowMode {
    Ticket(TicketMode),
    Configuration(ConfigurationMode),
}

impl WorkflowMode {
    pub const ALL: [WorkflowMode; 8] = [
        WorkflowMode::Ticket(TicketMode::Create),
        WorkflowMode::Ticket(TicketMode::Open),
        WorkflowMode::Ticket(TicketMode::Forward),
        WorkflowMode::Ticket(TicketMode::Close),
        WorkflowMode::Configuration(ConfigurationMode::Manual),
        WorkflowMode::Configuration(ConfigurationMode::Auto),
        WorkflowMode::Configuration(ConfigurationMode::Batch),
        WorkflowMode::Configuration(ConfigurationMode::Bridge),
    ];

    /// Parse a mode tag under `kind`
    pub fn parse(kind: WorkflowKind, tag: &str) -> Result<Self, ConfigurationError> {
        let normalized = tag.trim().to_ascii_lowercase();
        let mode = Self::ALL
            .into_iter()
            .find(|m| m.tag() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownMode {
                mode: tag.to_string(),
            })?;
        if mode.kind() != kind {
            return Err(ConfigurationError::ModeKindMismatch {
                kind: kind.to_string(),
                mode: tag.to_string(),
            });
        }
        Ok(mode)
    }

    pub fn kind(self) -> WorkflowKind {
        match self {
            WorkflowMode::Ticket(_) => WorkflowKind::Ticket,
            WorkflowMode::Configuration(_) => WorkflowKind::Configuration,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            WorkflowMode::Ticket(TicketMode::Create) => "create",
            WorkflowMode::Ticket(TicketMode::Open) => "open",
            WorkflowMode::Ticket(TicketMode::Forward) => "forward",
            WorkflowMode::Ticket(TicketMode::Close) => "close",
            WorkflowMode::Configuration(ConfigurationMode::Manual) => "manual",
            WorkflowMode::Configuration(ConfigurationMode::Auto) => "auto",
            WorkflowMode::Configuration(ConfigurationMode::Batch) => "batch",
            WorkflowMode::Configuration(ConfigurationMode::Bridge) => "bridge",
        }
    }

    /// Directory scope searched before editing, if the mode starts by
    /// finding a subject
    pub fn search_scope(self) -> Option<SearchScope> {
        match self {
            WorkflowMode::Ticket(TicketMode::Create)
            | WorkflowMode::Configuration(ConfigurationMode::Manual) => {
                Some(SearchScope::Customers)
            }
            WorkflowMode::Configuration(ConfigurationMode::Auto) => {
                Some(SearchScope::PendingRegistrations)
            }
            _ => None,
        }
    }

    /// Modes that edit an existing record instead of searching
    pub fn edits_existing_record(self) -> bool {
        matches!(
            self,
            WorkflowMode::Ticket(TicketMode::Open | TicketMode::Forward | TicketMode::Close)
                | WorkflowMode::Configuration(ConfigurationMode::Bridge)
        )
    }

    /// Audit action recorded for a submit
    pub fn audit_action(self) -> &'static str {
        match self {
            WorkflowMode::Ticket(TicketMode::Create) => "create",
            _ => "update",
        }
    }
}

impl fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.tag())
    }
}

/// Visual weight of the submit action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Default,
    Destructive,
}

/// Explicit execution context. Nothing is read from ambient state.
#[derive(Debug, Clone, Default)]
pub struct StrategyContext {
    /// Acting user, required for ticket operations
    pub credentials: Option<Credentials>,
    /// Selected OLT, required for configuration runs
    pub node: Option<String>,
    /// Batch queue snapshot, required for batch runs
    pub batch: Vec<BatchQueueItem>,
}

impl StrategyContext {
    fn node(&self) -> Option<&str> {
        self.node.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// A fully built backend call, ready to dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedCall {
    Ticket {
        payload: TicketPayload,
        credentials: Credentials,
    },
    Configuration {
        node: String,
        payload: ConfigurationPayload,
    },
}

impl PreparedCall {
    /// Audit target
    pub fn target(&self) -> &'static str {
        match self {
            PreparedCall::Ticket { .. } => "ticket",
            PreparedCall::Configuration { .. } => "configuration",
        }
    }

    /// Request body as JSON, without credentials
    pub fn details(&self) -> Value {
        match self {
            PreparedCall::Ticket { payload, .. } => {
                serde_json::to_value(payload).unwrap_or(Value::Null)
            }
            PreparedCall::Configuration { node, payload } => serde_json::json!({
                "olt_name": node,
                "request": payload,
            }),
        }
    }

    pub async fn execute(&self, collaborators: &Collaborators) -> Result<OperationResult, RemoteError> {
        match self {
            PreparedCall::Ticket {
                payload,
                credentials,
            } => {
                collaborators
                    .tickets
                    .execute_ticket_operation(payload, credentials)
                    .await
            }
            PreparedCall::Configuration { node, payload } => {
                collaborators
                    .configuration
                    .execute_configuration(node, payload)
                    .await
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("{0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Resolved behaviour for one mode
#[derive(Debug, Clone)]
pub struct Strategy {
    mode: WorkflowMode,
    title: &'static str,
    submit_label: &'static str,
    severity: Severity,
    schema: FormSchema,
    defaults: FormValues,
}

impl Strategy {
    fn build(mode: WorkflowMode, context: &StrategyContext) -> Self {
        let ((title, submit_label, severity), schema) = match mode {
            WorkflowMode::Ticket(m) => (ticket::metadata(m), ticket::schema(m)),
            WorkflowMode::Configuration(m) => (configuration::metadata(m), configuration::schema(m)),
        };

        let mut defaults = schema.defaults();
        if let (WorkflowKind::Configuration, Some(node)) = (mode.kind(), context.node()) {
            defaults.set("olt_name", node);
        }

        Self {
            mode,
            title,
            submit_label,
            severity,
            schema,
            defaults,
        }
    }

    pub fn mode(&self) -> WorkflowMode {
        self.mode
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn submit_label(&self) -> &'static str {
        self.submit_label
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn defaults(&self) -> FormValues {
        self.defaults.clone()
    }

    pub fn search_scope(&self) -> Option<SearchScope> {
        self.mode.search_scope()
    }

    /// Defaults overlaid with the subject's mapped attributes
    pub fn values_for_subject(&self, subject: &Subject) -> FormValues {
        let mut values = self.defaults();
        match self.mode {
            WorkflowMode::Ticket(m) => ticket::seed_from_subject(m, subject, &mut values),
            WorkflowMode::Configuration(m) => {
                configuration::seed_from_subject(m, subject, &mut values);
            }
        }
        values
    }

    /// Defaults overlaid with every schema field the record carries
    pub fn values_for_record(&self, record: &ExistingRecord) -> FormValues {
        let mut values = self.defaults();
        for field in self.schema.fields() {
            if field.name == "vlan_id" {
                if let Some(vlan) = record.vlan_id {
                    values.set(field.name, vlan);
                }
            } else if let Some(text) = record.text(field.name) {
                values.set(field.name, text);
            }
        }
        values
    }

    pub fn validate(&self, values: &FormValues) -> Result<(), ValidationErrors> {
        self.schema.validate(values)
    }

    /// Build the backend call for already-validated values
    pub fn prepare(
        &self,
        values: &FormValues,
        context: &StrategyContext,
    ) -> Result<PreparedCall, PreconditionError> {
        match self.mode {
            WorkflowMode::Ticket(m) => {
                let credentials = context
                    .credentials
                    .as_ref()
                    .filter(|c| c.is_complete())
                    .ok_or(PreconditionError::MissingCredentials)?;
                Ok(PreparedCall::Ticket {
                    payload: ticket::payload(m, values),
                    credentials: credentials.clone(),
                })
            }
            WorkflowMode::Configuration(m) => {
                let node = context.node().ok_or(PreconditionError::NoNodeSelected)?;
                Ok(PreparedCall::Configuration {
                    node: node.to_string(),
                    payload: configuration::payload(m, values, &context.batch)?,
                })
            }
        }
    }

    /// Validate, prepare and dispatch in one step
    pub async fn execute(
        &self,
        values: &FormValues,
        context: &StrategyContext,
        collaborators: &Collaborators,
    ) -> Result<OperationResult, ExecuteError> {
        self.validate(values).map_err(ExecuteError::Invalid)?;
        let call = self.prepare(values, context)?;
        Ok(call.execute(collaborators).await?)
    }
}

/// Closed registry over every supported mode
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeStrategyRegistry;

impl ModeStrategyRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a mode tag under `kind`. Unknown tags and tags belonging to the
    /// other kind are configuration errors.
    pub fn resolve(
        &self,
        kind: WorkflowKind,
        mode: &str,
        context: &StrategyContext,
    ) -> Result<Strategy, ConfigurationError> {
        let mode = WorkflowMode::parse(kind, mode)?;
        Ok(self.resolve_mode(mode, context))
    }

    pub fn resolve_mode(&self, mode: WorkflowMode, context: &StrategyContext) -> Strategy {
        Strategy::build(mode, context)
    }
}
