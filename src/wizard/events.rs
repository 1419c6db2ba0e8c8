use crate::api::RemoteError;
use crate::discovery::DiscoveryError;
use crate::error::{PreconditionError, ValidationErrors};
use crate::queue::EnrichmentOutcome;
use crate::strategy::WorkflowKind;
use crate::types::{Device, ExistingRecord, OperationResult, Subject};

/// How a wizard run is opened
#[derive(Debug, Clone)]
pub struct WizardLaunch {
    pub kind: WorkflowKind,
    /// Mode tag within `kind`, e.g. `create` or `batch`
    pub mode: String,
    /// Record pre-populating edit-only modes (open, forward, close, bridge)
    pub record: Option<ExistingRecord>,
    /// Initially selected OLT for configuration runs
    pub node: Option<String>,
}

impl WizardLaunch {
    pub fn new(kind: WorkflowKind, mode: impl Into<String>) -> Self {
        Self {
            kind,
            mode: mode.into(),
            record: None,
            node: None,
        }
    }

    pub fn ticket(mode: impl Into<String>) -> Self {
        Self::new(WorkflowKind::Ticket, mode)
    }

    pub fn configuration(mode: impl Into<String>) -> Self {
        Self::new(WorkflowKind::Configuration, mode)
    }

    pub fn with_record(mut self, record: ExistingRecord) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}

/// Something the controller must apply. Produced by
/// [`super::WizardController::next_event`].
#[derive(Debug)]
pub enum WizardEvent {
    /// Debounce interval elapsed; the current term should be issued
    SearchDue,

    SearchCompleted {
        generation: u64,
        seq: u64,
        term: String,
        result: Result<Vec<Subject>, RemoteError>,
    },

    ScanCompleted {
        generation: u64,
        seq: u64,
        node: String,
        result: Result<Vec<Device>, DiscoveryError>,
    },

    SubmitCompleted {
        generation: u64,
        result: Result<OperationResult, RemoteError>,
    },

    /// A queued device's customer lookup finished
    Enrichment(EnrichmentOutcome),
}

/// Immediate result of [`super::WizardController::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation passed and the backend call is in flight
    Dispatched,
    /// Schema validation failed; errors are attached to the state
    Invalid(ValidationErrors),
    /// Required context is missing; nothing was sent
    Refused(PreconditionError),
}
