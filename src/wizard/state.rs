use serde::{Deserialize, Serialize};

use crate::discovery::ScanStatus;
use crate::error::ValidationErrors;
use crate::strategy::{FormValues, WorkflowMode};
use crate::types::{Device, OperationResult, Subject};

/// Wizard lifecycle phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Looking for a subject to populate the form
    Searching,
    /// Form visible and editable
    Editing,
    /// Backend call in flight
    Submitting,
    /// Dismissed, either by success or cancel
    #[default]
    Closed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Searching => "searching",
            Phase::Editing => "editing",
            Phase::Submitting => "submitting",
            Phase::Closed => "closed",
        }
    }
}

/// Everything a front end renders for one wizard run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    pub mode: Option<WorkflowMode>,
    pub phase: Phase,
    pub subject: Option<Subject>,
    pub values: FormValues,
    pub errors: ValidationErrors,

    pub search_term: String,
    /// Latest applied results, in backend order
    pub results: Vec<Subject>,
    pub searching: bool,

    /// Selected OLT (configuration runs only)
    pub node: Option<String>,
    pub scan_status: ScanStatus,
    pub devices: Vec<Device>,

    /// Backend response of the successful submit
    pub last_result: Option<OperationResult>,
}

impl WizardState {
    /// Fresh state for a new run
    pub(super) fn initial(mode: WorkflowMode, phase: Phase, values: FormValues, node: Option<String>) -> Self {
        Self {
            mode: Some(mode),
            phase,
            values,
            node,
            ..Default::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase != Phase::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::TicketMode;

    #[test]
    fn test_default_is_closed() {
        let state = WizardState::default();
        assert_eq!(state.phase, Phase::Closed);
        assert!(!state.is_open());
        assert!(state.mode.is_none());
    }

    #[test]
    fn test_initial_state() {
        let state = WizardState::initial(
            WorkflowMode::Ticket(TicketMode::Create),
            Phase::Searching,
            FormValues::new().with("priority", "LOW"),
            None,
        );
        assert!(state.is_open());
        assert_eq!(state.values.text("priority"), "LOW");
        assert!(state.results.is_empty());
        assert_eq!(state.scan_status, ScanStatus::Idle);
    }
}
