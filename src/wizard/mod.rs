//! Wizard controller: drives one ticket or configuration run.
//!
//! The controller is owned by a single task. Remote work (searches, scans,
//! submits and enrichment) runs on spawned tasks that each report back exactly
//! once. The owner loops on [`WizardController::next_event`] and applies every
//! event with [`WizardController::handle_event`]:
//!
//! ```ignore
//! while let Some(event) = wizard.next_event().await {
//!     wizard.handle_event(event);
//! }
//! ```
//!
//! Results from a closed run carry an older generation and are dropped.
//! Search and scan results additionally carry a sequence number so only the
//! most recently issued request is applied.

mod events;
mod state;


pub use events::{SubmitOutcome, WizardEvent, WizardLaunch};
pub use state::{Phase, WizardState};

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{Collaborators, RemoteError};
use crate::audit::{AuditEntry, AuditStatus};
use crate::discovery::{DeviceDiscovery, DiscoveryError, ScanStatus};
use crate::error::{PreconditionError, ValidationErrors, WizardError};
use crate::notifications::{NotificationEvent, NotificationService};
use crate::queue::{AddOutcome, BatchQueue};
use crate::search::{SearchService, SearchSettings};
use crate::strategy::{
    ConfigurationMode, FieldValue, ModeStrategyRegistry, Strategy, StrategyContext, WorkflowKind,
    WorkflowMode,
};
use crate::types::{Credentials, Device, OperationResult, Subject};

/// Called once for every successful submit
pub type CompletionCallback = Box<dyn FnMut(WorkflowMode, &OperationResult) + Send>;

pub struct WizardController {
    registry: ModeStrategyRegistry,
    collaborators: Collaborators,
    search: SearchService,
    discovery: DeviceDiscovery,
    notifications: NotificationService,
    credentials: Option<Credentials>,
    on_complete: Option<CompletionCallback>,

    strategy: Option<Strategy>,
    state: WizardState,
    queue: BatchQueue,

    generation: u64,
    search_seq: u64,
    scan_seq: u64,
    search_deadline: Option<Instant>,

    event_tx: mpsc::UnboundedSender<WizardEvent>,
    event_rx: mpsc::UnboundedReceiver<WizardEvent>,
    /// Spawned tasks that have not reported back yet
    outstanding: usize,
}

impl WizardController {
    pub fn new(
        collaborators: Collaborators,
        settings: SearchSettings,
        notifications: NotificationService,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            registry: ModeStrategyRegistry::new(),
            search: SearchService::new(collaborators.directory.clone(), settings),
            discovery: DeviceDiscovery::new(collaborators.scanner.clone()),
            queue: BatchQueue::new(collaborators.matcher.clone()),
            collaborators,
            notifications,
            credentials: None,
            on_complete: None,
            strategy: None,
            state: WizardState::default(),
            generation: 0,
            search_seq: 0,
            scan_seq: 0,
            search_deadline: None,
            event_tx,
            event_rx,
            outstanding: 0,
        }
    }

    /// Acting-user credentials passed to ticket operations
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn on_complete(
        mut self,
        callback: impl FnMut(WorkflowMode, &OperationResult) + Send + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn strategy(&self) -> Option<&Strategy> {
        self.strategy.as_ref()
    }

    pub fn queue(&self) -> &BatchQueue {
        &self.queue
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Start a new run. Always begins from a fully reset state; an unknown or
    /// mismatched mode leaves the controller closed.
    pub fn open(&mut self, launch: WizardLaunch) -> Result<(), WizardError> {
        self.reset();

        let WizardLaunch {
            kind,
            mode,
            record,
            node,
        } = launch;

        let node = match kind {
            WorkflowKind::Configuration => node
                .or_else(|| record.as_ref().and_then(|r| r.olt_name.clone()))
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            WorkflowKind::Ticket => None,
        };

        let context = StrategyContext {
            credentials: self.credentials.clone(),
            node: node.clone(),
            batch: Vec::new(),
        };
        let strategy = self.registry.resolve(kind, &mode, &context)?;
        let mode = strategy.mode();

        let (phase, mut values) = if mode.search_scope().is_some() {
            (Phase::Searching, strategy.defaults())
        } else if let Some(record) = record.as_ref().filter(|_| mode.edits_existing_record()) {
            (Phase::Editing, strategy.values_for_record(record))
        } else {
            (Phase::Editing, strategy.defaults())
        };
        if let Some(node) = &node {
            values.set("olt_name", node.as_str());
        }

        info!(mode = %mode, phase = phase.as_str(), "Wizard opened");
        self.state = WizardState::initial(mode, phase, values, node);
        self.strategy = Some(strategy);
        Ok(())
    }

    /// Dismiss the run. Late results from it are discarded.
    pub fn cancel(&mut self) -> Result<(), WizardError> {
        let mode = self.state.mode.ok_or(WizardError::NotOpen)?;
        if self.state.phase == Phase::Closed {
            return Ok(());
        }
        info!(mode = %mode, phase = self.state.phase.as_str(), "Wizard cancelled");
        self.close();
        Ok(())
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.search_deadline = None;
        self.queue = BatchQueue::new(self.collaborators.matcher.clone());
        self.strategy = None;
        self.state = WizardState::default();
    }

    fn close(&mut self) {
        self.generation += 1;
        self.search_deadline = None;
        self.queue.reset();
        self.state.phase = Phase::Closed;
        self.state.searching = false;
        if self.state.scan_status.is_scanning() {
            self.state.scan_status = ScanStatus::Idle;
        }
    }

    // ─── Subject search ──────────────────────────────────────────────────────

    /// Update the search term. A searchable term (re)starts the debounce
    /// interval; a short one clears the results and invalidates any search
    /// still in flight.
    pub fn set_search_term(&mut self, term: impl Into<String>) -> Result<(), WizardError> {
        self.ensure("search", &[Phase::Searching])?;
        let term = term.into();

        if self.search.is_searchable(&term) {
            self.search_deadline = Some(Instant::now() + self.search.settings().debounce);
        } else {
            self.search_deadline = None;
            self.search_seq += 1;
            self.state.results.clear();
            self.state.searching = false;
        }
        self.state.search_term = term;
        Ok(())
    }

    /// Select `subject` and switch to editing. Form values, phase and the
    /// cleared search fields are applied as one state replacement.
    pub fn select_subject(&mut self, subject: Subject) -> Result<(), WizardError> {
        let mode = self.ensure("select_subject", &[Phase::Searching])?;
        let strategy = self.strategy.as_ref().ok_or(WizardError::NotOpen)?;
        let values = strategy.values_for_subject(&subject);

        // A configuration run without a selected OLT adopts the subject's
        let adopted = (mode.kind() == WorkflowKind::Configuration && self.state.node.is_none())
            .then(|| values.text_opt("olt_name").map(str::to_string))
            .flatten();

        self.search_seq += 1;
        self.search_deadline = None;
        debug!(subject = %subject.id, "Subject selected");

        let previous = std::mem::take(&mut self.state);
        self.state = WizardState {
            phase: Phase::Editing,
            subject: Some(subject),
            values,
            errors: ValidationErrors::new(),
            search_term: String::new(),
            results: Vec::new(),
            searching: false,
            ..previous
        };
        if let Some(node) = adopted {
            info!(mode = %mode, node = %node, "Node taken from subject");
            self.state.node = Some(node);
            self.strategy = Some(self.registry.resolve_mode(mode, &self.context()));
        }
        Ok(())
    }

    /// Select the `index`-th entry of the current results
    pub fn select_result(&mut self, index: usize) -> Result<bool, WizardError> {
        self.ensure("select_subject", &[Phase::Searching])?;
        match self.state.results.get(index).cloned() {
            Some(subject) => self.select_subject(subject).map(|_| true),
            None => Ok(false),
        }
    }

    /// Go back to searching, dropping the subject and every edited value
    pub fn change_subject(&mut self) -> Result<(), WizardError> {
        let mode = self.ensure("change_subject", &[Phase::Editing])?;
        if mode.search_scope().is_none() {
            return Err(WizardError::NotAvailable {
                action: "change_subject",
                mode: mode.to_string(),
            });
        }
        let strategy = self.strategy.as_ref().ok_or(WizardError::NotOpen)?;
        let values = strategy.defaults();

        self.search_seq += 1;
        self.search_deadline = None;

        let previous = std::mem::take(&mut self.state);
        self.state = WizardState {
            phase: Phase::Searching,
            subject: None,
            values,
            errors: ValidationErrors::new(),
            search_term: String::new(),
            results: Vec::new(),
            searching: false,
            ..previous
        };
        Ok(())
    }

    fn issue_search(&mut self) {
        if self.state.phase != Phase::Searching {
            return;
        }
        let Some(scope) = self.state.mode.and_then(WorkflowMode::search_scope) else {
            return;
        };
        let term = self.state.search_term.trim().to_string();
        if !self.search.is_searchable(&term) {
            return;
        }

        self.search_seq += 1;
        let (generation, seq) = (self.generation, self.search_seq);
        self.state.searching = true;
        debug!(seq, term = %term, ?scope, "Issuing directory search");

        let search = self.search.clone();
        let aborted_term = term.clone();
        self.spawn(
            async move {
                let result = search.search(scope, &term).await;
                WizardEvent::SearchCompleted {
                    generation,
                    seq,
                    term,
                    result,
                }
            },
            move |message| WizardEvent::SearchCompleted {
                generation,
                seq,
                term: aborted_term,
                result: Err(RemoteError::aborted("directory", message)),
            },
        );
    }

    fn apply_search(
        &mut self,
        generation: u64,
        seq: u64,
        term: String,
        result: Result<Vec<Subject>, RemoteError>,
    ) {
        if generation != self.generation || seq != self.search_seq {
            debug!(seq, current = self.search_seq, "Discarding stale search result");
            return;
        }

        self.state.searching = false;
        match result {
            Ok(subjects) => self.state.results = subjects,
            Err(e) => {
                warn!(term = %term, error = %e, "Directory search failed");
                self.state.results.clear();
                self.notifications.notify(NotificationEvent::SearchFailed {
                    term,
                    error: e.to_string(),
                });
            }
        }
    }

    // ─── Form editing ────────────────────────────────────────────────────────

    pub fn set_field(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), WizardError> {
        self.ensure("set_field", &[Phase::Editing])?;
        self.state.values.set(field, value);
        self.state.errors.remove(field);
        Ok(())
    }

    // ─── Node selection and discovery ────────────────────────────────────────

    /// Select the OLT for a configuration run. The strategy is re-resolved
    /// with the new node and `olt_name` follows the selection.
    pub fn select_node(&mut self, node: impl Into<String>) -> Result<(), WizardError> {
        let mode = self.ensure("select_node", &[Phase::Searching, Phase::Editing])?;
        Self::require_configuration("select_node", mode)?;

        let node = node.into().trim().to_string();
        self.state.node = (!node.is_empty()).then(|| node.clone());
        self.strategy = Some(self.registry.resolve_mode(mode, &self.context()));
        self.state.values.set("olt_name", node.as_str());

        // Devices belong to the previous node
        self.scan_seq += 1;
        self.state.scan_status = ScanStatus::Idle;
        self.state.devices.clear();

        info!(mode = %mode, node = %node, "Node selected");
        Ok(())
    }

    /// Scan the selected node for unconfigured devices. Without a selected
    /// node the scan is refused and nothing is spawned.
    pub fn scan(&mut self) -> Result<(), WizardError> {
        let mode = self.ensure("scan", &[Phase::Searching, Phase::Editing])?;
        Self::require_configuration("scan", mode)?;

        let Some(node) = self.state.node.clone() else {
            warn!(mode = %mode, "Scan refused: no OLT selected");
            let reason = PreconditionError::NoNodeSelected;
            self.notifications.notify(NotificationEvent::OperationRefused {
                mode: mode.to_string(),
                reason: reason.to_string(),
            });
            return Err(reason.into());
        };
        self.scan_seq += 1;
        let (generation, seq) = (self.generation, self.scan_seq);
        self.state.scan_status = ScanStatus::Scanning;
        self.state.devices.clear();

        let discovery = self.discovery.clone();
        let aborted_node = node.clone();
        self.spawn(
            async move {
                let result = discovery.scan(&node).await;
                WizardEvent::ScanCompleted {
                    generation,
                    seq,
                    node,
                    result,
                }
            },
            move |message| WizardEvent::ScanCompleted {
                generation,
                seq,
                node: aborted_node,
                result: Err(RemoteError::aborted("scanner", message).into()),
            },
        );
        Ok(())
    }

    fn apply_scan(
        &mut self,
        generation: u64,
        seq: u64,
        node: String,
        result: Result<Vec<Device>, DiscoveryError>,
    ) {
        if generation != self.generation || seq != self.scan_seq {
            debug!(seq, node = %node, "Discarding stale scan result");
            return;
        }

        match result {
            Ok(devices) => {
                let count = devices.len();
                self.state.scan_status = ScanStatus::Completed { count };
                self.state.devices = devices;
                self.notifications
                    .notify(NotificationEvent::ScanCompleted { node, count });
            }
            Err(e) => {
                warn!(node = %node, error = %e, "Node scan failed");
                let message = e.to_string();
                self.state.scan_status = ScanStatus::Failed {
                    message: message.clone(),
                };
                self.state.devices.clear();
                self.notifications.notify(NotificationEvent::ScanFailed {
                    node,
                    error: message,
                });
            }
        }
    }

    // ─── Batch queue ─────────────────────────────────────────────────────────

    /// Queue a device for batch provisioning. A duplicate serial leaves the
    /// queue unchanged and raises a warning notification.
    pub fn add_device(&mut self, device: &Device) -> Result<AddOutcome, WizardError> {
        let mode = self.ensure("add_device", &[Phase::Editing])?;
        Self::require_batch("add_device", mode)?;

        let outcome = self.queue.add(device);
        if outcome == AddOutcome::Duplicate {
            self.notifications.notify(NotificationEvent::BatchDuplicate {
                serial: device.serial.clone(),
            });
        }
        Ok(outcome)
    }

    /// Queue every device from the last scan. Returns how many were added.
    pub fn add_detected_devices(&mut self) -> Result<usize, WizardError> {
        let mode = self.ensure("add_device", &[Phase::Editing])?;
        Self::require_batch("add_device", mode)?;

        let devices = self.state.devices.clone();
        let mut added = 0;
        for device in &devices {
            if self.add_device(device)? == AddOutcome::Added {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn remove_device(&mut self, serial: &str) -> Result<bool, WizardError> {
        let mode = self.ensure("remove_device", &[Phase::Editing])?;
        Self::require_batch("remove_device", mode)?;
        Ok(self.queue.remove(serial))
    }

    // ─── Submit ──────────────────────────────────────────────────────────────

    /// Validate the form and dispatch exactly one backend call.
    ///
    /// Validation failures and missing context keep the wizard in
    /// [`Phase::Editing`] and raise one notification each.
    pub fn submit(&mut self) -> Result<SubmitOutcome, WizardError> {
        let mode = self.ensure("submit", &[Phase::Editing])?;
        let strategy = self.strategy.as_ref().ok_or(WizardError::NotOpen)?;

        if let Err(errors) = strategy.validate(&self.state.values) {
            warn!(mode = %mode, errors = %errors, "Submit blocked by validation");
            self.state.errors = errors.clone();
            self.notifications.notify(NotificationEvent::ValidationFailed {
                mode: mode.to_string(),
                fields: errors.iter().map(|e| e.field).collect(),
            });
            return Ok(SubmitOutcome::Invalid(errors));
        }

        let call = match strategy.prepare(&self.state.values, &self.context()) {
            Ok(call) => call,
            Err(reason) => {
                warn!(mode = %mode, reason = %reason, "Submit refused");
                self.state.errors = ValidationErrors::new();
                self.notifications.notify(NotificationEvent::OperationRefused {
                    mode: mode.to_string(),
                    reason: reason.to_string(),
                });
                return Ok(SubmitOutcome::Refused(reason));
            }
        };

        self.state.errors = ValidationErrors::new();
        self.state.phase = Phase::Submitting;
        info!(mode = %mode, target = call.target(), "Submitting operation");

        let collaborators = self.collaborators.clone();
        let user = self
            .credentials
            .as_ref()
            .map(|c| (c.user_id.clone(), c.display_name.clone()));
        let generation = self.generation;

        self.spawn(
            async move {
                let result = call.execute(&collaborators).await;

                let status = if result.is_ok() {
                    AuditStatus::Success
                } else {
                    AuditStatus::Error
                };
                let mut entry =
                    AuditEntry::new(mode.audit_action(), call.target(), status, call.details());
                if let Some((user_id, user_name)) = user {
                    entry = entry.with_user(user_id, user_name);
                }
                if let Err(e) = collaborators.audit.record_audit(&entry).await {
                    warn!(mode = %mode, error = %e, "Audit entry could not be recorded");
                }

                WizardEvent::SubmitCompleted { generation, result }
            },
            move |message| WizardEvent::SubmitCompleted {
                generation,
                result: Err(RemoteError::aborted("submit", message)),
            },
        );

        Ok(SubmitOutcome::Dispatched)
    }

    fn apply_submit(&mut self, generation: u64, result: Result<OperationResult, RemoteError>) {
        if generation != self.generation {
            debug!("Discarding submit result of a closed run");
            return;
        }
        let Some(mode) = self.state.mode else {
            return;
        };

        match result {
            Ok(result) => {
                info!(mode = %mode, message = %result.message, "Operation succeeded");
                self.notifications
                    .notify(NotificationEvent::OperationSucceeded {
                        mode: mode.to_string(),
                        message: result.message.clone(),
                    });
                if let Some(callback) = self.on_complete.as_mut() {
                    callback(mode, &result);
                }
                self.state.last_result = Some(result);
                self.close();
            }
            Err(e) => {
                warn!(mode = %mode, error = %e, "Operation failed");
                self.state.phase = Phase::Editing;
                self.notifications.notify(NotificationEvent::OperationFailed {
                    mode: mode.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    // ─── Event loop ──────────────────────────────────────────────────────────

    /// Wait for the next thing to apply. Returns `None` once nothing is
    /// pending: no debounce deadline, no spawned task and no enrichment.
    pub async fn next_event(&mut self) -> Option<WizardEvent> {
        let deadline = self.search_deadline;
        let enriching = self.queue.pending_enrichments() > 0;
        if deadline.is_none() && self.outstanding == 0 && !enriching {
            return None;
        }

        tokio::select! {
            Some(event) = self.event_rx.recv(), if self.outstanding > 0 => {
                self.outstanding -= 1;
                Some(event)
            }
            Some(outcome) = self.queue.recv_outcome(), if enriching => {
                Some(WizardEvent::Enrichment(outcome))
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                self.search_deadline = None;
                Some(WizardEvent::SearchDue)
            }
            else => None,
        }
    }

    pub fn handle_event(&mut self, event: WizardEvent) {
        match event {
            WizardEvent::SearchDue => self.issue_search(),
            WizardEvent::SearchCompleted {
                generation,
                seq,
                term,
                result,
            } => self.apply_search(generation, seq, term, result),
            WizardEvent::ScanCompleted {
                generation,
                seq,
                node,
                result,
            } => self.apply_scan(generation, seq, node, result),
            WizardEvent::SubmitCompleted { generation, result } => {
                self.apply_submit(generation, result)
            }
            WizardEvent::Enrichment(outcome) => {
                self.queue.apply_enrichment(outcome);
            }
        }
    }

    /// Apply events until nothing is pending
    pub async fn run_until_idle(&mut self) {
        while let Some(event) = self.next_event().await {
            self.handle_event(event);
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn context(&self) -> StrategyContext {
        StrategyContext {
            credentials: self.credentials.clone(),
            node: self.state.node.clone(),
            batch: self.queue.items().to_vec(),
        }
    }

    fn ensure(&self, action: &'static str, allowed: &[Phase]) -> Result<WorkflowMode, WizardError> {
        let mode = self.state.mode.ok_or(WizardError::NotOpen)?;
        if !allowed.contains(&self.state.phase) {
            return Err(WizardError::InvalidPhase {
                action,
                phase: self.state.phase.as_str(),
            });
        }
        Ok(mode)
    }

    fn require_configuration(action: &'static str, mode: WorkflowMode) -> Result<(), WizardError> {
        if mode.kind() == WorkflowKind::Configuration {
            Ok(())
        } else {
            Err(WizardError::NotAvailable {
                action,
                mode: mode.to_string(),
            })
        }
    }

    fn require_batch(action: &'static str, mode: WorkflowMode) -> Result<(), WizardError> {
        if mode == WorkflowMode::Configuration(ConfigurationMode::Batch) {
            Ok(())
        } else {
            Err(WizardError::NotAvailable {
                action,
                mode: mode.to_string(),
            })
        }
    }

    /// Run `task` and deliver its event. If the task panics, `on_abort`
    /// builds the event instead so `outstanding` always drains.
    fn spawn<F, A>(&mut self, task: F, on_abort: A)
    where
        F: Future<Output = WizardEvent> + Send + 'static,
        A: FnOnce(String) -> WizardEvent + Send + 'static,
    {
        let tx = self.event_tx.clone();
        self.outstanding += 1;
        let handle = tokio::spawn(task);
        tokio::spawn(async move {
            let event = match handle.await {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Wizard task aborted");
                    on_abort(e.to_string())
                }
            };
            // Receiver lives as long as the controller
            let _ = tx.send(event);
        });
    }
}
