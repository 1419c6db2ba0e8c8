//! In-process backend with scriptable latency and failures.
//!
//! Used by the test suites. Every call is counted so tests can assert how
//! often the remote was reached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::backend::{
    ConfigurationOperations, CustomerMatcher, Directory, NodeScanner, TicketOperations,
};
use super::error::RemoteError;
use super::payload::{ConfigurationPayload, TicketPayload};
use crate::search::{matches_term, SearchScope};
use crate::types::{Credentials, CustomerSummary, Device, OperationResult, Subject};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Default)]
struct Script {
    customers: Vec<Subject>,
    pending: Vec<Subject>,
    devices: HashMap<String, Vec<Device>>,
    matches: HashMap<String, CustomerSummary>,

    directory_delay: Duration,
    term_delays: HashMap<String, Duration>,
    scan_delay: Duration,
    match_delay: Duration,
    serial_delays: HashMap<String, Duration>,
    operation_delay: Duration,

    directory_failure: Option<RemoteError>,
    scan_failure: Option<RemoteError>,
    match_failures: HashMap<String, RemoteError>,
    ticket_failure: Option<RemoteError>,
    configuration_failure: Option<RemoteError>,

    ticket_calls: Vec<(TicketPayload, Credentials)>,
    configuration_calls: Vec<(String, ConfigurationPayload)>,
    issued_terms: Vec<String>,
}

/// Backend double implementing every collaborator trait
#[derive(Default)]
pub struct InMemoryBackend {
    script: Mutex<Script>,
    directory_calls: AtomicUsize,
    scan_calls: AtomicUsize,
    match_calls: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&self, subject: Subject) {
        lock(&self.script).customers.push(subject);
    }

    pub fn add_pending_registration(&self, subject: Subject) {
        lock(&self.script).pending.push(subject);
    }

    pub fn set_devices(&self, node: &str, devices: Vec<Device>) {
        lock(&self.script).devices.insert(node.to_string(), devices);
    }

    pub fn set_customer_match(&self, serial: &str, customer: CustomerSummary) {
        lock(&self.script).matches.insert(serial.to_string(), customer);
    }

    pub fn set_directory_delay(&self, delay: Duration) {
        lock(&self.script).directory_delay = delay;
    }

    /// Latency for one specific term, overriding the directory default
    pub fn set_term_delay(&self, term: &str, delay: Duration) {
        lock(&self.script).term_delays.insert(term.to_string(), delay);
    }

    pub fn set_scan_delay(&self, delay: Duration) {
        lock(&self.script).scan_delay = delay;
    }

    pub fn set_match_delay(&self, delay: Duration) {
        lock(&self.script).match_delay = delay;
    }

    /// Latency for one serial's enrichment, overriding the match default
    pub fn set_serial_delay(&self, serial: &str, delay: Duration) {
        lock(&self.script)
            .serial_delays
            .insert(serial.to_string(), delay);
    }

    pub fn set_operation_delay(&self, delay: Duration) {
        lock(&self.script).operation_delay = delay;
    }

    pub fn fail_directory(&self, error: RemoteError) {
        lock(&self.script).directory_failure = Some(error);
    }

    pub fn fail_scan(&self, error: RemoteError) {
        lock(&self.script).scan_failure = Some(error);
    }

    pub fn fail_match(&self, serial: &str, error: RemoteError) {
        lock(&self.script)
            .match_failures
            .insert(serial.to_string(), error);
    }

    pub fn fail_tickets(&self, error: RemoteError) {
        lock(&self.script).ticket_failure = Some(error);
    }

    pub fn fail_configuration(&self, error: RemoteError) {
        lock(&self.script).configuration_failure = Some(error);
    }

    /// Drop every scripted failure; data and call history are kept
    pub fn clear_failures(&self) {
        let mut script = lock(&self.script);
        script.directory_failure = None;
        script.scan_failure = None;
        script.match_failures.clear();
        script.ticket_failure = None;
        script.configuration_failure = None;
    }

    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(Ordering::SeqCst)
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn match_calls(&self) -> usize {
        self.match_calls.load(Ordering::SeqCst)
    }

    /// Terms that reached the directory, in arrival order
    pub fn issued_terms(&self) -> Vec<String> {
        lock(&self.script).issued_terms.clone()
    }

    pub fn ticket_calls(&self) -> Vec<(TicketPayload, Credentials)> {
        lock(&self.script).ticket_calls.clone()
    }

    pub fn configuration_calls(&self) -> Vec<(String, ConfigurationPayload)> {
        lock(&self.script).configuration_calls.clone()
    }
}

#[async_trait]
impl Directory for InMemoryBackend {
    async fn query_directory(
        &self,
        scope: SearchScope,
        term: &str,
    ) -> Result<Vec<Subject>, RemoteError> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        let delay = {
            let mut script = lock(&self.script);
            script.issued_terms.push(term.to_string());
            script
                .term_delays
                .get(term)
                .copied()
                .unwrap_or(script.directory_delay)
        };
        pause(delay).await;

        let script = lock(&self.script);
        if let Some(err) = &script.directory_failure {
            return Err(err.clone());
        }
        let source = match scope {
            SearchScope::Customers => &script.customers,
            SearchScope::PendingRegistrations => &script.pending,
        };
        Ok(source
            .iter()
            .filter(|subject| matches_term(subject, term))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NodeScanner for InMemoryBackend {
    async fn scan_node(&self, node: &str) -> Result<Vec<Device>, RemoteError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        let delay = lock(&self.script).scan_delay;
        pause(delay).await;

        let script = lock(&self.script);
        if let Some(err) = &script.scan_failure {
            return Err(err.clone());
        }
        Ok(script.devices.get(node).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl CustomerMatcher for InMemoryBackend {
    async fn match_customer_by_serial(
        &self,
        serial: &str,
    ) -> Result<Option<CustomerSummary>, RemoteError> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        let delay = {
            let script = lock(&self.script);
            script
                .serial_delays
                .get(serial)
                .copied()
                .unwrap_or(script.match_delay)
        };
        pause(delay).await;

        let script = lock(&self.script);
        if let Some(err) = script.match_failures.get(serial) {
            return Err(err.clone());
        }
        Ok(script.matches.get(serial).cloned())
    }
}

#[async_trait]
impl TicketOperations for InMemoryBackend {
    async fn execute_ticket_operation(
        &self,
        payload: &TicketPayload,
        credentials: &Credentials,
    ) -> Result<OperationResult, RemoteError> {
        let delay = {
            let mut script = lock(&self.script);
            script
                .ticket_calls
                .push((payload.clone(), credentials.clone()));
            script.operation_delay
        };
        pause(delay).await;

        if let Some(err) = &lock(&self.script).ticket_failure {
            return Err(err.clone());
        }
        Ok(OperationResult::new(format!(
            "Ticket {} succeeded",
            payload.operation().endpoint().trim_start_matches("/ticket/")
        )))
    }
}

#[async_trait]
impl ConfigurationOperations for InMemoryBackend {
    async fn execute_configuration(
        &self,
        node: &str,
        payload: &ConfigurationPayload,
    ) -> Result<OperationResult, RemoteError> {
        let delay = {
            let mut script = lock(&self.script);
            script
                .configuration_calls
                .push((node.to_string(), payload.clone()));
            script.operation_delay
        };
        pause(delay).await;

        if let Some(err) = &lock(&self.script).configuration_failure {
            return Err(err.clone());
        }
        let mut result = OperationResult::new(format!("Configuration applied on {node}"));
        result.logs.push(format!("POST {}", payload.endpoint()));
        Ok(result)
    }
}
