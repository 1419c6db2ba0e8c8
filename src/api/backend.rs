//! Collaborator traits the workflow core talks to.
//!
//! Each trait is a narrow async seam over the hosted backend so the core can
//! run against the HTTP client in production and the in-memory backend in
//! tests.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::RemoteError;
use super::payload::{ConfigurationPayload, TicketPayload};
use crate::audit::AuditLog;
use crate::search::SearchScope;
use crate::types::{Credentials, CustomerSummary, Device, OperationResult, Subject};

/// Customer / pending-registration lookup
#[async_trait]
pub trait Directory: Send + Sync {
    /// Case-insensitive substring lookup. Every whitespace-separated token of
    /// `term` must match at least one searchable field of a returned subject.
    async fn query_directory(
        &self,
        scope: SearchScope,
        term: &str,
    ) -> Result<Vec<Subject>, RemoteError>;
}

/// Discovery of unconfigured devices on an OLT
#[async_trait]
pub trait NodeScanner: Send + Sync {
    async fn scan_node(&self, node: &str) -> Result<Vec<Device>, RemoteError>;
}

/// Best-effort customer lookup for a device serial
#[async_trait]
pub trait CustomerMatcher: Send + Sync {
    async fn match_customer_by_serial(
        &self,
        serial: &str,
    ) -> Result<Option<CustomerSummary>, RemoteError>;
}

/// Mutating ticket operations
#[async_trait]
pub trait TicketOperations: Send + Sync {
    async fn execute_ticket_operation(
        &self,
        payload: &TicketPayload,
        credentials: &Credentials,
    ) -> Result<OperationResult, RemoteError>;
}

/// Mutating provisioning runs against one OLT
#[async_trait]
pub trait ConfigurationOperations: Send + Sync {
    async fn execute_configuration(
        &self,
        node: &str,
        payload: &ConfigurationPayload,
    ) -> Result<OperationResult, RemoteError>;
}

/// The full set of collaborators a wizard run needs
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn Directory>,
    pub scanner: Arc<dyn NodeScanner>,
    pub matcher: Arc<dyn CustomerMatcher>,
    pub tickets: Arc<dyn TicketOperations>,
    pub configuration: Arc<dyn ConfigurationOperations>,
    pub audit: Arc<dyn AuditLog>,
}

impl Collaborators {
    /// Wire every seam to one backend implementation
    pub fn from_backend<B>(backend: Arc<B>, audit: Arc<dyn AuditLog>) -> Self
    where
        B: Directory
            + NodeScanner
            + CustomerMatcher
            + TicketOperations
            + ConfigurationOperations
            + 'static,
    {
        Self {
            directory: backend.clone(),
            scanner: backend.clone(),
            matcher: backend.clone(),
            tickets: backend.clone(),
            configuration: backend,
            audit,
        }
    }
}
