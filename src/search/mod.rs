//! Customer and pending-registration lookup.
//!
//! [`SearchService`] is stateless: debounce and last-issued-wins ordering are
//! owned by the wizard controller, which tags every issued query with a
//! sequence number.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{Directory, RemoteError};
use crate::types::Subject;

/// Which directory collection a search runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Active customers
    Customers,
    /// Pending registrations (PSB)
    PendingRegistrations,
}

/// Tunables for interactive search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// Quiet interval after the last keystroke before a query is issued
    pub debounce: Duration,
    /// Trimmed terms shorter than this never reach the directory
    pub min_term_length: usize,
    /// Maximum number of subjects returned, in backend order
    pub result_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            min_term_length: 2,
            result_limit: 10,
        }
    }
}

/// True when every whitespace-separated token of `term` is a case-insensitive
/// substring of at least one searchable field of `subject`.
pub fn matches_term(subject: &Subject, term: &str) -> bool {
    let fields: Vec<String> = subject
        .searchable_fields()
        .map(str::to_lowercase)
        .collect();

    term.split_whitespace()
        .map(str::to_lowercase)
        .all(|token| fields.iter().any(|field| field.contains(&token)))
}

/// Debounce-agnostic search front end over a [`Directory`]
#[derive(Clone)]
pub struct SearchService {
    directory: Arc<dyn Directory>,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(directory: Arc<dyn Directory>, settings: SearchSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Whether `term` is long enough to be sent to the directory
    pub fn is_searchable(&self, term: &str) -> bool {
        term.trim().chars().count() >= self.settings.min_term_length
    }

    /// Run one lookup. Short terms resolve to an empty list without a remote
    /// call; results are capped at the configured limit.
    pub async fn search(
        &self,
        scope: SearchScope,
        term: &str,
    ) -> Result<Vec<Subject>, RemoteError> {
        let term = term.trim();
        if !self.is_searchable(term) {
            return Ok(Vec::new());
        }

        let mut subjects = self.directory.query_directory(scope, term).await?;
        subjects.truncate(self.settings.result_limit);
        debug!(?scope, term, count = subjects.len(), "Directory search completed");
        Ok(subjects)
    }
}
