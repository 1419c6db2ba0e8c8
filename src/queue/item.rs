use serde::{Deserialize, Serialize};

use crate::types::{CustomerSummary, Device};

/// Customer-match progress for one queued device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Loading,
    /// Lookup finished; the item may or may not carry a customer
    Resolved,
    /// Lookup failed
    Unresolved,
}

/// One device queued for batch provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQueueItem {
    /// Unique key within the queue
    pub serial: String,
    /// `"{port}/{slot}"`
    pub port: String,
    pub status: EnrichmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
}

impl BatchQueueItem {
    pub fn loading(device: &Device) -> Self {
        Self {
            serial: device.serial.clone(),
            port: device.port_label(),
            status: EnrichmentStatus::Loading,
            customer: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == EnrichmentStatus::Loading
    }
}

/// What a customer lookup produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentResult {
    Matched(CustomerSummary),
    NoMatch,
    Failed(String),
}

/// A finished lookup waiting to be applied to the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentOutcome {
    pub serial: String,
    pub result: EnrichmentResult,
}

/// Result of [`super::BatchQueue::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Serial already queued; the queue is unchanged
    Duplicate,
}
