//! Deduplicated queue of discovered devices for batch provisioning.
//!
//! Every inserted device starts a best-effort customer lookup on a spawned
//! task. Finished lookups are delivered through an internal channel and
//! applied by the owner with [`BatchQueue::apply_enrichment`], which checks
//! membership and mutates in the same call. A result for a serial that was
//! removed (or cleared by [`BatchQueue::reset`]) is dropped.

mod item;

pub use item::{AddOutcome, BatchQueueItem, EnrichmentOutcome, EnrichmentResult, EnrichmentStatus};

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::CustomerMatcher;
use crate::types::Device;

pub struct BatchQueue {
    items: Vec<BatchQueueItem>,
    matcher: Arc<dyn CustomerMatcher>,
    outcome_tx: mpsc::UnboundedSender<EnrichmentOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<EnrichmentOutcome>,
    in_flight: usize,
}

impl BatchQueue {
    pub fn new(matcher: Arc<dyn CustomerMatcher>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            items: Vec::new(),
            matcher,
            outcome_tx,
            outcome_rx,
            in_flight: 0,
        }
    }

    /// Queue `device` and start its customer lookup. Must be called from
    /// within a tokio runtime.
    pub fn add(&mut self, device: &Device) -> AddOutcome {
        if self.contains(&device.serial) {
            warn!(serial = %device.serial, "Device already queued");
            return AddOutcome::Duplicate;
        }

        self.items.push(BatchQueueItem::loading(device));
        self.in_flight += 1;

        let matcher = self.matcher.clone();
        let tx = self.outcome_tx.clone();
        let serial = device.serial.clone();
        tokio::spawn(async move {
            let result = match matcher.match_customer_by_serial(&serial).await {
                Ok(Some(customer)) => EnrichmentResult::Matched(customer),
                Ok(None) => EnrichmentResult::NoMatch,
                Err(e) => EnrichmentResult::Failed(e.to_string()),
            };
            // Receiver lives as long as the queue
            let _ = tx.send(EnrichmentOutcome { serial, result });
        });

        AddOutcome::Added
    }

    /// Remove the item for `serial`. Returns false if it was not queued.
    pub fn remove(&mut self, serial: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.serial != serial);
        self.items.len() != before
    }

    /// Drop every item. Lookups still in flight will fail the membership
    /// check when they arrive.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Apply a finished lookup if its serial is still queued.
    /// Returns true when an item was updated.
    pub fn apply_enrichment(&mut self, outcome: EnrichmentOutcome) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.serial == outcome.serial) else {
            debug!(serial = %outcome.serial, "Discarding enrichment for unqueued device");
            return false;
        };

        match outcome.result {
            EnrichmentResult::Matched(customer) => {
                item.status = EnrichmentStatus::Resolved;
                item.customer = Some(customer);
            }
            EnrichmentResult::NoMatch => {
                item.status = EnrichmentStatus::Resolved;
                item.customer = None;
            }
            EnrichmentResult::Failed(error) => {
                debug!(serial = %outcome.serial, %error, "Customer match failed");
                item.status = EnrichmentStatus::Unresolved;
                item.customer = None;
            }
        }
        true
    }

    /// Lookups started but not yet received
    pub fn pending_enrichments(&self) -> usize {
        self.in_flight
    }

    /// Wait for the next finished lookup. Returns `None` immediately when
    /// nothing is in flight.
    pub async fn recv_outcome(&mut self) -> Option<EnrichmentOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.outcome_rx.recv().await?;
        self.in_flight -= 1;
        Some(outcome)
    }

    /// Receive and apply every lookup still in flight
    pub async fn settle(&mut self) {
        while let Some(outcome) = self.recv_outcome().await {
            self.apply_enrichment(outcome);
        }
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.items.iter().any(|item| item.serial == serial)
    }

    pub fn get(&self, serial: &str) -> Option<&BatchQueueItem> {
        self.items.iter().find(|item| item.serial == serial)
    }

    /// Items in insertion order
    pub fn items(&self) -> &[BatchQueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::{InMemoryBackend, RemoteError};
    use crate::types::CustomerSummary;

    fn ann() -> CustomerSummary {
        CustomerSummary {
            name: "Ann Lee".into(),
            address: "Jl. Melati 4".into(),
            pppoe_user: "ann01".into(),
        }
    }

    fn queue_with(backend: &Arc<InMemoryBackend>) -> BatchQueue {
        BatchQueue::new(backend.clone())
    }

    #[tokio::test]
    async fn test_add_starts_loading_and_resolves() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_customer_match("ZTEG0001", ann());
        let mut queue = queue_with(&backend);

        assert_eq!(queue.add(&Device::new("ZTEG0001", "1", "3")), AddOutcome::Added);
        let item = queue.get("ZTEG0001").unwrap();
        assert!(item.is_loading());
        assert_eq!(item.port, "1/3");

        queue.settle().await;
        let item = queue.get("ZTEG0001").unwrap();
        assert_eq!(item.status, EnrichmentStatus::Resolved);
        assert_eq!(item.customer, Some(ann()));
        assert_eq!(queue.pending_enrichments(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_serial_is_rejected() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut queue = queue_with(&backend);

        queue.add(&Device::new("ZTEG0001", "1", "1"));
        let outcome = queue.add(&Device::new("ZTEG0001", "2", "2"));

        assert_eq!(outcome, AddOutcome::Duplicate);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.items()[0].port, "1/1");
        queue.settle().await;
        assert_eq!(backend.match_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_match_is_unresolved_not_loading() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_match("ZTEG0002", RemoteError::network("directory", "reset"));
        let mut queue = queue_with(&backend);

        queue.add(&Device::new("ZTEG0002", "1", "2"));
        queue.settle().await;

        let item = queue.get("ZTEG0002").unwrap();
        assert_eq!(item.status, EnrichmentStatus::Unresolved);
        assert!(item.customer.is_none());
    }

    #[tokio::test]
    async fn test_no_match_resolves_without_customer() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut queue = queue_with(&backend);

        queue.add(&Device::new("ZTEG0003", "1", "4"));
        queue.settle().await;

        let item = queue.get("ZTEG0003").unwrap();
        assert_eq!(item.status, EnrichmentStatus::Resolved);
        assert!(item.customer.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_item_is_not_resurrected() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_match_delay(Duration::from_millis(200));
        backend.set_customer_match("ZTEG0001", ann());
        let mut queue = queue_with(&backend);

        queue.add(&Device::new("ZTEG0001", "1", "1"));
        queue.add(&Device::new("ZTEG0002", "1", "2"));
        assert!(queue.remove("ZTEG0001"));

        queue.settle().await;
        assert_eq!(queue.len(), 1);
        assert!(!queue.contains("ZTEG0001"));
        assert_eq!(queue.items()[0].serial, "ZTEG0002");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_late_results() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_match_delay(Duration::from_millis(200));
        let mut queue = queue_with(&backend);

        queue.add(&Device::new("ZTEG0001", "1", "1"));
        queue.add(&Device::new("ZTEG0002", "1", "2"));
        queue.reset();

        let outcome = queue.recv_outcome().await.unwrap();
        assert!(!queue.apply_enrichment(outcome));
        queue.settle().await;
        assert!(queue.is_empty());
    }

    #[test]
    fn test_apply_to_unknown_serial_is_noop() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut queue = queue_with(&backend);
        let applied = queue.apply_enrichment(EnrichmentOutcome {
            serial: "GHOST".into(),
            result: EnrichmentResult::NoMatch,
        });
        assert!(!applied);
        assert!(queue.is_empty());
    }
}
