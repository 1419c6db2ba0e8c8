//! Integration tests for configuration wizard runs
//!
//! Covers the OLT side of the console:
//! - Scanning a node and queueing the detected devices
//! - Duplicate serial rejection
//! - Removing a device while its customer lookup is still in flight
//! - Batch and manual submits reaching the configuration endpoint
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test batch_workflow -- --nocapture
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use netdesk::api::{Collaborators, ConfigurationPayload, InMemoryBackend, RemoteError};
use netdesk::audit::MemoryAuditLog;
use netdesk::discovery::ScanStatus;
use netdesk::error::PreconditionError;
use netdesk::notifications::{NotificationEvent, NotificationService};
use netdesk::queue::{AddOutcome, EnrichmentStatus};
use netdesk::search::SearchSettings;
use netdesk::strategy::FieldValue;
use netdesk::types::{attr, CustomerSummary, Device, Subject, SubjectOrigin};
use netdesk::wizard::{Phase, SubmitOutcome, WizardController, WizardLaunch};

// ─── Fixtures ─────────────────────────────────────────────────────────────────

const NODE: &str = "OLT-KALIMALANG";

fn detected() -> Vec<Device> {
    vec![
        Device::new("ZTEGC0000001", "1", "1"),
        Device::new("ZTEGC0000002", "1", "2"),
        Device::new("HWTC00000003", "2", "1"),
    ]
}

fn summary(name: &str) -> CustomerSummary {
    CustomerSummary {
        name: name.into(),
        address: "Jl. Kalimalang 3".into(),
        pppoe_user: name.to_lowercase(),
    }
}

struct Olt {
    backend: Arc<InMemoryBackend>,
    audit: Arc<MemoryAuditLog>,
    notifications: UnboundedReceiver<NotificationEvent>,
    wizard: WizardController,
}

impl Olt {
    fn new() -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_devices(NODE, detected());
        backend.set_customer_match("ZTEGC0000001", summary("Sari"));
        backend.set_customer_match("HWTC00000003", summary("Tono"));

        let audit = Arc::new(MemoryAuditLog::new());
        let (service, notifications) = NotificationService::channel();
        let wizard = WizardController::new(
            Collaborators::from_backend(backend.clone(), audit.clone()),
            SearchSettings::default(),
            service,
        );
        Self {
            backend,
            audit,
            notifications,
            wizard,
        }
    }

    async fn notifications(&mut self) -> Vec<NotificationEvent> {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let mut events = Vec::new();
        while let Ok(event) = self.notifications.try_recv() {
            events.push(event);
        }
        events
    }

    async fn scan(&mut self) {
        self.wizard.scan().unwrap();
        self.wizard.run_until_idle().await;
    }
}

// ─── Batch ────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_batch_scan_queue_and_submit() {
    let mut olt = Olt::new();
    olt.backend.set_match_delay(Duration::from_millis(200));
    olt.wizard
        .open(WizardLaunch::configuration("batch").with_node(NODE))
        .unwrap();
    assert_eq!(olt.wizard.state().values.text("olt_name"), NODE);

    olt.scan().await;
    assert_eq!(
        olt.wizard.state().scan_status,
        ScanStatus::Completed { count: 3 }
    );
    assert_eq!(olt.wizard.state().devices, detected());
    assert_eq!(olt.backend.scan_calls(), 1);

    assert_eq!(olt.wizard.add_detected_devices().unwrap(), 3);
    assert_eq!(olt.wizard.queue().len(), 3);
    assert!(olt.wizard.queue().items().iter().all(|item| item.is_loading()));
    assert_eq!(olt.wizard.queue().items()[2].port, "2/1");

    // same serial again
    let again = olt.wizard.add_device(&detected()[0]).unwrap();
    assert_eq!(again, AddOutcome::Duplicate);
    assert_eq!(olt.wizard.queue().len(), 3);

    olt.wizard.run_until_idle().await;
    let queue = olt.wizard.queue();
    assert_eq!(olt.backend.match_calls(), 3);
    assert!(queue
        .items()
        .iter()
        .all(|item| item.status == EnrichmentStatus::Resolved));
    assert_eq!(
        queue.get("ZTEGC0000001").and_then(|i| i.customer.as_ref()),
        Some(&summary("Sari"))
    );
    assert!(queue.get("ZTEGC0000002").unwrap().customer.is_none());

    olt.wizard.set_field("modem_type", "ZTE").unwrap();
    olt.wizard.set_field("package", "30M").unwrap();
    assert_eq!(olt.wizard.submit().unwrap(), SubmitOutcome::Dispatched);
    olt.wizard.run_until_idle().await;

    let calls = olt.backend.configuration_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, NODE);
    let ConfigurationPayload::Batch(request) = &calls[0].1 else {
        panic!("expected batch payload");
    };
    let serials: Vec<_> = request.devices.iter().map(|d| d.sn.as_str()).collect();
    assert_eq!(serials, vec!["ZTEGC0000001", "ZTEGC0000002", "HWTC00000003"]);
    assert_eq!(request.package, "30M");

    assert_eq!(olt.wizard.phase(), Phase::Closed);
    assert!(olt.wizard.queue().is_empty());
    assert_eq!(olt.audit.entries().len(), 1);

    let events = olt.notifications().await;
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, NotificationEvent::BatchDuplicate { .. }))
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_removed_device_is_not_resurrected() {
    let mut olt = Olt::new();
    olt.backend
        .set_serial_delay("ZTEGC0000002", Duration::from_millis(500));
    olt.wizard
        .open(WizardLaunch::configuration("batch").with_node(NODE))
        .unwrap();
    olt.scan().await;
    olt.wizard.add_detected_devices().unwrap();

    // lookup for the second device is still running
    assert!(olt.wizard.remove_device("ZTEGC0000002").unwrap());
    assert!(!olt.wizard.remove_device("ZTEGC0000002").unwrap());
    olt.wizard.run_until_idle().await;

    let serials: Vec<_> = olt
        .wizard
        .queue()
        .items()
        .iter()
        .map(|item| item.serial.as_str())
        .collect();
    assert_eq!(serials, vec!["ZTEGC0000001", "HWTC00000003"]);
    assert_eq!(olt.wizard.queue().pending_enrichments(), 0);
}

#[tokio::test]
async fn test_failed_lookup_marks_item_unresolved() {
    let mut olt = Olt::new();
    olt.backend.fail_match(
        "HWTC00000003",
        RemoteError::network("customer-match", "connection reset"),
    );
    olt.wizard
        .open(WizardLaunch::configuration("batch").with_node(NODE))
        .unwrap();
    olt.scan().await;
    olt.wizard.add_detected_devices().unwrap();
    olt.wizard.run_until_idle().await;

    let item = olt.wizard.queue().get("HWTC00000003").unwrap();
    assert_eq!(item.status, EnrichmentStatus::Unresolved);
    assert!(item.customer.is_none());
    // the rest of the queue is unaffected
    assert_eq!(
        olt.wizard.queue().get("ZTEGC0000001").unwrap().status,
        EnrichmentStatus::Resolved
    );
}

#[tokio::test]
async fn test_scan_failure_keeps_queue() {
    let mut olt = Olt::new();
    olt.wizard
        .open(WizardLaunch::configuration("batch").with_node(NODE))
        .unwrap();
    olt.scan().await;
    olt.wizard.add_detected_devices().unwrap();
    olt.wizard.run_until_idle().await;

    olt.backend
        .fail_scan(RemoteError::http("scanner", 504, "OLT timeout"));
    olt.scan().await;

    assert!(matches!(
        olt.wizard.state().scan_status,
        ScanStatus::Failed { .. }
    ));
    assert!(olt.wizard.state().devices.is_empty());
    assert_eq!(olt.wizard.queue().len(), 3);

    let events = olt.notifications().await;
    assert!(events
        .iter()
        .any(|e| matches!(e, NotificationEvent::ScanFailed { node, .. } if node == NODE)));
}

#[tokio::test]
async fn test_empty_batch_refused_without_call() {
    let mut olt = Olt::new();
    olt.wizard
        .open(WizardLaunch::configuration("batch").with_node(NODE))
        .unwrap();
    olt.wizard.set_field("modem_type", "ZTE").unwrap();
    olt.wizard.set_field("package", "30M").unwrap();

    assert_eq!(
        olt.wizard.submit().unwrap(),
        SubmitOutcome::Refused(PreconditionError::EmptyBatch)
    );
    assert_eq!(olt.wizard.phase(), Phase::Editing);
    assert!(olt.backend.configuration_calls().is_empty());
}

// ─── Single device ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_manual_configuration_from_customer() {
    let mut olt = Olt::new();
    olt.backend.add_customer(
        Subject::new("sari", "Sari Dewi", SubjectOrigin::Customer)
            .with_attribute(attr::PPPOE_USER, "sari")
            .with_attribute(attr::PPPOE_PASSWORD, "s4r1")
            .with_attribute(attr::ADDRESS, "Jl. Kalimalang 3")
            .with_attribute(attr::ONU_SN, "ZTEGC0000001")
            .with_attribute(attr::PACKAGE, "20M"),
    );
    olt.wizard
        .open(WizardLaunch::configuration("manual").with_node(NODE))
        .unwrap();
    olt.wizard.set_search_term("sari").unwrap();
    olt.wizard.run_until_idle().await;
    assert!(olt.wizard.select_result(0).unwrap());

    olt.wizard.set_field("modem_type", "ZTE").unwrap();
    olt.wizard
        .set_field("eth_locks", FieldValue::Flags(vec![true, false, false, false]))
        .unwrap();
    assert_eq!(olt.wizard.submit().unwrap(), SubmitOutcome::Dispatched);
    olt.wizard.run_until_idle().await;

    let calls = olt.backend.configuration_calls();
    assert_eq!(calls.len(), 1);
    let ConfigurationPayload::Single(request) = &calls[0].1 else {
        panic!("expected single-device payload");
    };
    assert_eq!(request.sn, "ZTEGC0000001");
    assert_eq!(request.customer.pppoe_user, "sari");
    assert_eq!(request.eth_locks, vec![true, false, false, false]);
    assert_eq!(olt.wizard.phase(), Phase::Closed);
}
