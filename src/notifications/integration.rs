//! Notification integration trait definition.

use anyhow::Result;
use async_trait::async_trait;

use super::NotificationEvent;

/// Trait for notification integrations.
///
/// Each integration (log, channel, etc.) implements this trait
/// to receive and handle notification events.
#[async_trait]
pub trait NotificationIntegration: Send + Sync {
    /// Integration name (for logging and config identification)
    fn name(&self) -> &str;

    /// Check if this integration handles the given event type.
    fn handles_event(&self, event: &NotificationEvent) -> bool;

    /// Check if this integration is enabled.
    fn is_enabled(&self) -> bool;

    /// Deliver a notification event. Errors are logged by the service.
    async fn send(&self, event: &NotificationEvent) -> Result<()>;
}

/// Empty filter list means every event
pub(crate) fn filter_matches(filter: &[String], event: &NotificationEvent) -> bool {
    filter.is_empty() || filter.iter().any(|e| e == event.event_type())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_all() {
        let event = NotificationEvent::BatchDuplicate {
            serial: "ZTEG0001".into(),
        };
        assert!(filter_matches(&[], &event));
    }

    #[test]
    fn test_specific_filter() {
        let filter = vec!["scan.failed".to_string()];
        let failed = NotificationEvent::ScanFailed {
            node: "OLT-1".into(),
            error: "timeout".into(),
        };
        let completed = NotificationEvent::ScanCompleted {
            node: "OLT-1".into(),
            count: 1,
        };
        assert!(filter_matches(&filter, &failed));
        assert!(!filter_matches(&filter, &completed));
    }
}
