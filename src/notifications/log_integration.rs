//! Writes notifications to the tracing log.

use anyhow::Result;
use async_trait::async_trait;

use super::integration::{filter_matches, NotificationIntegration};
use super::{NotificationEvent, ToastLevel};

pub struct LogIntegration {
    enabled: bool,
    subscribed_events: Vec<String>,
}

impl LogIntegration {
    pub fn new(subscribed_events: Vec<String>) -> Self {
        Self {
            enabled: true,
            subscribed_events,
        }
    }
}

#[async_trait]
impl NotificationIntegration for LogIntegration {
    fn name(&self) -> &str {
        "log"
    }

    fn handles_event(&self, event: &NotificationEvent) -> bool {
        filter_matches(&self.subscribed_events, event)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, event: &NotificationEvent) -> Result<()> {
        let toast = event.to_toast();
        match toast.level {
            ToastLevel::Error => tracing::error!(
                event = %event.event_type(),
                "{}: {}", toast.title, toast.message
            ),
            ToastLevel::Warning => tracing::warn!(
                event = %event.event_type(),
                "{}: {}", toast.title, toast.message
            ),
            ToastLevel::Info | ToastLevel::Success => tracing::info!(
                event = %event.event_type(),
                "{}: {}", toast.title, toast.message
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_integration_filter() {
        let integration = LogIntegration::new(vec!["operation.failed".into()]);
        assert_eq!(integration.name(), "log");
        assert!(integration.is_enabled());
        assert!(!integration.handles_event(&NotificationEvent::BatchDuplicate {
            serial: "ZTEG0001".into()
        }));
    }

    #[tokio::test]
    async fn test_send_never_fails() {
        let integration = LogIntegration::new(Vec::new());
        let event = NotificationEvent::OperationFailed {
            mode: "ticket/close".into(),
            error: "HTTP 500".into(),
        };
        assert!(integration.send(&event).await.is_ok());
    }
}
