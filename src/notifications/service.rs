//! Central notification service that dispatches events to all integrations.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::channel_integration::ChannelIntegration;
use super::integration::NotificationIntegration;
use super::log_integration::LogIntegration;
use super::NotificationEvent;
use crate::config::Config;

/// Central notification dispatcher.
///
/// Receives events and dispatches them to all enabled integrations
/// that handle the given event type.
#[derive(Clone)]
pub struct NotificationService {
    integrations: Vec<Arc<dyn NotificationIntegration>>,
    enabled: bool,
}

impl NotificationService {
    /// Create a new notification service from config.
    pub fn from_config(config: &Config) -> Self {
        let integrations: Vec<Arc<dyn NotificationIntegration>> = vec![Arc::new(
            LogIntegration::new(config.notifications.events.clone()),
        )];

        Self {
            integrations,
            enabled: config.notifications.enabled,
        }
    }

    /// Service with a single channel integration and its receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (integration, rx) = ChannelIntegration::new();
        let service = Self::disabled().with_integration(Arc::new(integration));
        (
            Self {
                enabled: true,
                ..service
            },
            rx,
        )
    }

    /// Create a disabled notification service.
    pub fn disabled() -> Self {
        Self {
            integrations: Vec::new(),
            enabled: false,
        }
    }

    /// Add another integration.
    pub fn with_integration(mut self, integration: Arc<dyn NotificationIntegration>) -> Self {
        self.integrations.push(integration);
        self
    }

    /// Check if notifications are globally enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the number of registered integrations.
    pub fn integration_count(&self) -> usize {
        self.integrations.len()
    }

    /// Dispatch a notification to all enabled integrations that handle the event.
    ///
    /// This is fire-and-forget: each delivery runs on its own task and errors
    /// are logged but not propagated. Outside a tokio runtime the event is
    /// dropped with a debug log.
    pub fn notify(&self, event: NotificationEvent) {
        if !self.enabled {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(event = %event.event_type(), "No tokio runtime for notification");
            return;
        };

        for integration in &self.integrations {
            if integration.is_enabled() && integration.handles_event(&event) {
                let integration = integration.clone();
                let event = event.clone();

                handle.spawn(async move {
                    if let Err(e) = integration.send(&event).await {
                        tracing::warn!(
                            integration = %integration.name(),
                            event = %event.event_type(),
                            error = %e,
                            "Notification delivery failed"
                        );
                    }
                });
            }
        }
    }
}
