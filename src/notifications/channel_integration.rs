//! Forwards notifications to an in-process receiver (UI front ends, CLI, tests).

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::integration::{filter_matches, NotificationIntegration};
use super::NotificationEvent;

pub struct ChannelIntegration {
    tx: mpsc::UnboundedSender<NotificationEvent>,
    subscribed_events: Vec<String>,
}

impl ChannelIntegration {
    /// Create the integration together with its receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                subscribed_events: Vec::new(),
            },
            rx,
        )
    }

    pub fn with_events(mut self, events: Vec<String>) -> Self {
        self.subscribed_events = events;
        self
    }
}

#[async_trait]
impl NotificationIntegration for ChannelIntegration {
    fn name(&self) -> &str {
        "channel"
    }

    fn handles_event(&self, event: &NotificationEvent) -> bool {
        filter_matches(&self.subscribed_events, event)
    }

    fn is_enabled(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn send(&self, event: &NotificationEvent) -> Result<()> {
        self.tx
            .send(event.clone())
            .ok()
            .context("notification receiver dropped")
    }
}
