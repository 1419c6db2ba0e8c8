//! Notification system for workflow events.
//!
//! This module provides a notification integration architecture where multiple
//! integrations (tracing log, in-process channel) can receive events. Every
//! recovered failure in a wizard run produces exactly one event.

use serde::{Deserialize, Serialize};

mod channel_integration;
mod integration;
mod log_integration;
mod service;

pub use channel_integration::ChannelIntegration;
pub use integration::NotificationIntegration;
pub use log_integration::LogIntegration;
pub use service::NotificationService;

/// Severity of a user-facing toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Display form of an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub message: String,
}

/// All notification events that can be dispatched to integrations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum NotificationEvent {
    /// A directory search failed; results were cleared
    #[serde(rename = "search.failed")]
    SearchFailed { term: String, error: String },

    /// A node scan finished (possibly with zero devices)
    #[serde(rename = "scan.completed")]
    ScanCompleted { node: String, count: usize },

    /// A node scan failed
    #[serde(rename = "scan.failed")]
    ScanFailed { node: String, error: String },

    /// A device was already in the batch queue
    #[serde(rename = "batch.duplicate")]
    BatchDuplicate { serial: String },

    /// Submit blocked by schema validation
    #[serde(rename = "validation.failed")]
    ValidationFailed { mode: String, fields: Vec<String> },

    /// Submit refused because required context is missing
    #[serde(rename = "operation.refused")]
    OperationRefused { mode: String, reason: String },

    /// The backend accepted the operation
    #[serde(rename = "operation.succeeded")]
    OperationSucceeded { mode: String, message: String },

    /// The backend call failed; the form is still editable
    #[serde(rename = "operation.failed")]
    OperationFailed { mode: String, error: String },
}

impl NotificationEvent {
    /// Get the event type string for filtering (e.g., "scan.failed")
    pub fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::SearchFailed { .. } => "search.failed",
            NotificationEvent::ScanCompleted { .. } => "scan.completed",
            NotificationEvent::ScanFailed { .. } => "scan.failed",
            NotificationEvent::BatchDuplicate { .. } => "batch.duplicate",
            NotificationEvent::ValidationFailed { .. } => "validation.failed",
            NotificationEvent::OperationRefused { .. } => "operation.refused",
            NotificationEvent::OperationSucceeded { .. } => "operation.succeeded",
            NotificationEvent::OperationFailed { .. } => "operation.failed",
        }
    }

    /// Format for display.
    pub fn to_toast(&self) -> Toast {
        let (level, title, message) = match self {
            NotificationEvent::SearchFailed { term, error } => (
                ToastLevel::Error,
                "Search failed".to_string(),
                format!("'{term}': {error}"),
            ),
            NotificationEvent::ScanCompleted { node, count } => (
                ToastLevel::Info,
                "Scan complete".to_string(),
                format!("Found {count} devices on {node}"),
            ),
            NotificationEvent::ScanFailed { node, error } => (
                ToastLevel::Error,
                "Scan failed".to_string(),
                format!("{node}: {error}"),
            ),
            NotificationEvent::BatchDuplicate { serial } => (
                ToastLevel::Warning,
                "Already queued".to_string(),
                format!("Device {serial} is already in the batch"),
            ),
            NotificationEvent::ValidationFailed { fields, .. } => (
                ToastLevel::Error,
                "Please fix the highlighted fields".to_string(),
                fields.join(", "),
            ),
            NotificationEvent::OperationRefused { mode, reason } => (
                ToastLevel::Error,
                "Operation refused".to_string(),
                format!("{mode}: {reason}"),
            ),
            NotificationEvent::OperationSucceeded { mode, message } => (
                ToastLevel::Success,
                "Success".to_string(),
                if message.is_empty() {
                    format!("{mode} completed")
                } else {
                    message.clone()
                },
            ),
            NotificationEvent::OperationFailed { mode, error } => (
                ToastLevel::Error,
                "Operation failed".to_string(),
                format!("{mode}: {error}"),
            ),
        };
        Toast {
            level,
            title,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_strings() {
        let test_cases = vec![
            (
                NotificationEvent::SearchFailed {
                    term: "ann".into(),
                    error: "timeout".into(),
                },
                "search.failed",
            ),
            (
                NotificationEvent::ScanCompleted {
                    node: "OLT-1".into(),
                    count: 3,
                },
                "scan.completed",
            ),
            (
                NotificationEvent::BatchDuplicate {
                    serial: "ZTEG0001".into(),
                },
                "batch.duplicate",
            ),
            (
                NotificationEvent::OperationFailed {
                    mode: "ticket/create".into(),
                    error: "HTTP 500".into(),
                },
                "operation.failed",
            ),
        ];

        for (event, expected) in test_cases {
            assert_eq!(event.event_type(), expected);
        }
    }

    #[test]
    fn test_serialization_uses_event_tag() {
        let event = NotificationEvent::ScanCompleted {
            node: "OLT-1".into(),
            count: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "scan.completed");
        assert_eq!(json["data"]["count"], 0);

        let back: NotificationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_toast_levels() {
        let toast = NotificationEvent::BatchDuplicate {
            serial: "ZTEG0001".into(),
        }
        .to_toast();
        assert_eq!(toast.level, ToastLevel::Warning);
        assert!(toast.message.contains("ZTEG0001"));

        let toast = NotificationEvent::ScanCompleted {
            node: "OLT-1".into(),
            count: 0,
        }
        .to_toast();
        assert_eq!(toast.message, "Found 0 devices on OLT-1");
    }
}
