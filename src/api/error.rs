//! Remote operation errors for backend collaborator calls

use std::fmt;

/// Errors that can occur when a collaborator call reaches the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// 401 Unauthorized - operator credentials rejected
    Unauthorized { service: String },
    /// 403 Forbidden - credentials lack the required permission
    Forbidden { service: String },
    /// Network or timeout error
    NetworkError { service: String, message: String },
    /// Other HTTP errors, carrying the backend's `detail` when present
    HttpError {
        service: String,
        status: u16,
        message: String,
    },
    /// Response body could not be decoded
    Decode { service: String, message: String },
    /// Backend reported the operation as unsuccessful
    Rejected { service: String, message: String },
    /// Backend base URL not configured
    NotConfigured { service: String },
    /// The task running the call panicked or was cancelled
    Aborted { service: String, message: String },
}

impl RemoteError {
    /// Check if this is an authentication error (401 or 403)
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            RemoteError::Unauthorized { .. } | RemoteError::Forbidden { .. }
        )
    }

    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::NetworkError { .. } => true,
            RemoteError::HttpError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get the service name for this error
    pub fn service_name(&self) -> &str {
        match self {
            RemoteError::Unauthorized { service }
            | RemoteError::Forbidden { service }
            | RemoteError::NetworkError { service, .. }
            | RemoteError::HttpError { service, .. }
            | RemoteError::Decode { service, .. }
            | RemoteError::Rejected { service, .. }
            | RemoteError::NotConfigured { service }
            | RemoteError::Aborted { service, .. } => service,
        }
    }

    pub fn unauthorized(service: impl Into<String>) -> Self {
        RemoteError::Unauthorized {
            service: service.into(),
        }
    }

    pub fn forbidden(service: impl Into<String>) -> Self {
        RemoteError::Forbidden {
            service: service.into(),
        }
    }

    pub fn network(service: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::NetworkError {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn http(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        RemoteError::HttpError {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    pub fn decode(service: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Decode {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn rejected(service: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Rejected {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(service: impl Into<String>) -> Self {
        RemoteError::NotConfigured {
            service: service.into(),
        }
    }

    pub fn aborted(service: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Aborted {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Unauthorized { service } => {
                write!(f, "{service}: Unauthorized (401) - check operator credentials")
            }
            RemoteError::Forbidden { service } => {
                write!(f, "{service}: Forbidden (403) - insufficient permissions")
            }
            RemoteError::NetworkError { service, message } => {
                write!(f, "{service}: Network error - {message}")
            }
            RemoteError::HttpError {
                service,
                status,
                message,
            } => write!(f, "{service}: HTTP {status} - {message}"),
            RemoteError::Decode { service, message } => {
                write!(f, "{service}: Invalid response - {message}")
            }
            RemoteError::Rejected { service, message } => {
                write!(f, "{service}: {message}")
            }
            RemoteError::NotConfigured { service } => {
                write!(f, "{service}: Not configured (no backend URL)")
            }
            RemoteError::Aborted { service, message } => {
                write!(f, "{service}: Aborted - {message}")
            }
        }
    }
}

impl std::error::Error for RemoteError {}
