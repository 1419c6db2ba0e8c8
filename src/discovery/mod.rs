//! Discovery of unconfigured devices on an OLT

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::api::{NodeScanner, RemoteError};
use crate::error::PreconditionError;
use crate::types::Device;

/// Progress of the most recent scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    Idle,
    Scanning,
    /// Scan finished; zero devices is a valid outcome
    Completed { count: usize },
    Failed { message: String },
}

impl ScanStatus {
    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanStatus::Scanning)
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Stateless front end over a [`NodeScanner`]
#[derive(Clone)]
pub struct DeviceDiscovery {
    scanner: Arc<dyn NodeScanner>,
}

impl DeviceDiscovery {
    pub fn new(scanner: Arc<dyn NodeScanner>) -> Self {
        Self { scanner }
    }

    /// Scan `node` for unconfigured devices. A blank node name is refused
    /// before any network call.
    pub async fn scan(&self, node: &str) -> Result<Vec<Device>, DiscoveryError> {
        let node = node.trim();
        if node.is_empty() {
            return Err(PreconditionError::EmptyNodeName.into());
        }

        let devices = self.scanner.scan_node(node).await?;
        info!(node, count = devices.len(), "Node scan completed");
        Ok(devices)
    }
}
