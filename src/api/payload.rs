//! Request bodies for the mutating backend operations

use serde::{Deserialize, Serialize};

use crate::types::CustomerSummary;

/// Ticket operations exposed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketOperation {
    CreateAndProcess,
    Process,
    Forward,
    Close,
}

impl TicketOperation {
    /// Path below `/api/v1`
    pub fn endpoint(self) -> &'static str {
        match self {
            TicketOperation::CreateAndProcess => "/ticket/create-and-process",
            TicketOperation::Process => "/ticket/process",
            TicketOperation::Forward => "/ticket/forward",
            TicketOperation::Close => "/ticket/close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTicketPayload {
    pub query: String,
    pub description: String,
    pub priority: String,
    pub jenis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTicketPayload {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardTicketPayload {
    pub query: String,
    pub service_impact: String,
    pub root_cause: String,
    pub network_impact: String,
    /// Spelling matches the backend field
    #[serde(rename = "recomended_action")]
    pub recommended_action: String,
    pub onu_index: String,
    pub sn_modem: String,
    pub priority: String,
    pub person_in_charge: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseTicketPayload {
    pub query: String,
    pub close_reason: String,
    pub onu_sn: String,
}

/// Body of a ticket operation. Credentials are attached by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TicketPayload {
    CreateAndProcess(CreateTicketPayload),
    Process(ProcessTicketPayload),
    Forward(ForwardTicketPayload),
    Close(CloseTicketPayload),
}

impl TicketPayload {
    pub fn operation(&self) -> TicketOperation {
        match self {
            TicketPayload::CreateAndProcess(_) => TicketOperation::CreateAndProcess,
            TicketPayload::Process(_) => TicketOperation::Process,
            TicketPayload::Forward(_) => TicketOperation::Forward,
            TicketPayload::Close(_) => TicketOperation::Close,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub address: String,
    pub pppoe_user: String,
    pub pppoe_pass: String,
}

/// Single-device provisioning request (manual and auto modes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRequest {
    pub sn: String,
    pub customer: CustomerInfo,
    pub modem_type: String,
    pub package: String,
    pub eth_locks: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDevice {
    pub sn: String,
    pub port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfigurationRequest {
    pub modem_type: String,
    pub package: String,
    pub devices: Vec<BatchDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfigurationRequest {
    pub sn: String,
    pub modem_type: String,
    pub vlan_id: u16,
}

/// Body of a configuration run against one OLT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigurationPayload {
    Single(ConfigurationRequest),
    Batch(BatchConfigurationRequest),
    Bridge(BridgeConfigurationRequest),
}

impl ConfigurationPayload {
    /// Path below `/api/v1/config/api/olts/{node}`
    pub fn endpoint(&self) -> &'static str {
        match self {
            ConfigurationPayload::Single(_) => "/configure",
            ConfigurationPayload::Batch(_) => "/configure-batch",
            ConfigurationPayload::Bridge(_) => "/configure-bridge",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_payload_uses_backend_spelling() {
        let payload = TicketPayload::Forward(ForwardTicketPayload {
            query: "TN000001".into(),
            service_impact: "down".into(),
            root_cause: "fiber cut".into(),
            network_impact: "single".into(),
            recommended_action: "splice".into(),
            onu_index: "gpon-onu_1/2/3:4".into(),
            sn_modem: "ZTEG0001".into(),
            priority: "MEDIUM".into(),
            person_in_charge: "ALL TECHNICIAN".into(),
        });

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["recomended_action"], "splice");
        assert!(json.get("recommended_action").is_none());
        assert_eq!(payload.operation(), TicketOperation::Forward);
    }

    #[test]
    fn test_batch_device_omits_missing_customer() {
        let device = BatchDevice {
            sn: "ZTEG0001".into(),
            port: "1/1".into(),
            customer: None,
        };
        let json = serde_json::to_value(&device).unwrap();
        assert!(json.get("customer").is_none());
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            TicketOperation::CreateAndProcess.endpoint(),
            "/ticket/create-and-process"
        );
        let bridge = ConfigurationPayload::Bridge(BridgeConfigurationRequest {
            sn: "ZTEG0001".into(),
            modem_type: "ZTE".into(),
            vlan_id: 100,
        });
        assert_eq!(bridge.endpoint(), "/configure-bridge");
    }
}
