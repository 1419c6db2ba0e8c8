//! Subjects (customers and pending registrations) and the records that seed forms

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known subject attribute keys
pub mod attr {
    pub const ADDRESS: &str = "address";
    pub const PPPOE_USER: &str = "pppoe_user";
    pub const PPPOE_PASSWORD: &str = "pppoe_password";
    pub const ONU_SN: &str = "onu_sn";
    pub const OLT_NAME: &str = "olt_name";
    pub const PACKAGE: &str = "package";
    pub const MODEM_TYPE: &str = "modem_type";
}

/// Where a subject came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectOrigin {
    /// An active fiber customer
    Customer,
    /// A pending registration (PSB) awaiting first configuration
    PendingRegistration,
}

/// A read-only snapshot of a record selected to populate a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable identifier (PPPoE handle when the backend has one)
    pub id: String,
    pub display_name: String,
    pub origin: SubjectOrigin,
    /// Named attributes used to seed form fields (see [`attr`])
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Subject {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        origin: SubjectOrigin,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            origin,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter. Blank values are not stored.
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.attributes.insert(key.to_string(), value);
        }
        self
    }

    /// Get a non-blank attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Fields a directory search term is matched against:
    /// name, credential handle, address and device serial.
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.display_name.as_str()).chain(
            [attr::PPPOE_USER, attr::ADDRESS, attr::ONU_SN]
                .into_iter()
                .filter_map(|key| self.attribute(key)),
        )
    }
}

/// Customer data attached to a queued device by enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub pppoe_user: String,
}

/// An existing ticket or device record used to pre-populate edit-only modes.
///
/// Accepts both the console's English keys and the legacy column names
/// (`nama`, `alamat`, `kendala`, `sn_modem`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecord {
    #[serde(default, alias = "ticketId")]
    pub ticket_ref: Option<String>,
    #[serde(default, alias = "nama")]
    pub name: Option<String>,
    #[serde(default, alias = "alamat")]
    pub address: Option<String>,
    #[serde(default, alias = "kendala")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, rename = "type")]
    pub ticket_type: Option<String>,
    #[serde(default)]
    pub olt_name: Option<String>,
    #[serde(default)]
    pub user_pppoe: Option<String>,
    #[serde(default, alias = "sn_modem")]
    pub onu_sn: Option<String>,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub modem_type: Option<String>,
    #[serde(default)]
    pub vlan_id: Option<i64>,
    #[serde(default)]
    pub action_close: Option<String>,
    #[serde(default)]
    pub service_impact: Option<String>,
    #[serde(default)]
    pub root_cause: Option<String>,
    #[serde(default)]
    pub network_impact: Option<String>,
    #[serde(default, alias = "recomended_action")]
    pub recommended_action: Option<String>,
    #[serde(default, alias = "PIC")]
    pub person_in_charge: Option<String>,
}

impl ExistingRecord {
    /// Parse a record from a JSON object
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Look up a text value by form field name. Blank values count as absent.
    pub fn text(&self, field: &str) -> Option<&str> {
        let value = match field {
            "ticket_ref" => &self.ticket_ref,
            "name" => &self.name,
            "address" => &self.address,
            "description" => &self.description,
            "priority" => &self.priority,
            "type" => &self.ticket_type,
            "olt_name" => &self.olt_name,
            "user_pppoe" => &self.user_pppoe,
            "onu_sn" => &self.onu_sn,
            "interface" => &self.interface,
            "modem_type" => &self.modem_type,
            "action_close" => &self.action_close,
            "service_impact" => &self.service_impact,
            "root_cause" => &self.root_cause,
            "network_impact" => &self.network_impact,
            "recommended_action" => &self.recommended_action,
            "person_in_charge" => &self.person_in_charge,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }
}
