//! Device configuration workflows: manual, auto, batch and bridge

use super::schema::{FieldRule, FormSchema, FormValues};
use super::{ConfigurationMode, Severity};
use crate::api::{
    BatchConfigurationRequest, BatchDevice, BridgeConfigurationRequest, ConfigurationPayload,
    ConfigurationRequest, CustomerInfo,
};
use crate::error::PreconditionError;
use crate::queue::{BatchQueueItem, EnrichmentStatus};
use crate::types::{attr, Subject};

pub const MODEM_TYPES: &[&str] = &["ZTE", "HUAWEI", "NOKIA"];
pub const ETH_PORTS: usize = 4;
pub const DEFAULT_VLAN: i64 = 100;

pub(super) fn metadata(mode: ConfigurationMode) -> (&'static str, &'static str, Severity) {
    match mode {
        ConfigurationMode::Manual => ("Manual Configuration", "Start Config", Severity::Default),
        ConfigurationMode::Auto => ("Auto Configuration", "Start Config", Severity::Default),
        ConfigurationMode::Batch => ("Batch Configuration", "Configure Batch", Severity::Default),
        ConfigurationMode::Bridge => {
            ("Bridge Configuration", "Configure Bridge", Severity::Default)
        }
    }
}

fn device_fields() -> Vec<FieldRule> {
    vec![
        FieldRule::text("olt_name", "OLT").required(),
        FieldRule::choice("modem_type", "Modem Type", MODEM_TYPES).required(),
        FieldRule::text("onu_sn", "Serial Number").required(),
        FieldRule::flags("eth_locks", "ETH Locks", ETH_PORTS),
    ]
}

pub(super) fn schema(mode: ConfigurationMode) -> FormSchema {
    match mode {
        ConfigurationMode::Manual => {
            let mut fields = device_fields();
            fields.extend([
                FieldRule::text("package", "Package").required(),
                FieldRule::text("name", "Customer Name").required(),
                FieldRule::text("address", "Address"),
                FieldRule::text("user_pppoe", "PPPoE User").required(),
                FieldRule::text("pass_pppoe", "PPPoE Password").required(),
            ]);
            FormSchema::new(fields)
        }
        ConfigurationMode::Auto => {
            let mut fields = device_fields();
            fields.extend([
                FieldRule::text("data_psb", "Pending Customer").required(),
                FieldRule::text("name", "Customer Name"),
                FieldRule::text("address", "Address"),
                FieldRule::text("package", "Package"),
                FieldRule::text("user_pppoe", "PPPoE User").required(),
                FieldRule::text("pass_pppoe", "PPPoE Password").required(),
            ]);
            FormSchema::new(fields)
        }
        ConfigurationMode::Batch => FormSchema::new(vec![
            FieldRule::text("olt_name", "OLT").required(),
            FieldRule::choice("modem_type", "Modem Type", MODEM_TYPES).required(),
            FieldRule::text("package", "Package").required(),
        ]),
        ConfigurationMode::Bridge => FormSchema::new(vec![
            FieldRule::text("olt_name", "OLT").required(),
            FieldRule::choice("modem_type", "Modem Type", MODEM_TYPES).required(),
            FieldRule::text("onu_sn", "Serial Number").required(),
            FieldRule::number("vlan_id", "VLAN ID", 1, 4094).with_default(DEFAULT_VLAN),
        ]),
    }
}

/// Copy subject attributes into a single-device form
pub(super) fn seed_from_subject(
    mode: ConfigurationMode,
    subject: &Subject,
    values: &mut FormValues,
) {
    // a selected node has already set olt_name
    let node_selected = values.text_opt("olt_name").is_some();
    let mut copy = |field: &str, key: &str| {
        if let Some(value) = subject.attribute(key) {
            values.set(field, value);
        }
    };

    match mode {
        ConfigurationMode::Manual | ConfigurationMode::Auto => {
            copy("address", attr::ADDRESS);
            copy("user_pppoe", attr::PPPOE_USER);
            copy("pass_pppoe", attr::PPPOE_PASSWORD);
            copy("onu_sn", attr::ONU_SN);
            copy("package", attr::PACKAGE);
            copy("modem_type", attr::MODEM_TYPE);
            if !node_selected {
                copy("olt_name", attr::OLT_NAME);
            }
            values.set("name", subject.display_name.as_str());
            if mode == ConfigurationMode::Auto {
                values.set("data_psb", subject.id.as_str());
            }
        }
        ConfigurationMode::Batch | ConfigurationMode::Bridge => {}
    }
}

fn batch_device(item: &BatchQueueItem) -> BatchDevice {
    BatchDevice {
        sn: item.serial.clone(),
        port: item.port.clone(),
        customer: match item.status {
            EnrichmentStatus::Resolved => item.customer.clone(),
            EnrichmentStatus::Loading | EnrichmentStatus::Unresolved => None,
        },
    }
}

pub(super) fn payload(
    mode: ConfigurationMode,
    values: &FormValues,
    batch: &[BatchQueueItem],
) -> Result<ConfigurationPayload, PreconditionError> {
    let payload = match mode {
        ConfigurationMode::Manual | ConfigurationMode::Auto => {
            let name = if mode == ConfigurationMode::Auto {
                values.first_text(&["name", "data_psb"])
            } else {
                values.text("name")
            };
            let flags = values.flags("eth_locks");
            ConfigurationPayload::Single(ConfigurationRequest {
                sn: values.text("onu_sn").to_string(),
                customer: CustomerInfo {
                    name: name.to_string(),
                    address: values.text("address").to_string(),
                    pppoe_user: values.text("user_pppoe").to_string(),
                    pppoe_pass: values.text("pass_pppoe").to_string(),
                },
                modem_type: values.text("modem_type").to_string(),
                package: values.text("package").to_string(),
                eth_locks: if flags.len() == ETH_PORTS {
                    flags
                } else {
                    vec![false; ETH_PORTS]
                },
            })
        }
        ConfigurationMode::Batch => {
            if batch.is_empty() {
                return Err(PreconditionError::EmptyBatch);
            }
            ConfigurationPayload::Batch(BatchConfigurationRequest {
                modem_type: values.text("modem_type").to_string(),
                package: values.text("package").to_string(),
                devices: batch.iter().map(batch_device).collect(),
            })
        }
        ConfigurationMode::Bridge => ConfigurationPayload::Bridge(BridgeConfigurationRequest {
            sn: values.text("onu_sn").to_string(),
            modem_type: values.text("modem_type").to_string(),
            vlan_id: values
                .number("vlan_id")
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(DEFAULT_VLAN as u16),
        }),
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerSummary, SubjectOrigin};

    fn item(serial: &str, status: EnrichmentStatus, customer: Option<CustomerSummary>) -> BatchQueueItem {
        BatchQueueItem {
            serial: serial.into(),
            port: "1/1".into(),
            status,
            customer,
        }
    }

    #[test]
    fn test_auto_seeding_from_pending_registration() {
        let subject = Subject::new("anna07", "Anna Putri", SubjectOrigin::PendingRegistration)
            .with_attribute(attr::PPPOE_USER, "anna07")
            .with_attribute(attr::PPPOE_PASSWORD, "s3cret")
            .with_attribute(attr::PACKAGE, "50Mbps");
        let mut values = schema(ConfigurationMode::Auto).defaults();
        seed_from_subject(ConfigurationMode::Auto, &subject, &mut values);

        assert_eq!(values.text("data_psb"), "anna07");
        assert_eq!(values.text("name"), "Anna Putri");
        assert_eq!(values.text("pass_pppoe"), "s3cret");
        assert_eq!(values.text("package"), "50Mbps");
        assert_eq!(values.flags("eth_locks"), vec![false; 4]);
    }

    #[test]
    fn test_subject_node_fills_empty_olt_name() {
        let subject = Subject::new("citra", "Citra Ayu", SubjectOrigin::Customer)
            .with_attribute(attr::ONU_SN, "ZTEG0077")
            .with_attribute(attr::OLT_NAME, "OLT-KALIBATA");

        let mut values = schema(ConfigurationMode::Manual).defaults();
        seed_from_subject(ConfigurationMode::Manual, &subject, &mut values);
        assert_eq!(values.text("olt_name"), "OLT-KALIBATA");
        assert_eq!(values.text("onu_sn"), "ZTEG0077");

        let mut values = schema(ConfigurationMode::Manual)
            .defaults()
            .with("olt_name", "OLT-1");
        seed_from_subject(ConfigurationMode::Manual, &subject, &mut values);
        assert_eq!(values.text("olt_name"), "OLT-1");
    }

    #[test]
    fn test_manual_requires_credentials() {
        let values = FormValues::new()
            .with("olt_name", "OLT-1")
            .with("modem_type", "ZTE")
            .with("onu_sn", "ZTEG0001")
            .with("package", "50Mbps")
            .with("name", "Ann")
            .with("user_pppoe", "ann01");
        let errors = schema(ConfigurationMode::Manual).validate(&values).unwrap_err();
        assert_eq!(errors.get("pass_pppoe"), Some("PPPoE Password is required"));
    }

    #[test]
    fn test_auto_name_falls_back_to_registration() {
        let values = FormValues::new()
            .with("data_psb", "PSB-9")
            .with("onu_sn", "ZTEG0001");
        let ConfigurationPayload::Single(request) =
            payload(ConfigurationMode::Auto, &values, &[]).unwrap()
        else {
            panic!("expected single payload");
        };
        assert_eq!(request.customer.name, "PSB-9");
        assert_eq!(request.eth_locks, vec![false; 4]);
    }

    #[test]
    fn test_batch_payload_carries_resolved_customers_only() {
        let ann = CustomerSummary {
            name: "Ann".into(),
            address: String::new(),
            pppoe_user: "ann01".into(),
        };
        let batch = vec![
            item("A", EnrichmentStatus::Resolved, Some(ann.clone())),
            item("B", EnrichmentStatus::Loading, None),
            item("C", EnrichmentStatus::Unresolved, None),
        ];
        let values = FormValues::new()
            .with("modem_type", "ZTE")
            .with("package", "100Mbps");

        let ConfigurationPayload::Batch(request) =
            payload(ConfigurationMode::Batch, &values, &batch).unwrap()
        else {
            panic!("expected batch payload");
        };
        assert_eq!(request.devices.len(), 3);
        assert_eq!(request.devices[0].customer, Some(ann));
        assert!(request.devices[1].customer.is_none());
    }

    #[test]
    fn test_empty_batch_is_refused() {
        let err = payload(ConfigurationMode::Batch, &FormValues::new(), &[]).unwrap_err();
        assert_eq!(err, PreconditionError::EmptyBatch);
    }

    #[test]
    fn test_bridge_vlan_default() {
        let values = schema(ConfigurationMode::Bridge)
            .defaults()
            .with("onu_sn", "ZTEG0001")
            .with("modem_type", "ZTE");
        let ConfigurationPayload::Bridge(request) =
            payload(ConfigurationMode::Bridge, &values, &[]).unwrap()
        else {
            panic!("expected bridge payload");
        };
        assert_eq!(request.vlan_id, 100);
    }
}
