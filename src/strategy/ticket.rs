//! Ticket workflows: create, open (process), forward and close

use uuid::Uuid;

use super::schema::{FieldRule, FormSchema, FormValues, Refinement};
use super::{Severity, TicketMode};
use crate::api::{
    CloseTicketPayload, CreateTicketPayload, ForwardTicketPayload, ProcessTicketPayload,
    TicketPayload,
};
use crate::types::{attr, Subject};

pub const PRIORITIES: &[&str] = &["LOW", "MEDIUM", "HIGH"];
pub const TICKET_TYPES: &[&str] = &["FREE", "CHARGED"];

const DEFAULT_PIC: &str = "ALL TECHNICIAN";
const DEFAULT_CLOSE_REASON: &str = "Ticket Closed by System";

pub(super) fn metadata(mode: TicketMode) -> (&'static str, &'static str, Severity) {
    match mode {
        TicketMode::Create => ("Create New Ticket", "Create Ticket", Severity::Default),
        TicketMode::Open => ("Process Ticket", "Process Ticket", Severity::Default),
        TicketMode::Forward => ("Forward Ticket", "Forward Ticket", Severity::Default),
        TicketMode::Close => ("Close Ticket", "Close Ticket", Severity::Destructive),
    }
}

pub(super) fn schema(mode: TicketMode) -> FormSchema {
    match mode {
        TicketMode::Create => FormSchema::new(vec![
            FieldRule::text("ticket_ref", "Reference"),
            FieldRule::text("name", "Full Name").required(),
            FieldRule::text("address", "Installation Address"),
            FieldRule::text("user_pppoe", "PPPoE User"),
            FieldRule::text("onu_sn", "ONU Serial"),
            FieldRule::text("no_internet", "No Internet ID"),
            FieldRule::choice("priority", "Priority", PRIORITIES).with_default("LOW"),
            FieldRule::choice("type", "Type", TICKET_TYPES).with_default("FREE"),
            FieldRule::text("description", "Problem Description").required(),
        ]),
        TicketMode::Open => FormSchema::new(vec![
            FieldRule::text("ticket_ref", "Reference"),
            FieldRule::text("name", "Full Name"),
            FieldRule::text("user_pppoe", "PPPoE User"),
            FieldRule::text("description", "Problem Description"),
        ])
        .refine(Refinement::RequiredAnyOf {
            fields: &["name", "user_pppoe"],
            message: "Customer name or PPPoE user is required",
        }),
        TicketMode::Forward => FormSchema::new(vec![
            FieldRule::text("ticket_ref", "Reference").required(),
            FieldRule::text("service_impact", "Service Impact"),
            FieldRule::text("root_cause", "Root Cause"),
            FieldRule::text("network_impact", "Network Impact"),
            FieldRule::text("recommended_action", "Recommended Action"),
            FieldRule::text("interface", "ONU Interface"),
            FieldRule::text("onu_sn", "ONU Serial"),
            FieldRule::choice("priority", "Priority", PRIORITIES).with_default("MEDIUM"),
            FieldRule::text("person_in_charge", "Person in Charge").with_default(DEFAULT_PIC),
        ])
        .refine(Refinement::RequiredWhenPresent {
            field: "onu_sn",
            trigger: "interface",
            message: "ONU Serial is required when an interface is given",
        }),
        TicketMode::Close => FormSchema::new(vec![
            FieldRule::text("ticket_ref", "Reference").required(),
            FieldRule::text("action_close", "Closing Action"),
            FieldRule::text("onu_sn", "ONU Serial"),
        ]),
    }
}

/// `TN` followed by six digits
pub fn generate_ticket_ref() -> String {
    let n = Uuid::new_v4().as_u128() % 1_000_000;
    format!("TN{n:06}")
}

/// Copy subject attributes into the create form
pub(super) fn seed_from_subject(mode: TicketMode, subject: &Subject, values: &mut FormValues) {
    if mode != TicketMode::Create {
        return;
    }
    let pppoe = subject.attribute(attr::PPPOE_USER).unwrap_or_default();
    let serial = subject.attribute(attr::ONU_SN).unwrap_or_default();

    values.set("name", subject.display_name.to_uppercase());
    values.set("address", subject.attribute(attr::ADDRESS).unwrap_or_default());
    values.set("user_pppoe", pppoe);
    values.set("onu_sn", serial);
    values.set(
        "no_internet",
        if pppoe.is_empty() { serial } else { pppoe },
    );
    values.set("ticket_ref", generate_ticket_ref());
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

pub(super) fn payload(mode: TicketMode, values: &FormValues) -> TicketPayload {
    match mode {
        TicketMode::Create => TicketPayload::CreateAndProcess(CreateTicketPayload {
            query: values.first_text(&["user_pppoe", "name"]).to_string(),
            description: values.text("description").to_string(),
            priority: or_default(values.text("priority"), "LOW"),
            jenis: or_default(values.text("type"), "FREE"),
        }),
        TicketMode::Open => TicketPayload::Process(ProcessTicketPayload {
            query: values.first_text(&["name", "user_pppoe"]).to_string(),
        }),
        TicketMode::Forward => {
            let interface = values.text("interface");
            TicketPayload::Forward(ForwardTicketPayload {
                query: values.text("ticket_ref").to_string(),
                service_impact: or_dash(values.text("service_impact")),
                root_cause: or_dash(values.text("root_cause")),
                network_impact: or_dash(values.text("network_impact")),
                recommended_action: or_dash(values.text("recommended_action")),
                onu_index: if interface.is_empty() {
                    String::new()
                } else {
                    format!("gpon-onu_{interface}")
                },
                sn_modem: values.text("onu_sn").to_string(),
                priority: or_default(values.text("priority"), "MEDIUM"),
                person_in_charge: or_default(values.text("person_in_charge"), DEFAULT_PIC),
            })
        }
        TicketMode::Close => TicketPayload::Close(CloseTicketPayload {
            query: values.text("ticket_ref").to_string(),
            close_reason: or_default(values.text("action_close"), DEFAULT_CLOSE_REASON),
            onu_sn: values.text("onu_sn").to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectOrigin;

    #[test]
    fn test_ticket_ref_format() {
        for _ in 0..20 {
            let reference = generate_ticket_ref();
            assert_eq!(reference.len(), 8);
            assert!(reference.starts_with("TN"));
            assert!(reference[2..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_create_seeding() {
        let subject = Subject::new("ann01", "Ann Lee", SubjectOrigin::Customer)
            .with_attribute(attr::PPPOE_USER, "ann01")
            .with_attribute(attr::ADDRESS, "Jl. Melati 4");
        let mut values = schema(TicketMode::Create).defaults();
        seed_from_subject(TicketMode::Create, &subject, &mut values);

        assert_eq!(values.text("name"), "ANN LEE");
        assert_eq!(values.text("address"), "Jl. Melati 4");
        assert_eq!(values.text("user_pppoe"), "ann01");
        assert_eq!(values.text("no_internet"), "ann01");
        assert!(values.text("ticket_ref").starts_with("TN"));
        assert_eq!(values.text("priority"), "LOW");
    }

    #[test]
    fn test_no_internet_falls_back_to_serial() {
        let subject = Subject::new("x", "Budi", SubjectOrigin::Customer)
            .with_attribute(attr::ONU_SN, "ZTEG0042");
        let mut values = FormValues::new();
        seed_from_subject(TicketMode::Create, &subject, &mut values);
        assert_eq!(values.text("no_internet"), "ZTEG0042");
    }

    #[test]
    fn test_create_query_prefers_pppoe() {
        let values = FormValues::new()
            .with("name", "ANN LEE")
            .with("user_pppoe", "ann01")
            .with("description", "LOS red");
        let TicketPayload::CreateAndProcess(body) = payload(TicketMode::Create, &values) else {
            panic!("expected create payload");
        };
        assert_eq!(body.query, "ann01");
        assert_eq!(body.priority, "LOW");
        assert_eq!(body.jenis, "FREE");
    }

    #[test]
    fn test_open_query_prefers_name() {
        let values = FormValues::new()
            .with("name", "ANN LEE")
            .with("user_pppoe", "ann01");
        let TicketPayload::Process(body) = payload(TicketMode::Open, &values) else {
            panic!("expected process payload");
        };
        assert_eq!(body.query, "ANN LEE");
    }

    #[test]
    fn test_forward_defaults() {
        let values = FormValues::new()
            .with("ticket_ref", "TN000123")
            .with("interface", "1/2/3:4")
            .with("onu_sn", "ZTEG0001");
        let TicketPayload::Forward(body) = payload(TicketMode::Forward, &values) else {
            panic!("expected forward payload");
        };
        assert_eq!(body.onu_index, "gpon-onu_1/2/3:4");
        assert_eq!(body.service_impact, "-");
        assert_eq!(body.priority, "MEDIUM");
        assert_eq!(body.person_in_charge, "ALL TECHNICIAN");
    }

    #[test]
    fn test_forward_without_interface_has_empty_index() {
        let values = FormValues::new().with("ticket_ref", "TN000123");
        let TicketPayload::Forward(body) = payload(TicketMode::Forward, &values) else {
            panic!("expected forward payload");
        };
        assert!(body.onu_index.is_empty());
    }

    #[test]
    fn test_close_reason_default() {
        let values = FormValues::new().with("ticket_ref", "TN000123");
        let TicketPayload::Close(body) = payload(TicketMode::Close, &values) else {
            panic!("expected close payload");
        };
        assert_eq!(body.close_reason, "Ticket Closed by System");
    }

    #[test]
    fn test_create_requires_description() {
        let values = schema(TicketMode::Create).defaults().with("name", "ANN LEE");
        let errors = schema(TicketMode::Create).validate(&values).unwrap_err();
        assert_eq!(errors.get("description"), Some("Problem Description is required"));
        assert_eq!(errors.len(), 1);
    }
}
