//! Form values and the declarative schemas that validate them

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

/// A single form value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(i64),
    Text(String),
    Flags(Vec<bool>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "a flag",
            FieldValue::Number(_) => "a number",
            FieldValue::Text(_) => "text",
            FieldValue::Flags(_) => "a list of flags",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Vec<bool>> for FieldValue {
    fn from(value: Vec<bool>) -> Self {
        FieldValue::Flags(value)
    }
}

/// Field name to value mapping held by the wizard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, FieldValue>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// Builder-style [`FormValues::set`]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    /// Trimmed text value, `""` when absent or not text
    pub fn text(&self, field: &str) -> &str {
        self.get(field).and_then(FieldValue::as_text).map_or("", str::trim)
    }

    /// Trimmed text value, `None` when absent or blank
    pub fn text_opt(&self, field: &str) -> Option<&str> {
        Some(self.text(field)).filter(|s| !s.is_empty())
    }

    /// First non-blank text among `fields`
    pub fn first_text(&self, fields: &[&str]) -> &str {
        fields
            .iter()
            .find_map(|f| self.text_opt(f))
            .unwrap_or("")
    }

    pub fn number(&self, field: &str) -> Option<i64> {
        match self.get(field) {
            Some(FieldValue::Number(n)) => Some(*n),
            Some(FieldValue::Text(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn flags(&self, field: &str) -> Vec<bool> {
        match self.get(field) {
            Some(FieldValue::Flags(flags)) => flags.clone(),
            _ => Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Type constraint for a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Text restricted to a fixed set of values
    Choice(&'static [&'static str]),
    Number { min: i64, max: i64 },
    /// Fixed-length list of booleans
    Flags(usize),
}

/// One named field of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<FieldValue>,
}

impl FieldRule {
    fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            default: None,
        }
    }

    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn choice(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self::new(name, label, FieldKind::Choice(options))
    }

    pub fn number(name: &'static str, label: &'static str, min: i64, max: i64) -> Self {
        Self::new(name, label, FieldKind::Number { min, max })
    }

    pub fn flags(name: &'static str, label: &'static str, len: usize) -> Self {
        Self::new(name, label, FieldKind::Flags(len)).with_default(vec![false; len])
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn check(&self, value: Option<&FieldValue>, errors: &mut ValidationErrors) {
        let present = match value {
            None => false,
            Some(FieldValue::Text(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            if self.required {
                errors.add(self.name, format!("{} is required", self.label));
            }
            return;
        }

        let Some(value) = value else { return };
        match (&self.kind, value) {
            (FieldKind::Text, FieldValue::Text(_)) => {}
            (FieldKind::Choice(options), FieldValue::Text(s)) => {
                if !options.contains(&s.trim()) {
                    errors.add(
                        self.name,
                        format!("{} must be one of {}", self.label, options.join(", ")),
                    );
                }
            }
            (FieldKind::Number { min, max }, FieldValue::Number(n)) => {
                if n < min || n > max {
                    errors.add(
                        self.name,
                        format!("{} must be between {min} and {max}", self.label),
                    );
                }
            }
            (FieldKind::Number { min, max }, FieldValue::Text(s)) => match s.trim().parse::<i64>() {
                Ok(n) if n >= *min && n <= *max => {}
                Ok(_) => errors.add(
                    self.name,
                    format!("{} must be between {min} and {max}", self.label),
                ),
                Err(_) => errors.add(self.name, format!("{} must be a number", self.label)),
            },
            (FieldKind::Flags(len), FieldValue::Flags(flags)) => {
                if flags.len() != *len {
                    errors.add(
                        self.name,
                        format!("{} must have exactly {len} entries", self.label),
                    );
                }
            }
            (_, other) => errors.add(
                self.name,
                format!("{} cannot be {}", self.label, other.kind_name()),
            ),
        }
    }
}

/// Cross-field rule evaluated after the per-field checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refinement {
    /// At least one of `fields` must be non-blank; the error lands on the first
    RequiredAnyOf {
        fields: &'static [&'static str],
        message: &'static str,
    },
    /// `field` must be non-blank whenever `trigger` is non-blank
    RequiredWhenPresent {
        field: &'static str,
        trigger: &'static str,
        message: &'static str,
    },
}

impl Refinement {
    fn check(&self, values: &FormValues, errors: &mut ValidationErrors) {
        match self {
            Refinement::RequiredAnyOf { fields, message } => {
                if fields.iter().all(|f| values.text_opt(f).is_none()) {
                    if let Some(first) = fields.first() {
                        errors.add(*first, *message);
                    }
                }
            }
            Refinement::RequiredWhenPresent {
                field,
                trigger,
                message,
            } => {
                if values.text_opt(trigger).is_some() && values.text_opt(field).is_none() {
                    errors.add(*field, *message);
                }
            }
        }
    }
}

/// Named fields plus cross-field refinements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    fields: Vec<FieldRule>,
    refinements: Vec<Refinement>,
}

impl FormSchema {
    pub fn new(fields: Vec<FieldRule>) -> Self {
        Self {
            fields,
            refinements: Vec::new(),
        }
    }

    pub fn refine(mut self, refinement: Refinement) -> Self {
        self.refinements.push(refinement);
        self
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn refinements(&self) -> &[Refinement] {
        &self.refinements
    }

    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Values every field starts from
    pub fn defaults(&self) -> FormValues {
        let mut values = FormValues::new();
        for field in &self.fields {
            if let Some(default) = &field.default {
                values.set(field.name, default.clone());
            }
        }
        values
    }

    /// Check every field, then every refinement. Values for fields outside
    /// the schema are ignored.
    pub fn validate(&self, values: &FormValues) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for field in &self.fields {
            field.check(values.get(field.name), &mut errors);
        }
        for refinement in &self.refinements {
            refinement.check(values, &mut errors);
        }
        errors.into_result()
    }
}

impl fmt::Display for FormSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            let marker = if field.required { "*" } else { "" };
            writeln!(f, "{}{marker} ({})", field.name, field.label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: &[&str] = &["LOW", "MEDIUM", "HIGH"];

    fn schema() -> FormSchema {
        FormSchema::new(vec![
            FieldRule::text("name", "Name").required(),
            FieldRule::choice("priority", "Priority", LEVELS).with_default("LOW"),
            FieldRule::number("vlan_id", "VLAN ID", 1, 4094).with_default(100),
            FieldRule::flags("eth_locks", "ETH locks", 4),
            FieldRule::text("interface", "Interface"),
            FieldRule::text("onu_sn", "Serial"),
        ])
        .refine(Refinement::RequiredWhenPresent {
            field: "onu_sn",
            trigger: "interface",
            message: "Serial is required when an interface is given",
        })
    }

    #[test]
    fn test_defaults() {
        let defaults = schema().defaults();
        assert_eq!(defaults.text("priority"), "LOW");
        assert_eq!(defaults.number("vlan_id"), Some(100));
        assert_eq!(defaults.flags("eth_locks"), vec![false; 4]);
        assert!(defaults.get("name").is_none());
    }

    #[test]
    fn test_blank_required_text_fails() {
        let values = schema().defaults().with("name", "   ");
        let errors = schema().validate(&values).unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_choice_and_range() {
        let values = schema()
            .defaults()
            .with("name", "Ann")
            .with("priority", "URGENT")
            .with("vlan_id", 5000_i64);
        let errors = schema().validate(&values).unwrap_err();
        assert!(errors.contains("priority"));
        assert_eq!(errors.get("vlan_id"), Some("VLAN ID must be between 1 and 4094"));
    }

    #[test]
    fn test_number_accepts_numeric_text() {
        let values = schema()
            .defaults()
            .with("name", "Ann")
            .with("vlan_id", "200");
        assert!(schema().validate(&values).is_ok());
        assert_eq!(values.number("vlan_id"), Some(200));
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let values = schema().defaults().with("name", true);
        let errors = schema().validate(&values).unwrap_err();
        assert_eq!(errors.get("name"), Some("Name cannot be a flag"));
    }

    #[test]
    fn test_required_when_present_refinement() {
        let values = schema()
            .defaults()
            .with("name", "Ann")
            .with("interface", "1/2/3:4");
        let errors = schema().validate(&values).unwrap_err();
        assert!(errors.contains("onu_sn"));

        let values = values.with("onu_sn", "ZTEG0001");
        assert!(schema().validate(&values).is_ok());
    }

    #[test]
    fn test_required_any_of_refinement() {
        let schema = FormSchema::new(vec![
            FieldRule::text("name", "Name"),
            FieldRule::text("user_pppoe", "PPPoE User"),
        ])
        .refine(Refinement::RequiredAnyOf {
            fields: &["name", "user_pppoe"],
            message: "Provide a name or PPPoE user",
        });

        let errors = schema.validate(&FormValues::new()).unwrap_err();
        assert_eq!(errors.get("name"), Some("Provide a name or PPPoE user"));
        assert!(schema
            .validate(&FormValues::new().with("user_pppoe", "ann01"))
            .is_ok());
    }

    #[test]
    fn test_flags_length() {
        let values = schema()
            .defaults()
            .with("name", "Ann")
            .with("eth_locks", vec![true, false]);
        let errors = schema().validate(&values).unwrap_err();
        assert!(errors.contains("eth_locks"));
    }
}
