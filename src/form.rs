//! In-memory model of the booking and contact forms.
//
// Fields are addressed by their stable element identifiers. Each field also
// carries the key it contributes to the outgoing payload.

use log::debug;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

pub const BOOKING_SUBMIT_LABEL: &str = "Book Now";
pub const CONTACT_SUBMIT_LABEL: &str = "Send Message";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Unknown field '{0}'")]
    UnknownField(String),
    #[error("'{value}' is not an option of '{field}'")]
    UnknownOption { field: String, value: String },
}

/// Which of the two page forms a [`Form`] models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Booking,
    Contact,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Booking => "booking",
            FormKind::Contact => "contact",
        }
    }

    /// Message shown after the mail service accepted the submission
    pub fn success_message(&self) -> &'static str {
        match self {
            FormKind::Booking => "Booking request sent successfully! We will contact you shortly.",
            FormKind::Contact => "Message sent successfully! We will get back to you soon.",
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Date,
    Time,
    Select,
    TextArea,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self { value: value.to_string(), label: label.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct FormField {
    /// Element identifier, e.g. `contactEmail`
    pub id: String,
    /// Key used in the payload, e.g. `email`
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub value: String,
    pub options: Vec<SelectOption>,
    pub invalid: bool,
    pub tooltip: Option<String>,
}

impl FormField {
    pub fn new(id: &str, name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: false,
            value: String::new(),
            options: Vec::new(),
            invalid: false,
            tooltip: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    /// True when nothing would be left of the value once sanitized
    pub fn is_blank(&self) -> bool {
        sanitize(&self.value).is_empty()
    }

    /// The option matching the current value, by value attribute or label
    pub fn selected_option(&self) -> Option<&SelectOption> {
        let current = self.value.trim();
        self.options
            .iter()
            .find(|opt| opt.value == current || opt.label.eq_ignore_ascii_case(current))
    }

    /// Value as it should appear in the payload. Selects report the
    /// display label of the chosen option rather than its value attribute.
    pub fn payload_value(&self) -> String {
        match self.kind {
            FieldKind::Select => match self.selected_option() {
                Some(opt) => sanitize(&opt.label),
                None => sanitize(&self.value),
            },
            _ => sanitize(&self.value),
        }
    }

    pub fn mark_invalid(&mut self, reason: impl Into<String>) {
        self.invalid = true;
        self.tooltip = Some(reason.into());
    }

    pub fn clear_mark(&mut self) {
        self.invalid = false;
        self.tooltip = None;
    }
}

/// Submit button state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub enabled: bool,
    pub label: String,
}

impl SubmitControl {
    pub fn new(label: &str) -> Self {
        Self { enabled: true, label: label.to_string() }
    }

    pub fn for_form(kind: FormKind) -> Self {
        match kind {
            FormKind::Booking => Self::new(BOOKING_SUBMIT_LABEL),
            FormKind::Contact => Self::new(CONTACT_SUBMIT_LABEL),
        }
    }

    /// Disable the control with a busy label, returning the previous state
    pub fn begin(&mut self, busy_label: &str) -> SubmitControl {
        let saved = self.clone();
        self.enabled = false;
        self.label = busy_label.to_string();
        saved
    }

    pub fn restore(&mut self, saved: SubmitControl) {
        *self = saved;
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    kind: FormKind,
    fields: Vec<FormField>,
}

impl Form {
    pub fn new(kind: FormKind, fields: Vec<FormField>) -> Self {
        Self { kind, fields }
    }

    pub fn for_kind(kind: FormKind) -> Self {
        match kind {
            FormKind::Booking => Self::booking(),
            FormKind::Contact => Self::contact(),
        }
    }

    pub fn booking() -> Self {
        Self::new(
            FormKind::Booking,
            vec![
                FormField::new("name", "name", "Full name", FieldKind::Text).required(),
                FormField::new("email", "email", "Email", FieldKind::Email).required(),
                FormField::new("phone", "phone", "Phone", FieldKind::Tel).required(),
                FormField::new("address", "address", "Service address", FieldKind::Text).required(),
                FormField::new("yardSize", "yardSize", "Yard size", FieldKind::Select)
                    .required()
                    .with_options(yard_size_options()),
                FormField::new("date", "date", "Preferred date", FieldKind::Date).required(),
                FormField::new("time", "time", "Preferred time", FieldKind::Time).required(),
                FormField::new("notes", "notes", "Notes", FieldKind::TextArea),
            ],
        )
    }

    pub fn contact() -> Self {
        Self::new(
            FormKind::Contact,
            vec![
                FormField::new("contactName", "name", "Name", FieldKind::Text).required(),
                FormField::new("contactEmail", "email", "Email", FieldKind::Email).required(),
                FormField::new("contactSubject", "subject", "Subject", FieldKind::Text).required(),
                FormField::new("contactMessage", "message", "Message", FieldKind::TextArea)
                    .required(),
            ],
        )
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [FormField] {
        &mut self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|f| f.id == id)
    }

    pub fn value(&self, id: &str) -> Option<&str> {
        self.field(id).map(|f| f.value.as_str())
    }

    /// Write a value into the field with the given element identifier.
    /// Select fields only accept one of their option values or labels.
    pub fn set(&mut self, id: &str, value: &str) -> Result<(), FormError> {
        let field = self.field_mut(id).ok_or_else(|| FormError::UnknownField(id.to_string()))?;
        if field.kind == FieldKind::Select && !value.trim().is_empty() {
            let option = field
                .options
                .iter()
                .find(|opt| {
                    opt.value == value.trim() || opt.label.eq_ignore_ascii_case(value.trim())
                })
                .ok_or_else(|| FormError::UnknownOption {
                    field: id.to_string(),
                    value: value.to_string(),
                })?;
            field.value = option.value.clone();
        } else {
            field.value = value.to_string();
        }
        Ok(())
    }

    pub fn invalid_fields(&self) -> Vec<&str> {
        self.fields.iter().filter(|f| f.invalid).map(|f| f.id.as_str()).collect()
    }

    /// Clear every value along with any lingering invalid marks
    pub fn reset(&mut self) {
        debug!("Resetting {} form", self.kind);
        for field in &mut self.fields {
            field.value.clear();
            field.clear_mark();
        }
    }

    /// Read every field into a fresh payload, in form order
    pub fn collect_payload(&self) -> FormPayload {
        let mut payload = FormPayload::new();
        for field in &self.fields {
            payload.insert(&field.name, field.payload_value());
        }
        payload
    }
}

fn yard_size_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("small", "Small (under 1/4 acre)"),
        SelectOption::new("medium", "Medium (1/4 - 1/2 acre)"),
        SelectOption::new("large", "Large (1/2 - 1 acre)"),
        SelectOption::new("xlarge", "Extra Large (over 1 acre)"),
    ]
}

/// Trim a value, drop control characters other than newlines and tabs,
/// and strip angle brackets so nothing resembling markup reaches the template.
pub fn sanitize(input: &str) -> String {
    let kept: String = input
        .chars()
        .filter(|&c| (!c.is_control() || c == '\n' || c == '\t') && c != '<' && c != '>')
        .collect();
    kept.trim().to_string()
}

/// Ordered field-name to value mapping sent to the mail service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    entries: Vec<(String, String)>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value; replacing keeps the original position
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FormPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
