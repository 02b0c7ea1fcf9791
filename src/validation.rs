//! Validation functions for form fields.
//
// Format predicates for emails, phone numbers, dates and times, plus the
// `Validator` that applies them to a form and marks failing fields.

use crate::form::{sanitize, FieldKind, Form, FormField};
use chrono::{Datelike, Local, NaiveDate, NaiveTime, Weekday};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]{1,64}@(?:[A-Za-z0-9-]{1,63}\.)+[A-Za-z]{2,63}$")
        .expect("email pattern compiles")
});

// Optional leading '+', digits with space, dot, dash or parenthesis separators
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?\(?[0-9][0-9\s().-]*[0-9]$").expect("phone pattern compiles")
});

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}$").expect("time pattern compiles"));

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

pub const REQUIRED_REASON: &str = "This field is required.";
pub const EMAIL_REASON: &str = "Please enter a valid email address.";
pub const PHONE_REASON: &str = "Please enter a valid phone number with at least 10 digits.";
pub const DATE_FORMAT_REASON: &str = "Please enter a date as YYYY-MM-DD.";
pub const PAST_DATE_REASON: &str = "Please choose today or a future date.";
pub const TIME_FORMAT_REASON: &str = "Please enter a time as HH:MM.";
pub const OPTION_REASON: &str = "Please choose one of the listed options.";

/// Validate email has the local@domain.tld shape
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Validate a loosely formatted phone number with 10 to 15 digits
pub fn validate_phone(phone: &str) -> bool {
    let phone = phone.trim();
    if !PHONE_RE.is_match(phone) {
        return false;
    }
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

/// Parse a time string with format HH:MM
pub fn parse_time(time: &str) -> Option<NaiveTime> {
    let time = time.trim();
    if !TIME_RE.is_match(time) {
        return None;
    }
    let (hours, minutes) = time.split_once(':')?;
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// Parse a date string with format YYYY-MM-DD
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if !DATE_RE.is_match(date) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Opening hours: a half-open `[start, end)` time window on a set of weekdays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub days: Vec<Weekday>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
            ],
        }
    }
}

impl BusinessHours {
    pub fn contains_time(&self, time: NaiveTime) -> bool {
        time >= self.start && time < self.end
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        self.days.contains(&date.weekday())
    }

    pub fn describe(&self) -> String {
        format!("{} and {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Source of "today" for date checks
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn failed_fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }
}

pub struct Validator {
    hours: BusinessHours,
    clock: Arc<dyn Clock>,
}

impl Validator {
    pub fn new(hours: BusinessHours) -> Self {
        Self::with_clock(hours, Arc::new(SystemClock))
    }

    pub fn with_clock(hours: BusinessHours, clock: Arc<dyn Clock>) -> Self {
        Self { hours, clock }
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Check one field, returning the human-readable reason on failure.
    /// Empty optional fields are not format-checked.
    pub fn check_field(&self, field: &FormField) -> Result<(), String> {
        if field.is_blank() {
            return if field.required { Err(REQUIRED_REASON.to_string()) } else { Ok(()) };
        }

        // Formats are checked on what will actually be sent
        let value = sanitize(&field.value);
        match field.kind {
            FieldKind::Email if !validate_email(&value) => Err(EMAIL_REASON.to_string()),
            FieldKind::Tel if !validate_phone(&value) => Err(PHONE_REASON.to_string()),
            FieldKind::Time => match parse_time(&value) {
                None => Err(TIME_FORMAT_REASON.to_string()),
                Some(time) if !self.hours.contains_time(time) => {
                    Err(format!("Please choose a time between {}.", self.hours.describe()))
                }
                Some(_) => Ok(()),
            },
            FieldKind::Date => match parse_date(&value) {
                None => Err(DATE_FORMAT_REASON.to_string()),
                Some(date) if date < self.clock.today() => Err(PAST_DATE_REASON.to_string()),
                Some(_) => Ok(()),
            },
            FieldKind::Select if !field.options.is_empty() && field.selected_option().is_none() => {
                Err(OPTION_REASON.to_string())
            }
            _ => Ok(()),
        }
    }

    /// Validate a single field and update its invalid mark
    pub fn validate_field(&self, field: &mut FormField) -> bool {
        match self.check_field(field) {
            Ok(()) => {
                field.clear_mark();
                true
            }
            Err(reason) => {
                debug!("Field '{}' failed validation: {}", field.id, reason);
                field.mark_invalid(reason);
                false
            }
        }
    }

    /// Validate every field of the form, marking and clearing as it goes
    pub fn validate_form(&self, form: &mut Form) -> ValidationReport {
        let mut report = ValidationReport::default();
        for field in form.fields_mut() {
            if !self.validate_field(field) {
                report.issues.push(ValidationIssue {
                    field: field.id.clone(),
                    reason: field.tooltip.clone().unwrap_or_default(),
                });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn validator() -> Validator {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        Validator::with_clock(BusinessHours::default(), Arc::new(FixedClock(today)))
    }

    #[test_case("jane@x.com", true; "simple")]
    #[test_case("first.last+tag@mail.example.co.uk", true; "subdomains and plus")]
    #[test_case("jane.x.com", false; "missing at")]
    #[test_case("jane@x", false; "missing domain suffix")]
    #[test_case("jane@x.c", false; "short tld")]
    #[test_case("@x.com", false; "empty local part")]
    #[test_case("ja ne@x.com", false; "space in local part")]
    fn test_validate_email(input: &str, expected: bool) {
        assert_eq!(validate_email(input), expected);
    }

    #[test_case("555-123-4567", true; "dashed")]
    #[test_case("(555) 123-4567", true; "parenthesised area code")]
    #[test_case("+1 555.123.4567", true; "country code with dots")]
    #[test_case("5551234567", true; "bare digits")]
    #[test_case("555-1234", false; "too few digits")]
    #[test_case("555-123-456x", false; "letters")]
    #[test_case("1234567890123456", false; "too many digits")]
    fn test_validate_phone(input: &str, expected: bool) {
        assert_eq!(validate_phone(input), expected);
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("9:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_time("24:00"), None);
        assert_eq!(parse_time("12:60"), None);
        assert_eq!(parse_time("noon"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2099-01-01"), NaiveDate::from_ymd_opt(2099, 1, 1));
        assert_eq!(parse_date("2099-02-30"), None);
        assert_eq!(parse_date("01/01/2099"), None);
    }

    #[test_case("08:00", true; "opening time")]
    #[test_case("09:00", true; "morning")]
    #[test_case("15:59", true; "last minute")]
    #[test_case("07:59", false; "before opening")]
    #[test_case("16:00", false; "closing time")]
    #[test_case("17:00", false; "after closing")]
    fn test_time_within_business_hours(input: &str, expected: bool) {
        let mut field = FormField::new("time", "time", "Time", FieldKind::Time).required();
        field.value = input.to_string();
        assert_eq!(validator().check_field(&field).is_ok(), expected);
    }

    #[test_case("2026-10-15", false; "yesterday")]
    #[test_case("2020-01-01", false; "long ago")]
    #[test_case("2026-10-16", true; "today")]
    #[test_case("2026-10-17", true; "tomorrow")]
    fn test_date_not_in_past(input: &str, expected: bool) {
        let mut field = FormField::new("date", "date", "Date", FieldKind::Date).required();
        field.value = input.to_string();
        assert_eq!(validator().check_field(&field).is_ok(), expected);
    }

    #[test]
    fn test_required_blank_fields_fail() {
        let mut form = Form::contact();
        form.set("contactName", "   ").unwrap();
        let report = validator().validate_form(&mut form);
        assert!(!report.is_valid());
        assert_eq!(
            report.failed_fields(),
            vec!["contactName", "contactEmail", "contactSubject", "contactMessage"]
        );
        assert_eq!(form.field("contactName").unwrap().tooltip.as_deref(), Some(REQUIRED_REASON));
    }

    #[test]
    fn test_required_fields_that_sanitize_to_nothing_fail() {
        let mut form = Form::contact();
        form.set("contactName", "<>").unwrap();
        form.set("contactEmail", "jane@x.com").unwrap();
        form.set("contactSubject", "\u{7}\u{7}").unwrap();
        form.set("contactMessage", "<< >>").unwrap();

        let report = validator().validate_form(&mut form);
        assert_eq!(
            report.failed_fields(),
            vec!["contactName", "contactSubject", "contactMessage"]
        );
        assert!(report.issues.iter().all(|issue| issue.reason == REQUIRED_REASON));
    }

    #[test]
    fn test_formats_checked_on_sanitized_value() {
        let mut field = FormField::new("time", "time", "Time", FieldKind::Time).required();
        field.value = "<09:00>".to_string();
        assert!(validator().check_field(&field).is_ok());
        assert_eq!(field.payload_value(), "09:00");
    }

    #[test]
    fn test_optional_blank_field_passes() {
        let field = FormField::new("notes", "notes", "Notes", FieldKind::TextArea);
        assert!(validator().check_field(&field).is_ok());
    }

    #[test]
    fn test_mark_cleared_once_valid() {
        let v = validator();
        let mut field = FormField::new("email", "email", "Email", FieldKind::Email).required();
        field.value = "jane".to_string();
        assert!(!v.validate_field(&mut field));
        assert!(field.invalid);
        assert_eq!(field.tooltip.as_deref(), Some(EMAIL_REASON));

        field.value = "jane@x.com".to_string();
        assert!(v.validate_field(&mut field));
        assert!(!field.invalid);
        assert_eq!(field.tooltip, None);
    }

    #[test]
    fn test_booking_scenario_fails_only_on_time() {
        let v = validator();
        let mut form = Form::booking();
        form.set("name", "Jane").unwrap();
        form.set("email", "jane@x.com").unwrap();
        form.set("phone", "555-123-4567").unwrap();
        form.set("address", "1 Main St").unwrap();
        form.set("yardSize", "small").unwrap();
        form.set("date", "2099-01-01").unwrap();
        form.set("time", "09:00").unwrap();
        assert!(v.validate_form(&mut form).is_valid());

        form.set("time", "17:00").unwrap();
        let report = v.validate_form(&mut form);
        assert_eq!(report.failed_fields(), vec!["time"]);
        assert_eq!(report.issues[0].reason, "Please choose a time between 08:00 and 16:00.");
    }

    #[test]
    fn test_business_days() {
        let hours = BusinessHours::default();
        let friday = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert!(hours.is_business_day(friday));
        assert!(!hours.is_business_day(sunday));
    }
}
