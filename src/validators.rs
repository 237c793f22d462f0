//! Field validators shared by the roster, law and news endpoints and by the bulk importer.
//!
//! Every validator returns a [`ValidationErrors`] map keyed by dotted field path
//! (`title.ru`, `contactInfo.phone`, ...). An empty map means the input is valid.
//! Failures are data, never panics or `Err`s, so callers can merge the results of
//! several validators and report them all at once.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use serde_json::Value;

pub type ValidationErrors = BTreeMap<String, String>;

/// Languages every multilingual field must carry.
pub const LANGUAGES: [&str; 3] = ["ru", "uz", "en"];

pub const MIN_SERVICE_YEAR: i64 = 1900;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn current_year() -> i64 {
    i64::from(Utc::now().year())
}

/// validate_multilang_text
///
/// Checks `data[field]` is an object carrying a non-blank string for each of
/// `ru`, `uz` and `en`. Each language is checked on its own, so a single field can
/// yield up to three errors. Optional fields (`required == false`) never fail on
/// missing or blank languages, only on a non-object value.
pub fn validate_multilang_text(data: &Value, field: &str, required: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let Some(value) = data.get(field).filter(|v| !v.is_null()) else {
        if required {
            errors.insert(field.to_string(), format!("{field} is required"));
        }
        return errors;
    };

    let Some(object) = value.as_object() else {
        errors.insert(field.to_string(), format!("{field} must be an object"));
        return errors;
    };

    if !required {
        return errors;
    }

    for lang in LANGUAGES {
        let path = format!("{field}.{lang}");
        match object.get(lang) {
            None | Some(Value::Null) => {
                errors.insert(path, format!("{field} in {lang} is required"));
            }
            Some(Value::String(text)) if text.trim().is_empty() => {
                errors.insert(path, format!("{field} in {lang} cannot be empty"));
            }
            Some(Value::String(_)) => {}
            Some(_) => {
                errors.insert(path, format!("{field} in {lang} must be a string"));
            }
        }
    }

    errors
}

/// validate_date
///
/// `data[field]` must be a `YYYY-MM-DD` string naming a real calendar date.
pub fn validate_date(data: &Value, field: &str, required: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let raw = match data.get(field) {
        None | Some(Value::Null) => {
            if required {
                errors.insert(field.to_string(), format!("{field} is required"));
            }
            return errors;
        }
        Some(Value::String(s)) if s.is_empty() => {
            if required {
                errors.insert(field.to_string(), format!("{field} cannot be empty"));
            }
            return errors;
        }
        Some(Value::String(s)) => s.as_str(),
        Some(_) => {
            errors.insert(field.to_string(), format!("{field} must be in YYYY-MM-DD format"));
            return errors;
        }
    };

    if parse_date(raw).is_none() {
        errors.insert(field.to_string(), format!("{field} must be in YYYY-MM-DD format"));
    }

    errors
}

/// Strict `YYYY-MM-DD` parse. Rejects trailing garbage and non-padded forms.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// validate_year_range
///
/// Service years against the current calendar year. See [`validate_year_range_at`].
pub fn validate_year_range(year_from: Option<i64>, year_to: Option<i64>) -> ValidationErrors {
    validate_year_range_at(year_from, year_to, current_year())
}

/// validate_year_range_at
///
/// Each present bound must lie in `[1900, current_year]`. When both are present,
/// `year_to` must not precede `year_from`. Every violated rule gets its own entry,
/// so a reversed pair of out-of-range years reports three errors.
pub fn validate_year_range_at(
    year_from: Option<i64>,
    year_to: Option<i64>,
    current_year: i64,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let in_range = |year: i64| (MIN_SERVICE_YEAR..=current_year).contains(&year);

    if let Some(from) = year_from {
        if !in_range(from) {
            errors.insert(
                "yearOfServiceFrom".to_string(),
                format!("Year from must be between {MIN_SERVICE_YEAR} and {current_year}"),
            );
        }
    }

    if let Some(to) = year_to {
        if !in_range(to) {
            errors.insert(
                "yearOfServiceTo".to_string(),
                format!("Year to must be between {MIN_SERVICE_YEAR} and {current_year}"),
            );
        }
    }

    if let (Some(from), Some(to)) = (year_from, year_to) {
        if to < from {
            errors.insert(
                "yearOfServiceRange".to_string(),
                "Year to cannot be earlier than year from".to_string(),
            );
        }
    }

    errors
}

/// validate_contact_info
///
/// Raw-JSON entry point: anything but an object is a single `contactInfo` error.
pub fn validate_contact_info(contact: &Value) -> ValidationErrors {
    let Some(object) = contact.as_object() else {
        let mut errors = ValidationErrors::new();
        errors.insert(
            "contactInfo".to_string(),
            "Contact info must be an object".to_string(),
        );
        return errors;
    };

    let mut errors = ValidationErrors::new();
    for key in ["phone", "email", "address"] {
        match object.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => {
                errors.insert(format!("contactInfo.{key}"), format!("{key} must be a string"));
            }
        }
    }

    let phone = object.get("phone").and_then(Value::as_str);
    let email = object.get("email").and_then(Value::as_str);
    errors.extend(contact_field_errors(phone, email));
    errors
}

/// Shared phone/email rules used by both the raw-JSON validator and `ContactInfo::validate`.
pub fn contact_field_errors(phone: Option<&str>, email: Option<&str>) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) {
        if !phone.starts_with('+') || phone.chars().count() < 10 {
            errors.insert(
                "contactInfo.phone".to_string(),
                "Phone must start with + and be at least 10 characters".to_string(),
            );
        }
    }

    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        if !email.contains('@') || !email.contains('.') {
            errors.insert(
                "contactInfo.email".to_string(),
                "Invalid email format".to_string(),
            );
        }
    }

    errors
}

/// validate_required_text
///
/// Plain required string (comrade names, unit, region).
pub fn validate_required_text(data: &Value, field: &str, message: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let present = data
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !present {
        errors.insert(field.to_string(), message.to_string());
    }
    errors
}

/// Case-insensitive check of a filename's final extension against an allow-list.
pub fn allowed_extension(filename: &str, allowed: &[&str]) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| allowed.contains(&ext.as_str()))
}
