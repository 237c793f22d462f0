//! HTTP handlers, one module per resource.
//!
//! Handlers take raw `serde_json::Value` bodies where field-level validation must
//! report every problem at once; typed deserialisation happens only after the
//! validators pass. Numeric and date query parameters are parsed here so a bad
//! value becomes a 400 envelope rather than an extractor rejection.

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::validators::{self, ValidationErrors};

pub mod admin;
pub mod auth;
pub mod comrades;
pub mod files;
pub mod laws;
pub mod news;
pub mod system;

/// Upper bound for `limit` on every listing.
pub const MAX_PAGE_SIZE: i64 = 500;

/// Path ids are numeric; anything else cannot name an existing record.
pub(crate) fn parse_id(raw: &str, resource: &'static str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::NotFound(resource))
}

/// Trimmed, non-empty query value.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_int_param(name: &str, value: Option<&str>) -> AppResult<Option<i64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
            AppError::bad_request("Invalid parameter", format!("{name} must be a number"))
        }),
    }
}

/// `limit`/`offset` with a per-resource default limit. Negative values are rejected.
pub(crate) fn parse_page(
    limit: Option<&str>,
    offset: Option<&str>,
    default_limit: i64,
) -> AppResult<(i64, i64)> {
    let limit = parse_int_param("limit", limit)?.unwrap_or(default_limit);
    let offset = parse_int_param("offset", offset)?.unwrap_or(0);
    if limit < 0 || offset < 0 {
        return Err(AppError::bad_request(
            "Invalid parameter",
            "limit and offset must not be negative",
        ));
    }
    Ok((limit.min(MAX_PAGE_SIZE), offset))
}

pub(crate) fn parse_date_param(
    name: &str,
    value: Option<&str>,
) -> AppResult<Option<chrono::NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => validators::parse_date(raw).map(Some).ok_or_else(|| {
            AppError::bad_request(
                "Invalid parameter",
                format!("{name} must be in YYYY-MM-DD format"),
            )
        }),
    }
}

/// Request bodies must be JSON objects.
pub(crate) fn require_object(body: &Value) -> AppResult<()> {
    if body.is_object() {
        Ok(())
    } else {
        Err(AppError::bad_request(
            "Invalid request",
            "Request body must be a JSON object",
        ))
    }
}

pub(crate) fn fail_on(errors: ValidationErrors) -> AppResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation { details: errors })
    }
}

/// UploadedFile
///
/// The `file` part of a multipart form, read fully into memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// UploadForm
///
/// A multipart form split into its `file` part and its plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: std::collections::HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Drains a multipart body. Only the first `file` part is kept.
pub(crate) async fn read_upload(mut multipart: axum::extract::Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?.to_vec();
            if form.file.is_none() {
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}
