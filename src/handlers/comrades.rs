use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;

use super::{fail_on, non_empty, parse_id, parse_int_param, parse_page, read_upload, require_object};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, timestamp_now},
    import::{
        self, ALLOWED_EXTENSIONS, ImportOutcome,
        row::{OPTIONAL_COLUMNS, REQUIRED_COLUMNS},
        sample::{self, SAMPLE_FILE_NAME},
    },
    models::{
        Comrade, ComradeList, ContactInfo, ImportColumns, ImportResponse, ImportSampleResponse,
        ImportStatistics, NewComrade,
    },
    repository::{ComradeFilter, DEFAULT_COMRADE_LIMIT},
    validators::{self, ValidationErrors, current_year},
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// ComradeQuery
///
/// Query parameters of `GET /api/comrades`. Kept as strings so malformed numbers
/// can be reported in the standard error envelope.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ComradeQuery {
    /// Matches first, last or middle name (case-insensitive substring).
    pub name: Option<String>,
    pub unit: Option<String>,
    pub region: Option<String>,
    pub rank: Option<String>,
    /// Service started in or after this year.
    pub year_from: Option<String>,
    /// Service ended in or before this year (unknown end years always match).
    pub year_to: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ComradeQuery {
    pub fn into_filter(self) -> Result<ComradeFilter, AppError> {
        let (limit, offset) =
            parse_page(self.limit.as_deref(), self.offset.as_deref(), DEFAULT_COMRADE_LIMIT)?;
        Ok(ComradeFilter {
            year_from: parse_int_param("yearFrom", self.year_from.as_deref())?,
            year_to: parse_int_param("yearTo", self.year_to.as_deref())?,
            name: non_empty(self.name),
            unit: non_empty(self.unit),
            region: non_empty(self.region),
            rank: non_empty(self.rank),
            limit,
            offset,
        })
    }
}

/// Years arrive as numbers or numeric strings. Floats are truncated.
fn coerce_year(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn text(body: &Value, field: &str) -> String {
    body.get(field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn optional_text(body: &Value, field: &str, errors: &mut ValidationErrors) -> Option<String> {
    match body.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(_) => {
            errors.insert(field.to_string(), format!("{field} must be a string"));
            None
        }
    }
}

/// comrade_from_body
///
/// Validates a create/update body and builds the record. Every failing field is
/// reported together. Contact info that is absent, null or empty is stored as none.
pub fn comrade_from_body(body: &Value) -> AppResult<NewComrade> {
    require_object(body)?;
    let mut errors = ValidationErrors::new();

    for (field, message) in [
        ("firstName", "First name is required"),
        ("lastName", "Last name is required"),
        ("unit", "Unit is required"),
        ("region", "Region is required"),
    ] {
        errors.extend(validators::validate_required_text(body, field, message));
    }

    let year_from = if is_blank(body.get("yearOfServiceFrom")) {
        errors.insert(
            "yearOfServiceFrom".to_string(),
            "Year of service from is required".to_string(),
        );
        None
    } else {
        let parsed = body.get("yearOfServiceFrom").and_then(coerce_year);
        if parsed.is_none() {
            errors.insert(
                "yearOfServiceFrom".to_string(),
                "Year of service from must be a number".to_string(),
            );
        }
        parsed
    };

    let year_to = if is_blank(body.get("yearOfServiceTo")) {
        None
    } else {
        let parsed = body.get("yearOfServiceTo").and_then(coerce_year);
        if parsed.is_none() {
            errors.insert(
                "yearOfServiceTo".to_string(),
                "Year of service to must be a number".to_string(),
            );
        }
        parsed
    };

    if year_from.is_some() {
        errors.extend(validators::validate_year_range(year_from, year_to));
    }

    let contact_info = match body.get("contactInfo") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::Array(items)) if items.is_empty() => None,
        Some(raw) => {
            let contact_errors = validators::validate_contact_info(raw);
            if contact_errors.is_empty() {
                let contact: ContactInfo = serde_json::from_value(raw.clone())?;
                normalize_contact(contact)
            } else {
                errors.extend(contact_errors);
                None
            }
        }
    };

    let middle_name = optional_text(body, "middleName", &mut errors);
    let rank = optional_text(body, "rank", &mut errors);
    let photo_url = optional_text(body, "photoUrl", &mut errors);
    let additional_info = optional_text(body, "additionalInfo", &mut errors);

    fail_on(errors)?;

    let Some(year_of_service_from) = year_from else {
        return Err(AppError::Internal("year checked above".to_string()));
    };

    Ok(NewComrade {
        first_name: text(body, "firstName"),
        last_name: text(body, "lastName"),
        middle_name,
        unit: text(body, "unit"),
        region: text(body, "region"),
        year_of_service_from,
        year_of_service_to: year_to,
        rank,
        photo_url,
        contact_info,
        additional_info,
    })
}

fn normalize_contact(contact: ContactInfo) -> Option<ContactInfo> {
    let trimmed = |v: Option<String>| {
        v.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let contact = ContactInfo {
        phone: trimmed(contact.phone),
        email: trimmed(contact.email),
        address: trimmed(contact.address),
    };
    (!contact.is_empty()).then_some(contact)
}

/// list_comrades
///
/// [Public Route] Roster search, ordered by last name then first name.
#[utoipa::path(
    get,
    path = "/api/comrades",
    params(ComradeQuery),
    responses(
        (status = 200, description = "Matching comrades", body = ComradeList),
        (status = 400, description = "Malformed filter")
    )
)]
pub async fn list_comrades(
    State(state): State<AppState>,
    Query(query): Query<ComradeQuery>,
) -> AppResult<Json<ComradeList>> {
    let filter = query.into_filter()?;
    let page = state.repo.list_comrades(&filter).await?;
    Ok(Json(ComradeList {
        comrades: page.items,
        total: page.total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

#[utoipa::path(
    get,
    path = "/api/comrades/{id}",
    params(("id" = i64, Path, description = "Comrade ID")),
    responses((status = 200, description = "Found", body = Comrade), (status = 404, description = "Not Found"))
)]
pub async fn get_comrade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Comrade>> {
    let id = parse_id(&id, "Comrade")?;
    state
        .repo
        .get_comrade(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Comrade"))
}

/// create_comrade
///
/// [Public Route] Visitors may submit a comrade; the record starts unverified.
#[utoipa::path(
    post,
    path = "/api/comrades",
    request_body = Comrade,
    responses((status = 201, description = "Created", body = Comrade), (status = 400, description = "Validation Error"))
)]
pub async fn create_comrade(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Comrade>)> {
    let Json(body) = payload?;
    let comrade = comrade_from_body(&body)?;
    let created = state.repo.create_comrade(comrade).await?;
    tracing::info!(comrade_id = created.id, "comrade created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_comrade
///
/// [Authenticated Route] Full replacement; omitted optional fields are cleared.
#[utoipa::path(
    put,
    path = "/api/comrades/{id}",
    params(("id" = i64, Path, description = "Comrade ID")),
    request_body = Comrade,
    responses(
        (status = 200, description = "Updated", body = Comrade),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comrade(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Comrade>> {
    let id = parse_id(&id, "Comrade")?;
    if state.repo.get_comrade(id).await?.is_none() {
        return Err(AppError::NotFound("Comrade"));
    }
    let Json(body) = payload?;
    let comrade = comrade_from_body(&body)?;
    let updated = state
        .repo
        .update_comrade(id, comrade)
        .await?
        .ok_or(AppError::NotFound("Comrade"))?;
    tracing::info!(comrade_id = id, user_id = auth_user.id, "comrade updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/comrades/{id}",
    params(("id" = i64, Path, description = "Comrade ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_comrade(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "Comrade")?;
    if !state.repo.delete_comrade(id).await? {
        return Err(AppError::NotFound("Comrade"));
    }
    tracing::info!(comrade_id = id, user_id = auth_user.id, "comrade deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// bulk_import
///
/// [Authenticated Route] Imports comrades from an `.xlsx`/`.xls` upload (field `file`).
/// Structural problems reject the file with 400; row problems are listed in
/// `import_errors` while the remaining rows are imported.
#[utoipa::path(
    post,
    path = "/api/comrades/bulk-import",
    responses(
        (status = 200, description = "Import finished", body = ImportResponse),
        (status = 400, description = "File rejected")
    )
)]
pub async fn bulk_import(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ImportResponse>> {
    let no_file = || AppError::bad_request("No file provided", "Excel file is required for bulk import");

    let form = read_upload(multipart.map_err(|_| no_file())?).await?;
    let file = form.file.ok_or_else(no_file)?;

    if file.file_name.trim().is_empty() {
        return Err(AppError::bad_request("No file selected", "Please select an Excel file"));
    }
    if !validators::allowed_extension(&file.file_name, &ALLOWED_EXTENSIONS) {
        return Err(AppError::bad_request(
            "Invalid file format",
            "Only Excel files (.xlsx, .xls) are supported",
        ));
    }

    tracing::info!(
        user_id = auth_user.id,
        file = %file.file_name,
        bytes = file.bytes.len(),
        "bulk import started"
    );

    match import::import_roster(state.repo.as_ref(), file.bytes, current_year()).await {
        ImportOutcome::Rejected { errors, warnings } => {
            Err(AppError::ImportRejected { errors, warnings })
        }
        ImportOutcome::Completed(report) => Ok(Json(ImportResponse {
            success: true,
            message: format!(
                "Import finished. Imported: {}, skipped: {}",
                report.imported, report.skipped
            ),
            statistics: ImportStatistics {
                imported: report.imported,
                skipped: report.skipped,
                total_processed: report.total_processed,
            },
            warnings: Some(report.warnings).filter(|w| !w.is_empty()),
            import_errors: Some(report.errors).filter(|e| !e.is_empty()),
            timestamp: timestamp_now(),
        })),
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct SampleQuery {
    /// `true` streams the example workbook instead of describing it.
    pub download: Option<String>,
}

/// bulk_import_sample
///
/// [Authenticated Route] Describes the import columns, or with `?download=true`
/// returns a ready-to-fill example workbook.
#[utoipa::path(
    get,
    path = "/api/comrades/bulk-import/sample",
    params(SampleQuery),
    responses(
        (status = 200, description = "Column schema, or the .xlsx when download=true", body = ImportSampleResponse)
    )
)]
pub async fn bulk_import_sample(
    _auth_user: AuthUser,
    Query(query): Query<SampleQuery>,
) -> AppResult<Response> {
    let download = query
        .download
        .as_deref()
        .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"));

    if download {
        let bytes = sample::build_sample_workbook()
            .map_err(|e| AppError::Internal(format!("failed to build sample workbook: {e}")))?;
        let disposition = format!("attachment; filename=\"{SAMPLE_FILE_NAME}\"");
        return Ok((
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            bytes,
        )
            .into_response());
    }

    Ok(Json(ImportSampleResponse {
        message: "Sample file is available for download".to_string(),
        columns: ImportColumns {
            required: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            optional: OPTIONAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
        },
        example: format!(
            "{} example comrades in the column order {}",
            sample::SAMPLE_ROWS.len(),
            sample::SAMPLE_HEADERS.join(", ")
        ),
        download_url: "/api/comrades/bulk-import/sample?download=true".to_string(),
        timestamp: timestamp_now(),
    })
    .into_response())
}
