use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{non_empty, parse_page, read_upload};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{FileList, NewStoredFile, StoredFile},
    repository::{DEFAULT_FILE_LIMIT, FileFilter},
    validators,
};

pub const FILE_TYPE_PDF: &str = "pdf";
pub const FILE_TYPE_IMAGE: &str = "image";
pub const DEFAULT_CATEGORY: &str = "other";

const MB: usize = 1024 * 1024;

/// Upload rules for one accepted file type.
struct UploadRule {
    extensions: &'static [&'static str],
    max_size: usize,
}

fn upload_rule(file_type: &str) -> Option<UploadRule> {
    match file_type {
        FILE_TYPE_PDF => Some(UploadRule {
            extensions: &["pdf"],
            max_size: 10 * MB,
        }),
        FILE_TYPE_IMAGE => Some(UploadRule {
            extensions: &["png", "jpg", "jpeg", "gif", "webp"],
            max_size: 5 * MB,
        }),
        _ => None,
    }
}

fn invalid_file_type() -> AppError {
    AppError::bad_request("Invalid file type", "Type must be either \"pdf\" or \"image\"")
}

/// Final path component of a client-supplied name.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or_default()
}

/// secure_filename
///
/// Reduces a client-supplied name to ASCII letters, digits, `-`, `_` and `.`,
/// drops any directory part and leading dots. Whitespace becomes `_`.
pub fn secure_filename(name: &str) -> String {
    let cleaned: String = base_name(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// stored_filename
///
/// `<stem>_<YYYYmmdd_HHMMSS>_<unique>.<ext>` with a lower-cased extension. The
/// extension is split off before sanitising, so a name with no ASCII stem keeps it;
/// such a stem becomes `file`. `unique` keeps same-second uploads of one name apart.
pub fn stored_filename(original: &str, now: chrono::DateTime<Utc>, unique: &str) -> String {
    let base = base_name(original).trim();
    let (stem, ext) = base.rsplit_once('.').unwrap_or((base, ""));
    let stem = secure_filename(stem);
    let stem = if stem.is_empty() { "file" } else { stem.as_str() };
    let ext = secure_filename(ext).to_ascii_lowercase();
    let timestamp = now.format("%Y%m%d_%H%M%S");
    if ext.is_empty() {
        format!("{stem}_{timestamp}_{unique}")
    } else {
        format!("{stem}_{timestamp}_{unique}.{ext}")
    }
}

/// Short random tag for object keys.
fn unique_tag() -> String {
    let mut tag = Uuid::new_v4().simple().to_string();
    tag.truncate(12);
    tag
}

/// Content type for stored objects, derived from the extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// upload_file
///
/// [Authenticated Route] Multipart form with `file`, `type` (`pdf` | `image`)
/// and optional `category`. Bytes go to object storage, metadata to the database.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    responses(
        (status = 201, description = "Stored", body = StoredFile),
        (status = 400, description = "Rejected upload")
    )
)]
pub async fn upload_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<StoredFile>)> {
    let no_file = || AppError::bad_request("No file provided", "File field is required");

    let form = read_upload(multipart.map_err(|_| no_file())?).await?;
    let file_type = form.field("type").map(str::to_string);
    let category = form.field("category").unwrap_or(DEFAULT_CATEGORY).to_string();
    let file = form.file.ok_or_else(no_file)?;

    if file.file_name.trim().is_empty() {
        return Err(AppError::bad_request("No file selected", "Please select a file"));
    }

    let file_type = file_type.ok_or_else(invalid_file_type)?;
    let rule = upload_rule(&file_type).ok_or_else(invalid_file_type)?;

    if !validators::allowed_extension(&file.file_name, rule.extensions) {
        return Err(AppError::bad_request(
            "Invalid file format",
            format!(
                "Allowed formats for {file_type}: {}",
                rule.extensions.join(", ")
            ),
        ));
    }

    if file.bytes.len() > rule.max_size {
        return Err(AppError::bad_request(
            "File size too large",
            format!("Maximum file size for {file_type}: {}MB", rule.max_size / MB),
        ));
    }

    let filename = stored_filename(&file.file_name, Utc::now(), &unique_tag());
    let size = file.bytes.len() as i64;

    state
        .storage
        .put_object(&filename, file.bytes, content_type_for(&filename))
        .await?;

    let record = NewStoredFile {
        url: state.config.file_url(&filename),
        original_name: base_name(&file.file_name).trim().to_string(),
        filename: filename.clone(),
        file_type,
        category,
        size,
    };

    let stored = match state.repo.create_file(record).await {
        Ok(stored) => stored,
        Err(e) => {
            // Leave no orphaned object behind when the metadata insert fails.
            if let Err(cleanup) = state.storage.delete_object(&filename).await {
                tracing::warn!(error = %cleanup, "orphaned upload cleanup failed");
            }
            return Err(e);
        }
    };

    tracing::info!(
        file_id = %stored.id,
        user_id = auth_user.id,
        size = stored.size,
        "file uploaded"
    );
    Ok((StatusCode::CREATED, Json(stored)))
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct FileQuery {
    /// `pdf` or `image`.
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl FileQuery {
    pub fn into_filter(self) -> AppResult<FileFilter> {
        let (limit, offset) =
            parse_page(self.limit.as_deref(), self.offset.as_deref(), DEFAULT_FILE_LIMIT)?;
        let file_type = non_empty(self.file_type);
        if let Some(kind) = file_type.as_deref() {
            upload_rule(kind).ok_or_else(invalid_file_type)?;
        }
        Ok(FileFilter {
            file_type,
            category: non_empty(self.category),
            limit,
            offset,
        })
    }
}

/// list_files
///
/// [Authenticated Route] Most recent uploads first.
#[utoipa::path(
    get,
    path = "/api/files",
    params(FileQuery),
    responses((status = 200, description = "Uploaded files", body = FileList), (status = 400, description = "Invalid file type"))
)]
pub async fn list_files(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> AppResult<Json<FileList>> {
    let filter = query.into_filter()?;
    let page = state.repo.list_files(&filter).await?;
    Ok(Json(FileList {
        files: page.items,
        total: page.total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

/// get_file
///
/// [Public Route] Metadata only; the bytes are served by `download_file`.
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    params(("id" = String, Path, description = "File ID")),
    responses((status = 200, description = "Found", body = StoredFile), (status = 404, description = "Not Found"))
)]
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<StoredFile>> {
    state
        .repo
        .get_file(&id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("File"))
}

/// delete_file
///
/// [Authenticated Route] Removes the stored object, then the metadata row.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    params(("id" = String, Path, description = "File ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let file = state
        .repo
        .get_file(&id)
        .await?
        .ok_or(AppError::NotFound("File"))?;

    state.storage.delete_object(&file.filename).await?;
    if !state.repo.delete_file(&id).await? {
        return Err(AppError::NotFound("File"));
    }

    tracing::info!(file_id = %id, user_id = auth_user.id, "file deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// download_file
///
/// [Public Route] Streams a stored upload by its stored filename.
#[utoipa::path(
    get,
    path = "/api/files/uploads/{filename}",
    params(("filename" = String, Path, description = "Stored filename")),
    responses((status = 200, description = "File bytes"), (status = 404, description = "Not Found"))
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let object = state
        .storage
        .get_object(&filename)
        .await?
        .ok_or(AppError::NotFound("File"))?;

    let content_type = object
        .content_type
        .unwrap_or_else(|| content_type_for(&filename).to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], object.bytes).into_response())
}
