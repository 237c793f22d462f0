use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::validators::{self, ValidationErrors};

// --- Identity ---

/// User
///
/// An editor or administrator account from the `users` table.
/// The password hash never leaves the server: use [`UserProfile`] for responses.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    // 'admin' or 'editor'.
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// UserProfile
///
/// Public view of a [`User`], returned by login and token verification.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserProfile,
}

// --- Shared value types ---

/// MultilingualText
///
/// A text attribute carried simultaneously in Russian, Uzbek and English.
/// Storage flattens it into `<field>_ru/_uz/_en` columns; that mapping is
/// private to the repository.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct MultilingualText {
    pub ru: String,
    pub uz: String,
    pub en: String,
}

impl MultilingualText {
    pub fn new(ru: impl Into<String>, uz: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            ru: ru.into(),
            uz: uz.into(),
            en: en.into(),
        }
    }

    /// Case-insensitive substring match against any language.
    pub fn contains_ci(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.ru, &self.uz, &self.en]
            .iter()
            .any(|text| text.to_lowercase().contains(&needle))
    }
}

/// ContactInfo
///
/// Optional phone/email/address block attached to a comrade. Absent fields are
/// omitted from JSON, so an empty block serialises as `{}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email.is_none() && self.address.is_none()
    }

    /// Same phone/email rules as the raw-JSON `validate_contact_info`.
    pub fn validate(&self) -> ValidationErrors {
        validators::contact_field_errors(self.phone.as_deref(), self.email.as_deref())
    }
}

// --- Roster ---

/// Comrade
///
/// One roster entry: a person who served, searchable by name, unit, region,
/// rank and service years.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Comrade {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub unit: String,
    pub region: String,
    pub year_of_service_from: i64,
    pub year_of_service_to: Option<i64>,
    pub rank: Option<String>,
    pub photo_url: Option<String>,
    pub contact_info: ContactInfo,
    pub additional_info: Option<String>,
    pub is_verified: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewComrade
///
/// Validated comrade fields, ready to insert or to replace an existing record.
/// Produced both by the JSON endpoints and by the bulk importer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewComrade {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub unit: String,
    pub region: String,
    pub year_of_service_from: i64,
    pub year_of_service_to: Option<i64>,
    pub rank: Option<String>,
    pub photo_url: Option<String>,
    pub contact_info: Option<ContactInfo>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ComradeList {
    pub comrades: Vec<Comrade>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// --- Laws ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Law {
    pub id: i64,
    pub title: MultilingualText,
    pub description: MultilingualText,
    pub category: MultilingualText,
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub pdf_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// LawInput
///
/// Body of `POST /api/laws` and `PUT /api/laws/{id}`, deserialised only after
/// the raw JSON has passed the multilingual and date validators.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LawInput {
    pub title: MultilingualText,
    pub description: MultilingualText,
    pub category: MultilingualText,
    #[ts(type = "string")]
    pub date: NaiveDate,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LawList {
    pub laws: Vec<Law>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// --- News ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct News {
    pub id: i64,
    pub title: MultilingualText,
    pub content: MultilingualText,
    pub summary: MultilingualText,
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub image_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewsInput {
    pub title: MultilingualText,
    pub content: MultilingualText,
    pub summary: MultilingualText,
    #[ts(type = "string")]
    pub date: NaiveDate,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NewsList {
    pub news: Vec<News>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// --- Files ---

/// StoredFile
///
/// Metadata row for an uploaded PDF or image. The bytes live in object storage
/// under `filename`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoredFile {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub url: String,
    // 'type' is reserved in Rust; the column is `file_type` and the JSON key is `type`.
    #[serde(rename = "type")]
    pub file_type: String,
    pub category: String,
    pub size: i64,
    #[ts(type = "string")]
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewStoredFile {
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub file_type: String,
    pub category: String,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FileList {
    pub files: Vec<StoredFile>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// --- Bulk import ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ImportStatistics {
    pub imported: usize,
    pub skipped: usize,
    pub total_processed: usize,
}

/// ImportResponse
///
/// 200 body of `POST /api/comrades/bulk-import`. `warnings` and `import_errors`
/// are omitted when empty.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    pub statistics: ImportStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_errors: Option<Vec<String>>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImportColumns {
    pub required: Vec<String>,
    pub optional: Vec<String>,
}

/// ImportSampleResponse
///
/// Column schema of the import workbook plus a description of the example file
/// that `?download=true` produces.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImportSampleResponse {
    pub message: String,
    pub columns: ImportColumns,
    pub example: String,
    pub download_url: String,
    pub timestamp: String,
}

// --- Dashboard & service info ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_comrades: i64,
    pub total_laws: i64,
    pub total_news: i64,
    pub total_files: i64,
    pub total_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub languages: Vec<String>,
    pub endpoints: Vec<String>,
}
