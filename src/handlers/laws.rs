use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

use super::{fail_on, non_empty, parse_id, parse_page, require_object};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Law, LawInput, LawList},
    repository::{DEFAULT_LAW_LIMIT, LawFilter},
    validators::{ValidationErrors, validate_date, validate_multilang_text},
};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct LawQuery {
    /// Category text in any language (case-insensitive substring).
    pub category: Option<String>,
    /// Title or description in any language.
    pub search: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl LawQuery {
    pub fn into_filter(self) -> AppResult<LawFilter> {
        let (limit, offset) =
            parse_page(self.limit.as_deref(), self.offset.as_deref(), DEFAULT_LAW_LIMIT)?;
        Ok(LawFilter {
            category: non_empty(self.category),
            search: non_empty(self.search),
            limit,
            offset,
        })
    }
}

/// law_from_body
///
/// Title, description and category must carry all three languages; `date` is
/// `YYYY-MM-DD`. All problems are reported together.
pub fn law_from_body(body: &Value) -> AppResult<LawInput> {
    require_object(body)?;
    let mut errors = ValidationErrors::new();
    for field in ["title", "description", "category"] {
        errors.extend(validate_multilang_text(body, field, true));
    }
    errors.extend(validate_date(body, "date", true));
    fail_on(errors)?;

    Ok(serde_json::from_value(body.clone())?)
}

/// list_laws
///
/// [Public Route] Newest first.
#[utoipa::path(
    get,
    path = "/api/laws",
    params(LawQuery),
    responses((status = 200, description = "Matching laws", body = LawList))
)]
pub async fn list_laws(
    State(state): State<AppState>,
    Query(query): Query<LawQuery>,
) -> AppResult<Json<LawList>> {
    let filter = query.into_filter()?;
    let page = state.repo.list_laws(&filter).await?;
    Ok(Json(LawList {
        laws: page.items,
        total: page.total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

#[utoipa::path(
    get,
    path = "/api/laws/{id}",
    params(("id" = i64, Path, description = "Law ID")),
    responses((status = 200, description = "Found", body = Law), (status = 404, description = "Not Found"))
)]
pub async fn get_law(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Law>> {
    let id = parse_id(&id, "Law")?;
    state
        .repo
        .get_law(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Law"))
}

#[utoipa::path(
    post,
    path = "/api/laws",
    request_body = LawInput,
    responses((status = 201, description = "Created", body = Law), (status = 400, description = "Validation Error"))
)]
pub async fn create_law(
    auth_user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Law>)> {
    let Json(body) = payload?;
    let law = law_from_body(&body)?;
    let created = state.repo.create_law(law).await?;
    tracing::info!(law_id = created.id, user_id = auth_user.id, "law created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/laws/{id}",
    params(("id" = i64, Path, description = "Law ID")),
    request_body = LawInput,
    responses(
        (status = 200, description = "Updated", body = Law),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_law(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Law>> {
    let id = parse_id(&id, "Law")?;
    if state.repo.get_law(id).await?.is_none() {
        return Err(AppError::NotFound("Law"));
    }
    let Json(body) = payload?;
    let law = law_from_body(&body)?;
    let updated = state
        .repo
        .update_law(id, law)
        .await?
        .ok_or(AppError::NotFound("Law"))?;
    tracing::info!(law_id = id, user_id = auth_user.id, "law updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/laws/{id}",
    params(("id" = i64, Path, description = "Law ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_law(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "Law")?;
    if !state.repo.delete_law(id).await? {
        return Err(AppError::NotFound("Law"));
    }
    tracing::info!(law_id = id, user_id = auth_user.id, "law deleted");
    Ok(StatusCode::NO_CONTENT)
}
