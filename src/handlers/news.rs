use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

use super::{fail_on, non_empty, parse_date_param, parse_id, parse_page, require_object};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{News, NewsInput, NewsList},
    repository::{DEFAULT_NEWS_LIMIT, NewsFilter, NewsSortField, SortOrder},
    validators::{ValidationErrors, validate_date, validate_multilang_text},
};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NewsQuery {
    /// Title or content in any language.
    pub search: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub date_from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub date_to: Option<String>,
    /// `date` (default) or `title`.
    pub sort_by: Option<String>,
    /// `desc` (default) or `asc`.
    pub sort_order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl NewsQuery {
    pub fn into_filter(self) -> AppResult<NewsFilter> {
        let (limit, offset) =
            parse_page(self.limit.as_deref(), self.offset.as_deref(), DEFAULT_NEWS_LIMIT)?;

        let sort_by = match non_empty(self.sort_by).as_deref() {
            None | Some("date") => NewsSortField::Date,
            Some("title") => NewsSortField::Title,
            Some(_) => {
                return Err(AppError::bad_request(
                    "Invalid parameter",
                    "sortBy must be one of: date, title",
                ));
            }
        };
        let sort_order = match non_empty(self.sort_order).as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(_) => {
                return Err(AppError::bad_request(
                    "Invalid parameter",
                    "sortOrder must be one of: asc, desc",
                ));
            }
        };

        Ok(NewsFilter {
            search: non_empty(self.search),
            date_from: parse_date_param("dateFrom", self.date_from.as_deref())?,
            date_to: parse_date_param("dateTo", self.date_to.as_deref())?,
            sort_by,
            sort_order,
            limit,
            offset,
        })
    }
}

pub fn news_from_body(body: &Value) -> AppResult<NewsInput> {
    require_object(body)?;
    let mut errors = ValidationErrors::new();
    for field in ["title", "content", "summary"] {
        errors.extend(validate_multilang_text(body, field, true));
    }
    errors.extend(validate_date(body, "date", true));
    fail_on(errors)?;

    Ok(serde_json::from_value(body.clone())?)
}

/// list_news
///
/// [Public Route] Newest first unless `sortBy`/`sortOrder` say otherwise.
#[utoipa::path(
    get,
    path = "/api/news",
    params(NewsQuery),
    responses(
        (status = 200, description = "Matching articles", body = NewsList),
        (status = 400, description = "Malformed filter")
    )
)]
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> AppResult<Json<NewsList>> {
    let filter = query.into_filter()?;
    let page = state.repo.list_news(&filter).await?;
    Ok(Json(NewsList {
        news: page.items,
        total: page.total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

#[utoipa::path(
    get,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "News ID")),
    responses((status = 200, description = "Found", body = News), (status = 404, description = "Not Found"))
)]
pub async fn get_news(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<News>> {
    let id = parse_id(&id, "News")?;
    state
        .repo
        .get_news(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("News"))
}

#[utoipa::path(
    post,
    path = "/api/news",
    request_body = NewsInput,
    responses((status = 201, description = "Created", body = News), (status = 400, description = "Validation Error"))
)]
pub async fn create_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<News>)> {
    let Json(body) = payload?;
    let news = news_from_body(&body)?;
    let created = state.repo.create_news(news).await?;
    tracing::info!(news_id = created.id, user_id = auth_user.id, "news created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "News ID")),
    request_body = NewsInput,
    responses(
        (status = 200, description = "Updated", body = News),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<News>> {
    let id = parse_id(&id, "News")?;
    if state.repo.get_news(id).await?.is_none() {
        return Err(AppError::NotFound("News"));
    }
    let Json(body) = payload?;
    let news = news_from_body(&body)?;
    let updated = state
        .repo
        .update_news(id, news)
        .await?
        .ok_or(AppError::NotFound("News"))?;
    tracing::info!(news_id = id, user_id = auth_user.id, "news updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "News ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "News")?;
    if !state.repo.delete_news(id).await? {
        return Err(AppError::NotFound("News"));
    }
    tracing::info!(news_id = id, user_id = auth_user.id, "news deleted");
    Ok(StatusCode::NO_CONTENT)
}
