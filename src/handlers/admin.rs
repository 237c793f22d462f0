use axum::{Json, extract::State};

use crate::{AppState, auth::AuthUser, error::AppResult, models::AdminDashboardStats};

/// get_admin_stats
///
/// [Admin Route] Record counts for the dashboard.
///
/// *Authorization*: the caller must hold the `admin` role; editors get 403.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Access denied")
    )
)]
pub async fn get_admin_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<AdminDashboardStats>> {
    auth_user.require_admin()?;
    Ok(Json(state.repo.get_stats().await?))
}
