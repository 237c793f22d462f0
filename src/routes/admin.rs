use crate::{AppState, handlers::admin};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/api/admin`. The handlers resolve `AuthUser` themselves and
/// call `require_admin()`, so an editor token gets 403 and a missing token 401.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats
        // Counts of comrades, laws, news, files and users.
        .route("/stats", get(admin::get_admin_stats))
}
