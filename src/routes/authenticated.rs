use crate::{
    AppState,
    handlers::{auth, comrades, files, laws, news},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Content management for editors and admins. The whole router is wrapped in
/// `auth_middleware`, and handlers that need the caller's identity take `AuthUser`
/// (resolved once per request and cached in the request extensions).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session ---
        // POST /api/auth/logout revokes the presented token until it expires.
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/verify", get(auth::verify))
        // --- Roster ---
        .route(
            "/api/comrades/{id}",
            put(comrades::update_comrade).delete(comrades::delete_comrade),
        )
        // POST /api/comrades/bulk-import
        // Multipart `.xlsx`/`.xls` upload. Rows are persisted one by one; bad rows
        // are reported, not fatal.
        .route("/api/comrades/bulk-import", post(comrades::bulk_import))
        .route(
            "/api/comrades/bulk-import/sample",
            get(comrades::bulk_import_sample),
        )
        // --- Laws & News ---
        .route("/api/laws", post(laws::create_law))
        .route("/api/laws/{id}", put(laws::update_law).delete(laws::delete_law))
        .route("/api/news", post(news::create_news))
        .route("/api/news/{id}", put(news::update_news).delete(news::delete_news))
        // --- Files ---
        .route("/api/files", get(files::list_files))
        .route("/api/files/upload", post(files::upload_file))
        .route("/api/files/{id}", axum::routing::delete(files::delete_file))
}
