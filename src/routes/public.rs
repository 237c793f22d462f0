use crate::{
    AppState,
    handlers::{auth, comrades, files, laws, news, system},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Everything here is read-only except
/// login and comrade submission, which visitors may use to add themselves to
/// the roster.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(system::health))
        .route("/api/info", get(system::api_info))
        // POST /api/auth/login
        .route("/api/auth/login", post(auth::login))
        // GET /api/comrades?name=&unit=&region=&rank=&yearFrom=&yearTo=
        // POST /api/comrades (new records start unverified)
        .route(
            "/api/comrades",
            get(comrades::list_comrades).post(comrades::create_comrade),
        )
        .route("/api/comrades/{id}", get(comrades::get_comrade))
        // GET /api/laws?category=&search=
        .route("/api/laws", get(laws::list_laws))
        .route("/api/laws/{id}", get(laws::get_law))
        // GET /api/news?search=&dateFrom=&dateTo=&sortBy=&sortOrder=
        .route("/api/news", get(news::list_news))
        .route("/api/news/{id}", get(news::get_news))
        // File metadata and raw bytes. Uploaded content is linked from laws and news.
        .route("/api/files/{id}", get(files::get_file))
        .route("/api/files/uploads/{filename}", get(files::download_file))
}
