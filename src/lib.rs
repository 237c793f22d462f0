use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod import;
pub mod models;
pub mod repository;
pub mod revocation;
pub mod storage;
pub mod validators;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use revocation::{InMemoryRevocationStore, PostgresRevocationStore, RevocationState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// Largest accepted request body: a 10 MB PDF plus multipart overhead.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// ApiDoc
///
/// OpenAPI document built from every `#[utoipa::path]` handler and `ToSchema` model.
/// Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::system::health, handlers::system::api_info,
        handlers::auth::login, handlers::auth::logout, handlers::auth::verify,
        handlers::comrades::list_comrades, handlers::comrades::get_comrade,
        handlers::comrades::create_comrade, handlers::comrades::update_comrade,
        handlers::comrades::delete_comrade, handlers::comrades::bulk_import,
        handlers::comrades::bulk_import_sample,
        handlers::laws::list_laws, handlers::laws::get_law, handlers::laws::create_law,
        handlers::laws::update_law, handlers::laws::delete_law,
        handlers::news::list_news, handlers::news::get_news, handlers::news::create_news,
        handlers::news::update_news, handlers::news::delete_news,
        handlers::files::upload_file, handlers::files::list_files, handlers::files::get_file,
        handlers::files::delete_file, handlers::files::download_file,
        handlers::admin::get_admin_stats
    ),
    components(
        schemas(
            models::UserProfile, models::LoginRequest, models::LoginResponse, models::VerifyResponse,
            models::MultilingualText, models::ContactInfo, models::Comrade, models::ComradeList,
            models::Law, models::LawInput, models::LawList,
            models::News, models::NewsInput, models::NewsList,
            models::StoredFile, models::FileList,
            models::ImportStatistics, models::ImportResponse, models::ImportColumns,
            models::ImportSampleResponse, models::AdminDashboardStats, models::ApiInfo,
            handlers::system::HealthStatus, error::ErrorEnvelope,
        )
    ),
    tags(
        (name = "veterans-portal", description = "Veterans association content API (ru/uz/en)")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for comrades, laws, news, file metadata and users.
    pub repo: RepositoryState,
    /// Revoked token ids, consulted on every authenticated request.
    pub revocation: RevocationState,
    /// Object storage for uploaded PDFs and images.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors such as `AuthUser` pull just the services they need.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for RevocationState {
    fn from_ref(app_state: &AppState) -> RevocationState {
        app_state.revocation.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. Extracting `AuthUser` runs the full token
/// check; a failure short-circuits with the 401 envelope before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// CORS from `CORS_ORIGINS`. No configured origins means any origin.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// create_router
///
/// Assembles the public, authenticated and admin routers, the Swagger UI and the
/// observability layers around them.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Header name for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Role checks happen inside the admin handlers.
        .nest("/api/admin", admin::admin_routes())
        .fallback(handlers::system::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens one span per request carrying method, URI and `x-request-id`, so every
/// log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
