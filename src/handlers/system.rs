use axum::Json;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{error::timestamp_now, models::ApiInfo, validators::LANGUAGES};

pub const SERVICE_NAME: &str = "Veterans Portal API";

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

/// health
///
/// [Public Route] Liveness probe for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: timestamp_now(),
    })
}

#[utoipa::path(
    get,
    path = "/api/info",
    responses((status = 200, description = "Service description", body = ApiInfo))
)]
pub async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        name: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
        endpoints: [
            "/api/auth",
            "/api/comrades",
            "/api/laws",
            "/api/news",
            "/api/files",
            "/api/admin",
            "/swagger-ui",
        ]
        .iter()
        .map(|e| e.to_string())
        .collect(),
    })
}

/// Envelope for unknown routes.
pub async fn not_found() -> (axum::http::StatusCode, Json<Value>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "The requested resource was not found",
            "timestamp": timestamp_now(),
        })),
    )
}
