use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult},
    models::{LoginRequest, LoginResponse, UserProfile, VerifyResponse},
};

/// login
///
/// [Public Route] Exchanges username and password for a bearer token.
/// Unknown users and wrong passwords get the same 401 so usernames cannot be probed.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(request) = payload?;

    let (Some(username), Some(password)) = (
        request.username.filter(|u| !u.is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request(
            "Validation Error",
            "Username and password are required",
        ));
    };

    let invalid = || AppError::unauthorized("Invalid credentials", "Username or password is incorrect");

    let user = state
        .repo
        .get_user_by_username(&username)
        .await?
        .ok_or_else(invalid)?;

    // Argon2 verification runs on the blocking pool.
    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check panicked: {e}")))?;
    if !verified {
        tracing::info!(%username, "login rejected");
        return Err(invalid());
    }

    let (token, _) = auth::issue_token(&state.config, &user)?;
    tracing::info!(user_id = user.id, "login succeeded");

    Ok(Json(LoginResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

/// logout
///
/// [Authenticated Route] Revokes the presented token until it would have expired.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Token revoked"), (status = 401, description = "Unauthorized"))
)]
pub async fn logout(auth_user: AuthUser, State(state): State<AppState>) -> AppResult<StatusCode> {
    state
        .revocation
        .revoke(&auth_user.jti, auth_user.expires_at)
        .await?;

    match state.revocation.purge_expired().await {
        Ok(purged) if purged > 0 => tracing::debug!(purged, "expired revocations purged"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "revocation purge failed"),
    }

    tracing::info!(user_id = auth_user.id, "logout");
    Ok(StatusCode::NO_CONTENT)
}

/// verify
///
/// [Authenticated Route] Confirms the token is still accepted and returns its user.
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses((status = 200, description = "Token valid", body = VerifyResponse), (status = 401, description = "Unauthorized"))
)]
pub async fn verify(auth_user: AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: auth_user.profile(),
    })
}
