use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{User, UserProfile},
    repository::RepositoryState,
    revocation::RevocationState,
};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";

/// Claims
///
/// Payload of every token issued by `POST /api/auth/login`, signed with HS256.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject: the numeric user id, as a string.
    pub sub: String,
    /// Token id. Logout revokes this value until `exp`.
    pub jti: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp as i64, 0).unwrap_or_else(Utc::now)
    }
}

/// issue_token
///
/// Signs a fresh token for `user`, valid for `config.jwt_ttl_hours`.
pub fn issue_token(config: &AppConfig, user: &User) -> AppResult<(String, Claims)> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        jti: Uuid::new_v4().to_string(),
        role: user.role.clone(),
        exp: (now + Duration::hours(config.jwt_ttl_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to encode token: {e}")))?;

    Ok((token, claims))
}

/// decode_token
///
/// Signature and expiry check only; revocation and user lookup happen in the extractor.
pub fn decode_token(config: &AppConfig, token: &str) -> AppResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => {
                AppError::unauthorized("Token expired", "The token has expired")
            }
            _ => AppError::unauthorized("Invalid token", "Token is invalid"),
        })
}

/// hash_password
///
/// Argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

/// verify_password
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request, plus the token it came with
/// so logout can revoke it.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    /// 'admin' or 'editor'.
    pub role: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Role gate for admin-only handlers.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin privileges required".to_string()))
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument and as the guard of the
/// authenticated router (`auth_middleware`). Steps:
/// 1. Bearer token extraction.
/// 2. JWT decoding (signature, expiry).
/// 3. Revocation check against the `RevocationStore`.
/// 4. DB lookup, so a deleted user's tokens stop working immediately.
///
/// Rejection: `AppError::Unauthorized` (401) with the standard envelope.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    RevocationState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the middleware for this request.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let revocation = RevocationState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AppError::unauthorized(
                    "Authorization token required",
                    "Request does not contain an access token",
                )
            })?;

        let claims = decode_token(&config, token)?;

        if revocation.is_revoked(&claims.jti).await? {
            return Err(AppError::unauthorized(
                "Token revoked",
                "The token has been revoked",
            ));
        }

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid token", "Token is invalid"))?;

        let user = repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid token", "User not found"))?;

        let auth_user = AuthUser {
            id: user.id,
            username: user.username,
            role: user.role,
            expires_at: claims.expires_at(),
            jti: claims.jti,
        };
        parts.extensions.insert(auth_user.clone());
        Ok(auth_user)
    }
}
