mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{PASSWORD, TestApp};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use veterans_portal::{
    auth::{self, Claims, ROLE_EDITOR},
    models::User,
    revocation::{InMemoryRevocationStore, RevocationStore},
};

#[tokio::test]
async fn test_login_success_returns_token_and_profile() {
    let app = TestApp::new();
    app.user("editor", ROLE_EDITOR).await;

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "username": "editor", "password": PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["username"], "editor");
    assert_eq!(body["user"]["role"], "editor");
    assert!(body["user"].get("password_hash").is_none());

    let claims = auth::decode_token(&app.config, body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.role, "editor");
    assert_eq!(claims.sub, body["user"]["id"].to_string());
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_user_look_the_same() {
    let app = TestApp::new();
    app.user("editor", ROLE_EDITOR).await;

    let (status, wrong_password) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "username": "editor", "password": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_user) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "username": "ghost", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_password["error"], "Invalid credentials");
    assert_eq!(wrong_password["message"], unknown_user["message"]);
}

#[tokio::test]
async fn test_login_missing_credentials() {
    let app = TestApp::new();
    for body in [
        json!({}),
        json!({ "username": "editor" }),
        json!({ "username": "", "password": PASSWORD }),
    ] {
        let (status, error) = app.post_json("/api/auth/login", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["message"], "Username and password are required");
    }
}

#[tokio::test]
async fn test_verify_returns_user() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let (status, body) = app.get("/api/auth/verify", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn test_missing_or_malformed_header_is_401() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/auth/verify", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization token required");

    let request = axum::http::Request::builder()
        .uri("/api/auth/verify")
        .header("authorization", "Basic ZWRpdG9yOnB3")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_and_foreign_tokens_rejected() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/auth/verify", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");

    // Signed with another secret.
    let user = app.user("editor", ROLE_EDITOR).await;
    let mut other = app.config.clone();
    other.jwt_secret = "a-completely-different-signing-secret".to_string();
    let (foreign, _) = auth::issue_token(&other, &user).unwrap();
    let (status, _) = app.get("/api/auth/verify", Some(&foreign)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::new();
    let user = app.user("editor", ROLE_EDITOR).await;
    let issued = Utc::now() - Duration::hours(3);
    let claims = Claims {
        sub: user.id.to_string(),
        jti: "expired-jti".to_string(),
        role: user.role.clone(),
        iat: issued.timestamp() as usize,
        exp: (issued + Duration::hours(1)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(app.config.jwt_secret.as_bytes()),
    )
    .unwrap();

    let (status, body) = app.get("/api/auth/verify", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired");
}

#[tokio::test]
async fn test_token_for_unknown_user_rejected() {
    let app = TestApp::new();
    let ghost = User {
        id: 4242,
        username: "ghost".to_string(),
        password_hash: String::new(),
        role: ROLE_EDITOR.to_string(),
        created_at: Utc::now(),
    };
    let (token, _) = auth::issue_token(&app.config, &ghost).unwrap();

    let (status, body) = app.get("/api/auth/verify", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_logout_revokes_only_that_token() {
    let app = TestApp::new();
    let user = app.user("editor", ROLE_EDITOR).await;
    let (first, first_claims) = auth::issue_token(&app.config, &user).unwrap();
    let (second, _) = auth::issue_token(&app.config, &user).unwrap();

    let (status, body) = app.post_json("/api/auth/logout", Some(&first), json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    assert!(app.revocation.is_revoked(&first_claims.jti).await.unwrap());

    let (status, body) = app.get("/api/auth/verify", Some(&first)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token revoked");

    // Revoked tokens lose access to protected writes as well.
    let (status, _) = app.delete("/api/comrades/1", Some(&first)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/auth/verify", Some(&second)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_requires_token() {
    let app = TestApp::new();
    let (status, _) = app.post_json("/api/auth/logout", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revocation_store_purges_expired_entries() {
    let store = InMemoryRevocationStore::new();
    store
        .revoke("old", Utc::now() - Duration::minutes(5))
        .await
        .unwrap();
    store
        .revoke("live", Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(store.purge_expired().await.unwrap(), 1);
    assert!(!store.is_revoked("old").await.unwrap());
    assert!(store.is_revoked("live").await.unwrap());
}

#[test]
fn test_password_hashing() {
    let hash = auth::hash_password(PASSWORD).unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(auth::verify_password(PASSWORD, &hash));
    assert!(!auth::verify_password("wrong", &hash));
    assert!(!auth::verify_password(PASSWORD, "not-a-phc-string"));
}
