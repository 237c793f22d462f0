#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use veterans_portal::{
    AppConfig, AppState, InMemoryRepository, InMemoryRevocationStore, MockStorageService,
    auth::{self, ROLE_ADMIN, ROLE_EDITOR},
    create_router,
    models::User,
    repository::RepositoryState,
    revocation::RevocationState,
    storage::StorageState,
};

pub const PASSWORD: &str = "correct horse battery staple";

/// Router over in-memory services, plus handles on those services for assertions.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub revocation: Arc<InMemoryRevocationStore>,
    pub storage: MockStorageService,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_storage(MockStorageService::new())
    }

    pub fn with_storage(storage: MockStorageService) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let revocation = Arc::new(InMemoryRevocationStore::new());
        let config = AppConfig::default();

        let state = AppState {
            repo: repo.clone() as RepositoryState,
            revocation: revocation.clone() as RevocationState,
            storage: Arc::new(storage.clone()) as StorageState,
            config: config.clone(),
        };

        Self {
            router: create_router(state),
            repo,
            revocation,
            storage,
            config,
        }
    }

    pub async fn user(&self, username: &str, role: &str) -> User {
        let hash = auth::hash_password(PASSWORD).unwrap();
        self.repo.insert_user(username, &hash, role).await
    }

    /// Seeds a user and returns a valid bearer token for it.
    pub async fn token_for(&self, username: &str, role: &str) -> String {
        let user = self.user(username, role).await;
        auth::issue_token(&self.config, &user).unwrap().0
    }

    pub async fn editor_token(&self) -> String {
        self.token_for("editor", ROLE_EDITOR).await
    }

    pub async fn admin_token(&self) -> String {
        self.token_for("admin", ROLE_ADMIN).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes) }))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, token, None)).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("POST", uri, token, Some(body))).await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("PUT", uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("DELETE", uri, token, None)).await
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub const BOUNDARY: &str = "----veterans-test-boundary";

/// One part of a hand-built multipart body.
pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

/// A valid comrade body for the JSON endpoints.
pub fn comrade_json(first: &str, last: &str, unit: &str) -> Value {
    json!({
        "firstName": first,
        "lastName": last,
        "unit": unit,
        "region": "Ташкентская область",
        "yearOfServiceFrom": 1985,
        "yearOfServiceTo": 1987,
        "rank": "Сержант",
        "contactInfo": { "phone": "+998901234567", "email": "comrade@example.com" }
    })
}

pub fn multilang(ru: &str, uz: &str, en: &str) -> Value {
    json!({ "ru": ru, "uz": uz, "en": en })
}

pub fn law_json(title: &str, category: &str, date: &str) -> Value {
    json!({
        "title": multilang(&format!("{title} ru"), &format!("{title} uz"), title),
        "description": multilang("Описание", "Tavsif", "Description"),
        "category": multilang(category, category, category),
        "date": date,
    })
}

pub fn news_json(title: &str, date: &str) -> Value {
    json!({
        "title": multilang(title, &format!("{title} uz"), &format!("{title} en")),
        "content": multilang("Текст", "Matn", "Body text"),
        "summary": multilang("Кратко", "Qisqacha", "Summary"),
        "date": date,
    })
}
