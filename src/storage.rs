use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// StoredObject
///
/// Bytes and content type of an object read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for the object store holding uploaded PDFs and images.
/// Swaps the real S3 client (`S3StorageClient`) for the in-memory mock
/// (`MockStorageService`) in tests without touching the handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup to
    /// provision the bucket in MinIO.
    async fn ensure_bucket_exists(&self);

    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()>;

    /// `Ok(None)` when no object exists under `key`.
    async fn get_object(&self, key: &str) -> AppResult<Option<StoredObject>>;

    /// Deleting a missing key is not an error.
    async fn delete_object(&self, key: &str) -> AppResult<()>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// Concrete implementation using the AWS SDK for S3. Works against AWS S3 and
/// MinIO alike; `force_path_style(true)` is required for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key) for MinIO.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// CreateBucket fails harmlessly when the bucket is already there, so the
    /// result is only logged.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        let key = sanitize_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("put_object {key}: {e}")))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> AppResult<Option<StoredObject>> {
        let key = sanitize_key(key);
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!("get_object {key}: {service_error}")));
            }
        };

        let content_type = output.content_type().map(str::to_string);
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("read {key}: {e}")))?
            .into_bytes()
            .to_vec();

        Ok(Some(StoredObject {
            bytes,
            content_type,
        }))
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        let key = sanitize_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete_object {key}: {e}")))?;
        Ok(())
    }
}

/// sanitize_key
///
/// Prevents path traversal by removing directory navigation components
/// (`..`, `.`) and empty segments from a user-influenced key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory `StorageService` for unit and integration tests, so upload and download
/// handlers run without S3. Clones share the same object map.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Stored keys, sorted. Test helper.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check(&self) -> AppResult<()> {
        if self.should_fail {
            return Err(AppError::Storage(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        self.check()?;
        self.objects.write().await.insert(
            sanitize_key(key),
            StoredObject {
                bytes,
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> AppResult<Option<StoredObject>> {
        self.check()?;
        Ok(self.objects.read().await.get(&sanitize_key(key)).cloned())
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.check()?;
        self.objects.write().await.remove(&sanitize_key(key));
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
