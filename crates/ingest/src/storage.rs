use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use tokio::fs;
use tracing::info;

/// An image written to object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_image(&self, key: &str, bytes: Vec<u8>) -> Result<StoredObject>;
}

/// Bucket in S3 (or an S3-compatible service) written with `PutObject`.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url_base: String,
}

impl S3ObjectStore {
    /// Object URLs default to `https://<bucket>.s3.amazonaws.com/<key>`.
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_url_base: Option<String>) -> Self {
        let public_url_base = public_url_base
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket));

        Self {
            client,
            bucket,
            public_url_base: public_url_base.trim_end_matches('/').to_string(),
        }
    }

    /// Client for the region and credentials in `sdk_config`. An explicit
    /// `endpoint` (MinIO, LocalStack) switches to path-style addressing.
    pub fn from_sdk_config(
        sdk_config: &SdkConfig,
        endpoint: Option<&str>,
        bucket: String,
        public_url_base: Option<String>,
        timeout: Duration,
    ) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config)
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(
            aws_sdk_s3::Client::from_conf(builder.build()),
            bucket,
            public_url_base,
        )
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url_base, key)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_image(&self, key: &str, bytes: Vec<u8>) -> Result<StoredObject> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type("image/jpeg")
            .send()
            .await
            .map_err(|e| anyhow!("PutObject failed: {}", DisplayErrorContext(&e)))?;

        info!(bucket = %self.bucket, key = %key, bytes = size, "Uploaded image");

        Ok(StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            url: self.object_url(key),
        })
    }
}

/// Writes images under `<root>/<bucket>/`. For local runs without object storage.
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, bucket: String) -> Self {
        Self {
            root: root.into(),
            bucket,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_image(&self, key: &str, bytes: Vec<u8>) -> Result<StoredObject> {
        let dir = self.root.join(&self.bucket);
        fs::create_dir_all(&dir)
            .await
            .context(format!("Failed to create storage directory: {:?}", dir))?;

        let path = dir.join(key);
        fs::write(&path, &bytes)
            .await
            .context(format!("Failed to write image: {:?}", path))?;

        let absolute = fs::canonicalize(&path).await.unwrap_or(path);
        info!(path = %absolute.display(), bytes = bytes.len(), "Stored image locally");

        Ok(StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            url: format!("file://{}", absolute.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{Credentials, Region};
    use axum::{
        Router,
        body::Bytes,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::put,
    };
    use std::sync::{Arc, Mutex};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn s3_store(endpoint: &str, public_url_base: Option<String>) -> S3ObjectStore {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version_latest()
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDEXAMPLE", "secret", None, None, "test"))
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();
        S3ObjectStore::new(
            aws_sdk_s3::Client::from_conf(config),
            "passports".to_string(),
            public_url_base,
        )
    }

    #[derive(Debug)]
    struct ReceivedPut {
        bucket: String,
        key: String,
        content_type: String,
        authorization: String,
        length: String,
    }

    #[tokio::test]
    async fn test_s3_put_image_is_signed() {
        let received: Arc<Mutex<Option<ReceivedPut>>> = Arc::new(Mutex::new(None));
        let sink = received.clone();
        let app = Router::new().route(
            "/:bucket/:key",
            put(move |Path((bucket, key)): Path<(String, String)>, headers: HeaderMap, _body: Bytes| {
                let sink = sink.clone();
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .map(|value| value.to_str().unwrap().to_string())
                            .unwrap_or_default()
                    };
                    // Chunked uploads carry the payload size separately.
                    let length = match header("x-amz-decoded-content-length") {
                        decoded if !decoded.is_empty() => decoded,
                        _ => header("content-length"),
                    };
                    *sink.lock().unwrap() = Some(ReceivedPut {
                        bucket,
                        key,
                        content_type: header("content-type"),
                        authorization: header("authorization"),
                        length,
                    });
                    StatusCode::OK
                }
            }),
        );
        let endpoint = serve(app).await;

        let stored = s3_store(&endpoint, None)
            .put_image("passport_42.jpg", vec![1, 2, 3])
            .await
            .unwrap();

        assert_eq!(stored.url, "https://passports.s3.amazonaws.com/passport_42.jpg");
        assert_eq!(stored.bucket, "passports");
        let put = received.lock().unwrap().take().unwrap();
        assert_eq!(put.bucket, "passports");
        assert_eq!(put.key, "passport_42.jpg");
        assert_eq!(put.content_type, "image/jpeg");
        assert_eq!(put.length, "3");
        assert!(
            put.authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"),
            "{put:?}"
        );
        assert!(put.authorization.contains("/us-east-1/s3/"), "{put:?}");
    }

    #[tokio::test]
    async fn test_s3_put_failure() {
        let app = Router::new().route(
            "/:bucket/:key",
            put(|| async {
                (
                    StatusCode::FORBIDDEN,
                    [("content-type", "application/xml")],
                    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                     <Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
                )
            }),
        );
        let endpoint = serve(app).await;
        let store = s3_store(&endpoint, Some("https://cdn.example.com/".to_string()));

        assert_eq!(store.object_url("a.jpg"), "https://cdn.example.com/a.jpg");
        let err = store.put_image("a.jpg", vec![0]).await.unwrap_err();
        assert!(err.to_string().contains("AccessDenied"), "{err}");
    }

    #[tokio::test]
    async fn test_local_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "passports".to_string());

        let stored = store.put_image("passport_7.jpg", b"jpeg".to_vec()).await.unwrap();

        let written = std::fs::read(dir.path().join("passports").join("passport_7.jpg")).unwrap();
        assert_eq!(written, b"jpeg");
        assert!(stored.url.starts_with("file://"));
        assert!(stored.url.ends_with("passport_7.jpg"));
        assert_eq!(stored.key, "passport_7.jpg");
    }
}
