//! S3 client implementation.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// AWS region
    pub region: String,
    /// Custom endpoint (MinIO, LocalStack); `None` for AWS
    pub endpoint_url: Option<String>,
    /// Bucket receiving result documents
    pub result_bucket: String,
    /// Whether result documents are written at all
    pub result_upload_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: "ap-northeast-2".to_string(),
            endpoint_url: None,
            result_bucket: "shortform-result-bucket".to_string(),
            result_upload_enabled: true,
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            region: std::env::var("AWS_REGION").unwrap_or(defaults.region),
            endpoint_url: std::env::var("S3_ENDPOINT_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            result_bucket: std::env::var("RESULT_BUCKET_NAME").unwrap_or(defaults.result_bucket),
            result_upload_enabled: std::env::var("RESULT_UPLOAD_ENABLED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.result_upload_enabled),
        }
    }
}

/// S3 storage client.
///
/// The bucket is passed per call: source videos come from whichever bucket
/// the event names, results go to the configured result bucket.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Create a new client using the default AWS credential chain.
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }

    /// Wrap an existing SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Stream an object to a local file, returning the bytes written.
    pub async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> StorageResult<u64> {
        let path = path.as_ref();
        debug!("Downloading s3://{}/{} to {}", bucket, key, path.display());

        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let no_such_key = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if no_such_key {
                    StorageError::not_found(format!("s3://{}/{}", bucket, key))
                } else {
                    StorageError::download_failed(DisplayErrorContext(&e).to_string())
                }
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut reader = response.body.into_async_read();
        let mut file = tokio::fs::File::create(path).await?;
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| StorageError::download_failed(format!("Failed to write file: {}", e)))?;
        file.flush().await?;

        info!("Downloaded s3://{}/{} to {} ({} bytes)", bucket, key, path.display(), written);
        Ok(written)
    }

    /// Upload bytes to S3.
    pub async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to s3://{}/{}", data.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
