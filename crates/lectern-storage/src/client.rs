//! S3 source bucket client.

use std::path::{Path, PathBuf};

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the source bucket client.
#[derive(Debug, Clone)]
pub struct SourceBucketConfig {
    /// Regional S3 endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// AWS region
    pub region: String,
}

impl SourceBucketConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let region = std::env::var("AWS_REGION")
            .map_err(|_| StorageError::config_error("AWS_REGION not set"))?;
        Ok(Self {
            endpoint_url: std::env::var("AWS_ENDPOINT_URL")
                .unwrap_or_else(|_| format!("https://s3.{}.amazonaws.com", region)),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("AWS_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("AWS_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("AWS_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("AWS_BUCKET_NAME not set"))?,
            region,
        })
    }
}

/// Client for the bucket holding uploaded source videos.
#[derive(Clone)]
pub struct SourceBucket {
    client: Client,
    bucket: String,
}

impl SourceBucket {
    /// Create a new client from configuration.
    pub async fn new(config: SourceBucketConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "lectern",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(sdk_config);

        Ok(Self {
            client,
            bucket: config.bucket_name,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = SourceBucketConfig::from_env()?;
        Self::new(config).await
    }

    /// Download an object to a local path.
    pub async fn download_to_path(&self, key: &str, dest: impl AsRef<Path>) -> StorageResult<()> {
        let dest = dest.as_ref();
        debug!("Downloading {} to {}", key, dest.display());

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(e.to_string())
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?;

        tokio::fs::write(dest, data.into_bytes()).await?;

        info!("Downloaded {} to {}", key, dest.display());
        Ok(())
    }
}

/// Derive the sanitized local filename for an object key.
///
/// Uses the key's final path segment with whitespace replaced by
/// underscores, so it is always usable as a local path and as a subprocess
/// argument.
pub fn local_filename_for_key(key: &str) -> StorageResult<String> {
    let name = key.rsplit('/').next().unwrap_or(key);
    if name.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect())
}

/// Sanitized destination path for a key inside a working directory.
pub fn local_path_for_key(work_dir: &Path, key: &str) -> StorageResult<PathBuf> {
    Ok(work_dir.join(local_filename_for_key(key)?))
}
