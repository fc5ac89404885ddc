//! Blob store client implementation using Apache OpenDAL.

use std::future::Future;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use opendal::layers::{RetryLayer, TimeoutLayer};
use opendal::{EntryMode, ErrorKind, Operator, services};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;

/// Presigned URL for reading one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// The presigned URL.
    pub url: String,
    /// HTTP method to use (GET).
    pub method: String,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}

/// One stored object as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    /// Object key.
    pub key: String,
    /// Last write, when the provider reports it.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Key-addressed binary object storage.
///
/// Implemented by [`OpendalBlobStore`] in production; the coordinator only
/// depends on this trait.
pub trait BlobStore: Send + Sync {
    /// Make sure the target bucket exists. A no-op after the first success.
    fn ensure_bucket(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Upload exactly `size` bytes under `key`, overwriting any existing object.
    fn put_object(
        &self,
        key: &str,
        content: Bytes,
        size: u64,
        content_type: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Issue a read-only URL for `key` valid for `expiry`.
    fn presign(
        &self,
        key: &str,
        expiry: Duration,
    ) -> impl Future<Output = Result<PresignedUrl, StorageError>> + Send;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove_object(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Every object in the bucket with its last write time.
    fn list_objects(&self) -> impl Future<Output = Result<Vec<BlobEntry>, StorageError>> + Send;

    /// Whether `key` exists.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;
}

/// OpenDAL-backed blob store.
#[derive(Debug)]
pub struct OpendalBlobStore {
    operator: Operator,
    config: StorageConfig,
    bucket_ready: OnceCell<()>,
}

impl OpendalBlobStore {
    /// Create a new blob store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config)?;

        info!(
            provider = config.provider.name(),
            bucket = config.provider.bucket(),
            max_retries = config.max_retries,
            "Blob store initialized"
        );

        Ok(Self {
            operator,
            config,
            bucket_ready: OnceCell::new(),
        })
    }

    /// Create the OpenDAL operator with timeout and retry layers applied.
    fn create_operator(config: &StorageConfig) -> Result<Operator, StorageError> {
        let builder = match &config.provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                Operator::new(services::Fs::default().root(root)).map(|b| b.finish())
            }
        };

        let operator = builder.map_err(|e| StorageError::configuration(e.to_string()))?;

        // Retry wraps timeout so a timed-out attempt is retried.
        let mut operator =
            operator.layer(TimeoutLayer::new().with_timeout(config.operation_timeout));
        if config.max_retries > 0 {
            operator = operator.layer(
                RetryLayer::new()
                    .with_max_times(config.max_retries)
                    .with_jitter(),
            );
        }

        Ok(operator)
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.config.provider.bucket()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    async fn provision_bucket(&self) -> Result<(), StorageError> {
        // OpenDAL cannot create remote buckets; only the local root is created.
        if let StorageProvider::LocalFs { root } = &self.config.provider {
            tokio::fs::create_dir_all(root)
                .await
                .map_err(|e| StorageError::operation(e.to_string()))?;
        }

        self.operator.check().await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(format!("bucket '{}'", self.bucket())),
            _ => StorageError::from(e),
        })?;

        info!(bucket = self.bucket(), "Bucket ready");
        Ok(())
    }
}

impl BlobStore for OpendalBlobStore {
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        self.bucket_ready
            .get_or_try_init(|| self.provision_bucket())
            .await
            .map(|_| ())
    }

    async fn put_object(
        &self,
        key: &str,
        content: Bytes,
        size: u64,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }

        let actual = content.len() as u64;
        if actual != size {
            return Err(StorageError::size_mismatch(size, actual));
        }

        debug!(object_key = %key, size, content_type, "Writing object");

        self.operator
            .write_with(key, content)
            .content_type(content_type)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn presign(&self, key: &str, expiry: Duration) -> Result<PresignedUrl, StorageError> {
        let expires_at = expiry_instant(expiry)?;
        let presigned = self
            .operator
            .presign_read(key, expiry)
            .await
            .map_err(StorageError::from)?;

        Ok(PresignedUrl {
            url: presigned.uri().to_string(),
            method: presigned.method().to_string(),
            expires_at,
        })
    }

    async fn remove_object(&self, key: &str) -> Result<(), StorageError> {
        debug!(object_key = %key, "Removing object");

        match self.operator.delete(key).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(object_key = %key, "Object already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::from(e)),
        }
    }

    async fn list_objects(&self) -> Result<Vec<BlobEntry>, StorageError> {
        let entries = self
            .operator
            .list_with("/")
            .recursive(true)
            .await
            .map_err(StorageError::from)?;

        let mut objects = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.metadata().mode() != EntryMode::FILE {
                continue;
            }

            // Some listers (fs) leave out the timestamp; stat fills it in.
            let last_modified = match entry.metadata().last_modified() {
                Some(ts) => Some(ts),
                None => self
                    .operator
                    .stat(entry.path())
                    .await
                    .map_err(StorageError::from)?
                    .last_modified(),
            };

            objects.push(BlobEntry {
                key: entry.path().to_string(),
                last_modified: last_modified.map(|ts| DateTime::<Utc>::from(SystemTime::from(ts))),
            });
        }

        Ok(objects)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.operator.exists(key).await.map_err(StorageError::from)
    }
}

/// The instant a URL issued now for `expiry` stops working.
fn expiry_instant(expiry: Duration) -> Result<DateTime<Utc>, StorageError> {
    chrono::Duration::from_std(expiry)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| {
            StorageError::configuration(format!(
                "presign expiry of {}s is out of range",
                expiry.as_secs()
            ))
        })
}
