//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Shared HMAC secret used to verify tokens.
    pub secret: String,
    /// Expected `iss` claim, if any.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Clock skew tolerated when checking `exp`, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

fn default_leeway() -> u64 {
    30
}

/// Object storage configuration.
///
/// Which fields are required depends on `provider`:
/// - `s3`: `bucket`, `endpoint`, `region`, `access_key_id`, `secret_access_key`
/// - `azure_blob`: `bucket` (container), `account`, `access_key`
/// - `local`: `root` (falls back to `bucket` as a relative directory)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Provider name: `s3`, `azure_blob` or `local`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Bucket (S3) or container (Azure) name.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// S3 endpoint URL.
    pub endpoint: Option<String>,
    /// S3 region.
    pub region: Option<String>,
    /// S3 access key ID.
    pub access_key_id: Option<String>,
    /// S3 secret access key.
    pub secret_access_key: Option<String>,
    /// Azure storage account name.
    pub account: Option<String>,
    /// Azure storage access key.
    pub access_key: Option<String>,
    /// Root directory for the local provider.
    pub root: Option<String>,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Lifetime of presigned retrieval URLs in seconds.
    #[serde(default = "default_retrieval_url_ttl")]
    pub retrieval_url_ttl_secs: u64,
    /// Retries for temporary blob store failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Timeout applied to each blob store call, in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
    /// Minimum age in seconds before an unreferenced blob may be swept.
    /// Must comfortably exceed the longest upload.
    #[serde(default = "default_orphan_grace_period")]
    pub orphan_grace_period_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bucket: default_bucket(),
            endpoint: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            account: None,
            access_key: None,
            root: None,
            max_file_size: default_max_file_size(),
            retrieval_url_ttl_secs: default_retrieval_url_ttl(),
            max_retries: default_max_retries(),
            operation_timeout_secs: default_operation_timeout(),
            orphan_grace_period_secs: default_orphan_grace_period(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_bucket() -> String {
    "documents".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_retrieval_url_ttl() -> u64 {
    86_400 // 24 hours
}

fn default_max_retries() -> usize {
    3
}

fn default_operation_timeout() -> u64 {
    30
}

fn default_orphan_grace_period() -> u64 {
    3_600 // 1 hour
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("DOCSTORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
