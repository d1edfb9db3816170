//! s3gate Configuration
//!
//! Configuration is read from an optional TOML file and then overridden
//! from the process environment (`PORT`, `AWS_REGION`, `AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`, `AWS_ENDPOINT_URL`, `UPLOAD_BUCKET`).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main s3gate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage provider configuration
    #[serde(default)]
    pub aws: AwsConfig,

    /// Upload endpoint configuration
    #[serde(default)]
    pub upload: UploadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable permissive CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Maximum accepted upload request size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Storage provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Provider region
    #[serde(default = "default_region")]
    pub region: String,

    /// Access key id (required)
    #[serde(default)]
    pub access_key_id: String,

    /// Secret access key (required)
    #[serde(default)]
    pub secret_access_key: String,

    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Use path-style bucket addressing
    #[serde(default)]
    pub force_path_style: bool,
}

/// Upload endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Destination bucket (required)
    #[serde(default)]
    pub bucket: String,

    /// Prefix prepended to every uploaded key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Content type stored with uploaded objects
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Lifetime of the returned download URL
    #[serde(default = "default_url_expiry_secs")]
    pub url_expiry_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_max_upload_bytes() -> usize {
    500 * 1024 * 1024
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_key_prefix() -> String {
    "uploads/".to_string()
}

fn default_content_type() -> String {
    "application/vnd.android.package-archive".to_string()
}

fn default_url_expiry_secs() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key_prefix: default_key_prefix(),
            content_type: default_content_type(),
            url_expiry_secs: default_url_expiry_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration for startup.
    ///
    /// The file is optional; environment variables are applied on top and
    /// the merged result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Same as [`GatewayConfig::load`] with an explicit environment lookup
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            GatewayConfig::default()
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override values from environment variables.
    ///
    /// `lookup` abstracts the environment so tests do not touch process state.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got {:?}", port)))?;
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.aws.region = region;
        }
        if let Some(key) = lookup("AWS_ACCESS_KEY_ID") {
            self.aws.access_key_id = key;
        }
        if let Some(secret) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.aws.secret_access_key = secret;
        }
        if let Some(endpoint) = lookup("AWS_ENDPOINT_URL") {
            self.aws.endpoint_url = Some(endpoint).filter(|e| !e.is_empty());
        }
        if let Some(bucket) = lookup("UPLOAD_BUCKET") {
            self.upload.bucket = bucket;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.aws.region.is_empty() {
            return Err(Error::Config("aws.region cannot be empty".into()));
        }

        if self.aws.access_key_id.is_empty() {
            return Err(Error::Config(
                "aws.access_key_id (AWS_ACCESS_KEY_ID) is required".into(),
            ));
        }

        if self.aws.secret_access_key.is_empty() {
            return Err(Error::Config(
                "aws.secret_access_key (AWS_SECRET_ACCESS_KEY) is required".into(),
            ));
        }

        if self.upload.bucket.is_empty() {
            return Err(Error::Config(
                "upload.bucket (UPLOAD_BUCKET) is required".into(),
            ));
        }

        if self.upload.url_expiry_secs == 0 {
            return Err(Error::Config("upload.url_expiry_secs must be positive".into()));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(Error::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Socket address the HTTP server binds to
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid server address: {}", e)))
    }

    /// Get the download URL lifetime as Duration
    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.upload.url_expiry_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL: &str = r#"
[server]
host = "127.0.0.1"
port = 8099
cors_enabled = false

[aws]
region = "eu-west-1"
access_key_id = "AKIDEXAMPLE"
secret_access_key = "secret"
endpoint_url = "http://localhost:4566"
force_path_style = true

[upload]
bucket = "apk-drop"
key_prefix = "builds/"

[logging]
level = "debug"
format = "json"
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_config() {
        let config = GatewayConfig::from_str(FULL).unwrap();
        assert_eq!(config.server.port, 8099);
        assert!(!config.server.cors_enabled);
        assert_eq!(config.aws.region, "eu-west-1");
        assert_eq!(config.aws.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.upload.bucket, "apk-drop");
        assert_eq!(config.upload.key_prefix, "builds/");
        assert_eq!(config.upload.content_type, "application/vnd.android.package-archive");
        assert_eq!(config.url_expiry(), Duration::from_secs(3600));
        assert_eq!(config.bind_address().unwrap().to_string(), "127.0.0.1:8099");
    }

    #[test]
    fn test_defaults_and_env_only() {
        let mut config = GatewayConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(config.server.max_upload_bytes, 500 * 1024 * 1024);

        config
            .apply_env(env(&[
                ("PORT", "3009"),
                ("AWS_ACCESS_KEY_ID", "AKID"),
                ("AWS_SECRET_ACCESS_KEY", "shh"),
                ("UPLOAD_BUCKET", "uploads-bucket"),
            ]))
            .unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.port, 3009);
        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(config.upload.bucket, "uploads-bucket");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut config = GatewayConfig::default();
        config.apply_env(env(&[("UPLOAD_BUCKET", "b")])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AWS_ACCESS_KEY_ID"));
    }

    #[test]
    fn test_missing_upload_bucket_rejected() {
        let mut config = GatewayConfig::default();
        config
            .apply_env(env(&[
                ("AWS_ACCESS_KEY_ID", "AKID"),
                ("AWS_SECRET_ACCESS_KEY", "shh"),
            ]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("UPLOAD_BUCKET"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut config = GatewayConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_missing_file_uses_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = GatewayConfig::load_with(
            &path,
            env(&[
                ("AWS_ACCESS_KEY_ID", "AKIDENV"),
                ("AWS_SECRET_ACCESS_KEY", "envsecret"),
                ("UPLOAD_BUCKET", "env-bucket"),
                ("PORT", "8181"),
            ]),
        )
        .unwrap();

        assert_eq!(config.aws.access_key_id, "AKIDENV");
        assert_eq!(config.upload.bucket, "env-bucket");
        assert_eq!(config.server.port, 8181);
        assert_eq!(config.aws.region, "us-east-1");
    }

    #[test]
    fn test_load_missing_file_without_env_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = GatewayConfig::load_with(&path, env(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3gate.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = GatewayConfig::load_with(
            &path,
            env(&[
                ("AWS_ACCESS_KEY_ID", "AKIDENV"),
                ("AWS_SECRET_ACCESS_KEY", "envsecret"),
                ("UPLOAD_BUCKET", "env-bucket"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_file_without_bucket_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3gate.toml");
        std::fs::write(
            &path,
            "[aws]\naccess_key_id = \"AKIDEXAMPLE\"\nsecret_access_key = \"secret\"\n",
        )
        .unwrap();

        let err = GatewayConfig::load_with(&path, env(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3gate.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = GatewayConfig::from_file(&path).unwrap();
        assert_eq!(config.logging.format, "json");
    }
}
