//! Configuration management
//!
//! Configuration is read from `config.yml` and can be overridden with
//! `VASTLYWISE_*` environment variables. Missing values fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix for environment overrides
const ENV_PREFIX: &str = "VASTLYWISE_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the admin frontend, sends cookies)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/vastlywise.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens. Empty means a random per-process secret.
    #[serde(default)]
    pub jwt_secret: String,
    /// Token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64,
    /// Mark the auth cookie `Secure` (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_seconds: default_token_ttl(),
            secure_cookie: false,
        }
    }
}

fn default_token_ttl() -> i64 {
    60 * 60 * 24
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "application/pdf",
        "text/plain",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "application/pdf" => "pdf",
            "text/plain" => "txt",
            "application/msword" => "doc",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
            _ => "bin",
        }
    }

    /// Maximum size rendered in whole megabytes, for error messages
    pub fn max_size_mb(&self) -> u64 {
        self.max_file_size / (1024 * 1024)
    }
}

/// Website preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Timeout for fetching the target page
    #[serde(default = "default_preview_timeout")]
    pub timeout_secs: u64,
    /// How long fetched metadata stays cached. 0 disables caching.
    #[serde(default = "default_preview_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_preview_timeout(),
            cache_ttl_seconds: default_preview_cache_ttl(),
        }
    }
}

fn default_preview_timeout() -> u64 {
    10
}

fn default_preview_cache_ttl() -> u64 {
    300
}

/// Demo data seeding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Insert demo users, taxonomy, posts and settings into an empty database
    #[serde(default)]
    pub enabled: bool,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is an error
    /// that carries the line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides
    ///
    /// Recognised variables (all prefixed with `VASTLYWISE_`):
    /// `SERVER_HOST`, `SERVER_PORT`, `SERVER_CORS_ORIGIN`, `DATABASE_DRIVER`,
    /// `DATABASE_URL`, `AUTH_JWT_SECRET`, `AUTH_SECURE_COOKIE`, `UPLOAD_PATH`,
    /// `UPLOAD_MAX_FILE_SIZE`, `PREVIEW_TIMEOUT_SECS`,
    /// `PREVIEW_CACHE_TTL_SECONDS`, `SEED_ENABLED`.
    /// A bare `JWT_SECRET` is honoured when the prefixed one is absent.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("SERVER_PORT") {
            self.server.port = port;
        }
        if let Some(origin) = env_var("SERVER_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }

        if let Some(driver) = env_var("DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Some(url) = env_var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(secret) = env_var("AUTH_JWT_SECRET").or_else(|| std::env::var("JWT_SECRET").ok()) {
            self.auth.jwt_secret = secret;
        }
        if let Some(secure) = env_bool("AUTH_SECURE_COOKIE") {
            self.auth.secure_cookie = secure;
        }

        if let Some(path) = env_var("UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Some(size) = env_parse::<u64>("UPLOAD_MAX_FILE_SIZE") {
            self.upload.max_file_size = size;
        }

        if let Some(timeout) = env_parse::<u64>("PREVIEW_TIMEOUT_SECS") {
            self.preview.timeout_secs = timeout;
        }
        if let Some(ttl) = env_parse::<u64>("PREVIEW_CACHE_TTL_SECONDS") {
            self.preview.cache_ttl_seconds = ttl;
        }

        if let Some(enabled) = env_bool("SEED_ENABLED") {
            self.seed.enabled = enabled;
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

/// Unparseable values are ignored
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    env_var(name).and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn config_yaml_roundtrip(port in 1u16..=65535, secure in any::<bool>(), ttl in 0u64..86400) {
            let mut config = Config::default();
            config.server.port = port;
            config.auth.secure_cookie = secure;
            config.preview.cache_ttl_seconds = ttl;

            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded.server.port, port);
            prop_assert_eq!(loaded.auth.secure_cookie, secure);
            prop_assert_eq!(loaded.preview.cache_ttl_seconds, ttl);
        }

        #[test]
        fn env_port_overrides_file(file_port in 1u16..=65535, env_port in 1u16..=65535) {
            let _guard = lock_env();
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "server:\n  port: {}\n", file_port).unwrap();

            std::env::set_var("VASTLYWISE_SERVER_PORT", env_port.to_string());
            let config = Config::load_with_env(file.path());
            std::env::remove_var("VASTLYWISE_SERVER_PORT");

            prop_assert_eq!(config.unwrap().server.port, env_port);
        }
    }
}
