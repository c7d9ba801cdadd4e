use crate::constants::{self, env_vars};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

pub mod paths;
pub mod validation;

use paths::{get_config_path, get_log_dir_path};
use validation::validate_config;

/// Configuration structure for the relay.
///
/// Non-secret settings live in a TOML file in the platform config directory.
/// Credentials (API key, VAPID private key, quota bypass token) come from the
/// environment and are never written back to disk.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the upstream fixtures API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Upstream API key. Required at startup.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// VAPID public key (base64url) handed to browsers.
    #[serde(default, skip_serializing)]
    pub vapid_public_key: Option<String>,
    /// VAPID private key (base64url) used to sign push messages.
    #[serde(default, skip_serializing)]
    pub vapid_private_key: Option<String>,
    /// Subject claim of the VAPID signature.
    #[serde(default = "default_vapid_subject")]
    pub vapid_subject: String,
    /// Listening port of the client-facing API.
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP timeout in seconds for upstream requests.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    /// Interval between notification scans.
    #[serde(default = "default_notify_interval")]
    pub notify_interval_seconds: u64,
    /// Upstream requests admitted per quota window.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    /// Length of the quota window in seconds.
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_seconds: u64,
    /// LRU cap of each cache pool.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Token that lets loopback callers skip the quota.
    #[serde(default, skip_serializing)]
    pub quota_bypass_token: Option<String>,
    /// Path to the log file. If not specified, logs go to the default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
}

fn default_api_base_url() -> String {
    constants::DEFAULT_API_BASE_URL.to_string()
}

fn default_vapid_subject() -> String {
    constants::notify::DEFAULT_VAPID_SUBJECT.to_string()
}

fn default_port() -> u16 {
    constants::DEFAULT_PORT
}

fn default_http_timeout() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECONDS
}

fn default_notify_interval() -> u64 {
    constants::notify::DEFAULT_INTERVAL_SECONDS
}

fn default_rate_limit_requests() -> u32 {
    constants::rate_limit::DEFAULT_REQUESTS
}

fn default_rate_limit_window() -> u64 {
    constants::rate_limit::DEFAULT_WINDOW_SECONDS
}

fn default_cache_capacity() -> usize {
    constants::cache_ttl::DEFAULT_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: default_api_base_url(),
            api_key: String::new(),
            vapid_public_key: None,
            vapid_private_key: None,
            vapid_subject: default_vapid_subject(),
            port: default_port(),
            http_timeout_seconds: default_http_timeout(),
            notify_interval_seconds: default_notify_interval(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_seconds: default_rate_limit_window(),
            cache_capacity: default_cache_capacity(),
            quota_bypass_token: None,
            log_file_path: None,
        }
    }
}

/// Reads an environment variable, treating blank values as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a numeric environment variable, ignoring values that do not parse
fn env_number<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_value(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {name}: '{raw}' is not a valid number");
            None
        }
    }
}

fn mask(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "(set)",
        _ => "(not set)",
    }
}

impl Config {
    /// Loads configuration from the default config file location, falling
    /// back to defaults when no file exists. Environment variables override
    /// file values.
    ///
    /// # Environment Variables
    /// - `FOOTBALL_API_KEY` - Upstream API key
    /// - `VAPID_PUBLIC_KEY` / `VAPID_PRIVATE_KEY` / `VAPID_SUBJECT` - Web Push signing
    /// - `PORT` - Listening port
    /// - `MATCHDAY_API_BASE_URL` - Override upstream base URL
    /// - `MATCHDAY_HTTP_TIMEOUT` - Override HTTP timeout in seconds
    /// - `MATCHDAY_NOTIFY_INTERVAL` - Override notification scan interval
    /// - `MATCHDAY_QUOTA_BYPASS_TOKEN` - Enable quota bypass for loopback callers
    /// - `MATCHDAY_LOG_FILE` - Override log file path
    ///
    /// The API key is not checked here; see [`Config::require_api_key`].
    pub async fn load() -> Result<Self, AppError> {
        let config_path = get_config_path();

        let mut config = if Path::new(&config_path).exists() {
            Self::load_from_path(&config_path).await?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies environment overrides on top of the current values
    pub fn apply_env_overrides(&mut self) {
        if let Some(api_key) = env_value(env_vars::API_KEY) {
            self.api_key = api_key;
        }
        if let Some(key) = env_value(env_vars::VAPID_PUBLIC_KEY) {
            self.vapid_public_key = Some(key);
        }
        if let Some(key) = env_value(env_vars::VAPID_PRIVATE_KEY) {
            self.vapid_private_key = Some(key);
        }
        if let Some(subject) = env_value(env_vars::VAPID_SUBJECT) {
            self.vapid_subject = subject;
        }
        if let Some(port) = env_number(env_vars::PORT) {
            self.port = port;
        }
        if let Some(url) = env_value(env_vars::API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(timeout) = env_number(env_vars::HTTP_TIMEOUT) {
            self.http_timeout_seconds = timeout;
        }
        if let Some(interval) = env_number(env_vars::NOTIFY_INTERVAL) {
            self.notify_interval_seconds = interval;
        }
        if let Some(token) = env_value(env_vars::QUOTA_BYPASS_TOKEN) {
            self.quota_bypass_token = Some(token);
        }
        if let Some(log_file_path) = env_value(env_vars::LOG_FILE) {
            self.log_file_path = Some(log_file_path);
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(
            &self.api_base_url,
            self.rate_limit_requests,
            self.rate_limit_window_seconds,
            self.notify_interval_seconds,
            self.cache_capacity,
            &self.log_file_path,
        )
    }

    /// Returns the API key, or `MissingCredential` when it is not configured
    pub fn require_api_key(&self) -> Result<&str, AppError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(AppError::missing_credential(env_vars::API_KEY));
        }
        Ok(key)
    }

    /// Both VAPID keys, when configured
    pub fn vapid_keypair(&self) -> Option<(&str, &str)> {
        match (&self.vapid_public_key, &self.vapid_private_key) {
            (Some(public_key), Some(private_key))
                if !public_key.is_empty() && !private_key.is_empty() =>
            {
                Some((public_key.as_str(), private_key.as_str()))
            }
            _ => None,
        }
    }

    /// Saves current configuration to the default config file location.
    pub async fn save(&self) -> Result<(), AppError> {
        let config_path = get_config_path();
        self.save_to_path(&config_path).await
    }

    pub fn get_config_path() -> String {
        paths::get_config_path()
    }

    pub fn get_log_dir_path() -> String {
        paths::get_log_dir_path()
    }

    /// Displays current configuration settings to stdout with secrets masked.
    pub async fn display() -> Result<(), AppError> {
        let config_path = get_config_path();
        let log_dir = get_log_dir_path();
        let config = Config::load().await?;

        println!("\nCurrent Configuration");
        println!("────────────────────────────────────");
        println!("Config Location:");
        if Path::new(&config_path).exists() {
            println!("{config_path}");
        } else {
            println!("{config_path}");
            println!("(Not created, using defaults)");
        }
        println!("────────────────────────────────────");
        println!("API Base URL:");
        println!("{}", config.api_base_url);
        println!("API Key: {}", mask(Some(config.api_key.as_str())));
        println!("────────────────────────────────────");
        println!("Listening Port: {}", config.port);
        println!("HTTP Timeout: {} seconds", config.http_timeout_seconds);
        println!(
            "Upstream Quota: {} requests / {} seconds",
            config.rate_limit_requests, config.rate_limit_window_seconds
        );
        println!("Cache Capacity: {} entries per pool", config.cache_capacity);
        println!("────────────────────────────────────");
        println!("Notify Interval: {} seconds", config.notify_interval_seconds);
        println!("VAPID Public Key: {}", mask(config.vapid_public_key.as_deref()));
        println!("VAPID Private Key: {}", mask(config.vapid_private_key.as_deref()));
        println!("VAPID Subject: {}", config.vapid_subject);
        println!(
            "Quota Bypass Token: {}",
            mask(config.quota_bypass_token.as_deref())
        );
        println!("────────────────────────────────────");
        println!("Log File Location:");
        if let Some(custom_path) = &config.log_file_path {
            println!("{custom_path}");
        } else {
            println!("{log_dir}/{}", constants::LOG_FILE_NAME);
            println!("(Default location)");
        }

        Ok(())
    }

    /// Saves configuration to a custom file path, creating the parent
    /// directory if needed. Credentials are skipped during serialization.
    pub async fn save_to_path(&self, path: &str) -> Result<(), AppError> {
        let config_dir = Path::new(path).parent().ok_or_else(|| {
            AppError::config_error(format!("Path '{path}' has no parent directory"))
        })?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }
        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Loads configuration from a custom file path without env overrides.
    pub async fn load_from_path(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    const ALL_ENV_VARS: [&str; 10] = [
        env_vars::API_KEY,
        env_vars::VAPID_PUBLIC_KEY,
        env_vars::VAPID_PRIVATE_KEY,
        env_vars::VAPID_SUBJECT,
        env_vars::PORT,
        env_vars::API_BASE_URL,
        env_vars::HTTP_TIMEOUT,
        env_vars::NOTIFY_INTERVAL,
        env_vars::QUOTA_BYPASS_TOKEN,
        env_vars::LOG_FILE,
    ];

    fn clear_env() {
        for name in ALL_ENV_VARS {
            unsafe { std::env::remove_var(name) };
        }
    }

    fn set_env(name: &str, value: &str) {
        unsafe { std::env::set_var(name, value) };
    }

    #[tokio::test]
    async fn test_config_load_existing_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_path_str = config_path.to_string_lossy();

        let config_content = r#"
api_base_url = "https://api.example.com"
port = 8080
rate_limit_requests = 100
log_file_path = "/custom/log/path"
"#;
        tokio::fs::write(&config_path, config_content).await.unwrap();

        let config = Config::load_from_path(&config_path_str).await.unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_limit_requests, 100);
        assert_eq!(config.rate_limit_window_seconds, 60);
        assert_eq!(config.log_file_path, Some("/custom/log/path".to_string()));
    }

    #[tokio::test]
    async fn test_config_empty_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        tokio::fs::write(&config_path, "").await.unwrap();

        let config = Config::load_from_path(&config_path.to_string_lossy())
            .await
            .unwrap();

        assert_eq!(config.api_base_url, constants::DEFAULT_API_BASE_URL);
        assert_eq!(config.port, constants::DEFAULT_PORT);
        assert_eq!(config.http_timeout_seconds, 30);
        assert_eq!(config.cache_capacity, 1000);
        assert!(config.api_key.is_empty());
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_config_save_never_writes_secrets() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let config_path_str = config_path.to_string_lossy();

        let config = Config {
            api_key: "super-secret-key".to_string(),
            vapid_public_key: Some("public-key".to_string()),
            vapid_private_key: Some("private-key".to_string()),
            quota_bypass_token: Some("bypass-token".to_string()),
            port: 4000,
            ..Config::default()
        };
        config.save_to_path(&config_path_str).await.unwrap();

        let content = tokio::fs::read_to_string(&config_path).await.unwrap();
        assert!(!content.contains("super-secret-key"), "Content: {content}");
        assert!(!content.contains("private-key"), "Content: {content}");
        assert!(!content.contains("public-key"), "Content: {content}");
        assert!(!content.contains("bypass-token"), "Content: {content}");
        assert!(content.contains("port = 4000"), "Content: {content}");

        let loaded = Config::load_from_path(&config_path_str).await.unwrap();
        assert_eq!(loaded.port, 4000);
        assert!(loaded.api_key.is_empty());
        assert!(loaded.vapid_keypair().is_none());
    }

    #[tokio::test]
    async fn test_config_without_log_file_path_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_string.contains("log_file_path"));

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized.api_base_url, config.api_base_url);
        assert_eq!(deserialized.log_file_path, None);
    }

    #[tokio::test]
    async fn test_config_malformed_toml_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        tokio::fs::write(&config_path, "port = [not valid").await.unwrap();

        let result = Config::load_from_path(&config_path.to_string_lossy()).await;
        assert!(matches!(result.unwrap_err(), AppError::TomlDeserialize(_)));
    }

    #[tokio::test]
    async fn test_config_load_from_nonexistent_path() {
        let result = Config::load_from_path("/nonexistent/path/config.toml").await;
        assert!(matches!(result.unwrap_err(), AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_config_with_extra_fields() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let content = r#"
api_base_url = "https://api.example.com"
unknown_field = "ignored"
"#;
        tokio::fs::write(&config_path, content).await.unwrap();

        let config = Config::load_from_path(&config_path.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::default();
        assert!(matches!(
            config.require_api_key(),
            Err(AppError::MissingCredential(_))
        ));

        config.api_key = "   ".to_string();
        assert!(config.require_api_key().is_err());

        config.api_key = "abc123".to_string();
        assert_eq!(config.require_api_key().unwrap(), "abc123");
    }

    #[test]
    fn test_vapid_keypair_needs_both_keys() {
        let mut config = Config::default();
        assert!(config.vapid_keypair().is_none());

        config.vapid_public_key = Some("pub".to_string());
        assert!(config.vapid_keypair().is_none());

        config.vapid_private_key = Some(String::new());
        assert!(config.vapid_keypair().is_none());

        config.vapid_private_key = Some("priv".to_string());
        assert_eq!(config.vapid_keypair(), Some(("pub", "priv")));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        set_env(env_vars::API_KEY, "env-key");
        set_env(env_vars::PORT, "5050");
        set_env(env_vars::API_BASE_URL, "http://127.0.0.1:9999");
        set_env(env_vars::NOTIFY_INTERVAL, "30");
        set_env(env_vars::QUOTA_BYPASS_TOKEN, "token");
        set_env(env_vars::VAPID_PUBLIC_KEY, "pub");
        set_env(env_vars::VAPID_PRIVATE_KEY, "priv");

        let mut config = Config::default();
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.port, 5050);
        assert_eq!(config.api_base_url, "http://127.0.0.1:9999");
        assert_eq!(config.notify_interval_seconds, 30);
        assert_eq!(config.quota_bypass_token.as_deref(), Some("token"));
        assert_eq!(config.vapid_keypair(), Some(("pub", "priv")));
    }

    #[test]
    #[serial]
    fn test_env_overrides_ignore_blank_and_invalid_values() {
        clear_env();
        set_env(env_vars::API_KEY, "  ");
        set_env(env_vars::PORT, "not-a-port");
        set_env(env_vars::HTTP_TIMEOUT, "-5");

        let mut config = Config::default();
        config.apply_env_overrides();
        clear_env();

        assert!(config.api_key.is_empty());
        assert_eq!(config.port, constants::DEFAULT_PORT);
        assert_eq!(config.http_timeout_seconds, 30);
    }

    #[test]
    fn test_config_path_generation() {
        let config_path = Config::get_config_path();
        assert!(config_path.contains("matchday_relay"));
        assert!(config_path.ends_with("config.toml"));
    }
}
