//! Configuration for the pcbook server and client.
//!
//! Both are loaded from TOML files. Every field has a default suitable for
//! local development, so an empty file (or no file) is a valid config:
//!
//! - [`ServerConfig`] - listener, token signing, image storage, access rules, seed users
//! - [`ClientConfig`] - server address, credentials, token refresh timing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{AccessPolicy, TokenRefresh, default_access_policy};
use crate::constants;
use crate::reliability::retry::RetryConfig;
use crate::rpc::methods;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A user provisioned at server startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeed {
    pub username: String,
    pub password: String,
    pub role: String,
}

/// `pcbook serve` configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// HMAC secret for access tokens.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_token_duration_secs")]
    pub token_duration_secs: u64,
    /// Where uploaded images are written.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    #[serde(default = "default_max_image_size")]
    pub max_image_size: usize,
    /// Prometheus listener; metrics are not exported when unset.
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
    /// Method path -> roles allowed to call it. Unlisted methods are public.
    #[serde(default = "default_access")]
    pub access: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_users")]
    pub users: Vec<UserSeed>,
}

fn default_host() -> String {
    constants::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    constants::DEFAULT_PORT
}

fn default_secret_key() -> String {
    constants::DEFAULT_SECRET_KEY.to_string()
}

fn default_token_duration_secs() -> u64 {
    constants::TOKEN_DURATION_SECS
}

fn default_image_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_IMAGE_DIR)
}

fn default_max_image_size() -> usize {
    constants::MAX_IMAGE_SIZE
}

fn default_access() -> BTreeMap<String, Vec<String>> {
    default_access_policy()
        .rules()
        .map(|(method, roles)| {
            let mut roles: Vec<String> = roles.iter().cloned().collect();
            roles.sort();
            (method.to_string(), roles)
        })
        .collect()
}

fn default_users() -> Vec<UserSeed> {
    vec![
        UserSeed {
            username: "admin1".to_string(),
            password: "secret".to_string(),
            role: "admin".to_string(),
        },
        UserSeed {
            username: "user1".to_string(),
            password: "secret".to_string(),
            role: "user".to_string(),
        },
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secret_key: default_secret_key(),
            token_duration_secs: default_token_duration_secs(),
            image_dir: default_image_dir(),
            max_image_size: default_max_image_size(),
            metrics_addr: None,
            access: default_access(),
            users: default_users(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn token_duration(&self) -> Duration {
        Duration::from_secs(self.token_duration_secs)
    }

    /// Builds the access policy from the `[access]` table.
    pub fn access_policy(&self) -> AccessPolicy {
        self.access
            .iter()
            .map(|(method, roles)| (method.clone(), roles.iter().cloned().collect()))
            .collect()
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails with one or more errors:
    /// - Port 0, empty host or secret key
    /// - Zero or longer-than-a-year token duration, zero image size limit
    /// - An access rule with no roles
    /// - A seed user with an empty field, or a duplicate username
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Listener
        if self.host.is_empty() {
            errors.push("host cannot be empty".to_string());
        }
        if self.port == 0 {
            errors.push("port cannot be 0. Use a valid port number (1-65535)".to_string());
        } else if self.port < 1024 {
            warnings.push(format!(
                "port {} is a system/privileged port (< 1024)\n  \
                 Recommendation: Use ports >= 1024 (e.g., 8080) to avoid permission issues",
                self.port
            ));
        }

        // 2. Tokens
        if self.secret_key.is_empty() {
            errors.push("secret_key cannot be empty".to_string());
        } else if self.secret_key == constants::DEFAULT_SECRET_KEY {
            warnings.push(
                "secret_key is the built-in development key\n  \
                 Recommendation: Set a long random secret_key outside local development"
                    .to_string(),
            );
        }
        if self.token_duration_secs == 0 {
            errors.push("token_duration_secs cannot be 0".to_string());
        } else if self.token_duration_secs > constants::MAX_TOKEN_DURATION_SECS {
            errors.push(format!(
                "token_duration_secs cannot exceed {} (one year)",
                constants::MAX_TOKEN_DURATION_SECS
            ));
        }

        // 3. Images
        if self.max_image_size == 0 {
            errors.push("max_image_size cannot be 0".to_string());
        }

        // 4. Access rules
        for (method, roles) in &self.access {
            if roles.is_empty() {
                errors.push(format!(
                    "access rule for '{method}' has no roles; remove the rule to make it public"
                ));
            }
            if !methods::ALL.contains(&method.as_str()) {
                warnings.push(format!("access rule for unknown method '{method}' has no effect"));
            }
        }

        // 5. Seed users
        let mut seen = HashSet::new();
        for user in &self.users {
            if user.username.is_empty() || user.password.is_empty() || user.role.is_empty() {
                errors.push(format!(
                    "user '{}' must have a username, password and role",
                    user.username
                ));
            }
            if !seen.insert(user.username.as_str()) {
                errors.push(format!("user '{}' is listed twice", user.username));
            }
        }
        if self.users.is_empty() {
            warnings.push("no users are configured; only public methods can be called".to_string());
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}

/// `pcbook client` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server `host:port`.
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
}

fn default_address() -> String {
    constants::DEFAULT_CLIENT_ADDRESS.to_string()
}

fn default_username() -> String {
    "admin1".to_string()
}

fn default_password() -> String {
    "secret".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    constants::DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_retry_backoff_secs() -> u64 {
    constants::DEFAULT_REFRESH_BACKOFF.as_secs()
}

fn default_call_timeout_secs() -> u64 {
    constants::DEFAULT_CALL_TIMEOUT.as_secs()
}

fn default_connect_retries() -> u32 {
    constants::DEFAULT_CONNECT_RETRIES
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            username: default_username(),
            password: default_password(),
            refresh_interval_secs: default_refresh_interval_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            connect_retries: default_connect_retries(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn token_refresh(&self) -> TokenRefresh {
        TokenRefresh {
            interval: Duration::from_secs(self.refresh_interval_secs),
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::network().with_max_retries(self.connect_retries)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty address or username, or a zero
    /// interval, backoff or timeout.
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.address.is_empty() {
            errors.push("address cannot be empty".to_string());
        }
        if self.username.is_empty() {
            errors.push("username cannot be empty".to_string());
        }
        if self.refresh_interval_secs == 0 {
            errors.push("refresh_interval_secs cannot be 0".to_string());
        }
        if self.retry_backoff_secs == 0 {
            errors.push("retry_backoff_secs cannot be 0".to_string());
        }
        if self.call_timeout_secs == 0 {
            errors.push("call_timeout_secs cannot be 0".to_string());
        }
        if self.refresh_interval_secs > 0
            && self.retry_backoff_secs > self.refresh_interval_secs
        {
            warnings.push(format!(
                "retry_backoff_secs ({}) is longer than refresh_interval_secs ({})",
                self.retry_backoff_secs, self.refresh_interval_secs
            ));
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.access_policy(), default_access_policy());
    }

    #[test]
    fn test_parse_full_server_config() {
        let toml_str = r#"
host = "127.0.0.1"
port = 9090
secret_key = "a-long-random-secret"
token_duration_secs = 60
image_dir = "/var/lib/pcbook/images"
max_image_size = 2048
metrics_addr = "127.0.0.1:9100"

[access]
"/pcbook.LaptopService/CreateLaptop" = ["admin", "editor"]

[[users]]
username = "editor1"
password = "pw"
role = "editor"
"#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.token_duration(), Duration::from_secs(60));
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));

        let policy = config.access_policy();
        assert_eq!(policy.len(), 1);
        assert!(policy.roles_for(methods::CREATE_LAPTOP).unwrap().contains("editor"));
        assert!(policy.is_public(methods::RATE_LAPTOP));

        let result = config.validate().unwrap();
        assert!(!result.has_warnings(), "{:?}", result.warnings);
    }

    #[test]
    fn test_default_config_warns_about_secret() {
        let result = ServerConfig::default().validate().unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("secret_key")));
    }

    #[test]
    fn test_validate_port_zero() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("port cannot be 0"));
    }

    #[test]
    fn test_validate_privileged_port_warns() {
        let config = ServerConfig {
            port: 80,
            ..ServerConfig::default()
        };
        let result = config.validate().unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("privileged")));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let mut config = ServerConfig {
            secret_key: String::new(),
            token_duration_secs: 0,
            max_image_size: 0,
            ..ServerConfig::default()
        };
        config
            .access
            .insert(methods::UPLOAD_IMAGE.to_string(), Vec::new());
        config.users.push(config.users[0].clone());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("secret_key"));
        assert!(err.contains("token_duration_secs"));
        assert!(err.contains("max_image_size"));
        assert!(err.contains("has no roles"));
        assert!(err.contains("listed twice"));
    }

    #[test]
    fn test_validate_token_duration_upper_bound() {
        let at_limit = ServerConfig {
            token_duration_secs: constants::MAX_TOKEN_DURATION_SECS,
            ..ServerConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        for secs in [constants::MAX_TOKEN_DURATION_SECS + 1, u64::MAX] {
            let config = ServerConfig {
                token_duration_secs: secs,
                ..ServerConfig::default()
            };
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("token_duration_secs cannot exceed"), "{err}");
        }
    }

    #[test]
    fn test_unknown_method_rule_warns() {
        let mut config = ServerConfig::default();
        config
            .access
            .insert("/pcbook.LaptopService/Delete".to_string(), vec!["admin".to_string()]);
        let result = config.validate().unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("unknown method")));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        fs::write(&path, "port = 7000\n").unwrap();

        let config = ServerConfig::load_from(&path).unwrap();
        assert_eq!(config.port, 7000);
        assert!(ServerConfig::load_from(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_client_config_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.address, "127.0.0.1:8080");
        assert_eq!(config.token_refresh(), TokenRefresh::default());
        assert_eq!(config.call_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry_config().max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_zero_interval() {
        let config = ClientConfig {
            refresh_interval_secs: 0,
            ..ClientConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("refresh_interval_secs"));
    }
}
