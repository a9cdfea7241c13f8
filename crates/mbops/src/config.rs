//! Explicit configuration for all components.
//!
//! Everything the components need is carried in a [`Config`] loaded from a
//! JSON file and passed into constructors. There is no implicit process-wide
//! state beyond the environment variables named by the config itself.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::secrets::resolve_secret;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub platform: PlatformConfig,
    pub mailbox: MailboxConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Target blogging platform settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    /// Base URL of the platform's web UI.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Account email address the sign-in link is sent for.
    pub account_email: String,

    /// Site id used for exports and the default-site switch.
    pub site_id: String,

    /// Theme id used for theme reloads.
    pub theme_id: String,

    /// Name of the session cookie set by the magic link.
    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,

    /// Sender address of the platform's notification emails.
    #[serde(default = "default_sender")]
    pub notification_sender: String,
}

/// Remote mailbox (IMAP) settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxConfig {
    #[serde(default = "default_imap_host")]
    pub host: String,

    #[serde(default = "default_imap_port")]
    pub port: u16,

    pub username: String,

    /// App password, directly in the config. Prefer the file or env var form.
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub password_file: Option<String>,

    #[serde(default)]
    pub password_env_var: Option<String>,
}

impl MailboxConfig {
    /// Resolves the mailbox app password from the configured sources.
    pub fn resolve_password(&self) -> Result<SecretString, ConfigError> {
        resolve_secret(
            self.password.as_deref(),
            self.password_file.as_deref(),
            self.password_env_var.as_deref(),
        )
        .map_err(|e| ConfigError::Credentials(e.to_string()))
    }
}

/// Where the persisted session credential lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsConfig {
    /// File the session cookie is written to and read from.
    #[serde(default = "default_cookie_path")]
    pub session_cookie_path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            session_cookie_path: default_cookie_path(),
        }
    }
}

fn default_base_url() -> String {
    "https://micro.blog".to_string()
}

fn default_cookie_name() -> String {
    "rack.session".to_string()
}

fn default_sender() -> String {
    "help@micro.blog".to_string()
}

fn default_imap_host() -> String {
    "imap.gmail.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_cookie_path() -> PathBuf {
    PathBuf::from(".session-cookie")
}

/// Loads and validates a config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Parses and validates a config from a JSON string.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !config.platform.base_url.starts_with("http://")
        && !config.platform.base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation {
            message: format!(
                "platform.baseUrl must be an http(s) URL, got '{}'",
                config.platform.base_url
            ),
        });
    }

    if config.platform.account_email.is_empty() {
        return Err(ConfigError::Validation {
            message: "platform.accountEmail must not be empty".to_string(),
        });
    }

    if config.mailbox.username.is_empty() {
        return Err(ConfigError::Validation {
            message: "mailbox.username must not be empty".to_string(),
        });
    }

    if config.mailbox.password.is_none()
        && config.mailbox.password_file.is_none()
        && config.mailbox.password_env_var.is_none()
    {
        return Err(ConfigError::Validation {
            message: "mailbox needs one of password, passwordFile or passwordEnvVar".to_string(),
        });
    }

    Ok(())
}
