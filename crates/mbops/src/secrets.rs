//! Secret resolution from multiple sources.
//!
//! Secrets (the mailbox app password, the persisted session cookie) can come
//! from a direct config value, a file, or an environment variable, resolved
//! in that priority order.

use secrecy::SecretString;
use std::fs;
use thiserror::Error;

/// Error type for secret resolution failures.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("no secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("failed to read secret from file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Resolves a secret from multiple sources in priority order:
/// 1. Direct value (if provided and non-empty)
/// 2. File contents (if path provided)
/// 3. Environment variable (if name provided)
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString, SecretError> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            match fs::read_to_string(path) {
                Ok(content) => return Ok(SecretString::from(content.trim().to_string())),
                Err(e) => {
                    return Err(SecretError::FileRead {
                        path: path.to_string(),
                        source: e,
                    })
                }
            }
        }
    }

    if let Some(name) = env_var {
        if !name.is_empty() {
            return match std::env::var(name) {
                Ok(value) => Ok(SecretString::from(value.trim().to_string())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            };
        }
    }

    Err(SecretError::NoSourceProvided)
}
