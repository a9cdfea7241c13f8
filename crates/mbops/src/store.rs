//! Persisted session credential.
//!
//! The credential is an opaque cookie value treated as a bearer secret: raw
//! string contents in a file, no expiry tracking. Expiry is detected
//! reactively by a later validation call failing.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::secrets::resolve_secret;

/// Environment variable consulted when no explicit credential or file is
/// available.
pub const SESSION_COOKIE_ENV: &str = "MICROBLOG_SESSION_COOKIE";

/// An authenticated session with the target platform.
#[derive(Clone)]
pub struct SessionCredential(SecretString);

impl SessionCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential(redacted)")
    }
}

/// Loads the credential in priority order: explicit CLI value, cookie file,
/// environment variable. Read at most once per invocation.
pub fn load_credential(
    explicit: Option<&str>,
    path: &Path,
) -> Result<SessionCredential, ConfigError> {
    let file = path.exists().then(|| path.to_string_lossy().into_owned());

    let secret = resolve_secret(explicit, file.as_deref(), Some(SESSION_COOKIE_ENV))
        .map_err(|_| {
            ConfigError::Credentials(format!(
                "no session cookie provided (use --session-cookie, the {} file, or ${})",
                path.display(),
                SESSION_COOKIE_ENV
            ))
        })?;

    debug!("session credential loaded");
    Ok(SessionCredential(secret))
}

/// Writes the credential to a file as a raw string.
pub fn save_credential(credential: &SessionCredential, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, credential.expose())?;
    info!("session cookie saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_value_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".session-cookie");
        std::fs::write(&path, "from-file").unwrap();

        let credential = load_credential(Some("explicit"), &path).unwrap();
        assert_eq!(credential.expose(), "explicit");
    }

    #[test]
    fn file_is_read_when_no_explicit_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".session-cookie");
        std::fs::write(&path, "from-file\n").unwrap();

        let credential = load_credential(None, &path).unwrap();
        assert_eq!(credential.expose(), "from-file");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".session-cookie");

        save_credential(&SessionCredential::new("abc123"), &path).unwrap();
        let loaded = load_credential(None, &path).unwrap();
        assert_eq!(loaded.expose(), "abc123");
    }

    #[test]
    fn missing_everything_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist");
        // The env var may leak in from the host; skip the assertion if set.
        if std::env::var(SESSION_COOKIE_ENV).is_err() {
            assert!(load_credential(None, &path).is_err());
        }
    }

    #[test]
    fn debug_output_redacts_the_value() {
        let credential = SessionCredential::new("topsecret");
        assert!(!format!("{credential:?}").contains("topsecret"));
    }
}
