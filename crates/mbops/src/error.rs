//! Error types for mbops operations.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for one CLI operation.
#[derive(Error, Debug)]
pub enum MbopsError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("invalid link pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session cookie was rejected; run 'mbops auth' to obtain a fresh one")]
    SessionInvalid,

    #[error("build did not complete within the monitor window")]
    BuildTimeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for top-level operations.
pub type Result<T> = std::result::Result<T, MbopsError>;

/// Fatal failures of one email-mediated handshake.
///
/// Transient per-attempt problems are [`AttemptError`] and never reach the
/// caller; everything here terminates the operation.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// The mailbox rejected our credentials. Never retried.
    #[error("mailbox authentication failed: {0}")]
    MailboxAuth(String),

    /// Could not reach the mailbox at all when opening the first session.
    #[error("mailbox connection failed: {0}")]
    MailboxConnect(String),

    /// The triggering HTTP action failed. The whole run fails fast; the
    /// caller may re-invoke the program.
    #[error("trigger request failed: {0}")]
    Trigger(String),

    /// The retry budget was exhausted without a usable token.
    #[error("no matching email yielded a token after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// Following the token URL did not produce the expected session cookie.
    /// Not retried: magic links are single-use.
    #[error("token exchange failed: {0}")]
    Exchange(String),
}

/// Failures local to one poll attempt.
///
/// These are logged, counted against the retry budget, and the loop
/// continues.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("mailbox search failed: {0}")]
    Search(String),

    #[error("message fetch failed: {0}")]
    Fetch(String),

    #[error("message decode failed: {0}")]
    Decode(String),

    #[error("session reopen failed: {0}")]
    Reconnect(String),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("config validation failed: {message}")]
    Validation { message: String },

    #[error("credentials not found: {0}")]
    Credentials(String),
}

/// Archive download, backup and extraction errors.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("unexpected archive layout in '{path}': {reason}")]
    InvalidLayout { path: PathBuf, reason: String },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
