pub mod archive;
pub mod config;
pub mod correlate;
pub mod error;
pub mod extract;
pub mod handshake;
pub mod mailbox;
pub mod monitor;
pub mod ops;
pub mod platform;
pub mod secrets;
pub mod store;

pub use config::{load_config, Config, MailboxConfig, PlatformConfig};
pub use correlate::CorrelationWindow;
pub use error::{
    ArchiveError, AttemptError, ConfigError, HandshakeError, MbopsError, Result,
};
pub use extract::{ExtractedToken, TokenExtractor};
pub use handshake::{exchange_token, perform_handshake};
pub use mailbox::{ImapMailbox, MailboxConnector, MailboxSession, MatchCriteria, PollOptions};
pub use monitor::{monitor_build, BuildProgress, BuildStatusSample, CompletionTracker};
pub use platform::PlatformClient;
pub use secrets::{resolve_secret, SecretError};
pub use store::{load_credential, save_credential, SessionCredential};
