//! End-to-end operations behind the CLI subcommands.

pub mod auth;
pub mod backup;
pub mod deploy;

use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::error::{MbopsError, Result};
use crate::mailbox::PollOptions;
use crate::platform::PlatformClient;
use crate::store::{load_credential, SessionCredential};

/// Applies CLI retry overrides on top of a flow's poll preset.
fn apply_poll_overrides(
    mut options: PollOptions,
    max_retries: Option<u32>,
    retry_interval: Option<u64>,
) -> PollOptions {
    if let Some(max_retries) = max_retries {
        options.max_attempts = max_retries;
    }
    if let Some(secs) = retry_interval {
        options.retry_interval = Duration::from_secs(secs);
    }
    options
}

/// Builds an authenticated platform client, verifying the session cookie
/// before any action that depends on it.
async fn authenticated_platform(
    config: &Config,
    explicit_cookie: Option<&str>,
) -> Result<PlatformClient> {
    let credential = load_session(config, explicit_cookie)?;

    let mut platform = PlatformClient::new(&config.platform)?;
    platform.set_credential(credential);

    if !platform.validate_session().await? {
        return Err(MbopsError::SessionInvalid);
    }
    info!("session cookie accepted");
    Ok(platform)
}

fn load_session(config: &Config, explicit: Option<&str>) -> Result<SessionCredential> {
    Ok(load_credential(
        explicit,
        &config.credentials.session_cookie_path,
    )?)
}
