//! Sign-in operation: obtain a fresh session cookie via the magic-link
//! email and persist it.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::Config;
use crate::correlate;
use crate::error::Result;
use crate::extract::TokenExtractor;
use crate::handshake::{exchange_token, perform_handshake};
use crate::mailbox::{ImapMailbox, MatchCriteria, PollOptions};
use crate::platform::PlatformClient;
use crate::store::save_credential;

const SIGNIN_SUBJECT: &str = "sign-in";

#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// Write the cookie to this file instead of the configured path.
    pub output: Option<PathBuf>,

    /// Print the cookie to stdout instead of writing a file.
    pub stdout: bool,

    pub max_retries: Option<u32>,
    pub retry_interval: Option<u64>,
}

/// Runs the full sign-in handshake and persists the resulting cookie.
pub async fn run(config: &Config, options: &AuthOptions) -> Result<()> {
    let mut platform = PlatformClient::new(&config.platform)?;
    let connector = ImapMailbox::new(config.mailbox.clone());

    let poll = super::apply_poll_overrides(
        PollOptions::signin(),
        options.max_retries,
        options.retry_interval,
    );
    let criteria = MatchCriteria::new(&config.platform.notification_sender, SIGNIN_SUBJECT);
    let extractor = TokenExtractor::signin(&config.platform.base_url)?;

    let token = perform_handshake(
        &connector,
        || platform.request_signin_email(&config.platform.account_email),
        &poll,
        &criteria,
        correlate::signin_skew(),
        &extractor,
    )
    .await?;

    let credential = exchange_token(&token, &config.platform.session_cookie_name).await?;

    // Best effort: the cookie is usable even if the account stays on another
    // default site.
    platform.set_credential(credential.clone());
    if let Err(e) = platform.switch_default_site(&config.platform.site_id).await {
        warn!("default-site switch failed: {e}");
    }

    if options.stdout {
        // The cookie is the deliverable here, so it goes to stdout verbatim.
        println!("{}", credential.expose());
        return Ok(());
    }

    let path = options
        .output
        .as_deref()
        .unwrap_or(&config.credentials.session_cookie_path);
    save_credential(&credential, path)?;

    info!("authentication complete");
    Ok(())
}
