//! Request/response orchestration for the email-mediated handshake:
//! trigger an action, wait for the correlated email, extract its token and
//! exchange the token for a session credential.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, info};

use crate::correlate::CorrelationWindow;
use crate::error::HandshakeError;
use crate::extract::{ExtractedToken, TokenExtractor};
use crate::mailbox::{poll_for_token, MailboxConnector, MatchCriteria, PollOptions};
use crate::platform::USER_AGENT;
use crate::store::SessionCredential;

const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one trigger-then-poll handshake.
///
/// The trigger is issued first; on failure the whole operation fails fast.
/// On success its acceptance time anchors the correlation window, and the
/// mailbox is polled until a matching message yields a token.
pub async fn perform_handshake<C, F, Fut>(
    connector: &C,
    trigger: F,
    options: &PollOptions,
    criteria: &MatchCriteria,
    skew: chrono::Duration,
    extractor: &TokenExtractor,
) -> Result<ExtractedToken, HandshakeError>
where
    C: MailboxConnector,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<(), HandshakeError>>,
{
    trigger().await?;
    let submitted_at = Utc::now();
    info!(
        "trigger accepted at {}",
        submitted_at.format("%H:%M:%S UTC")
    );

    let window = CorrelationWindow::starting_at(submitted_at, skew);
    poll_for_token(connector, options, criteria, &window, extractor).await
}

/// Exchanges a magic-link token for a session credential: GET the URL
/// following redirects, then read the named cookie out of the jar.
///
/// Never retried; magic links are single-use, so a second attempt at the
/// same token is assumed futile.
pub async fn exchange_token(
    token: &ExtractedToken,
    cookie_name: &str,
) -> Result<SessionCredential, HandshakeError> {
    info!("following magic link to authenticate");

    let jar = Arc::new(Jar::default());
    let client = reqwest::Client::builder()
        .cookie_provider(jar.clone())
        .user_agent(USER_AGENT)
        .timeout(EXCHANGE_TIMEOUT)
        .build()
        .map_err(|e| HandshakeError::Exchange(e.to_string()))?;

    let response = client
        .get(token.url())
        .send()
        .await
        .map_err(|e| HandshakeError::Exchange(e.to_string()))?;

    if !response.status().is_success() {
        return Err(HandshakeError::Exchange(format!(
            "magic link returned status {}",
            response.status()
        )));
    }

    let url = reqwest::Url::parse(token.url())
        .map_err(|e| HandshakeError::Exchange(format!("invalid token URL: {e}")))?;

    let cookies = jar.cookies(&url);
    let value = cookies
        .as_ref()
        .and_then(|header| header.to_str().ok())
        .and_then(|header| find_cookie(header, cookie_name));

    match value {
        Some(value) => {
            debug!("session cookie captured");
            Ok(SessionCredential::new(value))
        }
        None => Err(HandshakeError::Exchange(format!(
            "no '{cookie_name}' cookie after following the magic link"
        ))),
    }
}

/// Picks one cookie value out of a `Cookie:` header string.
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header.split("; ").find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_cookie_picks_named_value() {
        let header = "theme=dark; rack.session=abc123; _tz=UTC";
        assert_eq!(find_cookie(header, "rack.session").as_deref(), Some("abc123"));
    }

    #[test]
    fn find_cookie_misses_absent_name() {
        assert!(find_cookie("theme=dark", "rack.session").is_none());
    }

    #[test]
    fn find_cookie_does_not_match_prefixes() {
        let header = "rack.session2=nope; other=1";
        assert!(find_cookie(header, "rack.session").is_none());
    }
}
