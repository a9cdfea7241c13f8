//! The inbox poll loop: repeated searches with retries, proactive session
//! refresh, and per-attempt error recovery.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::correlate::CorrelationWindow;
use crate::error::{AttemptError, HandshakeError};
use crate::extract::{ExtractedToken, TokenExtractor};

use super::{CandidateMessage, MailboxConnector, MailboxSession, MatchCriteria};

/// Retry behavior of the poll loop.
///
/// The budget here is attempt-count-based with a fixed per-attempt delay,
/// unlike the build monitor's wall-clock budget.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Attempts before giving up with a timeout.
    pub max_attempts: u32,

    /// Sleep between attempts after the first.
    pub retry_interval: Duration,

    /// Sleep before the first search. Longer than the steady-state interval,
    /// since the trigger needs time to produce an email at all.
    pub initial_delay: Duration,

    /// Proactively reopen the session every this many attempts, to pre-empt
    /// server-side idle timeouts that are otherwise only detectable by
    /// failure. Zero disables the refresh.
    pub refresh_every: u32,

    /// Only the newest this-many search hits are fetched per attempt, to
    /// bound cost in noisy inboxes. Older matches are never inspected.
    pub fetch_window: usize,
}

impl PollOptions {
    /// Preset for sign-in emails, which normally arrive within a minute.
    pub fn signin() -> Self {
        Self {
            max_attempts: 5,
            retry_interval: Duration::from_secs(12),
            initial_delay: Duration::from_secs(5),
            refresh_every: 10,
            fetch_window: 20,
        }
    }

    /// Preset for export-ready notifications. Exports typically take 2-5
    /// minutes and can take much longer under load, so the budget is about
    /// 20 minutes with a long initial grace.
    pub fn export() -> Self {
        Self {
            max_attempts: 50,
            retry_interval: Duration::from_secs(24),
            initial_delay: Duration::from_secs(60),
            refresh_every: 10,
            fetch_window: 50,
        }
    }
}

/// Polls the mailbox until a matching message yields a token, or the retry
/// budget is exhausted.
///
/// The session is always logged out before returning, on success and on
/// failure alike.
pub async fn poll_for_token<C>(
    connector: &C,
    options: &PollOptions,
    criteria: &MatchCriteria,
    window: &CorrelationWindow,
    extractor: &TokenExtractor,
) -> Result<ExtractedToken, HandshakeError>
where
    C: MailboxConnector,
{
    let mut session = connector.connect().await?;

    let outcome = run_attempts(
        connector,
        &mut session,
        options,
        criteria,
        window,
        extractor,
    )
    .await;

    if let Err(e) = session.logout().await {
        debug!("logout after poll loop failed: {e}");
    }

    outcome
}

async fn run_attempts<C>(
    connector: &C,
    session: &mut C::Session,
    options: &PollOptions,
    criteria: &MatchCriteria,
    window: &CorrelationWindow,
    extractor: &TokenExtractor,
) -> Result<ExtractedToken, HandshakeError>
where
    C: MailboxConnector,
{
    info!(
        "polling mailbox (up to {} attempts, {:?} apart)",
        options.max_attempts, options.retry_interval
    );

    for attempt in 1..=options.max_attempts {
        if attempt == 1 {
            debug!(
                "waiting {:?} for the notification to be produced",
                options.initial_delay
            );
            tokio::time::sleep(options.initial_delay).await;
        } else {
            debug!(
                "waiting {:?} before retry {attempt}/{}",
                options.retry_interval, options.max_attempts
            );
            tokio::time::sleep(options.retry_interval).await;
        }

        // Staleness is not detectable except by failure, so the session is
        // replaced on a fixed cycle regardless of its apparent health.
        if attempt > 1 && options.refresh_every > 0 && attempt % options.refresh_every == 1 {
            info!("refreshing mailbox session (attempt {attempt})");
            if let Err(e) = session.logout().await {
                debug!("logout of stale session failed: {e}");
            }
            match connector.connect().await {
                Ok(fresh) => *session = fresh,
                Err(e) => {
                    // The attempt is consumed; the loop keeps going.
                    warn!("mailbox reopen failed on attempt {attempt}: {e}");
                    continue;
                }
            }
        }

        match scan_attempt(session, criteria, window, extractor, options.fetch_window).await {
            Ok(Some(token)) => {
                info!("token found on attempt {attempt}/{}", options.max_attempts);
                return Ok(token);
            }
            Ok(None) => {
                info!(
                    "attempt {attempt}/{}: no matching message yet",
                    options.max_attempts
                );
            }
            Err(e) => {
                warn!("attempt {attempt}/{}: {e}", options.max_attempts);
            }
        }
    }

    Err(HandshakeError::Timeout {
        attempts: options.max_attempts,
    })
}

/// One search-and-scan pass. Returns the first accepted message that yields
/// a token; remaining candidates are not inspected.
async fn scan_attempt<S>(
    session: &mut S,
    criteria: &MatchCriteria,
    window: &CorrelationWindow,
    extractor: &TokenExtractor,
    fetch_window: usize,
) -> Result<Option<ExtractedToken>, AttemptError>
where
    S: MailboxSession,
{
    let ids = session.search(criteria).await?;
    if ids.is_empty() {
        return Ok(None);
    }

    // Newest first, bounded.
    let recent: Vec<u32> = ids.into_iter().rev().take(fetch_window).collect();
    debug!("checking the {} most recent matches", recent.len());

    for id in recent {
        let raw = match session.fetch(id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("fetch of message {id} failed: {e}");
                continue;
            }
        };

        let candidate = match CandidateMessage::parse(&raw) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!("message {id}: {e}");
                continue;
            }
        };

        if !window.accept(candidate.date) {
            debug!(
                "message {id} predates the correlation window (starts {})",
                window.start()
            );
            continue;
        }

        let Some(html) = candidate.html.as_deref() else {
            debug!("message {id} has no HTML part");
            continue;
        };

        if let Some(token) = extractor.extract(html) {
            info!(
                "token extracted from message {id} (subject: {})",
                candidate.subject.as_deref().unwrap_or("(none)")
            );
            return Ok(Some(token));
        }
    }

    Ok(None)
}
