//! Correlation window: deciding whether an inbound email is a plausible
//! response to the request we triggered.
//!
//! The window starts a little before the trigger time to absorb clock skew
//! between us, the platform and the mail provider. A message with a missing
//! or unparseable date header is always accepted: a false positive costs one
//! cheap failed token exchange, a false negative loses the whole operation.

use chrono::{DateTime, Duration, Utc};

/// Acceptable timestamp range for correlating an email to a trigger.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationWindow {
    start: DateTime<Utc>,
}

impl CorrelationWindow {
    /// Builds a window for a request accepted at `submitted_at`, tolerating
    /// `skew` of backward clock offset.
    pub fn starting_at(submitted_at: DateTime<Utc>, skew: Duration) -> Self {
        Self {
            start: submitted_at - skew,
        }
    }

    /// Accepts a candidate message timestamp.
    ///
    /// `None` (missing or unparseable date header) is accepted.
    pub fn accept(&self, candidate: Option<DateTime<Utc>>) -> bool {
        match candidate {
            None => true,
            Some(ts) => ts >= self.start,
        }
    }

    /// Start of the acceptable range.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }
}

/// Skew tolerance for sign-in emails. The search subject is narrow, so tight
/// correlation matters less.
pub fn signin_skew() -> Duration {
    Duration::minutes(1)
}

/// Skew tolerance for export-ready notifications. Platform-side processing
/// delay is expected to be large and variable.
pub fn export_skew() -> Duration {
    Duration::minutes(10)
}
