//! Build-completion monitoring.
//!
//! The platform exposes no authoritative "build finished" signal; the
//! monitor polls the check endpoint and infers completion from the sequence
//! of observed status samples. The loop's budget is wall-clock elapsed time,
//! unlike the mailbox poller's attempt count.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{info, warn};

use crate::platform::PlatformClient;

/// One poll result from the status endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildStatusSample {
    #[serde(default)]
    pub is_publishing: bool,

    #[serde(default)]
    pub is_processing: bool,

    #[serde(default)]
    pub publishing_status: String,
}

impl BuildStatusSample {
    fn is_active(&self) -> bool {
        self.is_publishing || self.is_processing
    }
}

/// Progress verdict after one observed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProgress {
    InProgress,
    Complete,
}

/// Infers build completion from a sequence of status samples.
///
/// Completion fires once both activity flags are false AND either a
/// previously seen non-empty status label has gone empty after more than 3
/// polls, or a hard cap of 10 polls is exceeded regardless of status
/// history. The minimum poll count exists because the endpoint may report an
/// empty label even mid-build on the very first poll; the whole heuristic is
/// a known approximation and may declare completion early on slow builds
/// that never report status text.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    polls: u32,
    last_status: Option<String>,
    seen_statuses: Vec<String>,
}

/// Minimum polls before an empty status label counts as completion.
const MIN_SETTLED_POLLS: u32 = 3;

/// Polls after which an idle endpoint is considered complete regardless of
/// status history.
const MAX_IDLE_POLLS: u32 = 10;

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one sample and reports progress.
    pub fn observe(&mut self, sample: &BuildStatusSample) -> BuildProgress {
        self.polls += 1;

        if !sample.publishing_status.is_empty()
            && self.last_status.as_deref() != Some(sample.publishing_status.as_str())
        {
            info!("build status: {}", sample.publishing_status);
            self.last_status = Some(sample.publishing_status.clone());
            self.seen_statuses.push(sample.publishing_status.clone());
        }

        if sample.is_active() {
            return BuildProgress::InProgress;
        }

        let settled = !self.seen_statuses.is_empty()
            && sample.publishing_status.is_empty()
            && self.polls > MIN_SETTLED_POLLS;

        if settled || self.polls > MAX_IDLE_POLLS {
            BuildProgress::Complete
        } else {
            BuildProgress::InProgress
        }
    }

    /// Consumes one poll slot for a failed poll. A failed poll can never
    /// itself trigger completion, but it still counts against the idle cap.
    pub fn note_failed_poll(&mut self) {
        self.polls += 1;
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Ordered distinct status labels observed so far, for diagnostics.
    pub fn seen_statuses(&self) -> &[String] {
        &self.seen_statuses
    }
}

/// Polls the status endpoint until completion is inferred or the wall-clock
/// budget runs out. Returns `true` on inferred completion, `false` on
/// timeout.
pub async fn monitor_build(
    platform: &PlatformClient,
    timeout: Duration,
    poll_interval: Duration,
) -> bool {
    info!(
        "monitoring build (timeout {:?}, interval {:?})",
        timeout, poll_interval
    );

    let started = Instant::now();
    let mut tracker = CompletionTracker::new();

    loop {
        if started.elapsed() > timeout {
            warn!(
                "build monitor timed out after {:?} ({} polls); the build may still be in progress",
                timeout,
                tracker.polls()
            );
            return false;
        }

        match platform.check_build_status().await {
            Ok(sample) => {
                if tracker.observe(&sample) == BuildProgress::Complete {
                    info!("build completed ({} polls)", tracker.polls());
                    if !tracker.seen_statuses().is_empty() {
                        info!(
                            "status progression: {} -> (complete)",
                            tracker.seen_statuses().join(" -> ")
                        );
                    }
                    return true;
                }
            }
            Err(e) => {
                // Treated as an empty sample: logged, counted, no state change.
                warn!("status poll failed: {e}");
                tracker.note_failed_poll();
            }
        }

        if tracker.polls() % 5 == 0 {
            info!(
                "{} polls, {}s elapsed...",
                tracker.polls(),
                started.elapsed().as_secs()
            );
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(status: &str) -> BuildStatusSample {
        BuildStatusSample {
            is_publishing: true,
            is_processing: false,
            publishing_status: status.to_string(),
        }
    }

    fn idle() -> BuildStatusSample {
        BuildStatusSample::default()
    }

    #[test]
    fn completes_once_activity_settles_past_minimum_polls() {
        let mut tracker = CompletionTracker::new();

        assert_eq!(
            tracker.observe(&active("Publishing posts...")),
            BuildProgress::InProgress
        );
        assert_eq!(
            tracker.observe(&active("Publishing posts...")),
            BuildProgress::InProgress
        );
        // Poll 3: flags settled but poll count not yet above the minimum.
        assert_eq!(tracker.observe(&idle()), BuildProgress::InProgress);
        // Poll 4: prior non-empty status + empty label + polls > 3.
        assert_eq!(tracker.observe(&idle()), BuildProgress::Complete);
        assert_eq!(tracker.seen_statuses(), ["Publishing posts..."]);
    }

    #[test]
    fn settled_sequence_completes_by_the_fourth_idle_sample() {
        let samples = [
            active("Building site"),
            active("Building site"),
            idle(),
            idle(),
            idle(),
            idle(),
        ];

        let mut tracker = CompletionTracker::new();
        let completed_at = samples
            .iter()
            .position(|s| tracker.observe(s) == BuildProgress::Complete);

        // Complete no later than the fourth idle sample.
        assert!(matches!(completed_at, Some(i) if i <= 5));
    }

    #[test]
    fn idle_from_start_needs_the_hard_cap() {
        let mut tracker = CompletionTracker::new();

        // An empty label on early polls must not count as completion.
        for _ in 0..10 {
            assert_eq!(tracker.observe(&idle()), BuildProgress::InProgress);
        }
        // Poll 11 exceeds the hard cap regardless of status history.
        assert_eq!(tracker.observe(&idle()), BuildProgress::Complete);
    }

    #[test]
    fn active_flags_hold_off_completion_past_the_cap() {
        let mut tracker = CompletionTracker::new();

        for _ in 0..15 {
            assert_eq!(
                tracker.observe(&active("Publishing...")),
                BuildProgress::InProgress
            );
        }
        // Flags dropping is still required.
        assert_eq!(tracker.observe(&idle()), BuildProgress::Complete);
    }

    #[test]
    fn failed_polls_count_toward_the_cap_but_never_complete() {
        let mut tracker = CompletionTracker::new();

        for _ in 0..12 {
            tracker.note_failed_poll();
        }
        assert_eq!(tracker.polls(), 12);

        // The next real idle sample pushes it over the cap.
        assert_eq!(tracker.observe(&idle()), BuildProgress::Complete);
    }

    #[test]
    fn repeated_status_labels_are_recorded_once() {
        let mut tracker = CompletionTracker::new();
        tracker.observe(&active("Step 1"));
        tracker.observe(&active("Step 1"));
        tracker.observe(&active("Step 2"));
        assert_eq!(tracker.seen_statuses(), ["Step 1", "Step 2"]);
    }
}
