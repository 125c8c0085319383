//! Home Chain Reader Statistics
//!
//! Every reader owns its own tracker; there is no process-wide state.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::error::Error;

/// Statistics of a single home chain reader instance.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReaderStats {
    /// Number of poll cycles that completed and published a snapshot.
    pub polls: u64,
    /// Number of poll cycles abandoned because of an error.
    pub poll_failures: u64,
    /// The most recent poll failure.  None = no cycle has failed yet.
    pub last_failure: Option<String>,
    /// Time of the last successful poll.  None = no cycle has succeeded yet.
    pub last_success: Option<DateTime<Utc>>,
}

/// Shared handle the poll task records into.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsTracker {
    /// The tracked statistics.
    inner: Arc<RwLock<ReaderStats>>,
}

impl StatsTracker {
    /// Create a fresh tracker.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record one successful poll cycle.
    pub(crate) fn record_success(&self) {
        match self.inner.write() {
            Ok(mut stats) => {
                stats.polls = stats.polls.saturating_add(1);
                stats.last_success = Some(Utc::now());
            },
            Err(err) => error!(error=%err, "reader stats lock poisoned"),
        }
    }

    /// Record one abandoned poll cycle.
    pub(crate) fn record_failure(&self, failure: &Error) {
        match self.inner.write() {
            Ok(mut stats) => {
                stats.poll_failures = stats.poll_failures.saturating_add(1);
                stats.last_failure = Some(failure.to_string());
            },
            Err(err) => error!(error=%err, "reader stats lock poisoned"),
        }
    }

    /// The current statistics value.
    pub(crate) fn current(&self) -> ReaderStats {
        match self.inner.read() {
            Ok(stats) => stats.clone(),
            Err(err) => {
                error!(error=%err, "reader stats lock poisoned");
                ReaderStats::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let tracker = StatsTracker::new();

        tracker.record_success();
        tracker.record_failure(&Error::LedgerUnavailable("connection reset".to_string()));
        tracker.record_success();

        let stats = tracker.current();
        assert_eq!(stats.polls, 2);
        assert_eq!(stats.poll_failures, 1);
        assert!(stats.last_success.is_some());
        assert_eq!(
            stats.last_failure.as_deref(),
            Some("Home ledger unavailable: connection reset")
        );
    }

    #[test]
    fn test_stats_serialize_for_logging() -> anyhow::Result<()> {
        let tracker = StatsTracker::new();
        tracker.record_success();

        let json = serde_json::to_string(&tracker.current())?;
        assert!(json.contains("\"polls\":1"));

        Ok(())
    }
}
