use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use wardlog_core::{AppError, AppResult};

/// Whether an audit entry created exactly at the window edge still counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowBoundary {
    /// Entries created at `reference - window` are accepted.
    Inclusive,
    /// Only entries created strictly after `reference - window` are accepted.
    #[default]
    Exclusive,
}

impl WindowBoundary {
    /// Returns true when `created_at` falls inside a window starting at `cutoff`.
    #[must_use]
    pub fn admits(self, created_at: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
        match self {
            Self::Inclusive => created_at >= cutoff,
            Self::Exclusive => created_at > cutoff,
        }
    }
}

/// Timing and output settings of the reconciliation engine.
///
/// The durations are coupled: the flush delay must outlast the expected
/// audit propagation latency, and the recency window plus the expected
/// notification jitter must cover the flush delay. [`Self::validate`]
/// enforces both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// Delay between the first notification of an episode and its flush.
    pub flush_delay: Duration,
    /// Maximum age of an audit entry still considered causally related.
    pub recency_window: Duration,
    /// Edge semantics of the recency window.
    pub window_boundary: WindowBoundary,
    /// Upper bound for one audit trail query.
    pub audit_query_timeout: Duration,
    /// Expected delay before an action shows up in the audit trail.
    pub audit_propagation_latency: Duration,
    /// Expected delay between an action and its notification.
    pub notification_jitter: Duration,
    /// Severity stamped on every emitted record.
    pub severity: u8,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_millis(3000),
            recency_window: Duration::from_millis(2000),
            window_boundary: WindowBoundary::Exclusive,
            audit_query_timeout: Duration::from_millis(5000),
            audit_propagation_latency: Duration::from_millis(1500),
            notification_jitter: Duration::from_millis(1500),
            severity: 1,
        }
    }
}

impl ReconciliationConfig {
    /// Checks non-zero durations and the timing invariants.
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [
            ("flush_delay", self.flush_delay),
            ("recency_window", self.recency_window),
            ("audit_query_timeout", self.audit_query_timeout),
        ] {
            if value.is_zero() {
                return Err(AppError::Validation(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        if self.flush_delay <= self.audit_propagation_latency {
            return Err(AppError::Validation(format!(
                "flush_delay ({} ms) must exceed audit_propagation_latency ({} ms)",
                self.flush_delay.as_millis(),
                self.audit_propagation_latency.as_millis()
            )));
        }

        if self.recency_window.saturating_add(self.notification_jitter) <= self.flush_delay {
            return Err(AppError::Validation(format!(
                "recency_window ({} ms) must exceed flush_delay ({} ms) minus notification_jitter ({} ms)",
                self.recency_window.as_millis(),
                self.flush_delay.as_millis(),
                self.notification_jitter.as_millis()
            )));
        }

        self.recency_window_delta()?;
        self.notification_jitter_delta().map(|_| ())
    }

    /// Returns the recency window as a calendar duration.
    pub fn recency_window_delta(&self) -> AppResult<TimeDelta> {
        TimeDelta::from_std(self.recency_window).map_err(|error| {
            AppError::Validation(format!("recency_window is out of range: {error}"))
        })
    }

    /// Returns the notification jitter as a calendar duration.
    pub fn notification_jitter_delta(&self) -> AppResult<TimeDelta> {
        TimeDelta::from_std(self.notification_jitter).map_err(|error| {
            AppError::Validation(format!("notification_jitter is out of range: {error}"))
        })
    }
}
