//! Attribution of observed mutations to audit trail executors.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use wardlog_core::{AppError, AppResult, EntityId, GuildId, UserId};
use wardlog_domain::{AuditEventKind, AuditTrailEntry};

use crate::reconciliation_config::{ReconciliationConfig, WindowBoundary};
use crate::reconciliation_ports::{AuditTrailSource, Clock};

/// Resolves who caused a mutation by querying the audit trail.
///
/// Every failure mode (unavailable source, timeout, no matching entry)
/// resolves to `None`; attribution is best effort.
#[derive(Clone)]
pub struct AuditCorrelator {
    source: Arc<dyn AuditTrailSource>,
    clock: Arc<dyn Clock>,
    recency_window: TimeDelta,
    notification_jitter: TimeDelta,
    window_boundary: WindowBoundary,
    query_timeout: Duration,
}

impl AuditCorrelator {
    /// Creates a correlator from engine configuration.
    pub fn new(
        source: Arc<dyn AuditTrailSource>,
        clock: Arc<dyn Clock>,
        config: &ReconciliationConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            source,
            clock,
            recency_window: config.recency_window_delta()?,
            notification_jitter: config.notification_jitter_delta()?,
            window_boundary: config.window_boundary,
            query_timeout: config.audit_query_timeout,
        })
    }

    /// Finds the executor of the latest matching entry within the window before now.
    pub async fn find_executor(
        &self,
        target_id: EntityId,
        guild_id: GuildId,
        kinds: &[AuditEventKind],
    ) -> Option<UserId> {
        self.find_executor_since(target_id, guild_id, kinds, self.clock.now())
            .await
    }

    /// Finds the executor of the latest matching entry around `reference`.
    ///
    /// Entries are admitted from `reference - recency_window` up to
    /// `reference + notification_jitter`. A late lookup anchored at the first
    /// observation still sees its own action once it reaches the audit trail,
    /// but not actions taken after the change was observed.
    pub async fn find_executor_since(
        &self,
        target_id: EntityId,
        guild_id: GuildId,
        kinds: &[AuditEventKind],
        reference: DateTime<Utc>,
    ) -> Option<UserId> {
        if kinds.is_empty() {
            return None;
        }

        let horizon = reference + self.notification_jitter;
        let entries = self
            .fetch_entries(guild_id, kinds)
            .await
            .into_iter()
            .filter(|entry| entry.created_at <= horizon)
            .collect::<Vec<_>>();
        let cutoff = reference - self.recency_window;
        let executor_id =
            select_most_recent(&entries, target_id, cutoff, self.window_boundary)
                .and_then(|entry| entry.executor_id);

        debug!(
            entity_id = %target_id,
            guild_id = %guild_id,
            candidates = entries.len(),
            executor_id = ?executor_id,
            "audit correlation finished"
        );

        executor_id
    }

    /// Queries every distinct kind concurrently and merges the results.
    async fn fetch_entries(
        &self,
        guild_id: GuildId,
        kinds: &[AuditEventKind],
    ) -> Vec<AuditTrailEntry> {
        let distinct_kinds = kinds.iter().copied().collect::<BTreeSet<_>>();
        let results = join_all(
            distinct_kinds
                .iter()
                .map(|kind| self.query_kind(guild_id, *kind)),
        )
        .await;

        let mut entries = Vec::new();
        for (kind, result) in distinct_kinds.iter().zip(results) {
            match result {
                Ok(found) => entries.extend(found),
                Err(error) => {
                    warn!(
                        guild_id = %guild_id,
                        kind = kind.as_str(),
                        error = %error,
                        "audit trail query failed, continuing without its entries"
                    );
                }
            }
        }

        entries
    }

    async fn query_kind(
        &self,
        guild_id: GuildId,
        kind: AuditEventKind,
    ) -> AppResult<Vec<AuditTrailEntry>> {
        tokio::time::timeout(self.query_timeout, self.source.query(guild_id, kind))
            .await
            .map_err(|_| {
                AppError::Unavailable(format!(
                    "audit trail query for '{}' timed out after {} ms",
                    kind.as_str(),
                    self.query_timeout.as_millis()
                ))
            })?
    }
}

/// Picks the most recently created entry for `target_id` inside the window.
///
/// On equal timestamps the entry seen first wins.
#[must_use]
pub fn select_most_recent(
    entries: &[AuditTrailEntry],
    target_id: EntityId,
    cutoff: DateTime<Utc>,
    boundary: WindowBoundary,
) -> Option<&AuditTrailEntry> {
    entries
        .iter()
        .filter(|entry| entry.target_id == target_id && boundary.admits(entry.created_at, cutoff))
        .reduce(|best, entry| {
            if entry.created_at > best.created_at {
                entry
            } else {
                best
            }
        })
}
