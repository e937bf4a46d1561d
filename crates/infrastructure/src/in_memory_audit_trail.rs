use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use wardlog_application::AuditTrailSource;
use wardlog_core::{AppError, AppResult, GuildId};
use wardlog_domain::{AuditEventKind, AuditTrailEntry};

/// Page size of one audit trail query.
const DEFAULT_QUERY_LIMIT: usize = 50;

/// In-memory audit trail keyed by guild.
///
/// Queries return the newest entries of one kind, capped at the query limit,
/// mirroring the paged API of the hosted platform.
pub struct InMemoryAuditTrail {
    entries: RwLock<HashMap<GuildId, Vec<AuditTrailEntry>>>,
    query_limit: usize,
    unavailable: AtomicBool,
}

impl Default for InMemoryAuditTrail {
    fn default() -> Self {
        Self::with_query_limit(DEFAULT_QUERY_LIMIT)
    }
}

impl InMemoryAuditTrail {
    /// Creates an empty audit trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty audit trail returning at most `query_limit` entries per query.
    #[must_use]
    pub fn with_query_limit(query_limit: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            query_limit: query_limit.max(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Appends an entry to a guild's trail.
    pub async fn record(&self, guild_id: GuildId, entry: AuditTrailEntry) {
        self.entries
            .write()
            .await
            .entry(guild_id)
            .or_default()
            .push(entry);
    }

    /// Toggles whether queries fail as if rate limited.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditTrailSource for InMemoryAuditTrail {
    async fn query(
        &self,
        guild_id: GuildId,
        kind: AuditEventKind,
    ) -> AppResult<Vec<AuditTrailEntry>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable(format!(
                "audit trail for guild '{guild_id}' is unavailable"
            )));
        }

        let entries = self.entries.read().await;
        let mut matching = entries
            .get(&guild_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.kind == kind)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        matching.truncate(self.query_limit);

        Ok(matching)
    }
}
