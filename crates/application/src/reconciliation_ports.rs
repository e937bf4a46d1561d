use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wardlog_core::{AppResult, GuildId};
use wardlog_domain::{AuditEventKind, AuditTrailEntry, LogRecord};

/// Query port for the platform's eventually-consistent audit trail.
#[async_trait]
pub trait AuditTrailSource: Send + Sync {
    /// Returns recent entries of one kind for a guild.
    ///
    /// Result order is unspecified. Rate limiting and network failures
    /// surface as `AppError::Unavailable`.
    async fn query(
        &self,
        guild_id: GuildId,
        kind: AuditEventKind,
    ) -> AppResult<Vec<AuditTrailEntry>>;
}

/// Output port receiving reconciled log records.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Appends one record. Delivery is at-least-once.
    async fn append(&self, record: LogRecord) -> AppResult<()>;
}

/// Wall-clock source used for recency windows and record timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}
