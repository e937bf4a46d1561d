use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardlog_core::{EntityId, GuildId, RoleId, UserId};

use crate::snapshot::ChannelSnapshot;

/// Kind of reconciled change carried by a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRecordType {
    /// Channel properties or overwrites changed.
    ChannelUpdate,
    /// Member nickname changed.
    MemberNicknameUpdate,
    /// Member gained roles.
    MemberRoleAdd,
    /// Member lost roles.
    MemberRoleRemove,
}

impl LogRecordType {
    /// Returns a stable storage value for this record type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChannelUpdate => "channel_update",
            Self::MemberNicknameUpdate => "member_nickname_update",
            Self::MemberRoleAdd => "member_role_add",
            Self::MemberRoleRemove => "member_role_remove",
        }
    }
}

/// Who changed what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    /// Entity the record is about.
    pub entity_id: EntityId,
    /// Attributed executor, `None` when no audit entry matched.
    pub executor_id: Option<UserId>,
}

/// Record payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum LogContent {
    /// Channel state at the start and end of an episode.
    Channel {
        /// First old snapshot of the episode.
        before: Box<ChannelSnapshot>,
        /// Latest new snapshot of the episode.
        after: Box<ChannelSnapshot>,
    },
    /// Display name before and after a nickname edit.
    Nickname {
        /// Previous display name.
        before: String,
        /// New display name.
        after: String,
    },
    /// Roles added or removed.
    Roles(Vec<RoleId>),
}

/// One attributed, deduplicated log entry handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique record id for sink-side deduplication.
    pub record_id: Uuid,
    /// Record type.
    #[serde(rename = "type")]
    pub record_type: LogRecordType,
    /// Entity and executor.
    pub context: LogContext,
    /// Change payload.
    pub content: LogContent,
    /// Guild the change happened in.
    pub guild_id: GuildId,
    /// Severity level forwarded to the sink.
    pub severity: u8,
    /// Instant the record was produced.
    pub emitted_at: DateTime<Utc>,
}

impl LogRecord {
    /// Creates a record with a fresh id.
    #[must_use]
    pub fn new(
        record_type: LogRecordType,
        context: LogContext,
        content: LogContent,
        guild_id: GuildId,
        severity: u8,
        emitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            record_type,
            context,
            content,
            guild_id,
            severity,
            emitted_at,
        }
    }
}
