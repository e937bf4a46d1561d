use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wardlog_core::{AppError, EntityId, UserId};

/// Audit trail event kinds the engine queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// Channel properties were edited.
    ChannelUpdate,
    /// A permission overwrite was added to a channel.
    ChannelOverwriteCreate,
    /// A permission overwrite was edited.
    ChannelOverwriteUpdate,
    /// A permission overwrite was removed.
    ChannelOverwriteDelete,
    /// Member attributes (nickname) were edited.
    MemberUpdate,
    /// Member roles were added or removed.
    MemberRoleUpdate,
}

impl AuditEventKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChannelUpdate => "channel.update",
            Self::ChannelOverwriteCreate => "channel.overwrite.create",
            Self::ChannelOverwriteUpdate => "channel.overwrite.update",
            Self::ChannelOverwriteDelete => "channel.overwrite.delete",
            Self::MemberUpdate => "member.update",
            Self::MemberRoleUpdate => "member.role.update",
        }
    }

    /// Kinds relevant to a channel property edit.
    #[must_use]
    pub fn channel_property_kinds() -> &'static [Self] {
        &[Self::ChannelUpdate]
    }

    /// Kinds relevant to a permission overwrite edit.
    #[must_use]
    pub fn channel_overwrite_kinds() -> &'static [Self] {
        &[
            Self::ChannelOverwriteCreate,
            Self::ChannelOverwriteUpdate,
            Self::ChannelOverwriteDelete,
        ]
    }
}

impl FromStr for AuditEventKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "channel.update" => Ok(Self::ChannelUpdate),
            "channel.overwrite.create" => Ok(Self::ChannelOverwriteCreate),
            "channel.overwrite.update" => Ok(Self::ChannelOverwriteUpdate),
            "channel.overwrite.delete" => Ok(Self::ChannelOverwriteDelete),
            "member.update" => Ok(Self::MemberUpdate),
            "member.role.update" => Ok(Self::MemberRoleUpdate),
            _ => Err(AppError::Validation(format!(
                "unknown audit event kind '{value}'"
            ))),
        }
    }
}

/// One "who did what" entry read from the external audit trail.
///
/// A single physical action may produce several entries, one per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrailEntry {
    /// Entity the action targeted.
    pub target_id: EntityId,
    /// Acting user, absent when unknown or no longer in the guild.
    pub executor_id: Option<UserId>,
    /// Creation instant reported by the platform.
    pub created_at: DateTime<Utc>,
    /// Event kind.
    pub kind: AuditEventKind,
}
