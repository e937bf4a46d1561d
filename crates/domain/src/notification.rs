use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wardlog_core::{EntityId, GuildId};

use crate::snapshot::{ChannelSnapshot, MemberSnapshot};

/// One "entity changed" notification delivered by the platform feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationNotification<S> {
    /// Entity that changed.
    pub entity_id: EntityId,
    /// Guild owning the entity.
    pub guild_id: GuildId,
    /// State before the change.
    pub before: S,
    /// State after the change.
    pub after: S,
    /// Instant the notification was observed locally.
    pub observed_at: DateTime<Utc>,
}

/// Channel update notification.
pub type ChannelMutation = MutationNotification<ChannelSnapshot>;

/// Member update notification.
pub type MemberMutation = MutationNotification<MemberSnapshot>;

impl ChannelMutation {
    /// Returns true when both snapshots describe a guild channel.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.before.kind.is_guild_based() && self.after.kind.is_guild_based()
    }
}
