use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use wardlog_core::{EntityId, RoleId, SubjectId};

/// Channel type as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Guild text channel.
    Text,
    /// Direct message between two users.
    Dm,
    /// Guild voice channel.
    Voice,
    /// Direct message group.
    GroupDm,
    /// Category grouping other channels.
    Category,
    /// Announcement (news) channel.
    Announcement,
    /// Stage channel.
    Stage,
    /// Forum channel.
    Forum,
    /// Media channel.
    Media,
}

impl ChannelKind {
    /// Returns true when the channel belongs to a guild and is therefore tracked.
    #[must_use]
    pub fn is_guild_based(self) -> bool {
        !matches!(self, Self::Dm | Self::GroupDm)
    }
}

/// Allow/deny bit pair of one permission overwrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    /// Explicitly allowed permission bits.
    pub allow: u64,
    /// Explicitly denied permission bits.
    pub deny: u64,
}

impl PermissionOverwrite {
    /// Creates an overwrite from its allow and deny bitmasks.
    #[must_use]
    pub const fn new(allow: u64, deny: u64) -> Self {
        Self { allow, deny }
    }

    /// Returns true when neither allow nor deny carries any bit.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.allow == 0 && self.deny == 0
    }
}

/// Serialized permission overwrite mapping keyed by subject.
///
/// A subject that is absent is a different state from a subject present
/// with zero bits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionOverwrites(BTreeMap<SubjectId, PermissionOverwrite>);

impl PermissionOverwrites {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the mapping with one subject set.
    #[must_use]
    pub fn with(mut self, subject_id: SubjectId, overwrite: PermissionOverwrite) -> Self {
        self.0.insert(subject_id, overwrite);
        self
    }

    /// Returns the overwrite for one subject.
    #[must_use]
    pub fn get(&self, subject_id: &SubjectId) -> Option<&PermissionOverwrite> {
        self.0.get(subject_id)
    }

    /// Iterates subjects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&SubjectId, &PermissionOverwrite)> {
        self.0.iter()
    }

    /// Returns the number of subjects carrying an overwrite.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no subject carries an overwrite.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(SubjectId, PermissionOverwrite)> for PermissionOverwrites {
    fn from_iter<T: IntoIterator<Item = (SubjectId, PermissionOverwrite)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Loggable attributes of a channel captured at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Channel display name.
    pub name: String,
    /// Parent category, if any.
    pub parent_id: Option<EntityId>,
    /// Sort position in the channel list.
    pub position: i32,
    /// Raw channel flag bitfield.
    pub flags: u64,
    /// Whether overwrites are synced with the parent category.
    pub permissions_locked: bool,
    /// Channel type.
    pub kind: ChannelKind,
    /// Permission overwrites keyed by subject.
    #[serde(default)]
    pub permission_overwrites: PermissionOverwrites,
}

/// Loggable attributes of a guild member captured at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    /// Guild-specific nickname, if set.
    pub nickname: Option<String>,
    /// Name shown in the guild (nickname or account name).
    pub display_name: String,
    /// Roles held by the member.
    #[serde(default)]
    pub role_ids: BTreeSet<RoleId>,
}
