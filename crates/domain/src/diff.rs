//! Pure structural comparison of entity snapshots.

use std::collections::BTreeMap;

use wardlog_core::{RoleId, SubjectId};

use crate::snapshot::{ChannelSnapshot, MemberSnapshot, PermissionOverwrite, PermissionOverwrites};

/// Returns true when any tracked channel property differs.
///
/// Overwrites are compared separately by [`permission_delta`].
#[must_use]
pub fn properties_changed(before: &ChannelSnapshot, after: &ChannelSnapshot) -> bool {
    before.name != after.name
        || before.parent_id != after.parent_id
        || before.position != after.position
        || before.flags != after.flags
        || before.permissions_locked != after.permissions_locked
        || before.kind != after.kind
}

/// How one subject's overwrite moved between two mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteChangeKind {
    /// Subject gained an overwrite.
    Added,
    /// Subject lost its overwrite.
    Removed,
    /// Subject kept an overwrite whose bits differ.
    Modified,
}

/// Before/after overwrite of one subject whose pair changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverwriteChange {
    /// Overwrite before the change, `None` when the subject had none.
    pub before: Option<PermissionOverwrite>,
    /// Overwrite after the change, `None` when the subject lost it.
    pub after: Option<PermissionOverwrite>,
}

impl OverwriteChange {
    /// Classifies the change.
    #[must_use]
    pub fn kind(&self) -> OverwriteChangeKind {
        match (self.before, self.after) {
            (None, _) => OverwriteChangeKind::Added,
            (Some(_), None) => OverwriteChangeKind::Removed,
            (Some(_), Some(_)) => OverwriteChangeKind::Modified,
        }
    }
}

/// Subjects whose allow/deny pair differs between two overwrite mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionDelta(BTreeMap<SubjectId, OverwriteChange>);

impl PermissionDelta {
    /// Returns true when both mappings were structurally equal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the change recorded for one subject.
    #[must_use]
    pub fn get(&self, subject_id: &SubjectId) -> Option<&OverwriteChange> {
        self.0.get(subject_id)
    }

    /// Iterates changed subjects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&SubjectId, &OverwriteChange)> {
        self.0.iter()
    }

    /// Returns the number of changed subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Computes the per-subject overwrite delta.
#[must_use]
pub fn permission_delta(
    before: &PermissionOverwrites,
    after: &PermissionOverwrites,
) -> PermissionDelta {
    let mut changes = BTreeMap::new();

    for (subject_id, old) in before.iter() {
        let new = after.get(subject_id).copied();
        if new != Some(*old) {
            changes.insert(
                *subject_id,
                OverwriteChange {
                    before: Some(*old),
                    after: new,
                },
            );
        }
    }

    for (subject_id, new) in after.iter() {
        if before.get(subject_id).is_none() {
            changes.insert(
                *subject_id,
                OverwriteChange {
                    before: None,
                    after: Some(*new),
                },
            );
        }
    }

    PermissionDelta(changes)
}

/// Roles gained and lost by a member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDelta {
    /// Roles present only after the change.
    pub added: Vec<RoleId>,
    /// Roles present only before the change.
    pub removed: Vec<RoleId>,
}

impl RoleDelta {
    /// Returns true when the role sets were equal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes role additions and removals between two member snapshots.
#[must_use]
pub fn role_delta(before: &MemberSnapshot, after: &MemberSnapshot) -> RoleDelta {
    RoleDelta {
        added: after.role_ids.difference(&before.role_ids).copied().collect(),
        removed: before.role_ids.difference(&after.role_ids).copied().collect(),
    }
}

/// Returns true when the member nickname differs.
#[must_use]
pub fn nickname_changed(before: &MemberSnapshot, after: &MemberSnapshot) -> bool {
    before.nickname != after.nickname
}
