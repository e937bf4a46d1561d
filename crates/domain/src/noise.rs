//! Interest policy deciding which channel changes are worth logging.

use crate::audit::AuditEventKind;
use crate::diff::{OverwriteChangeKind, PermissionDelta, permission_delta, properties_changed};
use crate::snapshot::ChannelSnapshot;

/// Returns true when an overwrite delta carries signal.
///
/// Edits and removals always count. A pure addition counts only when the new
/// overwrite has allow or deny bits: the platform creates a blank `0/0`
/// overwrite as soon as a subject is added in its UI, before any bit is set.
#[must_use]
pub fn is_permission_change_interesting(delta: &PermissionDelta) -> bool {
    if delta.is_empty() {
        return false;
    }

    if delta.iter().any(|(_, change)| {
        matches!(
            change.kind(),
            OverwriteChangeKind::Modified | OverwriteChangeKind::Removed
        )
    }) {
        return true;
    }

    delta
        .iter()
        .filter_map(|(_, change)| change.after)
        .any(|overwrite| !overwrite.is_empty())
}

/// Which diffs made a channel change interesting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeInterest {
    /// A tracked property differs.
    pub properties: bool,
    /// The overwrite delta passed the noise policy.
    pub permissions: bool,
}

impl ChangeInterest {
    /// Evaluates both diffs for one channel change.
    #[must_use]
    pub fn assess(before: &ChannelSnapshot, after: &ChannelSnapshot) -> Self {
        let delta = permission_delta(&before.permission_overwrites, &after.permission_overwrites);

        Self {
            properties: properties_changed(before, after),
            permissions: is_permission_change_interesting(&delta),
        }
    }

    /// Returns true when at least one diff triggered.
    #[must_use]
    pub fn is_interesting(&self) -> bool {
        self.properties || self.permissions
    }

    /// Audit trail kinds that may attribute this change.
    #[must_use]
    pub fn audit_kinds(&self) -> Vec<AuditEventKind> {
        let mut kinds = Vec::new();
        if self.properties {
            kinds.extend_from_slice(AuditEventKind::channel_property_kinds());
        }
        if self.permissions {
            kinds.extend_from_slice(AuditEventKind::channel_overwrite_kinds());
        }
        kinds
    }
}
