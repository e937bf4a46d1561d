//! NDJSON feed lines accepted on stdin.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use wardlog_core::{EntityId, GuildId, UserId};
use wardlog_domain::{
    AuditEventKind, AuditTrailEntry, ChannelSnapshot, MemberSnapshot, MutationNotification,
};

/// One line of the replay feed.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum FeedEvent {
    ChannelUpdate(MutationLine<ChannelSnapshot>),
    MemberUpdate(MutationLine<MemberSnapshot>),
    AuditEntry(AuditEntryLine),
}

#[derive(Debug, Deserialize)]
pub(crate) struct MutationLine<S> {
    guild_id: GuildId,
    entity_id: EntityId,
    before: S,
    after: S,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuditEntryLine {
    guild_id: GuildId,
    target_id: EntityId,
    #[serde(default)]
    executor_id: Option<UserId>,
    kind: AuditEventKind,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl<S> MutationLine<S> {
    /// Builds the notification, stamping it with `now` when the line has no timestamp.
    pub(crate) fn into_notification(self, now: DateTime<Utc>) -> MutationNotification<S> {
        MutationNotification {
            entity_id: self.entity_id,
            guild_id: self.guild_id,
            before: self.before,
            after: self.after,
            observed_at: self.observed_at.unwrap_or(now),
        }
    }
}

impl AuditEntryLine {
    pub(crate) fn into_entry(self, now: DateTime<Utc>) -> (GuildId, AuditTrailEntry) {
        (
            self.guild_id,
            AuditTrailEntry {
                target_id: self.target_id,
                executor_id: self.executor_id,
                created_at: self.created_at.unwrap_or(now),
                kind: self.kind,
            },
        )
    }
}

pub(crate) fn parse_line(line: &str) -> Result<FeedEvent, serde_json::Error> {
    serde_json::from_str(line)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use wardlog_core::{EntityId, GuildId, SubjectId, UserId};
    use wardlog_domain::{AuditEventKind, ChannelKind};

    use super::{FeedEvent, parse_line};

    #[test]
    fn channel_update_line_defaults_observed_at() {
        let line = r#"{"type":"channel_update","guild_id":"1","entity_id":"100",
            "before":{"name":"general","parent_id":null,"position":0,"flags":0,
                "permissions_locked":false,"kind":"text","permission_overwrites":{}},
            "after":{"name":"general","parent_id":null,"position":0,"flags":0,
                "permissions_locked":false,"kind":"text",
                "permission_overwrites":{"42":{"allow":1024,"deny":0}}}}"#
            .replace('\n', "");
        let now = Utc.timestamp_millis_opt(5_000).single().unwrap_or_default();

        let parsed = parse_line(&line);
        assert!(parsed.is_ok());
        let Ok(FeedEvent::ChannelUpdate(mutation)) = parsed else {
            unreachable!("line should parse as a channel update");
        };
        let notification = mutation.into_notification(now);

        assert_eq!(notification.guild_id, GuildId::new(1));
        assert_eq!(notification.entity_id, EntityId::new(100));
        assert_eq!(notification.observed_at, now);
        assert_eq!(notification.after.kind, ChannelKind::Text);
        assert!(
            notification
                .after
                .permission_overwrites
                .get(&SubjectId::new(42))
                .is_some()
        );
    }

    #[test]
    fn audit_entry_line_keeps_explicit_timestamp() {
        let line = r#"{"type":"audit_entry","guild_id":"1","target_id":"100","executor_id":"7","kind":"channel_overwrite_update","created_at":"2026-01-01T00:00:00Z"}"#;
        let now = Utc.timestamp_millis_opt(5_000).single().unwrap_or_default();

        let Ok(FeedEvent::AuditEntry(entry)) = parse_line(line) else {
            unreachable!("line should parse as an audit entry");
        };
        let (guild_id, entry) = entry.into_entry(now);

        assert_eq!(guild_id, GuildId::new(1));
        assert_eq!(entry.executor_id, Some(UserId::new(7)));
        assert_eq!(entry.kind, AuditEventKind::ChannelOverwriteUpdate);
        assert_ne!(entry.created_at, now);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(parse_line("not json").is_err());
        assert!(parse_line(r#"{"type":"guild_delete","guild_id":"1"}"#).is_err());
        assert!(parse_line(r#"{"type":"audit_entry","guild_id":"abc","target_id":"1","kind":"member_update"}"#).is_err());
    }
}
