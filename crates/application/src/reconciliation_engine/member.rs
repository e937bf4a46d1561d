use wardlog_domain::{AuditEventKind, diff};

use super::*;

impl ReconciliationEngine {
    /// Logs nickname and role changes of one member update.
    ///
    /// Member changes are emitted right away; both concerns run concurrently.
    pub async fn handle_member_update(&self, notification: MemberMutation) -> Vec<LogRecord> {
        let (nickname, roles) = tokio::join!(
            self.log_nickname_change(&notification),
            self.log_role_changes(&notification),
        );

        nickname.into_iter().chain(roles).collect()
    }

    async fn log_nickname_change(&self, notification: &MemberMutation) -> Option<LogRecord> {
        if !diff::nickname_changed(&notification.before, &notification.after) {
            return None;
        }

        let executor_id = self
            .correlator
            .find_executor(
                notification.entity_id,
                notification.guild_id,
                &[AuditEventKind::MemberUpdate],
            )
            .await;

        let record = self.record(
            LogRecordType::MemberNicknameUpdate,
            LogContext {
                entity_id: notification.entity_id,
                executor_id,
            },
            LogContent::Nickname {
                before: notification.before.display_name.clone(),
                after: notification.after.display_name.clone(),
            },
            notification.guild_id,
        );

        Some(self.emit(record).await)
    }

    async fn log_role_changes(&self, notification: &MemberMutation) -> Vec<LogRecord> {
        let delta = diff::role_delta(&notification.before, &notification.after);
        if delta.is_empty() {
            return Vec::new();
        }

        let executor_id = self
            .correlator
            .find_executor(
                notification.entity_id,
                notification.guild_id,
                &[AuditEventKind::MemberRoleUpdate],
            )
            .await;
        let context = LogContext {
            entity_id: notification.entity_id,
            executor_id,
        };

        let mut records = Vec::new();
        for (record_type, role_ids) in [
            (LogRecordType::MemberRoleAdd, delta.added),
            (LogRecordType::MemberRoleRemove, delta.removed),
        ] {
            if role_ids.is_empty() {
                continue;
            }
            let record = self.record(
                record_type,
                context,
                LogContent::Roles(role_ids),
                notification.guild_id,
            );
            records.push(self.emit(record).await);
        }

        records
    }
}
