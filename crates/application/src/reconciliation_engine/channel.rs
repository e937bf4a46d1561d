use super::*;

/// What the engine did with one channel notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelUpdateOutcome {
    /// Direct-message channel, not tracked.
    Untracked,
    /// No property or overwrite change worth logging.
    Ignored,
    /// Opened a new episode under this key.
    Buffered(BufferKey),
    /// Joined the live episode under this key.
    Merged(BufferKey),
}

impl ReconciliationEngine {
    /// Filters, attributes and buffers one channel update notification.
    pub async fn handle_channel_update(
        &self,
        notification: ChannelMutation,
    ) -> ChannelUpdateOutcome {
        let sequence = self.next_sequence();

        if !notification.is_tracked() {
            debug!(
                entity_id = %notification.entity_id,
                "dropping notification for untracked channel kind"
            );
            return ChannelUpdateOutcome::Untracked;
        }

        let interest = ChangeInterest::assess(&notification.before, &notification.after);
        if !interest.is_interesting() {
            debug!(
                entity_id = %notification.entity_id,
                "dropping channel notification without interesting change"
            );
            return ChannelUpdateOutcome::Ignored;
        }

        let audit_kinds = interest.audit_kinds();
        let executor_id = self
            .correlator
            .find_executor(notification.entity_id, notification.guild_id, &audit_kinds)
            .await;
        let key = BufferKey::derive(
            notification.entity_id,
            executor_id,
            notification.observed_at,
        );

        let outcome = self
            .buffer
            .merge_or_insert(PendingChange {
                key,
                guild_id: notification.guild_id,
                before: notification.before,
                after: notification.after,
                executor_id,
                audit_kinds,
                sequence,
                observed_at: notification.observed_at,
            })
            .await;

        match outcome {
            BufferOutcome::Inserted => {
                debug!(
                    key = %key,
                    properties = interest.properties,
                    permissions = interest.permissions,
                    "opened change episode"
                );
                ChannelUpdateOutcome::Buffered(key)
            }
            BufferOutcome::Merged => ChannelUpdateOutcome::Merged(key),
        }
    }
}
