//! Keyed coalescing of change episodes with a single delayed flush each.
//!
//! Atomicity contract: every operation on the key map (`merge_or_insert`,
//! `flush`, `drain`) runs under one lock, so for a given key a merge never
//! interleaves with a flush and a key is flushed at most once. A timer that
//! fires after its episode was flushed or drained finds nothing and is a
//! no-op.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use wardlog_core::{EntityId, GuildId, UserId};
use wardlog_domain::AuditEventKind;

/// Who an episode is attributed to at buffering time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAttribution {
    /// Executor already resolved.
    Executor(UserId),
    /// No executor yet, keyed by observation instant in milliseconds.
    Unattributed(i64),
}

/// Deterministic key of one change episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferKey {
    entity_id: EntityId,
    attribution: KeyAttribution,
}

impl BufferKey {
    /// Derives the key from the entity and the executor known at buffering time.
    ///
    /// Unattributed edits fall back to their observation instant so that two
    /// distinct unattributed edits never merge with each other or with an
    /// attributed episode.
    #[must_use]
    pub fn derive(
        entity_id: EntityId,
        executor_id: Option<UserId>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let attribution = match executor_id {
            Some(executor_id) => KeyAttribution::Executor(executor_id),
            None => KeyAttribution::Unattributed(observed_at.timestamp_millis()),
        };

        Self {
            entity_id,
            attribution,
        }
    }

    /// Returns the entity of the episode.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Returns the attribution part of the key.
    #[must_use]
    pub fn attribution(&self) -> KeyAttribution {
        self.attribution
    }
}

impl Display for BufferKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.attribution {
            KeyAttribution::Executor(executor_id) => {
                write!(formatter, "{}-{executor_id}", self.entity_id)
            }
            KeyAttribution::Unattributed(observed_at) => {
                write!(formatter, "{}-at{observed_at}", self.entity_id)
            }
        }
    }
}

/// One interesting notification ready to be buffered.
#[derive(Debug, Clone)]
pub struct PendingChange<S> {
    /// Episode key.
    pub key: BufferKey,
    /// Guild owning the entity.
    pub guild_id: GuildId,
    /// Snapshot before the change.
    pub before: S,
    /// Snapshot after the change.
    pub after: S,
    /// Executor resolved at notification time.
    pub executor_id: Option<UserId>,
    /// Audit kinds that may attribute this change.
    pub audit_kinds: Vec<AuditEventKind>,
    /// Arrival sequence number assigned by the engine.
    pub sequence: u64,
    /// Observation instant.
    pub observed_at: DateTime<Utc>,
}

/// Buffered record of one coalesced burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEpisode<S> {
    /// Episode key.
    pub key: BufferKey,
    /// Guild owning the entity.
    pub guild_id: GuildId,
    /// Old snapshot of the earliest-arrived notification.
    pub first_old: S,
    /// New snapshot of the latest-arrived notification.
    pub latest_new: S,
    /// Executor resolved while buffering, if any.
    pub executor_id: Option<UserId>,
    /// Union of audit kinds of every merged notification.
    pub audit_kinds: BTreeSet<AuditEventKind>,
    /// Observation instant of the notification that opened the episode.
    pub created_at: DateTime<Utc>,
    /// Number of notifications coalesced into the episode.
    pub notification_count: u32,
    first_sequence: u64,
    latest_sequence: u64,
}

impl<S> ChangeEpisode<S> {
    fn open(change: PendingChange<S>) -> Self {
        Self {
            key: change.key,
            guild_id: change.guild_id,
            first_old: change.before,
            latest_new: change.after,
            executor_id: change.executor_id,
            audit_kinds: change.audit_kinds.into_iter().collect(),
            created_at: change.observed_at,
            notification_count: 1,
            first_sequence: change.sequence,
            latest_sequence: change.sequence,
        }
    }

    /// Folds a later notification in; arrival order decides which snapshots win.
    fn absorb(&mut self, change: PendingChange<S>) {
        if change.sequence < self.first_sequence {
            self.first_old = change.before;
            self.first_sequence = change.sequence;
            self.created_at = self.created_at.min(change.observed_at);
        }
        if change.sequence > self.latest_sequence {
            self.latest_new = change.after;
            self.latest_sequence = change.sequence;
        }
        if self.executor_id.is_none() {
            self.executor_id = change.executor_id;
        }
        self.audit_kinds.extend(change.audit_kinds);
        self.notification_count = self.notification_count.saturating_add(1);
    }
}

/// Result of [`ChangeBuffer::merge_or_insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOutcome {
    /// A new episode was opened and its flush scheduled.
    Inserted,
    /// The change joined a live episode; the flush time is unchanged.
    Merged,
}

/// Receiving side of the delayed queue: yields keys whose flush delay elapsed.
pub struct DueKeys {
    receiver: mpsc::UnboundedReceiver<BufferKey>,
}

impl DueKeys {
    /// Waits for the next due key, `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<BufferKey> {
        self.receiver.recv().await
    }
}

/// Exclusive owner of live change episodes.
pub struct ChangeBuffer<S> {
    episodes: Mutex<HashMap<BufferKey, ChangeEpisode<S>>>,
    flush_delay: Duration,
    due_sender: mpsc::UnboundedSender<BufferKey>,
}

impl<S: Send + 'static> ChangeBuffer<S> {
    /// Creates an empty buffer and the queue its flush timers feed.
    #[must_use]
    pub fn new(flush_delay: Duration) -> (Self, DueKeys) {
        let (due_sender, receiver) = mpsc::unbounded_channel();

        (
            Self {
                episodes: Mutex::new(HashMap::new()),
                flush_delay,
                due_sender,
            },
            DueKeys { receiver },
        )
    }

    /// Returns the configured flush delay.
    #[must_use]
    pub fn flush_delay(&self) -> Duration {
        self.flush_delay
    }

    /// Opens an episode for a new key or folds the change into the live one.
    ///
    /// Only opening schedules a flush; later merges never push it back.
    pub async fn merge_or_insert(&self, change: PendingChange<S>) -> BufferOutcome {
        let key = change.key;
        let mut episodes = self.episodes.lock().await;

        if let Some(episode) = episodes.get_mut(&key) {
            episode.absorb(change);
            debug!(
                key = %key,
                notification_count = episode.notification_count,
                "merged change into live episode"
            );
            return BufferOutcome::Merged;
        }

        episodes.insert(key, ChangeEpisode::open(change));
        drop(episodes);

        self.schedule_flush(key);
        BufferOutcome::Inserted
    }

    /// Removes and returns the live episode for `key`, if any.
    pub async fn flush(&self, key: &BufferKey) -> Option<ChangeEpisode<S>> {
        self.episodes.lock().await.remove(key)
    }

    /// Removes and returns every live episode.
    pub async fn drain(&self) -> Vec<ChangeEpisode<S>> {
        self.episodes
            .lock()
            .await
            .drain()
            .map(|(_, episode)| episode)
            .collect()
    }

    /// Returns the number of live episodes.
    pub async fn len(&self) -> usize {
        self.episodes.lock().await.len()
    }

    /// Returns true when no episode is live.
    pub async fn is_empty(&self) -> bool {
        self.episodes.lock().await.is_empty()
    }

    fn schedule_flush(&self, key: BufferKey) {
        let due_sender = self.due_sender.clone();
        let flush_delay = self.flush_delay;

        tokio::spawn(async move {
            tokio::time::sleep(flush_delay).await;
            if due_sender.send(key).is_err() {
                debug!(key = %key, "flush queue closed before episode became due");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};
    use wardlog_core::{EntityId, GuildId, UserId};
    use wardlog_domain::AuditEventKind;

    use super::{BufferKey, BufferOutcome, ChangeBuffer, KeyAttribution, PendingChange};

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
    }

    fn change(key: BufferKey, before: &str, after: &str, sequence: u64) -> PendingChange<String> {
        PendingChange {
            key,
            guild_id: GuildId::new(1),
            before: before.to_owned(),
            after: after.to_owned(),
            executor_id: None,
            audit_kinds: vec![AuditEventKind::ChannelUpdate],
            sequence,
            observed_at: at(1_000 + i64::try_from(sequence).unwrap_or_default()),
        }
    }

    fn attributed_key() -> BufferKey {
        BufferKey::derive(EntityId::new(7), Some(UserId::new(9)), at(1_000))
    }

    #[test]
    fn key_uses_executor_when_known() {
        let key = attributed_key();
        assert_eq!(key.to_string(), "7-9");
        assert_eq!(key.attribution(), KeyAttribution::Executor(UserId::new(9)));
    }

    #[test]
    fn unattributed_keys_never_collide_with_attributed_ones() {
        let unattributed = BufferKey::derive(EntityId::new(7), None, at(9));
        let attributed = BufferKey::derive(EntityId::new(7), Some(UserId::new(9)), at(9));

        assert_ne!(unattributed, attributed);
        assert_eq!(unattributed.to_string(), "7-at9");
        assert_ne!(
            BufferKey::derive(EntityId::new(7), None, at(9)),
            BufferKey::derive(EntityId::new(7), None, at(10)),
        );
    }

    #[tokio::test]
    async fn merge_keeps_first_old_and_latest_new() {
        let (buffer, _due_keys) = ChangeBuffer::new(Duration::from_millis(3000));
        let key = attributed_key();

        assert_eq!(
            buffer.merge_or_insert(change(key, "a", "b", 1)).await,
            BufferOutcome::Inserted
        );
        assert_eq!(
            buffer.merge_or_insert(change(key, "b", "c", 2)).await,
            BufferOutcome::Merged
        );
        assert_eq!(
            buffer.merge_or_insert(change(key, "c", "d", 3)).await,
            BufferOutcome::Merged
        );

        let episode = buffer.flush(&key).await;
        assert!(episode.is_some());
        let episode = episode.unwrap_or_else(|| unreachable!());
        assert_eq!(episode.first_old, "a");
        assert_eq!(episode.latest_new, "d");
        assert_eq!(episode.notification_count, 3);
    }

    #[tokio::test]
    async fn out_of_order_merge_respects_arrival_sequence() {
        let (buffer, _due_keys) = ChangeBuffer::new(Duration::from_millis(3000));
        let key = attributed_key();

        buffer.merge_or_insert(change(key, "b", "c", 2)).await;
        buffer.merge_or_insert(change(key, "a", "b", 1)).await;

        let episode = buffer.flush(&key).await.unwrap_or_else(|| unreachable!());
        assert_eq!(episode.first_old, "a");
        assert_eq!(episode.latest_new, "c");
        assert_eq!(episode.created_at, at(1_001));
    }

    #[tokio::test]
    async fn flush_is_idempotent() {
        let (buffer, _due_keys) = ChangeBuffer::new(Duration::from_millis(3000));
        let key = attributed_key();
        buffer.merge_or_insert(change(key, "a", "b", 1)).await;

        assert!(buffer.flush(&key).await.is_some());
        assert!(buffer.flush(&key).await.is_none());
        assert!(buffer.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_timer_fires_once_per_episode_and_is_not_extended() {
        let (buffer, mut due_keys) = ChangeBuffer::new(Duration::from_millis(3000));
        let key = attributed_key();

        buffer.merge_or_insert(change(key, "a", "b", 1)).await;
        tokio::time::sleep(Duration::from_millis(2500)).await;
        buffer.merge_or_insert(change(key, "b", "c", 2)).await;

        let started = tokio::time::Instant::now();
        let due = due_keys.next().await;
        assert_eq!(due, Some(key));
        assert!(started.elapsed() < Duration::from_millis(1000));

        let pending_second = tokio::time::timeout(Duration::from_secs(10), due_keys.next()).await;
        assert!(pending_second.is_err());
    }

    #[tokio::test]
    async fn drain_empties_the_buffer() {
        let (buffer, _due_keys) = ChangeBuffer::new(Duration::from_millis(3000));
        buffer.merge_or_insert(change(attributed_key(), "a", "b", 1)).await;
        buffer
            .merge_or_insert(change(
                BufferKey::derive(EntityId::new(8), None, at(5)),
                "x",
                "y",
                2,
            ))
            .await;

        assert_eq!(buffer.len().await, 2);
        assert_eq!(buffer.drain().await.len(), 2);
        assert_eq!(buffer.len().await, 0);
    }
}
