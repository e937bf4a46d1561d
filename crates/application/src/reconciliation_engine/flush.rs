use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::change_buffer::ChangeEpisode;

use super::*;

/// Consumer of the buffer's delayed queue.
///
/// Each due episode is flushed on its own task so a failure stays confined
/// to that episode.
pub struct FlushWorker {
    engine: ReconciliationEngine,
    due_keys: DueKeys,
    stop_requested: watch::Receiver<bool>,
    done: watch::Sender<bool>,
}

impl FlushWorker {
    pub(super) fn new(
        engine: ReconciliationEngine,
        due_keys: DueKeys,
        stop_requested: watch::Receiver<bool>,
        done: watch::Sender<bool>,
    ) -> Self {
        Self {
            engine,
            due_keys,
            stop_requested,
            done,
        }
    }

    /// Flushes episodes as they become due until the engine shuts down.
    ///
    /// Flushes already started when the stop arrives run to completion
    /// before the worker reports itself stopped.
    pub async fn run(mut self) {
        let mut in_flight = JoinSet::new();

        loop {
            if *self.stop_requested.borrow_and_update() {
                break;
            }

            tokio::select! {
                changed = self.stop_requested.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                due = self.due_keys.next() => {
                    let Some(key) = due else {
                        break;
                    };
                    let engine = self.engine.clone();
                    in_flight.spawn(async move {
                        engine.flush_episode(&key).await;
                    });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(error) = joined {
                        warn!(error = %error, "episode flush task failed");
                    }
                }
            }
        }

        debug!(in_flight = in_flight.len(), "flush worker stopping");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(error) = joined {
                warn!(error = %error, "episode flush task failed");
            }
        }
        self.done.send_replace(true);
    }
}

impl ReconciliationEngine {
    /// Removes the episode for `key` and emits its record.
    ///
    /// Returns `None` when the episode was already flushed.
    pub async fn flush_episode(&self, key: &BufferKey) -> Option<LogRecord> {
        let Some(episode) = self.buffer.flush(key).await else {
            debug!(key = %key, "flush found no live episode");
            return None;
        };

        Some(self.emit_episode(episode).await)
    }

    /// Stops the flush worker, waits for its in-flight flushes, then emits
    /// every live episode without waiting for its timer.
    ///
    /// Returns the records of the drained episodes only.
    pub async fn shutdown(&self) -> Vec<LogRecord> {
        self.stop_worker.send_replace(true);
        let mut worker_stopped = self.worker_stopped.clone();
        let worker_finished = worker_stopped.wait_for(|stopped| *stopped).await.is_ok();
        if !worker_finished {
            debug!("flush worker dropped without running");
        }

        let episodes = self.buffer.drain().await;
        info!(pending = episodes.len(), "draining change buffer");

        join_all(
            episodes
                .into_iter()
                .map(|episode| self.emit_episode(episode)),
        )
        .await
    }

    async fn emit_episode(&self, episode: ChangeEpisode<ChannelSnapshot>) -> LogRecord {
        let entity_id = episode.key.entity_id();
        let executor_id = match episode.executor_id {
            Some(executor_id) => Some(executor_id),
            None => {
                let audit_kinds = episode.audit_kinds.iter().copied().collect::<Vec<_>>();
                let late = self
                    .correlator
                    .find_executor_since(
                        entity_id,
                        episode.guild_id,
                        &audit_kinds,
                        episode.created_at,
                    )
                    .await;
                if late.is_some() {
                    debug!(key = %episode.key, executor_id = ?late, "late attribution resolved");
                }
                late
            }
        };

        let record = self.record(
            LogRecordType::ChannelUpdate,
            LogContext {
                entity_id,
                executor_id,
            },
            LogContent::Channel {
                before: Box::new(episode.first_old),
                after: Box::new(episode.latest_new),
            },
            episode.guild_id,
        );

        self.emit(record).await
    }
}
