//! Orchestration of diffing, attribution, coalescing and emission.
//!
//! Channel episodes move through `Observed -> Buffered -> Correlating ->
//! Emitted`: an interesting notification is attributed and buffered, and
//! once its flush delay elapses the episode is removed from the buffer,
//! re-attributed if it is still anonymous, and emitted exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use tracing::{debug, info, warn};

use wardlog_core::{AppResult, GuildId};
use wardlog_domain::{
    ChangeInterest, ChannelMutation, ChannelSnapshot, LogContent, LogContext, LogRecord,
    LogRecordType, MemberMutation,
};

use crate::audit_correlator::AuditCorrelator;
use crate::change_buffer::{BufferKey, BufferOutcome, ChangeBuffer, DueKeys, PendingChange};
use crate::reconciliation_config::ReconciliationConfig;
use crate::reconciliation_ports::{AuditTrailSource, Clock, LogSink};

mod channel;
mod flush;
mod member;

pub use channel::ChannelUpdateOutcome;
pub use flush::FlushWorker;

/// Reconciles raw entity notifications into attributed log records.
#[derive(Clone)]
pub struct ReconciliationEngine {
    correlator: AuditCorrelator,
    buffer: Arc<ChangeBuffer<ChannelSnapshot>>,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    severity: u8,
    sequence: Arc<AtomicU64>,
    stop_worker: Arc<watch::Sender<bool>>,
    worker_stopped: watch::Receiver<bool>,
}

impl ReconciliationEngine {
    /// Creates an engine and the worker that drives its delayed flushes.
    ///
    /// The worker must be spawned for buffered episodes to be emitted.
    pub fn new(
        config: ReconciliationConfig,
        audit_source: Arc<dyn AuditTrailSource>,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<(Self, FlushWorker)> {
        config.validate()?;

        let correlator = AuditCorrelator::new(audit_source, clock.clone(), &config)?;
        let (buffer, due_keys) = ChangeBuffer::new(config.flush_delay);
        let (stop_worker, stop_requested) = watch::channel(false);
        let (worker_done, worker_stopped) = watch::channel(false);
        let engine = Self {
            correlator,
            buffer: Arc::new(buffer),
            sink,
            clock,
            severity: config.severity,
            sequence: Arc::new(AtomicU64::new(0)),
            stop_worker: Arc::new(stop_worker),
            worker_stopped,
        };
        let worker = FlushWorker::new(engine.clone(), due_keys, stop_requested, worker_done);

        Ok((engine, worker))
    }

    /// Returns the delay between opening an episode and flushing it.
    pub fn flush_delay(&self) -> Duration {
        self.buffer.flush_delay()
    }

    /// Returns the number of episodes waiting for their flush.
    pub async fn pending_episodes(&self) -> usize {
        self.buffer.len().await
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn record(
        &self,
        record_type: LogRecordType,
        context: LogContext,
        content: LogContent,
        guild_id: GuildId,
    ) -> LogRecord {
        LogRecord::new(
            record_type,
            context,
            content,
            guild_id,
            self.severity,
            self.clock.now(),
        )
    }

    /// Hands a record to the sink; failures are logged, never propagated.
    async fn emit(&self, record: LogRecord) -> LogRecord {
        match self.sink.append(record.clone()).await {
            Ok(()) => {
                info!(
                    record_id = %record.record_id,
                    record_type = record.record_type.as_str(),
                    entity_id = %record.context.entity_id,
                    executor_id = ?record.context.executor_id,
                    guild_id = %record.guild_id,
                    "log record emitted"
                );
            }
            Err(error) => {
                warn!(
                    record_id = %record.record_id,
                    record_type = record.record_type.as_str(),
                    entity_id = %record.context.entity_id,
                    error = %error,
                    "log sink rejected record"
                );
            }
        }

        record
    }
}
