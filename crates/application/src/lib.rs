//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_correlator;
mod change_buffer;
mod reconciliation_config;
mod reconciliation_engine;
mod reconciliation_ports;

pub use audit_correlator::{AuditCorrelator, select_most_recent};
pub use change_buffer::{
    BufferKey, BufferOutcome, ChangeBuffer, ChangeEpisode, DueKeys, KeyAttribution, PendingChange,
};
pub use reconciliation_config::{ReconciliationConfig, WindowBoundary};
pub use reconciliation_engine::{ChannelUpdateOutcome, FlushWorker, ReconciliationEngine};
pub use reconciliation_ports::{AuditTrailSource, Clock, LogSink};
