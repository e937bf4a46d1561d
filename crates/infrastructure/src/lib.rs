//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_log_sink;
mod in_memory_audit_trail;
mod json_lines_log_sink;
mod system_clock;

pub use http_log_sink::HttpLogSink;
pub use in_memory_audit_trail::InMemoryAuditTrail;
pub use json_lines_log_sink::JsonLinesLogSink;
pub use system_clock::SystemClock;
