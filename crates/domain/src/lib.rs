//! Domain entities, structural diffs and the noise policy.

#![forbid(unsafe_code)]

mod audit;
pub mod diff;
mod log_record;
pub mod noise;
mod notification;
mod snapshot;

pub use audit::{AuditEventKind, AuditTrailEntry};
pub use diff::{OverwriteChange, OverwriteChangeKind, PermissionDelta, RoleDelta};
pub use log_record::{LogContent, LogContext, LogRecord, LogRecordType};
pub use noise::ChangeInterest;
pub use notification::{ChannelMutation, MemberMutation, MutationNotification};
pub use snapshot::{
    ChannelKind, ChannelSnapshot, MemberSnapshot, PermissionOverwrite, PermissionOverwrites,
};
