//! Shared primitives for all Rust crates in Wardlog.

#![forbid(unsafe_code)]

/// Platform identifiers shared across layers.
pub mod ids;

use thiserror::Error;

pub use ids::{EntityId, GuildId, RoleId, SubjectId, UserId};

/// Result type used across Wardlog crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input, configuration or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// External collaborator is temporarily unreachable (rate limit, network, timeout).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
