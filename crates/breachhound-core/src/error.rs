//! Error taxonomy shared across the command surface.
//!
//! Every variant maps to a user-visible rejection; none of these abort the
//! process. Translation to reply text happens in the command handler.

use std::io;

/// Errors surfaced by core operations.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// A referenced key, file, or IP does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller lacks admin rights for the requested command.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed input (bad IP format, non-.txt filename, bad arguments).
    #[error("invalid input: {0}")]
    Validation(String),

    /// Free-tier search limit reached without an active API key.
    #[error("free search limit of {limit} reached")]
    QuotaExceeded { limit: u64 },

    /// A store or artifact read/write failed.
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// A persisted store could not be loaded or saved.
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}
