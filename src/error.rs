//! Errors returned by the primitives.
//!
//! Blocking calls never fail: they either return or stay blocked.
//! Everything else hands its error straight back to the caller, nothing retries internally.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Malformed input: a negative initial count, a slot index out of range
    #[error("invalid argument")]
    InvalidArgument,

    /// Unlock attempted by a thread that doesn't hold the lock (or nobody holds it in that mode)
    #[error("calling thread does not hold the lock")]
    NotOwner,

    /// A `try_*` call found the resource taken, nothing has changed
    #[error("operation would block")]
    WouldBlock,

    /// The primitive is still held or waited on and can't be torn down
    #[error("resource busy")]
    ResourceBusy,
}

pub type Result<T> = std::result::Result<T, SyncError>;
