//! Error taxonomy: one `thiserror` enum per operation family, never
//! propagated out of `tick` except for the single unrecoverable case: a
//! failing `poll_oneoff` call itself.

use reactor_sys::Errno;
use thiserror::Error;

/// `cancel`'s only failure mode.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelError {
    #[error("cannot cancel a cancel completion")]
    InvalidOp,
}

/// `accept`/`read`/`write`/`recv`/`send` failures — "BatchFull
/// (submission refused because no slot free) ∪ host-errno-derived errors
/// ∪ EOF (read/recv only)". One union type, not a separate submission-time
/// error: a `Completion`'s callback always receives the `Result` variant
/// matching its `Operation` tag, whether the failure happened at `start`
/// (no free batch slot) or after readiness fired (host errno, or a
/// zero-byte read/recv normalized to EOF).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// Submission refused — the batch had no free slot.
    #[error("batch is full")]
    BatchFull,
    #[error("host error: {0}")]
    Errno(#[from] Errno),
    /// `read`/`recv` returning zero bytes, normalized to an error so
    /// callers don't need a separate zero-length check.
    #[error("end of file")]
    Eof,
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Errno(Errno::from(e))
    }
}

/// `shutdown`/`close`/`async_wait` failures. `async_wait` never actually
/// produces one in this implementation — it is a pure software FIFO
/// operation with no host syscall to fail — but the variant is kept so
/// `OpResult::AsyncWait` has the same `Result<(), SyncOpError>` shape as
/// the other synchronous operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOpError {
    #[error("host error: {0}")]
    Errno(#[from] Errno),
}

impl From<std::io::Error> for SyncOpError {
    fn from(e: std::io::Error) -> Self {
        SyncOpError::Errno(Errno::from(e))
    }
}

/// Why a timer fired, not an error; the success payload itself carries
/// which of the two triggers occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerTrigger {
    Expiration,
    Cancel,
}

/// `Loop::init` failure.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("host resource unavailable: {0}")]
    HostResource(#[from] std::io::Error),
}

/// Returned from `run`/`tick` for the one case allowed to escape a
/// callback: an unrecoverable `poll_oneoff` failure.
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("poll_oneoff failed: {0}")]
    Poll(#[from] std::io::Error),
}
