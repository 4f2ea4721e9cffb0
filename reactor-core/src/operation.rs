//! [`Operation`] — the tagged variant a `Completion` carries.
//!
//! Closed set, dispatched by `match` rather than a `dyn Trait`: there is
//! a fixed, known set of operations, so a `match` is both cheaper and
//! exhaustive-checked by the compiler when a new variant is added.

use reactor_sys::{Host, RawFd, ShutdownHow};

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::completion::Completion;
use crate::error::IoError;

/// The closed set of things a `Completion` can do.
pub enum Operation {
    Cancel {
        target: &'static Completion,
    },
    Accept {
        fd: RawFd,
    },
    Read {
        fd: RawFd,
        buffer: ReadBuffer<'static>,
    },
    Write {
        fd: RawFd,
        buffer: WriteBuffer<'static>,
    },
    Recv {
        fd: RawFd,
        buffer: ReadBuffer<'static>,
    },
    Send {
        fd: RawFd,
        buffer: WriteBuffer<'static>,
    },
    Shutdown {
        fd: RawFd,
        how: ShutdownHow,
    },
    Close {
        fd: RawFd,
    },
    Timer {
        deadline_ns: u64,
    },
    AsyncWait,
}

/// Just the tag, with no payload — used to check the "result tag
/// equals operation tag" invariant without borrowing the operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Cancel,
    Accept,
    Read,
    Write,
    Recv,
    Send,
    Shutdown,
    Close,
    Timer,
    AsyncWait,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Cancel { .. } => OperationKind::Cancel,
            Operation::Accept { .. } => OperationKind::Accept,
            Operation::Read { .. } => OperationKind::Read,
            Operation::Write { .. } => OperationKind::Write,
            Operation::Recv { .. } => OperationKind::Recv,
            Operation::Send { .. } => OperationKind::Send,
            Operation::Shutdown { .. } => OperationKind::Shutdown,
            Operation::Close { .. } => OperationKind::Close,
            Operation::Timer { .. } => OperationKind::Timer,
            Operation::AsyncWait => OperationKind::AsyncWait,
        }
    }

    /// The fd/socket this operation's subscription should watch, and
    /// whether it watches for read- or write-readiness. `None` for
    /// operations that never enter the batch.
    pub(crate) fn subscription_fd(&self) -> Option<(RawFd, SubscriptionDirection)> {
        match self {
            Operation::Accept { fd } => Some((*fd, SubscriptionDirection::Read)),
            Operation::Read { fd, .. } => Some((*fd, SubscriptionDirection::Read)),
            Operation::Recv { fd, .. } => Some((*fd, SubscriptionDirection::Read)),
            Operation::Write { fd, .. } => Some((*fd, SubscriptionDirection::Write)),
            Operation::Send { fd, .. } => Some((*fd, SubscriptionDirection::Write)),
            _ => None,
        }
    }

    /// Perform the blocking syscall once readiness has fired.
    ///
    /// Undefined (panics) for `Close`/`AsyncWait`/`Shutdown`/`Cancel`/
    /// `Timer` — those never reach the poll demux path. The loop never
    /// calls this for those kinds; the panic is a defensive check against
    /// a future bug in the dispatch, not a recoverable condition a caller
    /// should handle.
    pub(crate) fn perform(&mut self, host: &dyn Host) -> Result<usize, IoError> {
        match self {
            Operation::Accept { fd } => host
                .sock_accept(*fd)
                .map(|accepted| accepted as usize)
                .map_err(IoError::from),
            Operation::Read { fd, buffer } => {
                let n = host.read(*fd, buffer.as_mut_slice()).map_err(IoError::from)?;
                if n == 0 {
                    Err(IoError::Eof)
                } else {
                    Ok(n)
                }
            }
            Operation::Write { fd, buffer } => {
                host.write(*fd, buffer.as_slice()).map_err(IoError::from)
            }
            Operation::Recv { fd, buffer } => {
                let n = host
                    .sock_recv(*fd, buffer.as_mut_slice())
                    .map_err(IoError::from)?;
                // zero-byte read/recv is EOF, not success.
                if n == 0 {
                    Err(IoError::Eof)
                } else {
                    Ok(n)
                }
            }
            Operation::Send { fd, buffer } => {
                host.sock_send(*fd, buffer.as_slice()).map_err(IoError::from)
            }
            Operation::Cancel { .. }
            | Operation::Shutdown { .. }
            | Operation::Close { .. }
            | Operation::Timer { .. }
            | Operation::AsyncWait => {
                unreachable!("perform() called on an operation that never reaches the poll demux path")
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SubscriptionDirection {
    Read,
    Write,
}
