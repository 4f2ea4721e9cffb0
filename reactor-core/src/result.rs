//! [`OpResult`] — isomorphic to [`Operation`]: the result tag delivered
//! to the callback is always equal to the completion's operation tag.
//! This is a hard invariant.

use reactor_sys::RawFd;

use crate::error::{CancelError, SyncOpError, TimerTrigger};
use crate::operation::OperationKind;

pub type IoResult<T> = Result<T, crate::error::IoError>;

/// The value handed to a completion's callback.
pub enum OpResult {
    Cancel(Result<(), CancelError>),
    Accept(IoResult<RawFd>),
    Read(IoResult<usize>),
    Write(IoResult<usize>),
    Recv(IoResult<usize>),
    Send(IoResult<usize>),
    Shutdown(Result<(), SyncOpError>),
    Close(Result<(), SyncOpError>),
    Timer(TimerTrigger),
    AsyncWait(Result<(), SyncOpError>),
}

impl OpResult {
    pub fn kind(&self) -> OperationKind {
        match self {
            OpResult::Cancel(_) => OperationKind::Cancel,
            OpResult::Accept(_) => OperationKind::Accept,
            OpResult::Read(_) => OperationKind::Read,
            OpResult::Write(_) => OperationKind::Write,
            OpResult::Recv(_) => OperationKind::Recv,
            OpResult::Send(_) => OperationKind::Send,
            OpResult::Shutdown(_) => OperationKind::Shutdown,
            OpResult::Close(_) => OperationKind::Close,
            OpResult::Timer(_) => OperationKind::Timer,
            OpResult::AsyncWait(_) => OperationKind::AsyncWait,
        }
    }
}
