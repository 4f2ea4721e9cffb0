//! Host errno → typed error mapping.
//!
//! Error-code mapping from host errno is kept as a thin interface rather
//! than a rich hierarchy. [`Errno`] is a thin newtype around the raw OS
//! error code;
//! [`Errno::last`] captures it the moment a syscall fails, and `Display`
//! defers to `std::io::Error` for the message so we don't hand-roll
//! `strerror` table.

use std::fmt;
use std::io;

/// A captured host error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Errno(pub i32);

impl Errno {
    /// Capture the calling thread's last OS error. Call this immediately
    /// after a syscall reports failure — the value is meaningless once
    /// another call has run.
    pub fn last() -> Self {
        Self(io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    /// True for `EAGAIN`/`EWOULDBLOCK` — readiness was reported but the
    /// blocking syscall would still not make progress. Operations should
    /// treat this as "stay in the batch", not as a terminal error.
    pub fn would_block(self) -> bool {
        self.0 == libc::EAGAIN || self.0 == libc::EWOULDBLOCK
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", io::Error::from_raw_os_error(self.0))
    }
}

impl std::error::Error for Errno {}

impl From<Errno> for io::Error {
    fn from(e: Errno) -> Self {
        io::Error::from_raw_os_error(e.0)
    }
}

impl From<io::Error> for Errno {
    fn from(e: io::Error) -> Self {
        Self(e.raw_os_error().unwrap_or(0))
    }
}
