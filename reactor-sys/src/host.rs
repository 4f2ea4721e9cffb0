//! The [`Host`] trait: the syscall surface `reactor-core` runs against.
//!
//! Vectored I/O is out of scope, so `sock_recv`/`sock_send` take a single
//! buffer rather than an iovec array.

use std::io;

use crate::subscription::{Event, ShutdownHow, Subscription};
use crate::RawFd;

/// Everything `reactor-core` needs from the host. Implemented once for
/// real use ([`crate::PosixHost`]); test code may provide fakes.
pub trait Host {
    /// Nanosecond timestamp on a clock that never moves backward.
    fn monotonic_now_ns(&self) -> u64;

    /// The multiplexed wait call. `subscriptions[0]` must be a `Clock`
    /// subscription — slot 0 is permanently reserved for it.
    /// Returns the number of entries written to `events_out`, which is
    /// always at least 1: the clock slot always reports, even on a bare
    /// timeout, so callers can implement a uniform "userdata == 0 →
    /// skip" demux rule.
    fn poll_oneoff(
        &self,
        subscriptions: &[Subscription],
        events_out: &mut [Event],
    ) -> io::Result<usize>;

    fn sock_accept(&self, fd: RawFd) -> io::Result<RawFd>;
    fn sock_recv(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize>;
    fn sock_send(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize>;
    fn sock_shutdown(&self, fd: RawFd, how: ShutdownHow) -> io::Result<()>;

    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize>;
    fn close(&self, fd: RawFd) -> io::Result<()>;
}
