//! Host syscall surface consumed by `reactor-core`.
//!
//! File/socket I/O, the monotonic clock, and the multiplexed wait call are
//! external collaborators, not part of the core loop's own design. This
//! crate declares the minimum needed to call them: a [`Host`] trait
//! matching the required syscalls, and one real implementation
//! ([`PosixHost`]) built on `libc::poll`.
//!
//! `PosixHost` is the POSIX analogue of the WASI `poll_oneoff` primitive
//! this whole design is modeled on — both are readiness multiplexers over
//! an array of fd-plus-interest subscriptions with one shared timeout.
//! This crate does not attempt to implement the WASI ABI itself; it gives
//! `reactor-core` a host it can actually run against.

pub mod errno;
pub mod host;
pub mod posix;
pub mod subscription;


pub use errno::Errno;
pub use host::Host;
pub use posix::PosixHost;
pub use subscription::{Event, ShutdownHow, Subscription, SubscriptionKind};

/// Raw file/socket handle. A bare `i32` on POSIX hosts; kept as a type
/// alias rather than a newtype so `reactor-core` never has to know the
/// representation differs across hosts.
pub type RawFd = libc::c_int;
