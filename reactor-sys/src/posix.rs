//! [`PosixHost`] — a `Host` built on `libc::poll` and the other raw POSIX
//! syscalls. The concrete stand-in for whatever capability surface the
//! sandboxed target actually exposes.

use std::io;

use log::{trace, warn};

use crate::host::Host;
use crate::subscription::{Event, ShutdownHow, Subscription, SubscriptionKind};
use crate::RawFd;

/// A `Host` implementation using plain POSIX syscalls via `libc`.
///
/// Stateless: every method is a direct syscall wrapper. Safe to share
/// across multiple `Loop`s — though a single `Loop` is never shared
/// across threads, nothing stops two independent loops from each holding
/// their own `PosixHost`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PosixHost;

impl PosixHost {
    pub const fn new() -> Self {
        Self
    }
}

fn last_err() -> io::Error {
    io::Error::last_os_error()
}

impl Host for PosixHost {
    fn monotonic_now_ns(&self) -> u64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid out-pointer for clock_gettime.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            warn!("clock_gettime(CLOCK_MONOTONIC) failed: {}", last_err());
            return 0;
        }
        (ts.tv_sec as u64).saturating_mul(1_000_000_000) + ts.tv_nsec as u64
    }

    fn poll_oneoff(
        &self,
        subscriptions: &[Subscription],
        events_out: &mut [Event],
    ) -> io::Result<usize> {
        let deadline_ns = match subscriptions.first().map(|s| s.kind) {
            Some(SubscriptionKind::Clock { deadline_ns }) => deadline_ns,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "poll_oneoff: subscription slot 0 must be a Clock subscription",
                ));
            }
        };
        if events_out.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "poll_oneoff: events_out must hold at least the clock slot",
            ));
        }

        let now = self.monotonic_now_ns();
        let timeout_ms: libc::c_int = if deadline_ns <= now {
            0
        } else {
            let remaining_ms = (deadline_ns - now) / 1_000_000;
            remaining_ms.min(libc::c_int::MAX as u64) as libc::c_int
        };

        let user_subs = &subscriptions[1..];
        let mut pollfds: Vec<libc::pollfd> = Vec::with_capacity(user_subs.len());
        for sub in user_subs {
            let (fd, events) = match sub.kind {
                SubscriptionKind::FdRead { fd } => (fd, libc::POLLIN),
                SubscriptionKind::FdWrite { fd } => (fd, libc::POLLOUT),
                SubscriptionKind::Clock { .. } => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "poll_oneoff: Clock subscription only valid in slot 0",
                    ));
                }
            };
            pollfds.push(libc::pollfd {
                fd,
                events,
                revents: 0,
            });
        }

        trace!(
            "poll_oneoff: {} fd subscriptions, timeout {}ms",
            pollfds.len(),
            timeout_ms
        );

        // SAFETY: `pollfds` is a valid, correctly-sized array for the
        // duration of the call.
        let rc = unsafe { libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            return Err(last_err());
        }

        // The clock slot always reports, whether or not any timer expired —
        // `reactor-core`'s demux loop skips userdata == 0 unconditionally.
        events_out[0] = Event {
            userdata: 0,
            error: None,
        };
        let mut n = 1usize;
        for (sub, pfd) in user_subs.iter().zip(pollfds.iter()) {
            if pfd.revents == 0 {
                continue;
            }
            if n >= events_out.len() {
                break;
            }
            // POLLHUP alone (the far end of a pipe/socket closing) is not
            // treated as an error here: the subsequent read still needs to
            // run to observe EOF (a zero-byte read) rather than have the
            // loop synthesize a spurious error and skip it. POLLERR and
            // POLLNVAL are unambiguous fd-level failures with no useful
            // read/write to attempt.
            let error = if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
                Some(crate::Errno(libc::EIO))
            } else {
                None
            };
            events_out[n] = Event {
                userdata: sub.userdata,
                error,
            };
            n += 1;
        }
        Ok(n)
    }

    fn sock_accept(&self, fd: RawFd) -> io::Result<RawFd> {
        // SAFETY: `fd` is caller-owned and valid for the duration of the call.
        let accepted = unsafe { libc::accept(fd, std::ptr::null_mut(), std::ptr::null_mut()) };
        if accepted < 0 {
            return Err(last_err());
        }
        Ok(accepted)
    }

    fn sock_recv(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is a valid, appropriately-sized mutable buffer.
        let n = unsafe {
            libc::recv(
                fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };
        if n < 0 {
            return Err(last_err());
        }
        Ok(n as usize)
    }

    fn sock_send(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: `buf` is a valid buffer for the duration of the call.
        let n = unsafe {
            libc::send(fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0)
        };
        if n < 0 {
            return Err(last_err());
        }
        Ok(n as usize)
    }

    fn sock_shutdown(&self, fd: RawFd, how: ShutdownHow) -> io::Result<()> {
        let raw = match how {
            ShutdownHow::BOTH => libc::SHUT_RDWR,
            h if h == ShutdownHow::RD => libc::SHUT_RD,
            h if h == ShutdownHow::WR => libc::SHUT_WR,
            _ => libc::SHUT_RDWR,
        };
        // SAFETY: `fd` is caller-owned and valid for the duration of the call.
        let rc = unsafe { libc::shutdown(fd, raw) };
        if rc < 0 {
            return Err(last_err());
        }
        Ok(())
    }

    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is a valid, appropriately-sized mutable buffer.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(last_err());
        }
        Ok(n as usize)
    }

    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: `buf` is a valid buffer for the duration of the call.
        let n = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            return Err(last_err());
        }
        Ok(n as usize)
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        // SAFETY: `fd` is caller-owned; caller does not use it afterward.
        let rc = unsafe { libc::close(fd) };
        if rc < 0 {
            return Err(last_err());
        }
        Ok(())
    }
}
