//! The platform-specific subscription/event encoding.
//!
//! Kept as small as the batch actually needs: a clock entry and two
//! fd-readiness kinds, each carrying the `userdata` the loop uses to
//! demultiplex results back to a `Completion`.

use bitflags::bitflags;

use crate::RawFd;

/// One slot of a `poll_oneoff` batch.
#[derive(Clone, Copy, Debug)]
pub struct Subscription {
    /// Opaque value round-tripped into the matching [`Event`]. The loop
    /// stores its completion's address here; slot 0's clock subscription
    /// always carries `0` (tick step f).
    pub userdata: usize,
    pub kind: SubscriptionKind,
}

#[derive(Clone, Copy, Debug)]
pub enum SubscriptionKind {
    /// Absolute monotonic deadline, millisecond precision per     /// step d. Only valid in batch slot 0.
    Clock { deadline_ns: u64 },
    FdRead { fd: RawFd },
    FdWrite { fd: RawFd },
}

/// One readiness result returned from `poll_oneoff`.
#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub userdata: usize,
    /// `Some` if the host observed an error condition on this fd
    /// (`POLLERR`/`POLLHUP`/`POLLNVAL` on POSIX) rather than plain
    /// readiness.
    pub error: Option<crate::Errno>,
}

bitflags! {
    /// `sock_shutdown`'s `how` argument. "both = WR|RD; recv =
    /// RD; send = WR" — a genuine OR-able flag set, unlike
    /// `Completion.state`, which is why this is `bitflags` and state is a
    /// plain enum.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ShutdownHow: u8 {
        const RD = 0b01;
        const WR = 0b10;
    }
}

impl ShutdownHow {
    pub const BOTH: Self = Self::RD.union(Self::WR);
}
