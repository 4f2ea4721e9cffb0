//! Async wakeup protocol: a pair of flags per notification — one
//! loop-wide (wakes the multiplexed wait promptly), one per-waiter
//! (identifies which waiter(s) to retire so a single notification does
//! not wake every parked completion).
//!
//! The per-waiter flag lives on [`Completion`] itself
//! ([`Completion::mark_woken`]/[`Completion::take_woken`]); this module is
//! just the loop-wide half.

use std::sync::atomic::{AtomicBool, Ordering};

/// Loop-wide half of the async wakeup protocol. Sequentially-consistent
/// because the whole point is cross-thread visibility the moment
/// `async_notify` runs from another thread. This build always assumes a
/// threaded host; see DESIGN.md for the Open Question this resolves.
pub struct AsyncFlag {
    set: AtomicBool,
}

impl AsyncFlag {
    pub const fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
        }
    }

    /// Safe to call from any thread, any number of times — idempotent
    /// (`async_notify`).
    pub fn raise(&self) {
        self.set.store(true, Ordering::SeqCst);
    }

    /// Clear and return whether it was set. Only ever called from the
    /// loop's owning thread, at the top of a tick's async-waiter
    /// servicing step.
    pub fn take(&self) -> bool {
        self.set.swap(false, Ordering::SeqCst)
    }
}

impl Default for AsyncFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod async_wait_tests {
    use super::*;

    #[test]
    fn raise_is_idempotent_until_taken() {
        let flag = AsyncFlag::new();
        flag.raise();
        flag.raise();
        flag.raise();
        assert!(flag.take());
        assert!(!flag.take());
    }
}
