//! [`Batch`] — the fixed-capacity subscription array handed to
//! `poll_oneoff` each tick, modeled directly on `slopos-lib::ring_buffer`'s
//! `RingBuffer<T, const N: usize>`: same const-generic capacity, no
//! allocation, array-backed.
//!
//! Unlike `RingBuffer`, a `Batch` is compacted by swap-with-last on
//! removal rather than wrapping head/tail indices — this requires
//! occupied slots to stay contiguous at the front so the whole
//! `[0, len)` range can be handed to the host in one call.

use reactor_sys::{Event, Subscription, SubscriptionKind};

use crate::completion::Completion;
use crate::error::IoError;

/// Default batch capacity: 1024 fixed slots.
pub const DEFAULT_CAPACITY: usize = 1024;

const SENTINEL: Subscription = Subscription {
    userdata: 0,
    kind: SubscriptionKind::Clock { deadline_ns: 0 },
};

/// Fixed-capacity subscription batch. Slot 0 is always the clock
/// subscription that bounds the tick's wait call; it is never freed via
/// [`Batch::put`] and never reported by [`Batch::completion_for_userdata`].
pub struct Batch<const N: usize = DEFAULT_CAPACITY> {
    completions: [Option<std::ptr::NonNull<Completion>>; N],
    subscriptions: [Subscription; N],
    /// Number of occupied slots, *including* reserved slot 0 — so this is
    /// always >= 1 (invariant).
    len: usize,
}

impl<const N: usize> Batch<N> {
    pub fn new() -> Self {
        Self {
            completions: [None; N],
            subscriptions: [SENTINEL; N],
            len: 1,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Rewrite slot 0's clock subscription for this tick.
    pub fn set_clock_slot(&mut self, deadline_ns: u64) {
        self.subscriptions[0] = Subscription {
            userdata: 0,
            kind: SubscriptionKind::Clock { deadline_ns },
        };
    }

    /// Reserve a new slot for `completion`, filling it with `subscription`.
    /// Fails with [`IoError::BatchFull`] when the batch is already at
    /// capacity.
    pub fn get(
        &mut self,
        completion: &Completion,
        subscription: Subscription,
    ) -> Result<usize, IoError> {
        if self.len >= N {
            return Err(IoError::BatchFull);
        }
        let idx = self.len;
        self.completions[idx] = Some(completion.as_nonnull());
        self.subscriptions[idx] = subscription;
        completion.batch_idx.set(idx);
        self.len += 1;
        Ok(idx)
    }

    /// Release `completion`'s slot, if it has one, swapping the last
    /// occupied slot into the freed position. A no-op for a completion
    /// with `batch_idx == 0` (not in the batch).
    pub fn put(&mut self, completion: &Completion) {
        let idx = completion.batch_idx.get();
        if idx == 0 {
            return;
        }
        let last = self.len - 1;
        if idx != last {
            self.completions[idx] = self.completions[last];
            self.subscriptions[idx] = self.subscriptions[last];
            if let Some(displaced) = self.completions[idx] {
                // SAFETY: `displaced` is a completion currently linked
                // into this batch, kept alive per the ownership contract.
                unsafe { displaced.as_ref() }.batch_idx.set(idx);
            }
        }
        self.completions[last] = None;
        self.len -= 1;
        completion.batch_idx.set(0);
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions[..self.len]
    }

    /// Blank event buffer sized to this batch's occupied range, ready to
    /// hand to `Host::poll_oneoff`.
    pub fn blank_events(&self) -> Vec<Event> {
        vec![
            Event {
                userdata: 0,
                error: None
            };
            self.len
        ]
    }

    /// Look up the completion occupying a returned event's `userdata`
    /// slot. `userdata == 0` is always the clock slot and never resolves
    /// to a completion.
    pub fn completion_for_userdata(&self, userdata: usize) -> Option<&'static Completion> {
        if userdata == 0 {
            return None;
        }
        // SAFETY: see the crate-level `&'static Completion` storage
        // contract in lib.rs.
        Some(unsafe { &*(userdata as *const Completion) })
    }
}

impl<const N: usize> Default for Batch<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;
    use crate::completion::CallbackAction;
    use crate::event_loop::Loop;
    use crate::operation::Operation;
    use crate::result::OpResult;
    use reactor_sys::SubscriptionKind as SK;

    fn noop_cb(_: usize, _: &mut Loop, _: &Completion, _: OpResult) -> CallbackAction {
        CallbackAction::Disarm
    }

    fn read_completion(fd: i32) -> Completion {
        Completion::new(
            Operation::Read {
                fd,
                buffer: crate::buffer::ReadBuffer::Inline([0u8; 32]),
            },
            fd as usize,
            noop_cb,
        )
    }

    fn fd_sub(completion: &Completion, fd: i32) -> Subscription {
        Subscription {
            userdata: completion as *const Completion as usize,
            kind: SK::FdRead { fd },
        }
    }

    #[test]
    fn new_batch_has_len_one_for_reserved_clock_slot() {
        let batch: Batch<8> = Batch::new();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn get_assigns_contiguous_slots_starting_at_one() {
        let mut batch: Batch<8> = Batch::new();
        let a = read_completion(3);
        let b = read_completion(4);
        let idx_a = batch.get(&a, fd_sub(&a, 3)).unwrap();
        let idx_b = batch.get(&b, fd_sub(&b, 4)).unwrap();
        assert_eq!(idx_a, 1);
        assert_eq!(idx_b, 2);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn put_swaps_last_into_freed_slot_and_updates_displaced_batch_idx() {
        let mut batch: Batch<8> = Batch::new();
        let a = read_completion(3);
        let b = read_completion(4);
        let c = read_completion(5);
        batch.get(&a, fd_sub(&a, 3)).unwrap();
        batch.get(&b, fd_sub(&b, 4)).unwrap();
        batch.get(&c, fd_sub(&c, 5)).unwrap();
        assert_eq!(a.batch_idx.get(), 1);

        batch.put(&a);
        assert_eq!(a.batch_idx.get(), 0, "removed completion is no longer in the batch");
        assert_eq!(batch.len(), 3);
        assert_eq!(c.batch_idx.get(), 1, "last occupied slot swapped into the freed one");
    }

    #[test]
    fn put_on_unbatched_completion_is_a_no_op() {
        let mut batch: Batch<8> = Batch::new();
        let a = read_completion(3);
        batch.put(&a);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn get_fails_with_batch_full_at_capacity() {
        let mut batch: Batch<2> = Batch::new();
        let a = read_completion(3);
        let b = read_completion(4);
        batch.get(&a, fd_sub(&a, 3)).unwrap();
        let err = batch.get(&b, fd_sub(&b, 4)).unwrap_err();
        assert_eq!(err, IoError::BatchFull);
    }
}
