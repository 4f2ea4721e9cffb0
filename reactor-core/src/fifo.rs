//! Intrusive FIFO, grounded on `slopos-lib`'s `WaitQueue` enqueue/dequeue
//! pattern, adapted from that fixed-array implementation to a
//! singly-linked list threaded through `Completion::next`, since the
//! submissions and async-waiter queues here must hold an unbounded
//! number of completions rather than a bounded per-resource count.

use std::ptr::NonNull;

use crate::completion::Completion;

/// FIFO of completions linked through their own `next` cell. A completion
/// may be on at most one such queue at a time.
pub struct Fifo {
    head: Option<NonNull<Completion>>,
    tail: Option<NonNull<Completion>>,
}

impl Fifo {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn push_back(&mut self, completion: &Completion) {
        completion.next.set(None);
        let node = completion.as_nonnull();
        match self.tail {
            Some(tail) => {
                // SAFETY: `tail` was pushed by this same FIFO and is kept
                // alive by the caller for as long as it's linked in
                // (Ownership).
                unsafe { tail.as_ref() }.next.set(Some(node));
            }
            None => self.head = Some(node),
        }
        self.tail = Some(node);
    }

    pub fn pop_front(&mut self) -> Option<&'static Completion> {
        let head = self.head?;
        // SAFETY: completions are only ever stored as `&'static Completion`
        // by callers (see the crate-level lifetime note in lib.rs);
        // reconstructing the reference here is sound.
        let head_ref: &'static Completion = unsafe { &*head.as_ptr() };
        self.head = head_ref.next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        Some(head_ref)
    }

    /// Swap this FIFO's contents with an empty one, returning what was
    /// queued. Used by `tick` (step 1) so that callbacks
    /// rescheduling work during the drain go to the *next* tick's queue,
    /// not this one, bounding a single tick's submission processing.
    pub fn take(&mut self) -> Fifo {
        std::mem::replace(self, Fifo::new())
    }

    /// Remove `target` from the queue if present, by linear scan. Used by
    /// `stop()` — describes cancellation acting on a
    /// completion observed to still be in a pending-queue state.
    pub fn remove(&mut self, target: &Completion) -> bool {
        let target_ptr = target.as_nonnull();
        let Some(mut head) = self.head else {
            return false;
        };
        if head == target_ptr {
            self.head = target.next.take();
            if self.head.is_none() {
                self.tail = None;
            }
            return true;
        }
        loop {
            // SAFETY: `head` is linked into this FIFO, kept alive per the
            // ownership invariant.
            let cur: &Completion = unsafe { head.as_ref() };
            let Some(next) = cur.next.get() else {
                return false;
            };
            if next == target_ptr {
                cur.next.set(target.next.take());
                if self.tail == Some(next) {
                    self.tail = Some(head);
                }
                return true;
            }
            head = next;
        }
    }
}

impl Default for Fifo {
    fn default() -> Self {
        Self::new()
    }
}
