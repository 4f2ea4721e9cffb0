//! [`Completion`] — the fundamental unit of submission.
//!
//! Follows an intrusive kernel-object style (akin to `FutexWaiter.task:
//! *mut Task` in a scheduler): linkage and position within whatever
//! structure currently owns a completion are stored *inside* the
//! completion itself, so the loop can unlink one given only its address,
//! with no separate allocation or lookup table.

use std::cell::{Cell, UnsafeCell};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event_loop::Loop;
use crate::operation::{Operation, OperationKind};
use crate::result::OpResult;

/// Decision returned by a callback: keep the completion alive for another
/// round (`Rearm`) or retire it (`Disarm`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Disarm,
    Rearm,
}

/// A completion's position in the loop's state machine.
///
/// State transitions are driven exclusively by the loop on its owning
/// thread — nothing here is atomic, unlike the async wakeup flags below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionState {
    Dead,
    Adding,
    /// Transient: set by `stop()` while unlinking a completion that had
    /// not yet fired, before its cancellation callback runs. Not reached
    /// via any path other than timer cancellation — batch-resident and
    /// async-waiter completions don't support cancellation yet.
    Deleting,
    Active,
    InProgress,
}

/// Callback signature from `(user_data, *loop, *completion,
/// result) -> {disarm, rearm}`. `user_data` is an opaque word the loop
/// never interprets.
pub type Callback = fn(user_data: usize, lp: &mut Loop, completion: &Completion, result: OpResult) -> CallbackAction;

/// One unit of asynchronous work.
///
/// Not `Send`/`Sync` by way of any derive — the only field that may
/// legitimately be touched from another thread is `waiter_flag`, which is
/// why that one field alone is an `AtomicBool`. Everything else is a
/// `Cell`, which is sound because requires `add`/`start`/`tick`
/// to run only on the loop's owning thread.
pub struct Completion {
    /// `UnsafeCell` rather than `Cell` because `Operation` is not `Copy`
    /// (it may hold a `&'static mut [u8]` buffer) — raw interior
    /// mutability over cloning on every access, the same way hot
    /// kernel-object paths favor a `ptr::read_volatile` accessor over a
    /// defensive copy. Sound under the same invariant as the rest of
    /// this struct: only the loop's owning thread touches it.
    operation: UnsafeCell<Operation>,
    user_data: Cell<usize>,
    callback: Cell<Callback>,
    pub(crate) state: Cell<CompletionState>,
    /// Intrusive FIFO link (submissions queue or async waiters queue).
    pub(crate) next: Cell<Option<NonNull<Completion>>>,
    /// 0 when not present in the batch; otherwise the occupied slot index.
    pub(crate) batch_idx: Cell<usize>,
    /// Position in the timer min-heap's backing array, for O(log n)
    /// arbitrary removal. Meaningless unless `in_heap` is set.
    pub(crate) heap_idx: Cell<usize>,
    pub(crate) in_heap: Cell<bool>,
    /// Per-waiter half of the async wakeup protocol.
    pub(crate) waiter_flag: AtomicBool,
}

// SAFETY: every field except `waiter_flag` is only ever touched from the
// loop's owning thread; `waiter_flag` is an AtomicBool and
// is the one field `async_notify` may set from any thread. A `Completion`
// is therefore safe to hand a `&Completion` to another thread purely to
// call `async_notify` through it.
unsafe impl Sync for Completion {}

impl Completion {
    /// Construct a completion. The operation is usually a placeholder —
    /// callers typically configure it via [`Loop::add`] or [`Loop::timer`]
    /// right before submission, since the real operation often needs a
    /// freshly-accepted fd or a deadline computed from "now".
    pub fn new(operation: Operation, user_data: usize, callback: Callback) -> Self {
        Self {
            operation: UnsafeCell::new(operation),
            user_data: Cell::new(user_data),
            callback: Cell::new(callback),
            state: Cell::new(CompletionState::Dead),
            next: Cell::new(None),
            batch_idx: Cell::new(0),
            heap_idx: Cell::new(0),
            in_heap: Cell::new(false),
            waiter_flag: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CompletionState {
        self.state.get()
    }

    pub fn operation_kind(&self) -> OperationKind {
        // SAFETY: loop-thread-only access per the struct-level invariant;
        // this is a shared read of the tag, never aliased with a `&mut`.
        unsafe { (*self.operation.get()).kind() }
    }

    pub fn user_data(&self) -> usize {
        self.user_data.get()
    }

    pub(crate) fn callback(&self) -> Callback {
        self.callback.get()
    }

    /// Reconfigure operation, user data, and callback in one shot — the
    /// allocate-blank-then-configure pattern `Loop::timer` uses as a
    /// convenience initializer that sets the operation and user data then
    /// calls `add`.
    ///
    /// # Safety
    /// Only sound when `self.state() == CompletionState::Dead` — the
    /// loop never calls this on a completion it still owns.
    pub(crate) unsafe fn reconfigure(&self, operation: Operation, user_data: usize, callback: Callback) {
        unsafe {
            *self.operation.get() = operation;
        }
        self.user_data.set(user_data);
        self.callback.set(callback);
    }

    /// Borrow the operation mutably. Restricted to `pub(crate)` — only
    /// the loop itself (always on its owning thread, per )
    /// calls this, e.g. to rewrite a timer's deadline on rearm.
    ///
    /// # Safety
    /// The caller must not hold another borrow of this completion's
    /// operation at the same time (no re-entrant `start`/`tick` calls on
    /// the same completion).
    pub(crate) unsafe fn operation_mut(&self) -> &mut Operation {
        unsafe { &mut *self.operation.get() }
    }

    pub(crate) fn operation_ref(&self) -> &Operation {
        // SAFETY: shared read under the same loop-thread-only invariant.
        unsafe { &*self.operation.get() }
    }

    /// Set the per-waiter wakeup flag. The loop-wide flag is set
    /// separately by [`Loop::async_notify`]. Idempotent: repeated calls
    /// before the next tick collapse into one flag set, and so into
    /// exactly one dispatch.
    pub(crate) fn mark_woken(&self) {
        self.waiter_flag.store(true, Ordering::SeqCst);
    }

    pub(crate) fn take_woken(&self) -> bool {
        self.waiter_flag.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn as_nonnull(&self) -> NonNull<Completion> {
        // SAFETY: `&self` is already a valid reference.
        NonNull::from(self)
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("state", &self.state.get())
            .field("batch_idx", &self.batch_idx.get())
            .field("user_data", &self.user_data.get())
            .finish()
    }
}

#[cfg(test)]
mod completion_tests {
    use super::*;
    use crate::operation::Operation;
    use crate::result::OpResult;

    fn noop_cb(_: usize, _: &mut Loop, _: &Completion, _: OpResult) -> CallbackAction {
        CallbackAction::Disarm
    }

    #[test]
    fn new_completion_starts_dead_and_unlinked() {
        let c = Completion::new(Operation::AsyncWait, 0, noop_cb);
        assert_eq!(c.state(), CompletionState::Dead);
        assert_eq!(c.batch_idx.get(), 0);
        assert!(c.next.get().is_none());
    }

    #[test]
    fn waiter_flag_is_idempotent_until_consumed() {
        let c = Completion::new(Operation::AsyncWait, 0, noop_cb);
        c.mark_woken();
        c.mark_woken();
        c.mark_woken();
        assert!(c.take_woken());
        assert!(!c.take_woken());
    }
}
