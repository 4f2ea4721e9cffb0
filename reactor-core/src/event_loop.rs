//! [`Loop`] — the event loop itself.
//!
//! `tick` is the one place every other module in this crate comes
//! together: it drains submissions into the right subsystem (batch,
//! timer heap, or async waiter list), advances the clock, demultiplexes
//! one `poll_oneoff` call's worth of readiness back to completions, and
//! invokes callbacks. Everything here runs on a single thread — see the
//! module docs on [`Completion`] for the one exception.

use std::sync::Arc;

use log::{debug, trace};
use reactor_sys::{Host, PosixHost, Subscription, SubscriptionKind};

use crate::async_wait::AsyncFlag;
use crate::batch::{Batch, DEFAULT_CAPACITY};
use crate::completion::{CallbackAction, Callback, Completion, CompletionState};
use crate::error::{CancelError, InitError, IoError, LoopError, SyncOpError, TimerTrigger};
use crate::fifo::Fifo;
use crate::operation::{Operation, OperationKind, SubscriptionDirection};
use crate::result::OpResult;
use crate::timer_heap::TimerHeap;

/// How long [`Loop::run`] keeps ticking ("run convenience
/// wrapper over repeated tick calls").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// One tick, draining whatever is already ready, never blocking.
    NoWait,
    /// One tick, blocking until at least one completion finishes.
    Once,
    /// Tick repeatedly until [`Loop::done`] is true.
    UntilDone,
}

/// Construction-time options for [`Loop::init`]. Currently empty — the
/// batch capacity is [`DEFAULT_CAPACITY`], a compile-time constant
/// ("fixed capacity N (1024)"), not something a caller picks
/// per loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct InitOptions {
    _private: (),
}

/// Handle used to wake a loop from another thread. The loop-wide flag
/// must be reachable without touching the rest of the loop's state.
///
/// `Loop` itself is not `Send`/`Sync` — most of its fields are bare
/// `Cell`s and raw intrusive pointers, sound only because single-thread
/// ownership restricts them to the owning thread. The wakeup path is the
/// one thing that must cross threads, so it lives in its own small,
/// independently-owned, genuinely `Sync` handle instead of being a
/// method callable through `&Loop`.
#[derive(Clone)]
pub struct LoopNotifier {
    flag: Arc<AsyncFlag>,
}

impl LoopNotifier {
    /// Wake the loop for `completion` (`async_notify`): set
    /// the per-waiter flag so the loop knows which waiter to retire, then
    /// the loop-wide flag so a blocked `poll_oneoff` call returns
    /// promptly. Safe to call from any thread, any number of times.
    pub fn notify(&self, completion: &Completion) {
        completion.mark_woken();
        self.flag.raise();
    }
}

/// The event loop.
///
/// Holds its host as `Box<dyn Host>` rather than a type parameter —
/// [`Completion`]'s callback signature carries a `&mut Loop`, and a
/// completion outlives any particular `start`/`tick` call, so `Loop`
/// cannot be generic over the host without infecting every completion's
/// type with it too. `Operation::perform` already takes `&dyn Host` for
/// the same reason; this just carries that choice one level up. Tests
/// that need a fake host construct a `Loop` via [`Loop::with_host`].
pub struct Loop {
    host: Box<dyn Host>,
    /// Number of completions currently owned by the loop: in the batch,
    /// in the timer heap, or on the async waiter list. Drives
    /// [`Loop::done`] ("done iff active == 0 and the
    /// submission queue is empty").
    active: usize,
    submissions: Fifo,
    async_waiters: Fifo,
    timers: TimerHeap,
    batch: Batch<DEFAULT_CAPACITY>,
    async_flag: Arc<AsyncFlag>,
}

impl Loop {
    /// Construct a loop against the real POSIX host.
    pub fn init(_options: InitOptions) -> Result<Self, InitError> {
        Ok(Self::with_host(PosixHost::new()))
    }

    /// Construct a loop against an arbitrary host — the seam tests use to
    /// substitute a fake `Host` (the host surface is an
    /// interface, not a fixed implementation).
    pub fn with_host<H: Host + 'static>(host: H) -> Self {
        Self {
            host: Box::new(host),
            active: 0,
            submissions: Fifo::new(),
            async_waiters: Fifo::new(),
            timers: TimerHeap::new(),
            batch: Batch::new(),
            async_flag: Arc::new(AsyncFlag::new()),
        }
    }

    /// A cross-thread-safe handle for waking this loop (`async_notify`).
    /// See [`LoopNotifier`].
    pub fn notifier(&self) -> LoopNotifier {
        LoopNotifier {
            flag: Arc::clone(&self.async_flag),
        }
    }

    /// True once there is nothing left to process: no active completions
    /// and nothing freshly submitted.
    pub fn done(&self) -> bool {
        self.active == 0 && self.submissions.is_empty()
    }

    /// Submit a completion. The completion's operation must already be
    /// configured; `add` only transitions its state and queues it for
    /// processing on the next tick.
    pub fn add(&mut self, completion: &'static Completion) {
        debug!("add: {:?}", completion.operation_kind());
        completion.state.set(CompletionState::Adding);
        self.submissions.push_back(completion);
    }

    /// Convenience initializer: reconfigure `completion` as a `Timer` due
    /// `next_ms` from now, with the given user data and callback, and
    /// submit it in one call.
    ///
    /// # Safety
    /// `completion` must currently be `Dead` — reusing a completion the
    /// loop still owns is undefined behavior (see
    /// [`Completion::reconfigure`]).
    pub unsafe fn timer(&mut self, completion: &'static Completion, next_ms: u64, user_data: usize, callback: Callback) {
        let deadline_ns = self.host.monotonic_now_ns().saturating_add(next_ms.saturating_mul(1_000_000));
        // SAFETY: forwarded from this method's own safety contract.
        unsafe {
            completion.reconfigure(Operation::Timer { deadline_ns }, user_data, callback);
        }
        self.add(completion);
    }

    /// Wake `completion` from the same thread the loop runs on. Kept as
    /// an instance method for same-thread convenience; code actually
    /// crossing threads should use [`Loop::notifier`] instead, since
    /// `&Loop` itself cannot soundly be handed to another thread.
    pub fn async_notify(&self, completion: &Completion) {
        self.notifier().notify(completion);
    }

    /// Cancel a pending completion. Only timer cancellation is
    /// implemented — batch-resident and async-waiter completions are left
    /// as a documented limitation.
    fn start_cancel(&mut self, cancel: &'static Completion) -> Result<(), CancelError> {
        let target = match cancel.operation_ref() {
            Operation::Cancel { target } => *target,
            _ => unreachable!("start_cancel only called for Operation::Cancel"),
        };
        if target.operation_kind() == OperationKind::Cancel {
            return Err(CancelError::InvalidOp);
        }
        match target.state() {
            CompletionState::Active if target.operation_kind() == OperationKind::Timer => {
                target.state.set(CompletionState::Deleting);
                if self.timers.remove(target) {
                    self.active -= 1;
                    target.state.set(CompletionState::Dead);
                    let action = (target.callback())(target.user_data(), self, target, OpResult::Timer(TimerTrigger::Cancel));
                    if action == CallbackAction::Rearm {
                        self.start(target);
                    }
                }
            }
            CompletionState::Adding => {
                // `target` may still be sitting in `self.submissions`, or
                // it may already have been moved into this tick's local
                // drained copy (tick() takes the whole FIFO before
                // draining it) — either way list surgery can't reach it
                // reliably. Flip its state instead: the drain loop only
                // starts a completion it still observes as `Adding`, so
                // this alone removes it from the pending queue logic.
                target.state.set(CompletionState::Dead);
                if target.operation_kind() == OperationKind::Timer {
                    let action = (target.callback())(target.user_data(), self, target, OpResult::Timer(TimerTrigger::Cancel));
                    if action == CallbackAction::Rearm {
                        self.start(target);
                    }
                }
            }
            _ => {
                // Already dead, in progress, or a kind cancellation does
                // not reach into (batch-resident fd waits, async waiters) —
                // leaves this a no-op rather than an error.
            }
        }
        Ok(())
    }

    /// Route a freshly-submitted completion to the subsystem that owns
    /// its kind (`start`).
    fn start(&mut self, completion: &'static Completion) {
        match completion.operation_kind() {
            OperationKind::Cancel => {
                let result = self.start_cancel(completion);
                completion.state.set(CompletionState::Dead);
                let action = (completion.callback())(completion.user_data(), self, completion, OpResult::Cancel(result));
                if action == CallbackAction::Rearm {
                    // Synchronous-completion rearm: defer to next tick via
                    // `add` rather than re-entering `start` now, bounding
                    // recursion (a callback that always rearms would
                    // otherwise recurse without limit).
                    self.add(completion);
                }
            }
            OperationKind::Shutdown => {
                let result = self.run_sync_shutdown(completion);
                completion.state.set(CompletionState::Dead);
                let action = (completion.callback())(completion.user_data(), self, completion, OpResult::Shutdown(result));
                if action == CallbackAction::Rearm {
                    self.add(completion);
                }
            }
            OperationKind::Close => {
                let result = self.run_sync_close(completion);
                completion.state.set(CompletionState::Dead);
                let action = (completion.callback())(completion.user_data(), self, completion, OpResult::Close(result));
                if action == CallbackAction::Rearm {
                    self.add(completion);
                }
            }
            OperationKind::Timer => {
                self.timers.insert(completion);
                completion.state.set(CompletionState::Active);
                self.active += 1;
            }
            OperationKind::AsyncWait => {
                self.async_waiters.push_back(completion);
                completion.state.set(CompletionState::Active);
                self.active += 1;
            }
            OperationKind::Accept | OperationKind::Read | OperationKind::Recv => {
                self.start_io(completion, SubscriptionDirection::Read);
            }
            OperationKind::Write | OperationKind::Send => {
                self.start_io(completion, SubscriptionDirection::Write);
            }
        }
    }

    fn run_sync_shutdown(&self, completion: &Completion) -> Result<(), SyncOpError> {
        match completion.operation_ref() {
            Operation::Shutdown { fd, how } => self.host.sock_shutdown(*fd, *how).map_err(SyncOpError::from),
            _ => unreachable!("run_sync_shutdown only called for Operation::Shutdown"),
        }
    }

    fn run_sync_close(&self, completion: &Completion) -> Result<(), SyncOpError> {
        match completion.operation_ref() {
            Operation::Close { fd } => self.host.close(*fd).map_err(SyncOpError::from),
            _ => unreachable!("run_sync_close only called for Operation::Close"),
        }
    }

    /// Reserve a batch slot for an fd-readiness completion, completing it
    /// immediately with `BatchFull` if the batch has no room.
    fn start_io(&mut self, completion: &'static Completion, direction: SubscriptionDirection) {
        let (fd, _) = completion
            .operation_ref()
            .subscription_fd()
            .expect("start_io only called for fd-bearing operations");
        let kind = match direction {
            SubscriptionDirection::Read => SubscriptionKind::FdRead { fd },
            SubscriptionDirection::Write => SubscriptionKind::FdWrite { fd },
        };
        let subscription = Subscription {
            userdata: completion as *const Completion as usize,
            kind,
        };
        match self.batch.get(completion, subscription) {
            Ok(_) => {
                completion.state.set(CompletionState::Active);
                self.active += 1;
            }
            Err(err) => {
                completion.state.set(CompletionState::Dead);
                let result = match completion.operation_kind() {
                    OperationKind::Accept => OpResult::Accept(Err(err)),
                    OperationKind::Read => OpResult::Read(Err(err)),
                    OperationKind::Recv => OpResult::Recv(Err(err)),
                    OperationKind::Write => OpResult::Write(Err(err)),
                    OperationKind::Send => OpResult::Send(Err(err)),
                    _ => unreachable!(),
                };
                let action = (completion.callback())(completion.user_data(), self, completion, result);
                if action == CallbackAction::Rearm {
                    // Same-tick re-`start` would just hit `BatchFull`
                    // again; defer to next tick via `add` instead.
                    self.add(completion);
                }
            }
        }
    }

    /// Perform the blocking completion for an fd-readiness operation once
    /// `poll_oneoff` has reported it ready, and build the matching
    /// [`OpResult`].
    fn complete_io(&mut self, completion: &'static Completion, event_error: Option<reactor_sys::Errno>) -> OpResult {
        let kind = completion.operation_kind();
        if let Some(errno) = event_error {
            let err = IoError::from(errno);
            return match kind {
                OperationKind::Accept => OpResult::Accept(Err(err)),
                OperationKind::Read => OpResult::Read(Err(err)),
                OperationKind::Recv => OpResult::Recv(Err(err)),
                OperationKind::Write => OpResult::Write(Err(err)),
                OperationKind::Send => OpResult::Send(Err(err)),
                _ => unreachable!("only fd-readiness operations reach complete_io"),
            };
        }
        // SAFETY: completion is unlinked from the batch by the caller
        // before this runs, and the loop is single-threaded.
        let op = unsafe { completion.operation_mut() };
        match kind {
            OperationKind::Accept => OpResult::Accept(op.perform(&self.host).map(|v| v as reactor_sys::RawFd)),
            OperationKind::Read => OpResult::Read(op.perform(&self.host)),
            OperationKind::Recv => OpResult::Recv(op.perform(&self.host)),
            OperationKind::Write => OpResult::Write(op.perform(&self.host)),
            OperationKind::Send => OpResult::Send(op.perform(&self.host)),
            _ => unreachable!("only fd-readiness operations reach complete_io"),
        }
    }

    /// Advance the loop once: drain submissions, fire
    /// expired timers, service woken async waiters, then make one
    /// `poll_oneoff` call bounded by the nearest timer deadline and
    /// dispatch whatever it reports. `wait` is the minimum number of
    /// completions to process before returning; `0` means "process
    /// whatever is already ready and return without blocking".
    pub fn tick(&mut self, wait: u32) -> Result<(), LoopError> {
        let mut drained = self.submissions.take();
        while let Some(completion) = drained.pop_front() {
            if completion.state() == CompletionState::Adding {
                self.start(completion);
            }
        }

        if self.active == 0 {
            return Ok(());
        }

        let mut wait_remaining = wait;
        loop {
            if self.active == 0 {
                break;
            }
            if wait != 0 && wait_remaining == 0 {
                break;
            }

            let now = self.host.monotonic_now_ns();

            while let Some(deadline) = self.timers.peek_min_deadline() {
                if deadline > now {
                    break;
                }
                let completion = self.timers.delete_min().expect("peeked Some above");
                completion.state.set(CompletionState::Dead);
                self.active -= 1;
                wait_remaining = wait_remaining.saturating_sub(1);
                let action = (completion.callback())(completion.user_data(), self, completion, OpResult::Timer(TimerTrigger::Expiration));
                if action == CallbackAction::Rearm {
                    self.start(completion);
                }
            }

            if !self.async_waiters.is_empty() && self.async_flag.take() {
                let mut pending = self.async_waiters.take();
                while let Some(waiter) = pending.pop_front() {
                    if waiter.take_woken() {
                        waiter.state.set(CompletionState::Dead);
                        self.active -= 1;
                        let action = (waiter.callback())(waiter.user_data(), self, waiter, OpResult::AsyncWait(Ok(())));
                        if action == CallbackAction::Rearm {
                            self.start(waiter);
                        }
                    } else {
                        self.async_waiters.push_back(waiter);
                    }
                }
            }

            if self.active == 0 {
                break;
            }

            let clock_deadline = self.timers.peek_min_deadline().unwrap_or(now);
            self.batch.set_clock_slot(clock_deadline);

            let mut events = self.batch.blank_events();
            trace!("poll_oneoff: {} subscriptions", self.batch.len());
            let n = self
                .host
                .poll_oneoff(self.batch.subscriptions(), &mut events)
                .map_err(LoopError::Poll)?;

            let mut dispatched = 0u32;
            for event in &events[..n] {
                if event.userdata == 0 {
                    continue;
                }
                let completion = match self.batch.completion_for_userdata(event.userdata) {
                    Some(c) => c,
                    None => continue,
                };
                completion.state.set(CompletionState::Dead);
                self.batch.put(completion);
                self.active -= 1;
                dispatched += 1;
                let result = self.complete_io(completion, event.error);
                let action = (completion.callback())(completion.user_data(), self, completion, result);
                if action == CallbackAction::Rearm {
                    self.start(completion);
                }
            }

            if wait == 0 {
                break;
            }
            wait_remaining = wait_remaining.saturating_sub(dispatched);
        }
        Ok(())
    }

    /// Run the loop according to `mode`.
    pub fn run(&mut self, mode: RunMode) -> Result<(), LoopError> {
        match mode {
            RunMode::NoWait => self.tick(0),
            RunMode::Once => self.tick(1),
            RunMode::UntilDone => {
                while !self.done() {
                    self.tick(1)?;
                }
                Ok(())
            }
        }
    }
}
