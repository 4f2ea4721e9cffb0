//! A callback-driven event loop multiplexing fd readiness, absolute-time
//! timers, and cross-thread async wakeups over a single `poll_oneoff`-style
//! host primitive.
//!
//! # Ownership and lifetimes
//!
//! The loop never allocates a [`Completion`]; callers own them and the
//! loop only ever links/unlinks them by address. Because a completion
//! must survive across tick boundaries — in the timer heap, the batch,
//! or an async waiter list — the public API requires `&'static
//! Completion`. In practice, store completions in `static`s or leak a
//! `Box<Completion>`; see the tests in `reactor-tests` for both
//! patterns.
//!
//! # Threading
//!
//! A [`Loop`] runs entirely on one thread (see the safety notes on
//! [`Completion`]). The one cross-thread operation, waking a loop from
//! elsewhere, goes through [`LoopNotifier`] rather than `&Loop` itself.

pub mod async_wait;
pub mod batch;
pub mod buffer;
pub mod completion;
pub mod error;
pub mod event_loop;
pub mod fifo;
pub mod operation;
pub mod result;
pub mod timer_heap;

pub use batch::{Batch, DEFAULT_CAPACITY};
pub use buffer::{ReadBuffer, WriteBuffer, INLINE_CAPACITY};
pub use completion::{CallbackAction, Callback, Completion, CompletionState};
pub use error::{CancelError, InitError, IoError, LoopError, SyncOpError, TimerTrigger};
pub use event_loop::{InitOptions, Loop, LoopNotifier, RunMode};
pub use operation::{Operation, OperationKind};
pub use result::{IoResult, OpResult};

pub use reactor_sys::{Errno, Host, PosixHost, RawFd, ShutdownHow};
