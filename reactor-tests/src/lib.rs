//! Shared helpers for `reactor-core` integration tests: leaking completions
//! to the `'static` lifetime the public API requires, and a couple of
//! small POSIX fd helpers for exercising real I/O.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use reactor_core::Completion;
use reactor_sys::RawFd;

/// Leak a completion to `'static`, the storage contract
/// `reactor_core::Loop` requires (see the crate-level docs on
/// `reactor_core`). Tests don't care about reclaiming the memory.
pub fn leak(completion: Completion) -> &'static Completion {
    Box::leak(Box::new(completion))
}

/// Leak an arbitrary value to `'static` and hand back its address as the
/// opaque `user_data` word a callback receives — the loop never
/// interprets this value, so tests use it as a typed context pointer,
/// the same pattern any real caller would use for callback state that
/// isn't just a completion's own identity.
pub fn leak_user_data<T>(value: T) -> usize {
    Box::leak(Box::new(value)) as *const T as usize
}

/// Recover a `&'static T` previously produced by [`leak_user_data`].
///
/// # Safety
/// `user_data` must have come from `leak_user_data::<T>`.
pub unsafe fn user_data_as<T>(user_data: usize) -> &'static T {
    unsafe { &*(user_data as *const T) }
}

/// A one-shot flag usable as callback-reachable test state via
/// [`leak_user_data`]/[`user_data_as`].
pub type Flag = Cell<bool>;

/// A small counter usable the same way, for tests that need to record an
/// order of events rather than a single boolean.
pub type Counter = AtomicUsize;

pub fn next_order(counter: &Counter) -> usize {
    counter.fetch_add(1, Ordering::SeqCst)
}

/// Create a connected pipe, returning `(read_fd, write_fd)`.
pub fn pipe_pair() -> (RawFd, RawFd) {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: `fds` is a valid two-element out-array for `pipe(2)`.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(rc, 0, "pipe() failed: {}", std::io::Error::last_os_error());
    (fds[0], fds[1])
}
