use reactor_core::{Batch, CallbackAction, Completion, IoError, Loop, Operation, OpResult, ReadBuffer};
use reactor_tests::{leak, pipe_pair};

fn noop_read(_user_data: usize, _lp: &mut Loop, _c: &Completion, _result: OpResult) -> CallbackAction {
    CallbackAction::Disarm
}

/// A batch of capacity 2 has room for exactly one fd-readiness completion
/// (slot 0 is the reserved clock slot) — reserving a second must fail
/// with `BatchFull` rather than grow, block, or panic.
///
/// Exercised directly against `Batch` rather than through a full `Loop`
/// tick: `Loop`'s own batch capacity is a fixed compile-time constant, so
/// driving it to capacity end-to-end would mean opening `DEFAULT_CAPACITY`
/// real file descriptors. `Batch::get`'s contract is exactly the same
/// either way.
#[test]
fn batch_full_error_is_reported_through_the_io_error_type() {
    let mut batch: Batch<2> = Batch::new();
    let (r1, _w1) = pipe_pair();
    let (r2, _w2) = pipe_pair();
    let a = leak(Completion::new(
        Operation::Read {
            fd: r1,
            buffer: ReadBuffer::Inline([0u8; 32]),
        },
        0,
        noop_read,
    ));
    let b = leak(Completion::new(
        Operation::Read {
            fd: r2,
            buffer: ReadBuffer::Inline([0u8; 32]),
        },
        0,
        noop_read,
    ));
    let sub_a = reactor_sys::Subscription {
        userdata: a as *const Completion as usize,
        kind: reactor_sys::SubscriptionKind::FdRead { fd: r1 },
    };
    let sub_b = reactor_sys::Subscription {
        userdata: b as *const Completion as usize,
        kind: reactor_sys::SubscriptionKind::FdRead { fd: r2 },
    };
    batch.get(a, sub_a).unwrap();
    let err = batch.get(b, sub_b).unwrap_err();
    assert_eq!(err, IoError::BatchFull);
}
