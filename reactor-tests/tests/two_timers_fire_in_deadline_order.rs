use std::sync::atomic::AtomicUsize;

use reactor_core::{CallbackAction, Completion, InitOptions, Loop, Operation, OpResult, RunMode};
use reactor_tests::{leak, leak_user_data, next_order, user_data_as, Counter};

struct Slot {
    order: &'static Counter,
    recorded: AtomicUsize,
}

fn on_timer(user_data: usize, _lp: &mut Loop, _c: &Completion, result: OpResult) -> CallbackAction {
    assert!(matches!(result, OpResult::Timer(_)));
    // SAFETY: this test leaked a `Slot` and handed its address as user_data.
    let slot = unsafe { user_data_as::<Slot>(user_data) };
    let position = next_order(slot.order);
    slot.recorded.store(position, std::sync::atomic::Ordering::SeqCst);
    CallbackAction::Disarm
}

#[test]
fn two_timers_fire_in_deadline_order() {
    let mut lp = Loop::init(InitOptions::default()).unwrap();
    let order: &'static Counter = Box::leak(Box::new(Counter::new(0)));

    let slow = leak_user_data(Slot {
        order,
        recorded: AtomicUsize::new(usize::MAX),
    });
    let fast = leak_user_data(Slot {
        order,
        recorded: AtomicUsize::new(usize::MAX),
    });

    let c_slow = leak(Completion::new(Operation::Timer { deadline_ns: 0 }, 0, on_timer));
    let c_fast = leak(Completion::new(Operation::Timer { deadline_ns: 0 }, 0, on_timer));

    // Submitted slow-first, scheduled to fire after the fast one — the
    // dispatch order must follow deadlines, not submission order.
    unsafe { lp.timer(c_slow, 50, slow, on_timer) };
    unsafe { lp.timer(c_fast, 5, fast, on_timer) };

    lp.run(RunMode::UntilDone).unwrap();

    let slow_pos = unsafe { user_data_as::<Slot>(slow) }.recorded.load(std::sync::atomic::Ordering::SeqCst);
    let fast_pos = unsafe { user_data_as::<Slot>(fast) }.recorded.load(std::sync::atomic::Ordering::SeqCst);
    assert!(fast_pos < slow_pos, "nearer deadline must fire first");
}
