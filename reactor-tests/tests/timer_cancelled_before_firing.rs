use reactor_core::{CallbackAction, Completion, InitOptions, Loop, Operation, OpResult, RunMode, TimerTrigger};
use reactor_tests::{leak, leak_user_data, user_data_as, Flag};

fn on_timer(user_data: usize, _lp: &mut Loop, _c: &Completion, result: OpResult) -> CallbackAction {
    let OpResult::Timer(trigger) = result else {
        panic!("expected a Timer result");
    };
    let flag = unsafe { user_data_as::<Flag>(user_data) };
    match trigger {
        TimerTrigger::Expiration => panic!("a cancelled timer must not report Expiration"),
        TimerTrigger::Cancel => flag.set(true),
    }
    CallbackAction::Disarm
}

fn on_cancel(_user_data: usize, _lp: &mut Loop, _c: &Completion, result: OpResult) -> CallbackAction {
    assert!(matches!(result, OpResult::Cancel(Ok(()))));
    CallbackAction::Disarm
}

#[test]
fn timer_cancelled_before_firing_reports_cancel_not_expiration() {
    let mut lp = Loop::init(InitOptions::default()).unwrap();
    let cancelled = leak_user_data(Flag::new(false));

    let timer = leak(Completion::new(Operation::Timer { deadline_ns: 0 }, 0, on_timer));
    // Far enough out that the cancel below always wins the race.
    unsafe { lp.timer(timer, 60_000, cancelled, on_timer) };

    let cancel = leak(Completion::new(Operation::Cancel { target: timer }, 0, on_cancel));
    lp.add(cancel);

    lp.run(RunMode::NoWait).unwrap();

    assert!(unsafe { user_data_as::<Flag>(cancelled) }.get());
    assert!(lp.done());
}
