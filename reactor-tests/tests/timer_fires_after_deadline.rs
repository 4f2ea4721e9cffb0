use reactor_core::{CallbackAction, Completion, InitOptions, Loop, Operation, OpResult, RunMode, TimerTrigger};
use reactor_tests::{leak, leak_user_data, user_data_as, Flag};

fn on_timer(user_data: usize, _lp: &mut Loop, _c: &Completion, result: OpResult) -> CallbackAction {
    let OpResult::Timer(trigger) = result else {
        panic!("expected a Timer result");
    };
    assert_eq!(trigger, TimerTrigger::Expiration);
    // SAFETY: this test leaked a `Flag` and handed its address as user_data.
    unsafe { user_data_as::<Flag>(user_data) }.set(true);
    CallbackAction::Disarm
}

#[test]
fn timer_fires_after_deadline() {
    let mut lp = Loop::init(InitOptions::default()).unwrap();
    let fired = leak_user_data(Flag::new(false));

    let completion = leak(Completion::new(Operation::Timer { deadline_ns: 0 }, 0, on_timer));
    // SAFETY: `completion` is freshly constructed and still Dead.
    unsafe { lp.timer(completion, 10, fired, on_timer) };

    lp.run(RunMode::UntilDone).unwrap();

    assert!(unsafe { user_data_as::<Flag>(fired) }.get());
    assert!(lp.done());
}
