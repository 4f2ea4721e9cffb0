use std::cell::Cell;

use reactor_core::{CallbackAction, Completion, InitOptions, IoError, Loop, Operation, OpResult, ReadBuffer, RunMode, WriteBuffer};
use reactor_sys::Host;
use reactor_tests::{leak, leak_user_data, pipe_pair, user_data_as};

fn on_write(_user_data: usize, _lp: &mut Loop, _c: &Completion, result: OpResult) -> CallbackAction {
    let OpResult::Write(written) = result else {
        panic!("expected a Write result");
    };
    assert_eq!(written.unwrap(), 5);
    CallbackAction::Disarm
}

fn on_read_data(user_data: usize, _lp: &mut Loop, _c: &Completion, result: OpResult) -> CallbackAction {
    let OpResult::Read(outcome) = result else {
        panic!("expected a Read result");
    };
    assert_eq!(outcome.unwrap(), 5);
    unsafe { user_data_as::<Cell<bool>>(user_data) }.set(true);
    CallbackAction::Disarm
}

fn on_read_eof(user_data: usize, _lp: &mut Loop, _c: &Completion, result: OpResult) -> CallbackAction {
    let OpResult::Read(outcome) = result else {
        panic!("expected a Read result");
    };
    assert!(matches!(outcome, Err(IoError::Eof)));
    unsafe { user_data_as::<Cell<bool>>(user_data) }.set(true);
    CallbackAction::Disarm
}

#[test]
fn file_io_round_trip_and_eof() {
    let mut lp = Loop::init(InitOptions::default()).unwrap();
    let (r, w) = pipe_pair();

    let write_completion = leak(Completion::new(
        Operation::Write {
            fd: w,
            buffer: WriteBuffer::inline(b"hello"),
        },
        0,
        on_write,
    ));
    lp.add(write_completion);

    let read_saw_data = leak_user_data(Cell::new(false));
    let read_completion = leak(Completion::new(
        Operation::Read {
            fd: r,
            buffer: ReadBuffer::Inline([0u8; 32]),
        },
        read_saw_data,
        on_read_data,
    ));
    lp.add(read_completion);

    lp.run(RunMode::UntilDone).unwrap();
    assert!(unsafe { user_data_as::<Cell<bool>>(read_saw_data) }.get());

    // Closing the write end is what turns the next read into EOF rather
    // than another blocking wait.
    reactor_sys::PosixHost::new().close(w).unwrap();

    let read_saw_eof = leak_user_data(Cell::new(false));
    let eof_completion = leak(Completion::new(
        Operation::Read {
            fd: r,
            buffer: ReadBuffer::Inline([0u8; 32]),
        },
        read_saw_eof,
        on_read_eof,
    ));
    lp.add(eof_completion);
    lp.run(RunMode::UntilDone).unwrap();

    assert!(unsafe { user_data_as::<Cell<bool>>(read_saw_eof) }.get());
    reactor_sys::PosixHost::new().close(r).unwrap();
}
