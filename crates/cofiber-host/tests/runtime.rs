//! Integration tests for the `Runtime` embedding facade (spec §6):
//! drives it the way a host actually would, through `handle_inbound`,
//! with a `RecordingSink` and a `VirtualTimer` standing in for the real
//! transport and clock.

use std::rc::Rc;

use cofiber_abi::{DebuggerSubtype, InboundMessage, ObjectId, OutboundMessage, RunMessage, RunState, Value};
use cofiber_host::Runtime;
use cofiber_runtime::{leave, Interp, LabelFn, ProgramImage, RecordingSink, RuntimeConfig, VirtualTimer};

struct EchoProgram;

impl ProgramImage for EchoProgram {
    fn entry_point(&self) -> LabelFn {
        Rc::new(|interp, frame| {
            let pc = frame.borrow().pc;
            if pc == 0 {
                frame.borrow_mut().pc = 1;
                let handle = interp.handle();
                Interp::check_breakpoint(&handle, &frame, 0, 1, vec![])
            } else {
                Ok(leave(&frame, Value::Int(1)))
            }
        })
    }
    fn resolve_action(&self, _action: ObjectId) -> Option<LabelFn> {
        None
    }
    fn ref_counting(&self) -> bool {
        false
    }
    fn breakpoint_count(&self) -> usize {
        1
    }
}

#[test]
fn run_posts_running_status_and_executes_the_entry_point() {
    let timer = Rc::new(VirtualTimer::new());
    let sink = Rc::new(RecordingSink::new());
    let runtime = Runtime::new(
        "r1",
        Rc::new(EchoProgram),
        sink.clone(),
        timer,
        RuntimeConfig::default(),
    );

    runtime.handle_inbound(InboundMessage::Run(RunMessage {
        id: "r1".into(),
        code: String::new(),
        ref_counting_debug: false,
    }));

    let posted = sink.take();
    assert!(posted.iter().any(|m| matches!(
        m,
        OutboundMessage::Status { state: RunState::Running, .. }
    )));
}

#[test]
fn pause_then_resume_round_trips_through_handle_inbound() {
    let timer = Rc::new(VirtualTimer::new());
    let sink = Rc::new(RecordingSink::new());
    let runtime = Runtime::new(
        "r2",
        Rc::new(EchoProgram),
        sink.clone(),
        timer,
        RuntimeConfig::default(),
    );

    runtime.handle_inbound(InboundMessage::Debugger(DebuggerSubtype::Pause));
    runtime.handle_inbound(InboundMessage::Run(RunMessage {
        id: "r2".into(),
        code: String::new(),
        ref_counting_debug: false,
    }));

    let posted = sink.take();
    assert!(
        posted.iter().any(|m| matches!(m, OutboundMessage::Breakpoint(_))),
        "pausing before run should stop at the entry point's first breakpoint"
    );

    runtime.handle_inbound(InboundMessage::Debugger(DebuggerSubtype::Resume));
}

#[test]
fn kill_posts_killed_status_and_is_terminal() {
    let timer = Rc::new(VirtualTimer::new());
    let sink = Rc::new(RecordingSink::new());
    let runtime = Runtime::new(
        "r3",
        Rc::new(EchoProgram),
        sink.clone(),
        timer,
        RuntimeConfig::default(),
    );

    runtime.kill();
    let posted = sink.take();
    assert!(posted
        .iter()
        .any(|m| matches!(m, OutboundMessage::Status { state: RunState::Killed, .. })));

    // A run issued after kill must not execute the entry point again,
    // nor report a fresh "running" status for a runtime that's dead.
    runtime.handle_inbound(InboundMessage::Run(RunMessage {
        id: "r3".into(),
        code: String::new(),
        ref_counting_debug: false,
    }));
    let posted_after_kill = sink.take();
    assert!(
        !posted_after_kill.iter().any(|m| matches!(m, OutboundMessage::Status { .. })),
        "a dead runtime must not post a running status on a subsequent run message"
    );
}
