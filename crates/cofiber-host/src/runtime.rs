//! Public embedding facade. Wraps an `Interp` with the host-facing
//! vocabulary the "run"/"debugger"/"custom" message protocol expects
//! (spec §6), so an embedder never has to reach into `cofiber-runtime`
//! directly.

use std::rc::Rc;

use cofiber_abi::{DebuggerSubtype, InboundMessage, OutboundMessage, RunState};
use cofiber_runtime::{
    Interp, InterpHandle, PostMessageSink, ProgramImage, RuntimeConfig, TimerSource,
};

pub struct Runtime {
    handle: InterpHandle,
    runtime_id: String,
}

impl Runtime {
    pub fn new(
        runtime_id: impl Into<String>,
        program: Rc<dyn ProgramImage>,
        sink: Rc<dyn PostMessageSink>,
        timer: Rc<dyn TimerSource>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            handle: Interp::new_handle_with(config, program, sink, timer),
            runtime_id: runtime_id.into(),
        }
    }

    pub fn handle(&self) -> InterpHandle {
        self.handle.clone()
    }

    /// Start the program's entry point as a fresh top-level call, and
    /// post the initial `running` status (spec §6). A no-op once the
    /// runtime has been killed (spec §8 "Dead safety") — a dead runtime
    /// must never report itself as running again.
    pub fn run(&self) {
        if self.handle.borrow().dead {
            return;
        }
        cofiber_runtime::setup_top(self.handle.clone());
        self.handle.borrow().post(OutboundMessage::Status {
            runtimeid: self.runtime_id.clone(),
            state: RunState::Running,
        });
    }

    /// Tear the runtime down for good (spec §8 "dead runtime is
    /// terminal"). Posts the final `killed` status.
    pub fn kill(&self) {
        Interp::kill(&self.handle);
        self.handle.borrow().post(OutboundMessage::Status {
            runtimeid: self.runtime_id.clone(),
            state: RunState::Killed,
        });
    }

    /// Dispatch one inbound message (spec §6). `Custom` payloads are
    /// not interpreted here — an embedder wires its own hook for those
    /// ahead of calling this, since the runtime has no opinion on their
    /// shape.
    pub fn handle_inbound(&self, msg: InboundMessage) {
        match msg {
            InboundMessage::Run(_run) => self.run(),
            InboundMessage::Debugger(sub) => self.handle_debugger(sub),
            InboundMessage::Custom(_) => {
                log::debug!("custom message received with no registered handler");
            }
        }
    }

    fn handle_debugger(&self, sub: DebuggerSubtype) {
        match sub {
            DebuggerSubtype::Config { set_breakpoints } => {
                self.handle.borrow_mut().debugger.set_breakpoints(set_breakpoints);
            }
            DebuggerSubtype::TraceConfig { interval } => {
                self.handle.borrow_mut().debugger.set_trace(Some(interval));
            }
            DebuggerSubtype::Pause => {
                self.handle.borrow_mut().debugger.pause();
            }
            DebuggerSubtype::Resume => {
                self.handle.borrow_mut().debugger.resume();
                Interp::continue_paused(self.handle.clone());
            }
            DebuggerSubtype::Stepover => self.step(cofiber_runtime::StepMode::Over),
            DebuggerSubtype::Stepinto => self.step(cofiber_runtime::StepMode::Into),
            DebuggerSubtype::Stepout => self.step(cofiber_runtime::StepMode::Out),
            DebuggerSubtype::Variables { variables_reference, seq } => {
                let msg = cofiber_runtime::debugger::variables_response(
                    &self.handle.borrow().heap_snapshot,
                    variables_reference,
                    seq,
                );
                self.handle.borrow().post(msg);
            }
        }
    }

    fn step(&self, mode: cofiber_runtime::StepMode) {
        let Some(frame) = self.handle.borrow().paused_frame() else {
            return;
        };
        let depth = frame.borrow().depth;
        {
            let mut interp = self.handle.borrow_mut();
            match mode {
                cofiber_runtime::StepMode::Over => interp.debugger.step_over(depth, &frame),
                cofiber_runtime::StepMode::Into => interp.debugger.step_into(depth, &frame),
                cofiber_runtime::StepMode::Out => interp.debugger.step_out(depth, &frame),
            }
        }
        Interp::continue_paused(self.handle.clone());
    }
}
