//! The frame-threaded interpreter loop (spec §4.1) and the `Interp`
//! state it threads through every step.
//!
//! `Interp` plays the role the teacher's `Vm` plays for its bytecode
//! loop: one mutable object carrying everything a running fiber can
//! touch. The difference is ownership — the teacher's `Vm` is driven
//! synchronously start-to-finish, but a cofiber `Interp` can park
//! mid-program and be re-entered later from a timer callback or a
//! native extension's resume function, so it lives behind
//! `Rc<RefCell<_>>` and keeps a weak handle to itself for closures that
//! need to hand a live reference back in.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use cofiber_abi::{DebugInfo, Value};
use cofiber_heap::{HeapSnapshot, LiveObjectTable, NativeExtensionRegistry};

use crate::config::RuntimeConfig;
use crate::debugger::Debugger;
use crate::error::RuntimeError;
use crate::event_queue::EventQueues;
use crate::frame::FrameRef;
use crate::program::{NullProgram, ProgramImage};
use crate::resume::ResumeSite;
use crate::sink::{NullSink, PostMessageSink};
use crate::timers::TimerSource;

/// Shared handle to a running interpreter. Cloned into every resume
/// continuation and timer callback that needs to re-enter the loop.
pub type InterpHandle = Rc<RefCell<Interp>>;

/// Sentinel held while the loop is about to re-enter imminently
/// (spec §3 "Loop lock"). Its only job is to exist: `Some(_)` means
/// "don't re-enter synchronously, defer onto the wait list instead."
pub struct LoopLock;

impl LoopLock {
    pub fn new() -> Self {
        LoopLock
    }
}

impl Default for LoopLock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Interp {
    pub config: RuntimeConfig,

    /// Set once and never unset (spec §8 "Dead runtime is terminal").
    pub dead: bool,

    pub loop_lock: Option<LoopLock>,
    pub wait_list: Vec<Box<dyn FnOnce()>>,

    pub timer: Rc<dyn TimerSource>,
    pub sink: Rc<dyn PostMessageSink>,

    /// Resume protocol handoff slot (spec §4.3).
    pub curr_resume: Option<ResumeSite>,

    pub externs: NativeExtensionRegistry,
    pub live: LiveObjectTable,
    pub heap_snapshot: HeapSnapshot,
    pub debug_info: DebugInfo,
    pub debugger: Debugger,
    pub events: EventQueues,
    pub program: Rc<dyn ProgramImage>,

    /// Set while a fiber is parked at a breakpoint (spec §4.7): the
    /// frame it parked in, and the one-shot continuation a debugger
    /// `resume`/`step*` command invokes to let it continue.
    pub paused: Option<(FrameRef, Box<dyn FnOnce(Value)>)>,

    self_weak: Weak<RefCell<Interp>>,
}

impl Interp {
    /// Convenience constructor for plumbing tests that never dispatch
    /// through a real compiled program.
    pub fn new_handle(config: RuntimeConfig) -> InterpHandle {
        Self::new_handle_with(
            config,
            Rc::new(NullProgram),
            Rc::new(NullSink),
            Rc::new(crate::timers::VirtualTimer::new()),
        )
    }

    pub fn new_handle_with(
        config: RuntimeConfig,
        program: Rc<dyn ProgramImage>,
        sink: Rc<dyn PostMessageSink>,
        timer: Rc<dyn TimerSource>,
    ) -> InterpHandle {
        let debug_info = DebugInfo::default();
        let ref_counting = program.ref_counting();
        Rc::new_cyclic(|weak: &Weak<RefCell<Interp>>| {
            RefCell::new(Interp {
                config,
                dead: false,
                loop_lock: None,
                wait_list: Vec::new(),
                timer,
                sink,
                curr_resume: None,
                externs: NativeExtensionRegistry::new(),
                live: LiveObjectTable::new(ref_counting),
                heap_snapshot: HeapSnapshot::new(),
                debug_info,
                debugger: Debugger::new(),
                events: EventQueues::new(config.event_queue_capacity),
                program,
                paused: None,
                self_weak: weak.clone(),
            })
        })
    }

    /// A clone of the handle this `Interp` lives behind. Used by label
    /// functions that need to hand the interpreter to a resume
    /// continuation or a spawned fiber (spec §4.3, §4.5).
    pub fn handle(&self) -> InterpHandle {
        self.self_weak.upgrade().expect("Interp dropped while still running")
    }

    pub fn post(&self, msg: cofiber_abi::OutboundMessage) {
        self.sink.post(msg);
    }

    /// Mark the runtime dead (spec §8: terminal, all further resumes are
    /// silent no-ops). Idempotent.
    pub fn kill(handle: &InterpHandle) {
        handle.borrow_mut().dead = true;
    }

    /// The frame-threaded loop (spec §4.1): `p = p.fn(p)` until parked
    /// or finished. Each step also runs the cooperative-yield check
    /// (spec §4.4); when the run budget is exhausted the loop schedules
    /// its own continuation and returns, rather than looping further.
    pub fn run(handle: InterpHandle, start: Option<FrameRef>) {
        if handle.borrow().dead {
            return;
        }
        let mut p = start;
        let run_start = handle.borrow().timer.now_ms();

        while let Some(frame) = p {
            if handle.borrow().dead {
                return;
            }

            let step = {
                let fn_ = frame.borrow().fn_.clone();
                let mut interp = handle.borrow_mut();
                fn_(&mut interp, frame.clone())
            };

            match step {
                Ok(next) => {
                    // `overwrittenPC` means a native extension decided not
                    // to suspend after all; re-dispatch the same frame
                    // instead of whatever the label function returned
                    // (spec §4.3).
                    if frame.borrow_mut().overwritten_pc {
                        frame.borrow_mut().overwritten_pc = false;
                        p = Some(frame);
                    } else {
                        p = next;
                    }
                }
                Err(e) => {
                    Self::handle_error(&handle, &frame, e);
                    return;
                }
            }

            if let Some(ref frame) = p {
                if crate::yield_::maybe_yield(&handle, frame.clone(), run_start) {
                    return;
                }
            }
        }
    }

    /// Error boundary (spec §4.1 step 5, §7): caught here, never allowed
    /// to unwind past `run`. User errors and stack overflows are posted
    /// as breakpoint-style exception payloads; anything else is the same
    /// shape but marked uncaught.
    pub(crate) fn handle_error(handle: &InterpHandle, frame: &FrameRef, err: RuntimeError) {
        log::warn!("fiber faulted: {err}");
        let depth = frame.borrow().depth;
        handle.borrow().post(cofiber_abi::OutboundMessage::Breakpoint(
            cofiber_abi::BreakpointPayload {
                breakpoint_id: 0,
                global_names: Vec::new(),
                locals: Vec::new(),
                exception_message: Some(err.message()),
                exception_stack: Some(if err.stack().is_empty() {
                    format!("at depth {depth}")
                } else {
                    err.stack()
                }),
            },
        ));
    }

    /// Drain the wait list accumulated while the loop lock was held
    /// (spec §3 "Loop lock"). Draining can itself enqueue more waiters,
    /// so this keeps going until the list is empty.
    pub fn flush_wait_list(handle: InterpHandle) {
        loop {
            let next: Vec<Box<dyn FnOnce()>> = {
                let mut interp = handle.borrow_mut();
                if interp.loop_lock.is_some() || interp.wait_list.is_empty() {
                    return;
                }
                std::mem::take(&mut interp.wait_list)
            };
            for thunk in next {
                thunk();
            }
        }
    }

    /// Breakpoint check (spec §4.7), called by compiled code at every
    /// position the debug info marks breakpoint-eligible. Reuses the
    /// resume protocol to park the frame: from the loop's point of view
    /// a breakpoint stop is just another suspension, indistinguishable
    /// from a native extension call that hasn't returned yet.
    ///
    /// Returns `Ok(Some(frame))` to keep running immediately (nothing to
    /// break on), or `Ok(None)` once the frame has been parked and a
    /// `Breakpoint` message posted.
    pub fn check_breakpoint(
        handle: &InterpHandle,
        frame: &FrameRef,
        breakpoint_id: u32,
        ret_pc: i64,
        locals: Vec<cofiber_abi::VariableEntry>,
    ) -> Result<Option<FrameRef>, RuntimeError> {
        let depth = frame.borrow().depth;
        let already_here = frame.borrow().last_brk_id == Some(breakpoint_id);
        let should_break =
            !already_here && handle.borrow().debugger.should_break(Some(breakpoint_id), frame, depth);
        if !should_break {
            frame.borrow_mut().last_brk_id = None;
            return Ok(Some(frame.clone()));
        }
        frame.borrow_mut().last_brk_id = Some(breakpoint_id);

        crate::resume::setup_resume(&mut handle.borrow_mut().curr_resume, frame.clone(), ret_pc)?;
        let resume_fn = crate::resume::get_resume(handle.clone(), &mut handle.borrow_mut().curr_resume)?;
        let var_ref = handle.borrow_mut().heap_snapshot.add_scope(locals.clone());
        let _ = var_ref;
        handle.borrow_mut().paused = Some((frame.clone(), resume_fn));

        handle.borrow().post(cofiber_abi::OutboundMessage::Breakpoint(cofiber_abi::BreakpointPayload {
            breakpoint_id,
            global_names: Vec::new(),
            locals,
            exception_message: None,
            exception_stack: None,
        }));
        Ok(None)
    }

    /// Let a paused fiber continue (spec §4.7 `resume`/`stepover`/
    /// `stepinto`/`stepout`). No-op if nothing is paused.
    pub fn continue_paused(handle: InterpHandle) {
        let resume = handle.borrow_mut().paused.take();
        if let Some((_, resume_fn)) = resume {
            handle.borrow_mut().heap_snapshot.clear();
            resume_fn(Value::Undefined);
        }
    }

    /// Depth of the currently paused frame, if any — what a `stepover`/
    /// `stepinto`/`stepout` command measures its target against.
    pub fn paused_depth(&self) -> Option<u32> {
        self.paused.as_ref().map(|(frame, _)| frame.borrow().depth)
    }

    /// The currently paused frame, if any — the `breakFrame` a
    /// `stepover`/`stepinto`/`stepout` command scopes its step to
    /// (spec §4.7).
    pub fn paused_frame(&self) -> Option<FrameRef> {
        self.paused.as_ref().map(|(frame, _)| frame.clone())
    }

    /// Trace check (spec §4.7, §8 scenario 6), called by compiled code
    /// at every breakpoint-eligible position while trace mode is on.
    /// Unlike `check_breakpoint`, a traced position doesn't wait for a
    /// host command: it posts a `Trace` message and auto-continues
    /// after `traceConfig.interval` ms, pacing execution by real time.
    /// Positions outside the program's main file are skipped entirely
    /// (spec: "produce no trace message but still yield" — the normal
    /// cooperative-yield check still applies to them).
    pub fn check_trace(
        handle: &InterpHandle,
        frame: &FrameRef,
        breakpoint_id: u32,
        ret_pc: i64,
        is_main_file: bool,
    ) -> Result<Option<FrameRef>, RuntimeError> {
        if !is_main_file {
            return Ok(Some(frame.clone()));
        }
        let Some(interval) = handle.borrow().debugger.trace_interval_ms() else {
            return Ok(Some(frame.clone()));
        };

        crate::resume::setup_resume(&mut handle.borrow_mut().curr_resume, frame.clone(), ret_pc)?;
        let resume_fn = crate::resume::get_resume(handle.clone(), &mut handle.borrow_mut().curr_resume)?;

        handle.borrow().post(cofiber_abi::OutboundMessage::Debugger(
            cofiber_abi::DebuggerOutbound::Trace { breakpoint_id },
        ));

        let timer = handle.borrow().timer.clone();
        timer.schedule(interval, Box::new(move || resume_fn(Value::Undefined)));

        Ok(None)
    }
}
