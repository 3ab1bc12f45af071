//! Cooperative fiber interpreter.
//!
//! Frame-threaded interpreter loop, the resume/suspension protocol for
//! native extension calls, cooperative yield, fiber spawn, the bounded
//! per-source event queue, and the in-process debugger — everything
//! that runs a single-threaded compiled program without ever blocking
//! the host's event loop (spec §2, §5).
//!
//! What runs the labels (a `ProgramImage`) and how the host actually
//! talks to it (message envelopes, timers) are boundaries, not
//! implementations: this crate is runnable and fully testable with the
//! `VirtualTimer`/`RecordingSink`/`NullProgram` test doubles alone.

pub mod config;
pub mod debugger;
pub mod error;
pub mod event_queue;
pub mod events;
pub mod fiber;
pub mod frame;
pub mod interp;
pub mod program;
pub mod resume;
pub mod sink;
pub mod timers;
pub mod top;
pub mod yield_;

pub use config::{RuntimeConfig, YieldBudget};
pub use debugger::{Debugger, StepMode};
pub use error::RuntimeError;
pub use event_queue::{ArgAdapter, EventQueue, EventQueues, HandlerId, SourceId};
pub use events::push_event;
pub use fiber::{run_fiber_async, run_fiber_async_cb};
pub use frame::{action_call, action_call_with_cap, leave, Frame, FrameRef, LabelFn, StepResult, MAX_DEPTH};
pub use interp::{Interp, InterpHandle, LoopLock};
pub use program::{NullProgram, ProgramImage};
pub use resume::{check_resume_consumed, get_resume, overwrite_resume, setup_resume, ResumeSite};
pub use sink::{NullSink, PostMessageSink, RecordingSink};
pub use timers::{TimerCallback, TimerSource, VirtualTimer};
pub use top::{setup_top, setup_top_core, spawn_tail_call, top_call};
