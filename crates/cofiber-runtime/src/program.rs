//! Program loading boundary (spec §4.9). Turning a "run" message's
//! opaque `code` blob into callable label functions is the code-loading
//! collaborator's job (spec §1 Non-goals) — the interpreter only needs
//! three things back from it, captured here as a trait so the loader
//! can live anywhere (a bytecode decoder, a JIT, a precompiled table)
//! without the interpreter core knowing which.

use cofiber_abi::ObjectId;

use crate::frame::LabelFn;

pub trait ProgramImage {
    /// The label function the top-level call starts at (spec §4.2
    /// `setupTopCore`).
    fn entry_point(&self) -> LabelFn;

    /// Resolve a closure's action id — the `action` field of a
    /// `Value::FnWrapper` — to its label function (spec §4.3 "FnWrapper
    /// tail dispatch"). `None` if the id is unknown to this program.
    fn resolve_action(&self, action: ObjectId) -> Option<LabelFn>;

    /// Whether this program was compiled with refcount debugging
    /// enabled (spec §4.8; mirrors `RunMessage::ref_counting_debug`).
    fn ref_counting(&self) -> bool;

    /// Number of distinct breakpoint ids the compiled program carries,
    /// for host-side sanity checks on `setBreakpoints` requests.
    fn breakpoint_count(&self) -> usize;
}

/// Placeholder program with no entry point of its own, for tests that
/// exercise the interpreter plumbing (resume protocol, event queue,
/// debugger) without a real compiled program attached.
pub struct NullProgram;

impl ProgramImage for NullProgram {
    fn entry_point(&self) -> LabelFn {
        std::rc::Rc::new(|_interp, _frame| Ok(None))
    }

    fn resolve_action(&self, _action: ObjectId) -> Option<LabelFn> {
        None
    }

    fn ref_counting(&self) -> bool {
        false
    }

    fn breakpoint_count(&self) -> usize {
        0
    }
}
