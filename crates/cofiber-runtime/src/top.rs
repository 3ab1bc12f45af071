//! Top-level call entry (spec §4.2): `setupTopCore`, `topCall`, and
//! `setupTop` build the bottom sentinel frame and kick the interpreter
//! loop off from the program's entry point, or from a closure's action
//! id when a native extension hands one back for tail dispatch
//! (spec §4.3).

use cofiber_abi::{ObjectId, Value};

use crate::frame::{action_call_with_cap, Frame, FrameRef, LabelFn};
use crate::interp::{Interp, InterpHandle};

/// Build the bottom sentinel frame a call chain unwinds into
/// (spec §4.2).
pub fn setup_top_core(cb: Box<dyn FnOnce(Value)>) -> FrameRef {
    Frame::sentinel(cb)
}

/// Build a fresh call chain rooted at `fn_` and run it to its first
/// park or completion (spec §4.2).
pub fn top_call(handle: InterpHandle, fn_: LabelFn, cb: Box<dyn FnOnce(Value)>) {
    let sentinel = setup_top_core(cb);
    let max_depth = handle.borrow().config.max_depth;
    match action_call_with_cap(&sentinel, fn_, None, max_depth) {
        Ok(first) => Interp::run(handle, Some(first)),
        Err(e) => Interp::handle_error(&handle, &sentinel, e),
    }
}

/// Start the program's entry point as a detached top-level call whose
/// result nobody awaits (spec §4.2; this is what a freshly loaded "run"
/// message kicks off).
pub fn setup_top(handle: InterpHandle) {
    let entry = handle.borrow().program.entry_point();
    top_call(handle, entry, Box::new(|_v| {}));
}

/// Resolve a closure's action id to its label function and build a
/// fresh, detached call chain for it (spec §4.3 "FnWrapper tail
/// dispatch"). Returns `None` if the program doesn't recognize the
/// action id.
pub fn spawn_tail_call(
    handle: &InterpHandle,
    action: ObjectId,
    caps: Vec<Value>,
    args: Vec<Value>,
) -> Option<FrameRef> {
    let program = handle.borrow().program.clone();
    let fn_ = program.resolve_action(action)?;
    let sentinel = setup_top_core(Box::new(|_v| {}));
    let max_depth = handle.borrow().config.max_depth;
    match action_call_with_cap(&sentinel, fn_, None, max_depth) {
        Ok(frame) => {
            {
                let mut f = frame.borrow_mut();
                f.caps = caps;
                f.lambda_args = args;
            }
            Some(frame)
        }
        Err(e) => {
            Interp::handle_error(handle, &sentinel, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::program::{NullProgram, ProgramImage};
    use crate::sink::RecordingSink;
    use crate::timers::VirtualTimer;
    use std::cell::Cell;
    use std::rc::Rc;

    struct OneShotProgram;

    impl ProgramImage for OneShotProgram {
        fn entry_point(&self) -> LabelFn {
            Rc::new(|_interp, frame| Ok(crate::frame::leave(&frame, Value::Int(7))))
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

    #[test]
    fn top_call_runs_entry_point_to_completion() {
        let handle = Interp::new_handle_with(
            RuntimeConfig::default(),
            Rc::new(OneShotProgram),
            Rc::new(RecordingSink::new()),
            Rc::new(VirtualTimer::new()),
        );
        let seen = Rc::new(Cell::new(None));
        let seen2 = seen.clone();
        let entry = handle.borrow().program.entry_point();
        top_call(
            handle,
            entry,
            Box::new(move |v| {
                if let Value::Int(n) = v {
                    seen2.set(Some(n));
                }
            }),
        );
        assert_eq!(seen.get(), Some(7));
    }

    #[test]
    fn spawn_tail_call_returns_none_for_unknown_action() {
        let handle = Interp::new_handle(RuntimeConfig::default());
        let _ = NullProgram;
        assert!(spawn_tail_call(&handle, 999, vec![], vec![]).is_none());
    }
}
