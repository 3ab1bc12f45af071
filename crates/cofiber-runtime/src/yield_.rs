//! Cooperative yield (spec §4.4): a fiber is not allowed to monopolize
//! the event loop. Every step of `Interp::run` checks elapsed run time
//! against a budget and, once it's spent, parks by scheduling its own
//! continuation a few milliseconds out instead of looping again
//! immediately.

use crate::frame::FrameRef;
use crate::interp::{Interp, InterpHandle, LoopLock};

/// Returns `true` if the loop should stop (having scheduled its own
/// continuation), `false` if it still has budget to keep going.
///
/// While the continuation is pending, a fresh loop lock is held (spec
/// §4.4 "install a fresh loop lock") so that a resume fired during the
/// yield window is deferred onto the wait list rather than racing the
/// scheduled re-entry; the continuation releases the lock and flushes
/// the wait list after the loop returns, the same pattern `resume.rs`'s
/// `FnWrapper` dispatch and `fiber.rs`'s fiber spawn both follow.
pub fn maybe_yield(handle: &InterpHandle, frame: FrameRef, run_start_ms: u64) -> bool {
    let (elapsed, budget) = {
        let interp = handle.borrow();
        (interp.timer.now_ms().saturating_sub(run_start_ms), interp.config.yield_budget)
    };
    if elapsed < budget.run_ms {
        return false;
    }

    handle.borrow_mut().loop_lock = Some(LoopLock::new());
    let handle2 = handle.clone();
    let timer = handle.borrow().timer.clone();
    timer.schedule(
        budget.resume_after_ms,
        Box::new(move || {
            if handle2.borrow().dead {
                handle2.borrow_mut().loop_lock = None;
                return;
            }
            handle2.borrow_mut().loop_lock = None;
            Interp::run(handle2.clone(), Some(frame));
            Interp::flush_wait_list(handle2);
        }),
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::timers::VirtualTimer;
    use std::rc::Rc;

    fn leaf_frame() -> FrameRef {
        let fn_: crate::frame::LabelFn = Rc::new(|_i, _f| Ok(None));
        Rc::new(std::cell::RefCell::new(crate::frame::Frame {
            fn_,
            pc: 0,
            parent: None,
            depth: 0,
            r0: cofiber_abi::Value::Undefined,
            retval: cofiber_abi::Value::Undefined,
            overwritten_pc: false,
            final_callback: None,
            lambda_args: Vec::new(),
            caps: Vec::new(),
            last_brk_id: None,
        }))
    }

    #[test]
    fn within_budget_does_not_yield() {
        let timer = Rc::new(VirtualTimer::new());
        let handle = Interp::new_handle_with(
            RuntimeConfig::default(),
            Rc::new(crate::program::NullProgram),
            Rc::new(crate::sink::NullSink),
            timer,
        );
        assert!(!maybe_yield(&handle, leaf_frame(), 0));
    }

    #[test]
    fn over_budget_schedules_continuation_and_yields() {
        let timer = Rc::new(VirtualTimer::new());
        let handle = Interp::new_handle_with(
            RuntimeConfig::default(),
            Rc::new(crate::program::NullProgram),
            Rc::new(crate::sink::NullSink),
            timer.clone(),
        );
        timer.advance(25);
        assert!(maybe_yield(&handle, leaf_frame(), 0));
    }

    #[test]
    fn yield_window_holds_a_loop_lock_until_the_continuation_fires() {
        let timer = Rc::new(VirtualTimer::new());
        let handle = Interp::new_handle_with(
            RuntimeConfig::default(),
            Rc::new(crate::program::NullProgram),
            Rc::new(crate::sink::NullSink),
            timer.clone(),
        );
        timer.advance(25);
        assert!(maybe_yield(&handle, leaf_frame(), 0));
        assert!(handle.borrow().loop_lock.is_some(), "lock held while the continuation is pending");

        timer.advance(5);
        assert!(handle.borrow().loop_lock.is_none(), "lock released once the continuation runs");
    }
}
