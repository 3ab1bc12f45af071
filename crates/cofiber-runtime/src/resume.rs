//! Resume / suspension protocol (spec §4.3).
//!
//! `setupResume`/`getResume` hand a one-shot continuation to a native
//! extension; `overwriteResume` is the escape hatch for an extension that
//! turned out not to need one. DESIGN NOTES frames the resume function as
//! "a builder that captures [the parked frame and expected return pc],
//! plus an atomic consumed flag" — that's exactly `build_resume` below.

use std::cell::Cell;
use std::rc::Rc;

use cofiber_abi::Value;

use crate::error::RuntimeError;
use crate::frame::FrameRef;
use crate::interp::{InterpHandle, LoopLock};

/// What `setupResume` stashed for the call site that hasn't yet called
/// `getResume()`.
pub struct ResumeSite {
    pub frame: FrameRef,
    pub ret_pc: i64,
}

/// Called by the compiled code at a call site that *might* suspend
/// (spec §4.3 step 1). Fails if the previous call site never consumed
/// its own resume via `getResume()`.
pub fn setup_resume(
    curr_resume: &mut Option<ResumeSite>,
    frame: FrameRef,
    ret_pc: i64,
) -> Result<(), RuntimeError> {
    check_resume_consumed(curr_resume)?;
    *curr_resume = Some(ResumeSite { frame, ret_pc });
    Ok(())
}

/// Asserts the previously set-up resume, if any, was already consumed.
/// Called before installing a new one (spec §4.3: "enforced by
/// checkResumeConsumed"), and also usable as a standalone sanity check
/// around breakpoint/trace pausing, which consume their own resume
/// immediately (spec §4.7).
pub fn check_resume_consumed(curr_resume: &Option<ResumeSite>) -> Result<(), RuntimeError> {
    if curr_resume.is_some() {
        return Err(RuntimeError::ProtocolMisuse("getResume() not called"));
    }
    Ok(())
}

/// Retrieved by the native extension (spec §4.3 step 2): consumes the
/// pending resume site and returns a one-shot callback the extension
/// invokes later with its result.
pub fn get_resume(
    handle: InterpHandle,
    curr_resume: &mut Option<ResumeSite>,
) -> Result<Box<dyn FnOnce(Value)>, RuntimeError> {
    let site = curr_resume.take().ok_or(RuntimeError::ProtocolMisuse("noresume"))?;
    Ok(build_resume(handle, site.frame, site.ret_pc))
}

/// Called by a native extension that didn't need to suspend after all
/// (spec §4.3). Discards the pending resume and, if `ret_pc >= 0`,
/// patches the frame's `pc` and raises `overwrittenPC` so the
/// interpreter re-dispatches the current frame instead of following the
/// child-frame pointer.
pub fn overwrite_resume(curr_resume: &mut Option<ResumeSite>, frame: &FrameRef, ret_pc: i64) {
    *curr_resume = None;
    if ret_pc >= 0 {
        frame.borrow_mut().pc = ret_pc as u32;
    }
    frame.borrow_mut().overwritten_pc = true;
}

/// Build the one-shot resume continuation. Contract (spec §4.3):
/// - dead runtime: drop silently.
/// - loop lock held: defer onto the wait list.
/// - `FnWrapper` value: tail-dispatch through a fresh loop lock + next
///   tick bounce (spec §4.3, DESIGN NOTES "FnWrapper tail dispatch").
/// - otherwise: deposit into `retval`, assert `pc == ret_pc`, re-enter
///   the loop at `frame`.
fn build_resume(handle: InterpHandle, frame: FrameRef, ret_pc: i64) -> Box<dyn FnOnce(Value)> {
    let consumed = Rc::new(Cell::new(false));
    Box::new(move |v: Value| {
        if consumed.replace(true) {
            // Already fired once; at-most-once (spec §8).
            return;
        }
        resume_entry(handle, frame, ret_pc, v);
    })
}

/// The actual re-entry logic, factored out of the closure so it can
/// recurse through the loop-lock-deferred path without re-boxing.
fn resume_entry(handle: InterpHandle, frame: FrameRef, ret_pc: i64, v: Value) {
    if handle.borrow().dead {
        return;
    }
    if handle.borrow().loop_lock.is_some() {
        let handle2 = handle.clone();
        handle.borrow_mut().wait_list.push(Box::new(move || {
            resume_entry(handle2, frame, ret_pc, v);
        }));
        return;
    }

    if let Value::FnWrapper { action, caps, args } = v {
        let handle2 = handle.clone();
        handle.borrow_mut().loop_lock = Some(LoopLock::new());
        let timer = handle.borrow().timer.clone();
        timer.schedule(
            0,
            Box::new(move || {
                if handle2.borrow().dead {
                    handle2.borrow_mut().loop_lock = None;
                    return;
                }
                let child = crate::top::spawn_tail_call(&handle2, action, caps, args);
                handle2.borrow_mut().loop_lock = None;
                crate::interp::Interp::run(handle2.clone(), child);
                crate::interp::Interp::flush_wait_list(handle2);
            }),
        );
        return;
    }

    {
        let mut f = frame.borrow_mut();
        f.retval = v;
        debug_assert!(
            ret_pc < 0 || f.pc == ret_pc as u32,
            "resume re-entered at unexpected pc: spurious re-entry"
        );
    }
    crate::interp::Interp::run(handle.clone(), Some(frame));
    crate::interp::Interp::flush_wait_list(handle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_then_get_round_trips() {
        let mut curr = None;
        let frame_fn: crate::frame::LabelFn = Rc::new(|_i, _f| Ok(None));
        let frame = Rc::new(std::cell::RefCell::new(crate::frame::Frame {
            fn_: frame_fn,
            pc: 0,
            parent: None,
            depth: 0,
            r0: Value::Undefined,
            retval: Value::Undefined,
            overwritten_pc: false,
            final_callback: None,
            lambda_args: Vec::new(),
            caps: Vec::new(),
            last_brk_id: None,
        }));
        setup_resume(&mut curr, frame, 12).unwrap();
        assert!(curr.is_some());
    }

    #[test]
    fn get_resume_called_twice_fails_with_noresume() {
        let mut curr: Option<ResumeSite> = None;
        let handle = crate::interp::Interp::new_handle(Default::default());
        let err = get_resume(handle, &mut curr).unwrap_err();
        assert!(matches!(err, RuntimeError::ProtocolMisuse("noresume")));
    }

    #[test]
    fn setup_resume_without_consuming_previous_fails() {
        let mut curr = None;
        let frame_fn: crate::frame::LabelFn = Rc::new(|_i, _f| Ok(None));
        let frame = Rc::new(std::cell::RefCell::new(crate::frame::Frame {
            fn_: frame_fn,
            pc: 0,
            parent: None,
            depth: 0,
            r0: Value::Undefined,
            retval: Value::Undefined,
            overwritten_pc: false,
            final_callback: None,
            lambda_args: Vec::new(),
            caps: Vec::new(),
            last_brk_id: None,
        }));
        setup_resume(&mut curr, frame.clone(), 1).unwrap();
        let err = setup_resume(&mut curr, frame, 2).unwrap_err();
        assert!(matches!(err, RuntimeError::ProtocolMisuse("getResume() not called")));
    }
}
