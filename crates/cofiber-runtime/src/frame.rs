//! Stack frame model, `leave`, and `actionCall` (spec §3, §4.2).
//!
//! A frame is a heap object, not a stack slot — unlike the teacher's
//! register VM, where `CallFrame` lives inline in a `Vec<CallFrame>`, a
//! parked frame here can outlive the call that created it (that's the
//! whole point of the resume protocol), so frames are reference-counted
//! and linked by `parent` rather than indexed by position.

use std::cell::RefCell;
use std::rc::Rc;

use cofiber_abi::Value;

use crate::error::RuntimeError;
use crate::interp::Interp;

/// Depth cap enforced by `actionCall` (spec §4.2, §8 "Stack-overflow cap").
pub const MAX_DEPTH: u32 = 1000;

/// One activation record on a fiber's frame chain.
pub struct Frame {
    pub fn_: LabelFn,
    pub pc: u32,
    pub parent: Option<FrameRef>,
    pub depth: u32,
    pub r0: Value,
    pub retval: Value,
    /// Set by `overwriteResume` to force the loop to re-dispatch this
    /// frame rather than follow the returned next-frame (spec §4.3).
    pub overwritten_pc: bool,
    pub final_callback: Option<Box<dyn FnOnce(Value)>>,
    pub lambda_args: Vec<Value>,
    pub caps: Vec<Value>,
    pub last_brk_id: Option<u32>,
}

pub type FrameRef = Rc<RefCell<Frame>>;

/// What a label function hands back: the next frame to run, or `None`
/// to stop the loop (fiber parked or finished).
pub type StepResult = Result<Option<FrameRef>, RuntimeError>;

/// A compiled basic block. DESIGN NOTES calls this a "polymorphic block
/// value over the capability set {advance(frame) -> frame|null}" — any
/// closure satisfying the signature qualifies, which is exactly what a
/// trait object over `Fn` gives us.
pub type LabelFn = Rc<dyn Fn(&mut Interp, FrameRef) -> StepResult>;

impl Frame {
    /// Build the bottom sentinel frame. Its `fn` delivers `retval` to the
    /// outer completion callback and returns `None`, terminating the loop
    /// cleanly (spec §4.2 `setupTopCore`).
    pub fn sentinel(cb: Box<dyn FnOnce(Value)>) -> FrameRef {
        let fn_: LabelFn = Rc::new(|_interp: &mut Interp, frame: FrameRef| {
            // The sentinel only ever steps once, so `final_callback` is
            // always present here.
            let cb = frame.borrow_mut().final_callback.take();
            let retval = frame.borrow().retval.clone();
            if let Some(cb) = cb {
                cb(retval);
            }
            Ok(None)
        });
        Rc::new(RefCell::new(Frame {
            fn_,
            pc: 0,
            parent: None,
            depth: 0,
            r0: Value::Undefined,
            retval: Value::Undefined,
            overwritten_pc: false,
            final_callback: Some(cb),
            lambda_args: Vec::new(),
            caps: Vec::new(),
            last_brk_id: None,
        }))
    }
}

/// Universal return primitive (spec §4.2): deposit `v` into `s`'s
/// parent's `retval`, invoke `s`'s `finalCallback` if present exactly
/// once, and return the parent so the loop continues there.
pub fn leave(s: &FrameRef, v: Value) -> Option<FrameRef> {
    let (parent, cb) = {
        let mut frame = s.borrow_mut();
        (frame.parent.clone(), frame.final_callback.take())
    };
    if let Some(parent) = &parent {
        parent.borrow_mut().retval = v.clone();
    }
    if let Some(cb) = cb {
        cb(v);
    }
    parent
}

/// Prepare a child frame for dispatch (spec §4.2): binds `cb` as its
/// final callback, computes `depth`, enforces the depth cap, resets
/// `pc` to 0. Enforces the default (spec-mandated) 1000-frame cap; use
/// [`action_call_with_cap`] to enforce a `RuntimeConfig::max_depth`
/// that an embedder tightened or loosened.
pub fn action_call(
    parent: &FrameRef,
    fn_: LabelFn,
    cb: Option<Box<dyn FnOnce(Value)>>,
) -> Result<FrameRef, RuntimeError> {
    action_call_with_cap(parent, fn_, cb, MAX_DEPTH)
}

/// Same as [`action_call`], but enforcing an explicit depth cap rather
/// than the spec's default 1000 (spec §4.2, §9 "Configuration" —
/// `RuntimeConfig::max_depth`).
pub fn action_call_with_cap(
    parent: &FrameRef,
    fn_: LabelFn,
    cb: Option<Box<dyn FnOnce(Value)>>,
    max_depth: u32,
) -> Result<FrameRef, RuntimeError> {
    let depth = parent.borrow().depth + 1;
    if depth > max_depth {
        return Err(RuntimeError::StackOverflow { depth });
    }
    Ok(Rc::new(RefCell::new(Frame {
        fn_,
        pc: 0,
        parent: Some(parent.clone()),
        depth,
        r0: Value::Undefined,
        retval: Value::Undefined,
        overwritten_pc: false,
        final_callback: cb,
        lambda_args: Vec::new(),
        caps: Vec::new(),
        last_brk_id: None,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc as StdRc;

    fn dummy_fn() -> LabelFn {
        Rc::new(|_interp, _frame| Ok(None))
    }

    fn make_root() -> FrameRef {
        Rc::new(RefCell::new(Frame {
            fn_: dummy_fn(),
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
        }))
    }

    #[test]
    fn depth_is_strictly_parent_depth_plus_one() {
        let root = make_root();
        let child = action_call(&root, dummy_fn(), None).unwrap();
        assert_eq!(child.borrow().depth, root.borrow().depth + 1);
        let grandchild = action_call(&child, dummy_fn(), None).unwrap();
        assert_eq!(grandchild.borrow().depth, child.borrow().depth + 1);
    }

    #[test]
    fn depth_1000_permitted_1001_rejected() {
        let mut frame = make_root();
        frame.borrow_mut().depth = MAX_DEPTH - 1;
        let at_1000 = action_call(&frame, dummy_fn(), None).unwrap();
        assert_eq!(at_1000.borrow().depth, MAX_DEPTH);
        let err = action_call(&at_1000, dummy_fn(), None).unwrap_err();
        assert!(matches!(err, RuntimeError::StackOverflow { depth } if depth == MAX_DEPTH + 1));
    }

    #[test]
    fn leave_deposits_retval_and_invokes_callback_once() {
        let root = make_root();
        let child = action_call(&root, dummy_fn(), None).unwrap();

        let seen = StdRc::new(Cell::new(None));
        let seen2 = seen.clone();
        child.borrow_mut().final_callback = Some(Box::new(move |v| {
            if let Value::Int(n) = v {
                seen2.set(Some(n));
            }
        }));

        let parent = leave(&child, Value::Int(42)).unwrap();
        assert!(StdRc::ptr_eq(&parent, &root));
        assert!(matches!(root.borrow().retval, Value::Int(42)));
        assert_eq!(seen.get(), Some(42));
    }
}
