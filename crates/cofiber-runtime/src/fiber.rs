//! Fiber spawn (spec §4.5): `runFiberAsync` starts a new, independent
//! call chain — its own sentinel, its own loop — without blocking the
//! caller. Like the resume protocol's `FnWrapper` tail dispatch
//! (spec §4.3), the new chain doesn't start synchronously inside the
//! caller's stack: it's deferred behind the loop lock and bounced to
//! the next tick, so spawning fibers from deep inside another fiber
//! never grows the native call stack.

use cofiber_abi::{ObjectId, Value};

use crate::frame::LabelFn;
use crate::interp::{Interp, InterpHandle, LoopLock};
use crate::top::setup_top_core;

/// Spawn `fn_` as a new detached fiber, bound to `caps`/`args`. Runs on
/// the next tick of the shared timer, under its own loop-lock guard.
/// `action`, if given, is the `FnWrapper`'s action id — its refcount is
/// bumped across the spawn-to-dispatch gap (spec §4.5) so it can't be
/// collected while the fiber is waiting on its first tick. Pass `None`
/// for fibers spawned from a `LabelFn` that isn't backed by a tracked
/// heap object (e.g. a bare closure built by the embedding code).
pub fn run_fiber_async(
    handle: &InterpHandle,
    action: Option<ObjectId>,
    fn_: LabelFn,
    caps: Vec<Value>,
    args: Vec<Value>,
) {
    run_fiber_async_cb(handle, action, fn_, caps, args, Box::new(|_v| {}))
}

/// Same as [`run_fiber_async`], but `on_complete` is invoked with the
/// fiber's return value once its sentinel fires. The event queue's
/// drain (spec §4.6) uses this to know when a dispatched handler has
/// finished, so it can tell when an event's whole fan-out is done.
pub fn run_fiber_async_cb(
    handle: &InterpHandle,
    action: Option<ObjectId>,
    fn_: LabelFn,
    caps: Vec<Value>,
    args: Vec<Value>,
    on_complete: Box<dyn FnOnce(Value)>,
) {
    if let Some(action_id) = action {
        handle.borrow_mut().live.incref(action_id);
    }

    let handle2 = handle.clone();
    handle.borrow_mut().loop_lock = Some(LoopLock::new());
    let timer = handle.borrow().timer.clone();

    timer.schedule(
        0,
        Box::new(move || {
            if handle2.borrow().dead {
                handle2.borrow_mut().loop_lock = None;
                if let Some(action_id) = action {
                    handle2.borrow_mut().live.decref(action_id);
                }
                return;
            }

            // Balances the increment above: once the action actually
            // begins dispatching, the spawn-to-dispatch gap it was
            // protecting is over (spec §4.5 "decrement the refcount,
            // balanced against the increment performed ... when the
            // action begins running").
            if let Some(action_id) = action {
                handle2.borrow_mut().live.decref(action_id);
            }

            let sentinel = setup_top_core(on_complete);
            let max_depth = handle2.borrow().config.max_depth;
            let frame = match crate::frame::action_call_with_cap(&sentinel, fn_, None, max_depth) {
                Ok(f) => {
                    {
                        let mut f_mut = f.borrow_mut();
                        f_mut.caps = caps;
                        f_mut.lambda_args = args;
                    }
                    Some(f)
                }
                Err(e) => {
                    Interp::handle_error(&handle2, &sentinel, e);
                    None
                }
            };

            handle2.borrow_mut().loop_lock = None;
            Interp::run(handle2.clone(), frame);
            Interp::flush_wait_list(handle2);
        }),
    );
}
