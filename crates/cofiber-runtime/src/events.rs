//! Event queue dispatch (spec §4.6): wires the bounded per-source
//! `EventQueue` data structure up to the interpreter's fiber spawner.
//!
//! `push_event` is the host-/native-extension-facing entry point a
//! board peripheral calls when a new value arrives (a button press, a
//! radio packet, a pin transition). Draining is recursive rather than
//! looping in place: each event's handlers are dispatched as fresh
//! fibers via `run_fiber_async_cb`, and the next event isn't popped
//! until every handler fiber from this one has run its sentinel
//! (spec §8 "Single drain" — no two `poke`s overlap, and a later event's
//! handlers never start before the earlier event's are done).

use std::cell::Cell;
use std::rc::Rc;

use cofiber_abi::{ObjectId, Value};

use crate::event_queue::SourceId;
use crate::fiber::run_fiber_async_cb;
use crate::interp::InterpHandle;

/// Push a value onto `source`'s queue (spec §4.6).
///
/// 1. Wake awaiters first, with the *pushed* value, regardless of
///    whether the push itself is later dropped for capacity — spec §8
///    "Event-queue bound": excess pushes are dropped but awaiters still
///    wake.
/// 2. Enqueue if there's room.
/// 3. If the queue was empty before this push and isn't already
///    draining, start a drain.
///
/// Starting a drain marks the queue as draining immediately but defers
/// the actual pop-and-dispatch to the next tick (like every other
/// fiber-spawning entry point in this crate). This matters for the
/// capacity bound: several `push_event` calls issued back-to-back in
/// the same synchronous burst must see the backlog as it actually
/// stands, not as it would look after the first event had already been
/// shifted off — otherwise a burst of pushes would never hit capacity
/// (spec §8 "Event-queue bound", scenario 3).
pub fn push_event(handle: &InterpHandle, source: SourceId, value: Value, notify_one: bool) {
    let awaiters = {
        let mut interp = handle.borrow_mut();
        interp.events.get_or_create(source).take_wakeable_awaiters(notify_one)
    };
    for awaiter in awaiters {
        awaiter(value.clone());
    }

    let should_start_drain = {
        let mut interp = handle.borrow_mut();
        let queue = interp.events.get_or_create(source);
        let accepted = queue.push(value);
        accepted && queue.buffer_len() == 1 && !queue.is_draining()
    };
    if should_start_drain {
        {
            let mut interp = handle.borrow_mut();
            if let Some(queue) = interp.events.get_mut(source) {
                queue.set_draining(true);
            }
        }
        let handle2 = handle.clone();
        let timer = handle.borrow().timer.clone();
        timer.schedule(0, Box::new(move || drain_source(&handle2, source)));
    }
}

/// Pop the head event and fan it out to every registered handler as a
/// fresh fiber. Recurses onto the next event once every handler fiber
/// dispatched for this one has completed; a handler action that isn't
/// a recognized closure value, or that the program doesn't resolve, is
/// silently skipped rather than failing the whole drain.
fn drain_source(handle: &InterpHandle, source: SourceId) {
    let (value, handler_actions) = {
        let mut interp = handle.borrow_mut();
        let Some(queue) = interp.events.get_mut(source) else { return };
        queue.set_draining(true);
        let Some(value) = queue.pop_front() else {
            queue.set_draining(false);
            return;
        };
        let args = queue.adapt_args(&value);
        (args, queue.handler_actions())
    };

    if handler_actions.is_empty() {
        advance_or_finish_drain(handle, source);
        return;
    }

    let remaining = Rc::new(Cell::new(handler_actions.len()));
    for action in handler_actions {
        let remaining = remaining.clone();
        let handle2 = handle.clone();
        let source2 = source;
        let on_complete = Box::new(move |_retval: Value| {
            remaining.set(remaining.get() - 1);
            if remaining.get() == 0 {
                advance_or_finish_drain(&handle2, source2);
            }
        });
        dispatch_handler(handle, action, value.clone(), on_complete);
    }
}

/// Either pop the next buffered event, or clear the draining flag if
/// none remain — the exact branch spec §4.6's `poke` takes at the end
/// of fanning out one event.
fn advance_or_finish_drain(handle: &InterpHandle, source: SourceId) {
    let has_more = {
        let mut interp = handle.borrow_mut();
        interp.events.get_mut(source).map(|q| !q.is_empty()).unwrap_or(false)
    };
    if has_more {
        drain_source(handle, source);
    } else {
        let mut interp = handle.borrow_mut();
        if let Some(q) = interp.events.get_mut(source) {
            q.set_draining(false);
        }
    }
}

/// Resolve a handler action to a label function and spawn it as a
/// fiber. Only `Value::FnWrapper` is dispatchable — anything else
/// registered as a handler (a stray scalar, say) can't be called, so
/// it's dropped rather than panicking the drain.
fn dispatch_handler(
    handle: &InterpHandle,
    action: Value,
    args: Vec<Value>,
    on_complete: Box<dyn FnOnce(Value)>,
) {
    let Value::FnWrapper { action: action_id, caps, args: bound_args } = action else {
        on_complete(Value::Undefined);
        return;
    };
    let program = handle.borrow().program.clone();
    let Some(fn_) = program.resolve_action(action_id) else {
        on_complete(Value::Undefined);
        return;
    };
    let mut full_args = bound_args;
    full_args.extend(args);
    run_fiber_async_cb(handle, Some(action_id), fn_, caps, full_args, on_complete);
}

/// Resolve a `Value::FnWrapper`'s action id against the program the
/// `Interp` is currently running, for call sites (like `addHandler`)
/// that only want to confirm an action id is dispatchable.
pub fn is_dispatchable_action(handle: &InterpHandle, action_id: ObjectId) -> bool {
    handle.borrow().program.resolve_action(action_id).is_some()
}
