//! Bounded per-source event queue (spec §3, §4.6).
//!
//! Each source id (a board event channel, e.g. a button or a radio
//! packet slot) owns one `EventQueue`: a small ring of buffered values,
//! a set of persistent handlers (`onEvent`-style, refcounted because
//! the same action can be registered from more than one call site), and
//! a set of one-shot awaiters (`pauseUntil`-style).
//!
//! This module is the data structure only — push/pop/handler bookkeeping
//! with no notion of how a handler action actually gets dispatched as a
//! fiber. `events.rs` owns that: it pops one event at a time, fans it out
//! to every registered handler via `run_fiber_async_cb`, and only pops
//! the next event once every handler fiber for this one has completed
//! (spec §4.6, §8 "Single drain").
//!
//! Open question (spec §9): the original event-queue `push` carries a
//! guard condition that's always false in the traces we could inspect.
//! Read literally it would suppress enqueueing under some circumstance
//! that never triggers. We don't guess at what that circumstance was
//! meant to be — `push` here enqueues unconditionally whenever there's
//! room, and draining a queue with no handlers registered is simply a
//! no-op fan-out (the event is consumed, nobody receives it).

use std::collections::VecDeque;
use std::rc::Rc;

use cofiber_abi::Value;
use hashbrown::HashMap;

pub type HandlerId = u32;
pub type SourceId = u32;

/// Optional translation applied to a buffered value before it's handed
/// to a handler fiber as its argument list (spec §4.6 "translated
/// through an optional argument-adapter function"). Lets a board
/// peripheral post a raw wire value while handlers see e.g. `[x, y]`.
pub type ArgAdapter = Rc<dyn Fn(Value) -> Vec<Value>>;

struct Handler {
    id: HandlerId,
    refcount: u32,
    action: Value,
}

pub struct EventQueue {
    capacity: usize,
    buffer: VecDeque<Value>,
    handlers: Vec<Handler>,
    awaiters: Vec<Box<dyn FnOnce(Value)>>,
    next_handler_id: HandlerId,
    /// Set while `events.rs` is fanning out the head event to its
    /// handlers; guards against a second drain starting concurrently.
    draining: bool,
    arg_adapter: Option<ArgAdapter>,
}

impl EventQueue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: VecDeque::new(),
            handlers: Vec::new(),
            awaiters: Vec::new(),
            next_handler_id: 0,
            draining: false,
            arg_adapter: None,
        }
    }

    pub fn set_arg_adapter(&mut self, adapter: ArgAdapter) {
        self.arg_adapter = Some(adapter);
    }

    /// Turn a buffered value into the argument vector a handler fiber
    /// is dispatched with.
    pub fn adapt_args(&self, value: &Value) -> Vec<Value> {
        match &self.arg_adapter {
            Some(f) => f(value.clone()),
            None => vec![value.clone()],
        }
    }

    /// Enqueue a value if there's room. Returns `false` (value dropped)
    /// when the queue is already at capacity (spec §4.6 step 2, §8
    /// "Event-queue bound").
    pub fn push(&mut self, value: Value) -> bool {
        if self.buffer.len() >= self.capacity {
            return false;
        }
        self.buffer.push_back(value);
        true
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn pop_front(&mut self) -> Option<Value> {
        self.buffer.pop_front()
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn set_draining(&mut self, draining: bool) {
        self.draining = draining;
    }

    /// Snapshot of every currently registered handler action, in
    /// registration order — what a drain fans the head event out to.
    pub fn handler_actions(&self) -> Vec<Value> {
        self.handlers.iter().map(|h| h.action.clone()).collect()
    }

    pub fn add_handler(&mut self, action: Value) -> HandlerId {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        self.handlers.push(Handler { id, refcount: 1, action });
        id
    }

    /// Replace the handler list wholesale (spec §4.6 `setHandler`):
    /// every handler currently registered is dropped — its outstanding
    /// refcount decremented to zero in one shot — and the new list is
    /// installed in its place, each handler starting fresh at refcount 1.
    pub fn set_handlers(&mut self, actions: Vec<Value>) {
        self.handlers.clear();
        for action in actions {
            self.add_handler(action);
        }
    }

    pub fn incref_handler(&mut self, id: HandlerId) {
        if let Some(h) = self.handlers.iter_mut().find(|h| h.id == id) {
            h.refcount += 1;
        }
    }

    /// Drop one reference; the handler is removed once its refcount
    /// reaches zero (spec §4.6 "handler refcount discipline").
    pub fn remove_handler(&mut self, id: HandlerId) {
        if let Some(pos) = self.handlers.iter().position(|h| h.id == id) {
            self.handlers[pos].refcount -= 1;
            if self.handlers[pos].refcount == 0 {
                self.handlers.remove(pos);
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Register a one-shot continuation that fires on the next push
    /// (spec §4.6 awaiter fan-out).
    pub fn add_awaiter(&mut self, cb: Box<dyn FnOnce(Value)>) {
        self.awaiters.push(cb);
    }

    pub fn awaiter_count(&self) -> usize {
        self.awaiters.len()
    }

    /// Consume the awaiters a push with this `notify_one` should wake
    /// (spec §4.6 step 1): just the head awaiter if `notify_one`,
    /// otherwise a snapshot-and-clear of the whole list so that an
    /// awaiter re-registered by a woken callback lands in the next
    /// batch rather than this one (spec §5 "awaiters woken ... see a
    /// consistent snapshot"). The caller invokes the returned closures
    /// itself, after dropping any borrow on the queue.
    pub fn take_wakeable_awaiters(&mut self, notify_one: bool) -> Vec<Box<dyn FnOnce(Value)>> {
        if notify_one {
            if self.awaiters.is_empty() {
                Vec::new()
            } else {
                vec![self.awaiters.remove(0)]
            }
        } else {
            std::mem::take(&mut self.awaiters)
        }
    }
}

/// All event queues, keyed by source id, created lazily on first touch
/// with the configured default capacity (spec §3, default 5).
pub struct EventQueues {
    default_capacity: usize,
    queues: HashMap<SourceId, EventQueue>,
}

impl EventQueues {
    pub fn new(default_capacity: usize) -> Self {
        Self { default_capacity, queues: HashMap::new() }
    }

    pub fn get_or_create(&mut self, source: SourceId) -> &mut EventQueue {
        self.queues.entry(source).or_insert_with(|| EventQueue::new(self.default_capacity))
    }

    pub fn get_mut(&mut self, source: SourceId) -> Option<&mut EventQueue> {
        self.queues.get_mut(&source)
    }
}
