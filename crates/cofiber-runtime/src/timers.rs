//! Timer boundary. The interpreter needs two things from the host clock:
//! "what time is it" (for `runningTime`/`runningTimeUs`, spec §5) and
//! "call me back in N ms" (`maybeYield`'s continuation, resume-after-
//! sleep scheduling). Defining the trait here, rather than in
//! `cofiber-host`, keeps the interpreter's dependency on the real clock
//! at arm's length — tests drive it with a virtual clock instead of
//! sleeping for real.

/// A scheduled callback. Boxed so both real (`setTimeout`) and virtual
/// (manually-advanced) timer sources can hold it uniformly.
pub type TimerCallback = Box<dyn FnOnce()>;

pub trait TimerSource {
    /// Milliseconds since some fixed epoch the embedder controls (not
    /// necessarily wall-clock — a virtual clock in tests just counts up).
    fn now_ms(&self) -> u64;

    /// Schedule `cb` to run after `delay_ms` milliseconds, not before.
    fn schedule(&self, delay_ms: u32, cb: TimerCallback);
}

/// A manually-advanced clock for tests: `schedule` records pending
/// callbacks, and `advance` fires whichever are due.
#[derive(Default)]
pub struct VirtualTimer {
    now: std::cell::Cell<u64>,
    pending: std::cell::RefCell<Vec<(u64, TimerCallback)>>,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `ms` and run every callback now due, in the
    /// order they become due (ties broken by registration order).
    pub fn advance(&self, ms: u64) {
        let target = self.now.get() + ms;
        self.now.set(target);
        loop {
            let due_idx = {
                let pending = self.pending.borrow();
                pending
                    .iter()
                    .enumerate()
                    .filter(|(_, (at, _))| *at <= target)
                    .map(|(i, (at, _))| (i, *at))
                    .min_by_key(|(_, at)| *at)
                    .map(|(i, _)| i)
            };
            let Some(idx) = due_idx else { break };
            let (_, cb) = self.pending.borrow_mut().remove(idx);
            cb();
        }
    }
}

impl TimerSource for VirtualTimer {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn schedule(&self, delay_ms: u32, cb: TimerCallback) {
        let at = self.now.get() + delay_ms as u64;
        self.pending.borrow_mut().push((at, cb));
    }
}
