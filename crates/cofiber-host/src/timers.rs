//! Real `TimerSource` implementations. The interpreter only ever needs
//! "what time is it" and "call me back later" (`cofiber_runtime::timers`);
//! everything else about how those get serviced is a host concern.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use cofiber_runtime::{TimerCallback, TimerSource};

/// Wall-clock timer for a non-browser host (CLI, native embedding). The
/// runtime is single-threaded and cooperative, so nothing here spawns a
/// thread — the embedder drives progress by calling `pump()` from its
/// own event loop, the same way a `setInterval(pump, 1)` would in JS.
pub struct WallClockTimer {
    start: Instant,
    pending: RefCell<Vec<(u64, TimerCallback)>>,
}

impl WallClockTimer {
    pub fn new() -> Rc<Self> {
        Rc::new(Self { start: Instant::now(), pending: RefCell::new(Vec::new()) })
    }

    /// Run every callback whose delay has elapsed. Call this from the
    /// embedder's own loop (a `tokio::time::interval`, a game loop tick,
    /// whatever drives the host forward).
    pub fn pump(&self) {
        let now = self.now_ms();
        loop {
            let due_idx = {
                let pending = self.pending.borrow();
                pending
                    .iter()
                    .enumerate()
                    .filter(|(_, (at, _))| *at <= now)
                    .min_by_key(|(_, (at, _))| *at)
                    .map(|(i, _)| i)
            };
            let Some(idx) = due_idx else { break };
            let (_, cb) = self.pending.borrow_mut().remove(idx);
            cb();
        }
    }
}

impl TimerSource for WallClockTimer {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn schedule(&self, delay_ms: u32, cb: TimerCallback) {
        let at = self.now_ms() + delay_ms as u64;
        self.pending.borrow_mut().push((at, cb));
    }
}

#[cfg(feature = "wasm")]
pub use wasm_timer::JsTimer;

#[cfg(feature = "wasm")]
mod wasm_timer {
    use super::*;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;

    /// Browser timer backed by `Date.now()` and `window.setTimeout`.
    pub struct JsTimer;

    impl JsTimer {
        pub fn new() -> Rc<Self> {
            Rc::new(Self)
        }
    }

    impl TimerSource for JsTimer {
        fn now_ms(&self) -> u64 {
            js_sys::Date::now() as u64
        }

        fn schedule(&self, delay_ms: u32, cb: TimerCallback) {
            let cb = RefCell::new(Some(cb));
            let closure = Closure::once_into_js(move || {
                if let Some(cb) = cb.borrow_mut().take() {
                    cb();
                }
            });
            let window = web_sys::window().expect("no global window in this wasm host");
            window
                .set_timeout_with_callback_and_timeout_and_arguments_0(
                    closure.unchecked_ref(),
                    delay_ms as i32,
                )
                .expect("setTimeout failed");
        }
    }
}
