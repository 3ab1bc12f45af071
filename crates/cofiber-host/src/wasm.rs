//! wasm-bindgen entry points (spec §6). These are the only symbols a
//! JS embedder touches directly; everything else is driven through
//! `postMessage`/`onmessage`, same as the sim iframe this runtime
//! replaces.

use std::rc::Rc;

use wasm_bindgen::prelude::*;

use cofiber_abi::InboundMessage;
use cofiber_runtime::{NullProgram, RuntimeConfig};

use crate::runtime::Runtime;
use crate::sink::JsPostMessageSink;
use crate::timers::JsTimer;

#[wasm_bindgen(start)]
pub fn wasm_init() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Thin JS-facing wrapper around `Runtime`. A real embedder constructs
/// one per "run" message with a `ProgramImage` produced by its own
/// code-loading step (spec §1 Non-goals — out of scope here, so this
/// entry point starts from `NullProgram` until that's wired in).
#[wasm_bindgen]
pub struct JsRuntime {
    inner: Runtime,
}

#[wasm_bindgen]
impl JsRuntime {
    #[wasm_bindgen(constructor)]
    pub fn new(runtime_id: String) -> JsRuntime {
        let sink = Rc::new(JsPostMessageSink);
        let timer = JsTimer::new();
        JsRuntime {
            inner: Runtime::new(runtime_id, Rc::new(NullProgram), sink, timer, RuntimeConfig::default()),
        }
    }

    /// Feed one inbound message, JSON-encoded the same way the host's
    /// `postMessage` payloads are shaped (spec §6).
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, js_msg: JsValue) -> Result<(), JsValue> {
        let msg: InboundMessage = serde_wasm_bindgen::from_value(js_msg)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.inner.handle_inbound(msg);
        Ok(())
    }

    pub fn kill(&self) {
        self.inner.kill();
    }
}
