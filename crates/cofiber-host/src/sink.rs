//! Host-side `PostMessageSink` implementations.

use cofiber_runtime::PostMessageSink;

/// Logs every outbound message at debug level instead of delivering it
/// anywhere. Useful for a native host that doesn't have a postMessage
/// bridge of its own yet.
pub struct LoggingSink;

impl PostMessageSink for LoggingSink {
    fn post(&self, msg: cofiber_abi::OutboundMessage) {
        log::debug!("outbound: {msg:?}");
    }
}

#[cfg(feature = "wasm")]
pub use wasm_sink::JsPostMessageSink;

#[cfg(feature = "wasm")]
mod wasm_sink {
    use super::*;
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = self, js_name = postMessage)]
        fn js_post_message(msg: JsValue);
    }

    /// Bridges outbound messages to the embedding page/worker via the
    /// global `postMessage` (spec §6 — the same channel pxt's own sim
    /// iframe uses).
    pub struct JsPostMessageSink;

    impl PostMessageSink for JsPostMessageSink {
        fn post(&self, msg: cofiber_abi::OutboundMessage) {
            match serde_wasm_bindgen::to_value(&msg) {
                Ok(js_msg) => js_post_message(js_msg),
                Err(e) => log::error!("failed to serialize outbound message: {e}"),
            }
        }
    }
}
