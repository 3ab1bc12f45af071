//! Outbound message sink boundary (spec §6). All outbound traffic —
//! status, serial, breakpoint, debugger trace/variables — goes through
//! one sink, FIFO (spec §5).

use cofiber_abi::OutboundMessage;

pub trait PostMessageSink {
    fn post(&self, msg: OutboundMessage);
}

/// Discards everything. Useful as a default when the embedding host
/// hasn't wired a real bridge yet.
pub struct NullSink;

impl PostMessageSink for NullSink {
    fn post(&self, _msg: OutboundMessage) {}
}

/// Records every posted message in order, for tests that assert on the
/// exact sequence the host would have received.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: std::cell::RefCell<Vec<OutboundMessage>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<OutboundMessage> {
        self.messages.borrow_mut().drain(..).collect()
    }
}

impl PostMessageSink for RecordingSink {
    fn post(&self, msg: OutboundMessage) {
        self.messages.borrow_mut().push(msg);
    }
}
