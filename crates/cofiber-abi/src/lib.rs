//! Wire-level types shared by every layer of the cofiber runtime.
//!
//! Nothing in this crate knows how to *run* a program; it only describes
//! the shapes that cross a boundary: the value representation fibers pass
//! around, the inbound/outbound message envelopes exchanged with the host,
//! and the debug location table used to decorate exceptions and traces.

pub mod debug_info;
pub mod message;
pub mod value;

pub use debug_info::{DebugInfo, DebugLoc, LabelDebugInfo, SourceLoc};
pub use message::{
    BreakpointPayload, DebuggerOutbound, DebuggerSubtype, InboundMessage, OutboundMessage,
    RunMessage, RunState, VariableEntry,
};
pub use value::{ObjectId, RefObject, Value, VariablesReference};
