//! Embedding surface for the cofiber runtime.
//!
//! `Runtime` wires an `Interp` to a `PostMessageSink` and a
//! `TimerSource` and speaks the host message protocol (spec §6)
//! directly; everything wasm-specific is feature-gated behind `wasm`
//! so a native embedder pulls in none of it.

pub mod runtime;
pub mod sink;
pub mod timers;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use runtime::Runtime;
pub use sink::LoggingSink;
pub use timers::WallClockTimer;
