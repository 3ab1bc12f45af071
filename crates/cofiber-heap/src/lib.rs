//! Refcount bookkeeping, the debugger's heap snapshot, and the registry
//! through which native extensions are dispatched (spec §4.8, §3 "Heap
//! snapshot", §4.3).
//!
//! No cycle collection lives here, and none ever will (spec §1
//! Non-goals) — this crate tracks live objects for leak diagnosis only.

pub mod extern_registry;
pub mod refcount;
pub mod snapshot;

pub use extern_registry::{ExternCallCtx, ExternOutcome, NativeExtension, NativeExtensionRegistry};
pub use refcount::{LiveObjectTable, RefcountError};
pub use snapshot::HeapSnapshot;
