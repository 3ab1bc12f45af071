//! Values that flow through the interpreter: register/scratch contents,
//! resume payloads, event queue payloads, and debugger variable values.
//!
//! This is deliberately small. The compiled program's own value system
//! (structs, closures, arrays) is the code-loading collaborator's concern
//! (spec §1, §4.9) — `Value` only needs to carry what the runtime itself
//! inspects: scalars, a reference to a host heap object, and the one
//! compound shape the resume protocol understands natively, `FnWrapper`.

use std::fmt;
use std::rc::Rc;

/// Monotonically increasing id assigned to every tracked `RefObject`
/// (spec §4.8). Never reused within a runtime's lifetime.
pub type ObjectId = u64;

/// A handle the debugger's `variables` request resolves against the live
/// heap snapshot (spec §4.7, §3 "Heap snapshot").
pub type VariablesReference = u64;

/// A value the runtime understands well enough to move around without
/// needing to know the compiled program's own type system.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Int(i32),
    Str(Rc<str>),
    /// Opaque reference into the host's heap, tracked by `ObjectId` when
    /// refcount debugging is enabled.
    Ref(ObjectId),
    /// A not-yet-invoked function value a native extension handed back
    /// to the resume mechanism, which builds the child frame itself
    /// (spec §4.3, DESIGN NOTES "FnWrapper tail dispatch").
    FnWrapper {
        action: ObjectId,
        caps: Vec<Value>,
        args: Vec<Value>,
    },
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Ref(id) => write!(f, "ref#{id}"),
            Value::FnWrapper { action, .. } => write!(f, "fn#{action}(..)"),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

/// Trait implemented by any heap object the refcount bookkeeping (spec
/// §4.8) needs to track. A target-language implementation can hide the
/// inc/dec traffic inside owned handles; exposing it as a trait is the
/// explicit alternative DESIGN NOTES calls out.
pub trait RefObject {
    fn object_id(&self) -> ObjectId;
    fn refcount(&self) -> u32;
    fn incref(&self);
    fn decref(&self) -> u32;
}
