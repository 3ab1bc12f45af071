//! Error taxonomy (spec §7).

use thiserror::Error;

/// Every way a fiber's execution can fail. All of these are caught at
/// the loop boundary (spec §4.1 step 5, §7) — none of them are meant to
/// unwind past `Interp::run`.
#[derive(Debug, Error, Clone)]
pub enum RuntimeError {
    /// Raised by `userError(msg)` in the compiled program.
    #[error("{0}")]
    UserError(String),

    /// `actionCall` pushed past the depth cap (spec §4.2, §8).
    #[error("stack overflow at depth {depth}")]
    StackOverflow { depth: u32 },

    /// `getResume()` called twice, or a call site's resume was never
    /// consumed before the next `setupResume` (spec §4.3).
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(&'static str),

    /// Programming-error guard (e.g. `checkResumeConsumed` firing
    /// outside a resume-capable call site).
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// Anything the compiled program's own code threw that wasn't one
    /// of the above.
    #[error("uncaught exception: {message}")]
    Uncaught { message: String, stack: String },
}

impl RuntimeError {
    /// Whether this error kind should be surfaced as a `userError`-style
    /// fault rather than a generic uncaught exception (spec §7: user
    /// error and stack overflow share the same propagation path).
    pub fn is_user_fault(&self) -> bool {
        matches!(self, RuntimeError::UserError(_) | RuntimeError::StackOverflow { .. })
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn stack(&self) -> String {
        match self {
            RuntimeError::Uncaught { stack, .. } => stack.clone(),
            _ => String::new(),
        }
    }
}

impl From<cofiber_heap::RefcountError> for RuntimeError {
    fn from(err: cofiber_heap::RefcountError) -> Self {
        RuntimeError::AssertionFailed(err.to_string())
    }
}
