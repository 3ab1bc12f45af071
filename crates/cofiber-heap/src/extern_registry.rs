//! Native extension dispatch table.
//!
//! "Native extensions exposed to the compiled program" (spec §4.3) are
//! Rust functions the embedding host registers under an id the compiled
//! program's `CallExtern`-equivalent instruction looks up by. The
//! registry itself only dispatches; the resume/suspension protocol
//! (`setupResume`/`getResume`, spec §4.3) is owned by the interpreter
//! loop in `cofiber-runtime`, which is why `get_resume` below is a
//! closure supplied by the caller rather than a type this crate knows
//! about — it keeps `cofiber-heap` from depending back on
//! `cofiber-runtime`.

use std::rc::Rc;

use hashbrown::HashMap;

use cofiber_abi::Value;

/// Outcome of dispatching one native extension call.
pub enum ExternOutcome {
    /// Completed synchronously. A call that never needed to suspend
    /// must still resolve its call site's pending resume (by calling
    /// `overwriteResume` through the handle obtained from
    /// `get_resume`) before returning this.
    Ok(Vec<Value>),
    /// The extension consumed `getResume()` and will invoke it later,
    /// asynchronously (spec §4.3).
    Suspended,
    /// The extension id has no registered handler, or the handler
    /// itself reported a failure.
    Panic(String),
}

/// Per-call context handed to a `NativeExtension`.
pub struct ExternCallCtx<'a> {
    pub args: &'a [Value],
    /// Retrieves the one-shot resume closure the interpreter set up for
    /// this call site, if any (spec §4.3 `getResume`). Calling it twice,
    /// or on a call site that never set one up, returns `None` the
    /// second time — enforcing at-most-once consumption is the
    /// interpreter's job, not this registry's.
    pub get_resume: &'a mut dyn FnMut() -> Option<Box<dyn FnOnce(Value)>>,
}

pub trait NativeExtension {
    fn call(&self, ctx: &mut ExternCallCtx) -> ExternOutcome;
}

impl<F> NativeExtension for F
where
    F: Fn(&mut ExternCallCtx) -> ExternOutcome,
{
    fn call(&self, ctx: &mut ExternCallCtx) -> ExternOutcome {
        self(ctx)
    }
}

#[derive(Default)]
pub struct NativeExtensionRegistry {
    extensions: HashMap<u32, Rc<dyn NativeExtension>>,
}

impl NativeExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extern_id: u32, ext: impl NativeExtension + 'static) {
        self.extensions.insert(extern_id, Rc::new(ext));
    }

    pub fn call(&self, extern_id: u32, ctx: &mut ExternCallCtx) -> ExternOutcome {
        match self.extensions.get(&extern_id) {
            Some(ext) => ext.call(ctx),
            None => ExternOutcome::Panic(format!("no native extension registered for id {extern_id}")),
        }
    }
}
