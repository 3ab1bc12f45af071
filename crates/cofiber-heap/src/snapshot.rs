//! Heap snapshot: while a fiber is paused at a breakpoint, a mapping from
//! variable-reference handles to resolved variables, used to answer the
//! debugger's `variables` request (spec §3 "Heap snapshot", §4.7).

use hashbrown::HashMap;

use cofiber_abi::message::VariableEntry;
use cofiber_abi::VariablesReference;

/// Snapshot of the paused fiber's visible scopes. Built fresh each time a
/// breakpoint fires; dropped on resume. A `variables` request arriving
/// while no fiber is paused finds nothing to resolve against.
#[derive(Debug, Default)]
pub struct HeapSnapshot {
    scopes: HashMap<VariablesReference, Vec<VariableEntry>>,
    next_ref: VariablesReference,
}

impl HeapSnapshot {
    pub fn new() -> Self {
        Self {
            scopes: HashMap::new(),
            // 0 is reserved to mean "no reference" on the wire.
            next_ref: 1,
        }
    }

    /// Register a scope (locals, globals, or an expanded object/array)
    /// and return the reference the host can later resolve.
    pub fn add_scope(&mut self, vars: Vec<VariableEntry>) -> VariablesReference {
        let id = self.next_ref;
        self.next_ref += 1;
        self.scopes.insert(id, vars);
        id
    }

    /// Resolve a `variablesReference` against this snapshot (spec §4.7
    /// `variables` message). Returns `None` if the reference is unknown
    /// or the snapshot has since been cleared (fiber no longer paused).
    pub fn resolve(&self, reference: VariablesReference) -> Option<&[VariableEntry]> {
        self.scopes.get(&reference).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
        self.next_ref = 1;
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, value: &str) -> VariableEntry {
        VariableEntry {
            name: name.into(),
            value: value.into(),
            variables_reference: 0,
        }
    }

    #[test]
    fn resolves_registered_scope() {
        let mut snap = HeapSnapshot::new();
        let r = snap.add_scope(vec![var("x", "42")]);
        let vars = snap.resolve(r).unwrap();
        assert_eq!(vars[0].name, "x");
    }

    #[test]
    fn unknown_reference_resolves_to_nothing() {
        let snap = HeapSnapshot::new();
        assert!(snap.resolve(999).is_none());
    }

    #[test]
    fn clear_drops_every_scope_and_resets_ids() {
        let mut snap = HeapSnapshot::new();
        let r1 = snap.add_scope(vec![var("x", "1")]);
        snap.clear();
        assert!(snap.resolve(r1).is_none());
        let r2 = snap.add_scope(vec![var("y", "2")]);
        assert_eq!(r1, r2);
    }
}
