//! Live-object table: when refcount debugging is enabled, every
//! `RefObject` is registered here under a monotonically increasing id so
//! leaks can be dumped for diagnosis (spec §4.8, §3 "Live-object table").
//!
//! There is no collection policy. Cycles are never reclaimed — refcount
//! only, by design (spec §1 Non-goals).

use hashbrown::HashMap;
use thiserror::Error;

use cofiber_abi::ObjectId;

#[derive(Debug, Error)]
pub enum RefcountError {
    #[error("unregisterLiveObject: object {0} still has refcount {1} and keepAlive was not set")]
    StillReferenced(ObjectId, u32),
    #[error("unregisterLiveObject: object {0} was not registered")]
    NotRegistered(ObjectId),
}

/// A registered live object's bookkeeping entry. The table doesn't hold
/// the object itself (that's owned by the interpreter/heap) — only
/// enough to answer "is this still referenced" and print a diagnosis.
#[derive(Clone, Debug)]
pub struct LiveEntry {
    pub type_name: &'static str,
    pub refcount: u32,
}

/// Maps `ObjectId` to bookkeeping entries while `refCounting` is enabled
/// (spec §4.8). Disabled (the default) it costs nothing: every method is
/// a no-op unless `enabled()` was set at construction.
#[derive(Debug, Default)]
pub struct LiveObjectTable {
    enabled: bool,
    next_id: ObjectId,
    live: HashMap<ObjectId, LiveEntry>,
}

impl LiveObjectTable {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            next_id: 1,
            live: HashMap::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Register a freshly allocated object and return its id. Ids are
    /// monotonically increasing and never reused (spec §3).
    pub fn register_live_object(&mut self, type_name: &'static str, refcount: u32) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        if self.enabled {
            self.live.insert(id, LiveEntry { type_name, refcount });
        }
        id
    }

    /// Update the bookkeeping entry's refcount without touching the real
    /// owner's count (callers keep the two in sync; this is diagnostic
    /// shadow state only).
    pub fn update_refcount(&mut self, id: ObjectId, refcount: u32) {
        if let Some(entry) = self.live.get_mut(&id) {
            entry.refcount = refcount;
        }
    }

    /// Bump a tracked object's refcount by one (spec §4.5 "increment the
    /// action's refcount" around a fiber spawn). No-op if the id was
    /// never registered, or refcount tracking is disabled — registration
    /// only happens while `enabled`, so an untracked id means this call
    /// has nothing to balance.
    pub fn incref(&mut self, id: ObjectId) {
        if let Some(entry) = self.live.get_mut(&id) {
            entry.refcount += 1;
        }
    }

    /// Drop a tracked object's refcount by one. Same no-op conditions as
    /// [`incref`](Self::incref).
    pub fn decref(&mut self, id: ObjectId) {
        if let Some(entry) = self.live.get_mut(&id) {
            entry.refcount = entry.refcount.saturating_sub(1);
        }
    }

    /// Remove an object from the table. Unless `keep_alive` is set, its
    /// tracked refcount must be zero (spec §4.8).
    pub fn unregister_live_object(
        &mut self,
        id: ObjectId,
        keep_alive: bool,
    ) -> Result<(), RefcountError> {
        if !self.enabled {
            return Ok(());
        }
        let Some(entry) = self.live.remove(&id) else {
            return Err(RefcountError::NotRegistered(id));
        };
        if !keep_alive && entry.refcount != 0 {
            // Put it back so the table stays consistent with reality —
            // the caller is expected to treat this as a fatal bug.
            let refcount = entry.refcount;
            self.live.insert(id, entry);
            return Err(RefcountError::StillReferenced(id, refcount));
        }
        Ok(())
    }

    /// Enumerate every still-live object for leak diagnosis (debug-only,
    /// spec §4.8 `dumpLivePointers`).
    pub fn dump_live_pointers(&self) -> Vec<(ObjectId, LiveEntry)> {
        let mut out: Vec<_> = self
            .live
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut table = LiveObjectTable::new(true);
        let a = table.register_live_object("Action", 1);
        let b = table.register_live_object("Action", 1);
        assert!(b > a);
        table.unregister_live_object(a, false).unwrap();
        let c = table.register_live_object("Action", 1);
        assert!(c > b);
    }

    #[test]
    fn unregister_rejects_still_referenced_object() {
        let mut table = LiveObjectTable::new(true);
        let id = table.register_live_object("Action", 2);
        let err = table.unregister_live_object(id, false).unwrap_err();
        assert!(matches!(err, RefcountError::StillReferenced(_, 2)));
        // the entry must still be present after a rejected unregister
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn keep_alive_bypasses_the_refcount_check() {
        let mut table = LiveObjectTable::new(true);
        let id = table.register_live_object("Action", 2);
        table.unregister_live_object(id, true).unwrap();
        assert_eq!(table.live_count(), 0);
    }

    #[test]
    fn disabled_table_assigns_ids_but_tracks_nothing() {
        let mut table = LiveObjectTable::new(false);
        let id = table.register_live_object("Action", 1);
        assert_eq!(table.live_count(), 0);
        table.unregister_live_object(id, false).unwrap();
    }

    #[test]
    fn incref_decref_balance_around_a_registered_object() {
        let mut table = LiveObjectTable::new(true);
        let id = table.register_live_object("Action", 1);
        table.incref(id);
        let err = table.unregister_live_object(id, false).unwrap_err();
        assert!(matches!(err, RefcountError::StillReferenced(_, 2)));
        table.decref(id);
        table.unregister_live_object(id, false).unwrap();
    }

    #[test]
    fn incref_decref_on_an_untracked_id_is_a_no_op() {
        let mut table = LiveObjectTable::new(true);
        table.incref(999);
        table.decref(999);
        assert_eq!(table.live_count(), 0);
    }
}
