use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::entry::Entry;
use crate::primitives::Primitive;
use crate::token::{Key, Token, TokenKind, Value};

/// The on-demand, reference-counted lock directory.
///
/// Backed by `DashMap`, which shards its internal map and takes a lock per
/// shard rather than a single global lock: two unrelated tokens landing in
/// different shards never contend.
pub struct Directory<K: Key, V: Value> {
    map: DashMap<Token<K, V>, Arc<Entry>>,
}

impl<K: Key, V: Value> Directory<K, V> {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }

    fn primitive_for(token: &Token<K, V>) -> Primitive {
        match token.kind() {
            TokenKind::Shared => Primitive::shared(),
            TokenKind::Ordinary | TokenKind::Range => Primitive::ordinary(),
        }
    }

    /// Finds or creates the entry for `token`, bumps its refcount, and
    /// re-verifies the bump landed on a live, still-current entry, retrying
    /// on a lost race. Never returns a dead entry and never returns one that
    /// no longer matches `token` in the directory.
    pub fn ensure_entry(&self, token: &Token<K, V>) -> Arc<Entry> {
        loop {
            let entry = self
                .map
                .entry(token.clone())
                .or_insert_with(|| Arc::new(Entry::new(Self::primitive_for(token))))
                .clone();

            let count = entry.bump();
            if count > 0 {
                let still_current = self
                    .map
                    .get(token)
                    .map(|cur| Arc::ptr_eq(&cur, &entry))
                    .unwrap_or(false);

                if still_current {
                    return entry;
                }
            }

            // Either the bump landed on a dead entry, or the reclaimer swapped
            // (or removed) the mapping between our insert and our bump.
            entry.unbump();
            trace!(?token, "ensure_entry retry: lost race with reclaimer");
            std::thread::yield_now();
        }
    }

    /// Releases one hold against `entry`. Does not remove the binding from
    /// the directory; that is the reclaimer's job.
    pub fn release(&self, entry: &Arc<Entry>) {
        entry.unbump();
    }

    /// Whether `token` currently has a (live) binding. Used by the
    /// range-block engine's LT/LTE/GT/GTE/BETWEEN test, which must not treat
    /// a write point as blocking once its own lock entry is gone.
    pub fn contains(&self, token: &Token<K, V>) -> bool {
        self.map.contains_key(token)
    }

    /// A best-effort snapshot of the tokens currently bound, for the
    /// reclaimer to walk. New entries inserted mid-walk may or may not be
    /// observed; that's acceptable since they necessarily have a fresh
    /// positive refcount and would fail the reclaimer's CAS anyway.
    pub fn snapshot_tokens(&self) -> Vec<Token<K, V>> {
        self.map.iter().map(|r| r.key().clone()).collect()
    }

    /// Attempts to reclaim exactly one token's entry. Returns `true` if this
    /// call is the one that killed and removed it.
    pub fn try_reclaim(&self, token: &Token<K, V>) -> bool {
        let Some(entry) = self.map.get(token).map(|r| r.clone()) else {
            return false;
        };

        if !entry.try_kill() {
            return false;
        }

        // Conditional remove: only drop the binding if it still points at the
        // instance we just killed. A concurrent ensure_entry could have
        // already replaced it (impossible once killed, but the check is what
        // makes that impossibility structural rather than assumed).
        self.map.remove_if(token, |_, v| Arc::ptr_eq(v, &entry));
        true
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}
