use std::sync::atomic::{AtomicIsize, Ordering};

use crate::primitives::Primitive;

/// Sentinel refcount marking an entry dead. Must never be reachable by
/// ordinary increments/decrements from a live count, which is why it sits
/// far below any achievable live value.
pub const DEAD: isize = isize::MIN;

/// A directory value: a concrete lock primitive plus its reference count.
///
/// Entries are identity-distinct: the directory stores `Arc<Entry>` and the
/// reclaimer's conditional remove compares pointer identity, never value
/// equality, so a replacement entry inserted after a reclaim can never be
/// mistaken for the one that was just killed.
pub struct Entry {
    pub primitive: Primitive,
    refcount: AtomicIsize,
}

impl Entry {
    pub fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            refcount: AtomicIsize::new(0),
        }
    }

    /// Bumps the refcount for a new acquirer and returns the post-bump
    /// value. The caller must treat a non-positive result as "this entry is
    /// dead, roll back and retry".
    pub fn bump(&self) -> isize {
        self.refcount.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Rolls back a bump that turned out to target a dead entry, or
    /// releases a previously-successful acquisition.
    pub fn unbump(&self) {
        self.refcount.fetch_sub(1, Ordering::AcqRel);
    }

    /// The reclaimer's CAS: only succeeds if the refcount is currently
    /// exactly zero, i.e. no acquirer holds or is contesting this entry.
    pub fn try_kill(&self) -> bool {
        self.refcount
            .compare_exchange(0, DEAD, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[cfg(test)]
    pub fn refcount(&self) -> isize {
        self.refcount.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_unbump_round_trips() {
        let e = Entry::new(Primitive::ordinary());
        assert_eq!(e.bump(), 1);
        assert_eq!(e.bump(), 2);
        e.unbump();
        e.unbump();
        assert_eq!(e.refcount(), 0);
    }

    #[test]
    fn try_kill_only_succeeds_at_zero() {
        let e = Entry::new(Primitive::ordinary());
        e.bump();
        assert!(!e.try_kill());
        e.unbump();
        assert!(e.try_kill());
        assert!(!e.try_kill());
    }

    #[test]
    fn bump_after_death_is_non_positive() {
        let e = Entry::new(Primitive::ordinary());
        assert!(e.try_kill());
        assert!(e.bump() <= 0);
    }
}
