use std::sync::Arc;

use crate::entry::Entry;
use crate::primitives::Mode;
use crate::token::{Key, Token, Value};

/// A held lock. Consumed by value on release, so Rust's ownership model
/// rules out a double release at compile time; there is no numeric stamp
/// here, only the issuer identity needed to reject release against the
/// wrong broker.
pub struct Permit<K: Key, V: Value> {
    pub(crate) token: Token<K, V>,
    pub(crate) mode: Mode,
    pub(crate) issuer: u64,
    pub(crate) entry: Arc<Entry>,
}

impl<K: Key, V: Value> Permit<K, V> {
    pub fn token(&self) -> &Token<K, V> {
        &self.token
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// The outcome of a non-blocking acquire. Kept separate from `Result` since
/// "the lock is currently unavailable" is an ordinary outcome, not a
/// failure.
pub enum TryAcquireOutcome<K: Key, V: Value> {
    Acquired(Permit<K, V>),
    Unavailable,
}

impl<K: Key, V: Value> TryAcquireOutcome<K, V> {
    pub fn is_acquired(&self) -> bool {
        matches!(self, TryAcquireOutcome::Acquired(_))
    }

    pub fn permit(self) -> Option<Permit<K, V>> {
        match self {
            TryAcquireOutcome::Acquired(p) => Some(p),
            TryAcquireOutcome::Unavailable => None,
        }
    }
}
