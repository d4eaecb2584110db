use std::sync::Arc;

use crate::broker::LockSource;
use crate::entry::Entry;
use crate::error::Result;
use crate::permit::{Permit, TryAcquireOutcome};
use crate::primitives::{Mode, Primitive};
use crate::token::{Key, Token, Value};

/// A broker that grants every acquisition immediately and never blocks
/// anything. Used by isolation contexts that own their own snapshot and
/// need no cross-caller coordination, so the rest of the code can stay
/// generic over [`LockSource`] instead of special-casing "no locking
/// here."
#[derive(Default)]
pub struct NoopBroker;

impl NoopBroker {
    pub fn new() -> Self {
        Self
    }
}

fn sentinel<K: Key, V: Value>(token: Token<K, V>, mode: Mode) -> Permit<K, V> {
    Permit {
        token,
        mode,
        issuer: 0,
        entry: Arc::new(Entry::new(Primitive::ordinary())),
    }
}

impl<K: Key, V: Value> LockSource<K, V> for NoopBroker {
    fn read_lock(&self, token: Token<K, V>) -> Result<Permit<K, V>> {
        Ok(sentinel(token, Mode::Read))
    }

    fn write_lock(&self, token: Token<K, V>) -> Result<Permit<K, V>> {
        Ok(sentinel(token, Mode::Write))
    }

    fn try_read_lock(&self, token: Token<K, V>) -> Result<TryAcquireOutcome<K, V>> {
        Ok(TryAcquireOutcome::Acquired(sentinel(token, Mode::Read)))
    }

    fn try_write_lock(&self, token: Token<K, V>) -> Result<TryAcquireOutcome<K, V>> {
        Ok(TryAcquireOutcome::Acquired(sentinel(token, Mode::Write)))
    }

    fn release(&self, _permit: Permit<K, V>) -> Result<()> {
        Ok(())
    }
}
