use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info_span, trace};

use crate::cancel::CancelToken;
use crate::config::BrokerConfig;
use crate::directory::Directory;
use crate::error::{BrokerError, Result};
use crate::permit::{Permit, TryAcquireOutcome};
use crate::primitives::Mode;
use crate::range_block::RangeBlockEngine;
use crate::reclaimer::Reclaimer;
use crate::token::{Key, Token, Value};

static NEXT_BROKER_ID: AtomicU64 = AtomicU64::new(1);

/// The generic "something that hands out locks" interface. Lets a caller
/// hold either a real [`LockBroker`] or a [`crate::noop::NoopBroker`] behind
/// the same type, so an isolation context that needs no locking at all
/// doesn't force a divergent code path.
pub trait LockSource<K: Key, V: Value> {
    fn read_lock(&self, token: Token<K, V>) -> Result<Permit<K, V>>;
    fn write_lock(&self, token: Token<K, V>) -> Result<Permit<K, V>>;
    fn try_read_lock(&self, token: Token<K, V>) -> Result<TryAcquireOutcome<K, V>>;
    fn try_write_lock(&self, token: Token<K, V>) -> Result<TryAcquireOutcome<K, V>>;
    fn release(&self, permit: Permit<K, V>) -> Result<()>;
}

/// The granular lock broker.
pub struct LockBroker<K: Key, V: Value> {
    id: u64,
    directory: Arc<Directory<K, V>>,
    range_block: Arc<RangeBlockEngine<K, V>>,
    reclaimer: Mutex<Option<Reclaimer>>,
    shut_down: AtomicBool,
}

impl<K: Key, V: Value> LockBroker<K, V> {
    pub fn new(config: BrokerConfig) -> Self {
        let directory = Arc::new(Directory::new());
        let reclaimer = Reclaimer::spawn(
            directory.clone(),
            config.reclaim_interval,
            config.reclaim_batch_yield,
        );
        Self {
            id: NEXT_BROKER_ID.fetch_add(1, Ordering::Relaxed),
            directory,
            range_block: Arc::new(RangeBlockEngine::new()),
            reclaimer: Mutex::new(Some(reclaimer)),
            shut_down: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(BrokerError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn wait_for_range_clearance(&self, token: &Token<K, V>) {
        while self.range_block.is_blocked(&self.directory, token) {
            trace!(?token, "range-block spin");
            std::thread::yield_now();
        }
    }

    fn finish_acquire(&self, token: Token<K, V>, mode: Mode, entry: Arc<crate::entry::Entry>) -> Permit<K, V> {
        self.range_block.record_acquired(&token);
        debug!(?token, ?mode, "acquired");
        Permit {
            token,
            mode,
            issuer: self.id,
            entry,
        }
    }

    fn acquire(&self, token: Token<K, V>, mode: Mode) -> Result<Permit<K, V>> {
        self.check_open()?;
        let span = info_span!("lock_broker.acquire", kind = ?token.kind(), ?mode);
        let _enter = span.enter();

        self.wait_for_range_clearance(&token);
        let entry = self.directory.ensure_entry(&token);
        entry.primitive.acquire(mode);
        Ok(self.finish_acquire(token, mode, entry))
    }

    fn try_acquire(&self, token: Token<K, V>, mode: Mode) -> Result<TryAcquireOutcome<K, V>> {
        self.check_open()?;
        let span = info_span!("lock_broker.try_acquire", kind = ?token.kind(), ?mode);
        let _enter = span.enter();

        if self.range_block.is_blocked(&self.directory, &token) {
            return Ok(TryAcquireOutcome::Unavailable);
        }

        let entry = self.directory.ensure_entry(&token);
        if entry.primitive.try_acquire(mode) {
            Ok(TryAcquireOutcome::Acquired(self.finish_acquire(token, mode, entry)))
        } else {
            self.directory.release(&entry);
            Ok(TryAcquireOutcome::Unavailable)
        }
    }

    fn acquire_timeout(&self, token: Token<K, V>, mode: Mode, timeout: Duration) -> Result<Permit<K, V>> {
        self.check_open()?;
        let deadline = Instant::now() + timeout;

        while self.range_block.is_blocked(&self.directory, &token) {
            if Instant::now() >= deadline {
                return Err(BrokerError::TimedOut(timeout));
            }
            trace!(?token, "range-block spin (timed)");
            std::thread::yield_now();
        }

        let entry = self.directory.ensure_entry(&token);
        let remaining = deadline.saturating_duration_since(Instant::now());
        match entry.primitive.acquire_timeout(mode, remaining) {
            Ok(()) => Ok(self.finish_acquire(token, mode, entry)),
            Err(e) => {
                self.directory.release(&entry);
                Err(e)
            }
        }
    }

    fn acquire_interruptible(&self, token: Token<K, V>, mode: Mode, cancel: &CancelToken) -> Result<Permit<K, V>> {
        self.check_open()?;

        while self.range_block.is_blocked(&self.directory, &token) {
            if cancel.is_cancelled() {
                return Err(BrokerError::Interrupted);
            }
            trace!(?token, "range-block spin (interruptible)");
            std::thread::yield_now();
        }

        let entry = self.directory.ensure_entry(&token);
        match entry.primitive.acquire_interruptible(mode, cancel) {
            Ok(()) => Ok(self.finish_acquire(token, mode, entry)),
            Err(e) => {
                self.directory.release(&entry);
                Err(e)
            }
        }
    }

    pub fn read_lock_timeout(&self, token: Token<K, V>, timeout: Duration) -> Result<Permit<K, V>> {
        self.acquire_timeout(token, Mode::Read, timeout)
    }

    pub fn write_lock_timeout(&self, token: Token<K, V>, timeout: Duration) -> Result<Permit<K, V>> {
        self.acquire_timeout(token, Mode::Write, timeout)
    }

    pub fn read_lock_interruptible(&self, token: Token<K, V>, cancel: &CancelToken) -> Result<Permit<K, V>> {
        self.acquire_interruptible(token, Mode::Read, cancel)
    }

    pub fn write_lock_interruptible(&self, token: Token<K, V>, cancel: &CancelToken) -> Result<Permit<K, V>> {
        self.acquire_interruptible(token, Mode::Write, cancel)
    }

    /// Stops the reclaimer and rejects new acquisitions. In-flight permits
    /// may still be released normally afterward.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        if let Some(mut reclaimer) = self.reclaimer.lock().unwrap().take() {
            reclaimer.stop();
        }
    }

}

impl<K: Key, V: Value> Default for LockBroker<K, V> {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

impl<K: Key, V: Value> LockSource<K, V> for LockBroker<K, V> {
    fn read_lock(&self, token: Token<K, V>) -> Result<Permit<K, V>> {
        self.acquire(token, Mode::Read)
    }

    fn write_lock(&self, token: Token<K, V>) -> Result<Permit<K, V>> {
        self.acquire(token, Mode::Write)
    }

    fn try_read_lock(&self, token: Token<K, V>) -> Result<TryAcquireOutcome<K, V>> {
        self.try_acquire(token, Mode::Read)
    }

    fn try_write_lock(&self, token: Token<K, V>) -> Result<TryAcquireOutcome<K, V>> {
        self.try_acquire(token, Mode::Write)
    }

    /// Range tables are updated before the refcount is decremented, so a
    /// concurrent range-block check never observes a refcount drop to zero
    /// (and a possible reclaim) before the coverage this release is
    /// withdrawing has actually been removed.
    fn release(&self, permit: Permit<K, V>) -> Result<()> {
        if permit.issuer != self.id {
            return Err(BrokerError::ForeignIssuer);
        }

        self.range_block.record_released(&permit.token);
        permit.entry.primitive.release(permit.mode);
        self.directory.release(&permit.entry);
        debug!(token = ?permit.token, mode = ?permit.mode, "released");
        Ok(())
    }
}
