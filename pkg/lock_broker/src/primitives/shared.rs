use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::primitives::Mode;

/// Many readers xor many writers: `0` unheld, `>0` is a count of write
/// holders, `<0` is a count of read holders.
///
/// Acquisition here can block indefinitely, which requires an OS wait
/// mechanism regardless of primitive, so the counter lives behind the same
/// `Mutex`+`Condvar` monitor `RwExclusion` uses rather than a bare atomic,
/// keeping the same sign convention and the same "delta applied only if the
/// sign permits" admission rule.
pub struct SharedExclusion {
    count: Mutex<isize>,
    condvar: Condvar,
}

impl SharedExclusion {
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    fn delta(mode: Mode) -> isize {
        match mode {
            Mode::Write => 1,
            Mode::Read => -1,
        }
    }

    fn admits(count: isize, mode: Mode) -> bool {
        match mode {
            Mode::Write => count >= 0,
            Mode::Read => count <= 0,
        }
    }

    pub fn acquire(&self, mode: Mode) {
        let mut guard = self.count.lock().unwrap();
        while !Self::admits(*guard, mode) {
            guard = self.condvar.wait(guard).unwrap();
        }
        *guard += Self::delta(mode);
    }

    pub fn try_acquire(&self, mode: Mode) -> bool {
        let mut guard = self.count.lock().unwrap();
        if Self::admits(*guard, mode) {
            *guard += Self::delta(mode);
            true
        } else {
            false
        }
    }

    pub fn acquire_timeout(&self, mode: Mode, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.count.lock().unwrap();
        while !Self::admits(*guard, mode) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next_guard, result) = self.condvar.wait_timeout(guard, deadline - now).unwrap();
            guard = next_guard;
            if result.timed_out() && !Self::admits(*guard, mode) {
                return false;
            }
        }
        *guard += Self::delta(mode);
        true
    }

    pub fn acquire_interruptible(&self, mode: Mode, cancel: &CancelToken) -> bool {
        const POLL: Duration = Duration::from_millis(20);
        let mut guard = self.count.lock().unwrap();
        while !Self::admits(*guard, mode) {
            if cancel.is_cancelled() {
                return false;
            }
            let (next_guard, _) = self.condvar.wait_timeout(guard, POLL).unwrap();
            guard = next_guard;
        }
        if cancel.is_cancelled() {
            return false;
        }
        *guard += Self::delta(mode);
        true
    }

    /// Releases a hold acquired under `mode`. Releasing a mode that does not
    /// match an outstanding hold of that sign panics rather than silently
    /// inverting the count, since it indicates a broker-internal bug:
    /// callers can never observe a `Permit` whose mode disagrees with how
    /// it was acquired.
    pub fn release(&self, mode: Mode) {
        let mut guard = self.count.lock().unwrap();
        let delta = Self::delta(mode);
        assert!(
            (delta > 0 && *guard > 0) || (delta < 0 && *guard < 0),
            "released the shared primitive from a state that does not hold that mode"
        );
        *guard -= delta;
        drop(guard);
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_writers_then_many_readers() {
        let lock = SharedExclusion::new();
        assert!(lock.try_acquire(Mode::Write));
        assert!(lock.try_acquire(Mode::Write));
        assert!(lock.try_acquire(Mode::Write));
        assert!(!lock.try_acquire(Mode::Read));
        lock.release(Mode::Write);
        lock.release(Mode::Write);
        lock.release(Mode::Write);

        assert!(lock.try_acquire(Mode::Read));
        assert!(lock.try_acquire(Mode::Read));
        assert!(!lock.try_acquire(Mode::Write));
        lock.release(Mode::Read);
        lock.release(Mode::Read);
    }

    #[test]
    #[should_panic]
    fn mismatched_release_panics_instead_of_inverting() {
        let lock = SharedExclusion::new();
        assert!(lock.try_acquire(Mode::Write));
        lock.release(Mode::Read);
    }
}
