use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::primitives::Mode;

/// Any number of readers concurrently, or exactly one writer. Writers and
/// readers mutually exclude.
pub struct RwExclusion {
    state: Mutex<State>,
    condvar: Condvar,
}

#[derive(Default)]
struct State {
    readers: usize,
    writer: bool,
}

impl State {
    fn admits(&self, mode: Mode) -> bool {
        match mode {
            Mode::Read => !self.writer,
            Mode::Write => !self.writer && self.readers == 0,
        }
    }

    fn admit(&mut self, mode: Mode) {
        match mode {
            Mode::Read => self.readers += 1,
            Mode::Write => self.writer = true,
        }
    }
}

impl RwExclusion {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            condvar: Condvar::new(),
        }
    }

    pub fn acquire(&self, mode: Mode) {
        let mut guard = self.state.lock().unwrap();
        while !guard.admits(mode) {
            guard = self.condvar.wait(guard).unwrap();
        }
        guard.admit(mode);
    }

    pub fn try_acquire(&self, mode: Mode) -> bool {
        let mut guard = self.state.lock().unwrap();
        if guard.admits(mode) {
            guard.admit(mode);
            true
        } else {
            false
        }
    }

    pub fn acquire_timeout(&self, mode: Mode, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.state.lock().unwrap();
        while !guard.admits(mode) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next_guard, result) = self
                .condvar
                .wait_timeout(guard, deadline - now)
                .unwrap();
            guard = next_guard;
            if result.timed_out() && !guard.admits(mode) {
                return false;
            }
        }
        guard.admit(mode);
        true
    }

    pub fn acquire_interruptible(&self, mode: Mode, cancel: &CancelToken) -> bool {
        const POLL: Duration = Duration::from_millis(20);
        let mut guard = self.state.lock().unwrap();
        while !guard.admits(mode) {
            if cancel.is_cancelled() {
                return false;
            }
            let (next_guard, _) = self.condvar.wait_timeout(guard, POLL).unwrap();
            guard = next_guard;
        }
        if cancel.is_cancelled() {
            return false;
        }
        guard.admit(mode);
        true
    }

    pub fn release(&self, mode: Mode) {
        let mut guard = self.state.lock().unwrap();
        match mode {
            Mode::Read => {
                guard.readers = guard
                    .readers
                    .checked_sub(1)
                    .expect("released a read lock that was never acquired");
            }
            Mode::Write => {
                assert!(guard.writer, "released a write lock that was never acquired");
                guard.writer = false;
            }
        }
        drop(guard);
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_share_writers_exclude() {
        let lock = RwExclusion::new();
        assert!(lock.try_acquire(Mode::Read));
        assert!(lock.try_acquire(Mode::Read));
        assert!(!lock.try_acquire(Mode::Write));
        lock.release(Mode::Read);
        lock.release(Mode::Read);
        assert!(lock.try_acquire(Mode::Write));
        assert!(!lock.try_acquire(Mode::Read));
        lock.release(Mode::Write);
    }

    #[test]
    fn timeout_expires_without_side_effects() {
        let lock = RwExclusion::new();
        assert!(lock.try_acquire(Mode::Write));
        assert!(!lock.acquire_timeout(Mode::Read, Duration::from_millis(10)));
        lock.release(Mode::Write);
        assert!(lock.try_acquire(Mode::Read));
    }
}
