use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};

use crate::directory::Directory;
use crate::token::{Key, Value};

/// Periodic background task that sweeps zero-refcount entries out of the
/// directory.
///
/// The reclaimer is an explicit, injectable collaborator rather than a
/// shared global registry: each `Reclaimer` is owned by exactly one
/// `LockBroker`, and nothing here requires a process-wide sweep list.
pub struct Reclaimer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Reclaimer {
    pub fn spawn<K: Key, V: Value>(
        directory: Arc<Directory<K, V>>,
        interval: Duration,
        batch_yield: bool,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();

        let handle = std::thread::Builder::new()
            .name("lock-broker-reclaimer".into())
            .spawn(move || {
                while !stop_for_thread.load(Ordering::Relaxed) {
                    std::thread::sleep(interval);
                    if stop_for_thread.load(Ordering::Relaxed) {
                        break;
                    }
                    Self::sweep(&directory, batch_yield);
                }
            })
            .expect("failed to spawn reclaimer thread");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn sweep<K: Key, V: Value>(directory: &Directory<K, V>, batch_yield: bool) {
        let tokens = directory.snapshot_tokens();
        let mut reclaimed = 0u64;
        for token in &tokens {
            if directory.try_reclaim(token) {
                reclaimed += 1;
            }
            if batch_yield {
                std::thread::yield_now();
            }
        }
        if reclaimed > 0 {
            info!(reclaimed, scanned = tokens.len(), "reclaim tick");
        } else {
            debug!(scanned = tokens.len(), "reclaim tick: nothing to reclaim");
        }
    }

    /// Stops the background thread. Does not block on in-flight permits;
    /// those may still be released normally afterward.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.stop();
    }
}
