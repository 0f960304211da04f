#![forbid(unsafe_code)]

//! Keyed trailing-edge coalescing scheduler.
//!
//! Refresh triggers arrive in bursts: one ledger transaction fans out into
//! several notifications, each of which may invalidate the same view. The
//! [`Coalescer`] turns any burst of triggers for one key into a single fire,
//! scheduled a fixed window after the **latest** trigger (trailing-edge
//! debounce). Distinct keys coalesce independently.
//!
//! # Invariants
//!
//! - **Latest wins**: a re-trigger for a pending key restarts that key's
//!   window; the superseded timer never fires.
//! - **One pending slot per key**: at most one armed timer per key at any
//!   instant.
//! - **Discard on teardown**: [`cancel_all`](Coalescer::cancel_all) drops
//!   every pending timer without running it.
//!
//! Timers are tokio sleep tasks; a re-trigger aborts the superseded task. A
//! monotonic sequence number per armed timer guards the narrow window where a
//! superseded timer has already woken but not yet fired, so it can detect it
//! was replaced and stand down.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Delay between the latest trigger and the fire it coalesces into.
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(500);

struct PendingTimer {
    seq: u64,
    handle: JoinHandle<()>,
}

/// Trailing-edge debouncer over an arbitrary key space.
///
/// Must be used from within a tokio runtime; each armed key spawns one sleep
/// task. The fire callback runs on that task.
pub struct Coalescer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    window: Duration,
    on_fire: Arc<dyn Fn(K) + Send + Sync>,
    pending: Arc<Mutex<HashMap<K, PendingTimer>>>,
    next_seq: AtomicU64,
}

impl<K> Coalescer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Create a coalescer that invokes `on_fire` once per settled burst.
    pub fn new(window: Duration, on_fire: impl Fn(K) + Send + Sync + 'static) -> Self {
        Self {
            window,
            on_fire: Arc::new(on_fire),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Arm (or re-arm) the window for a key.
    ///
    /// Any timer already pending for the key is discarded; the fire happens
    /// `window` after the latest trigger.
    pub fn trigger(&self, key: K) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        // Hold the map lock across the spawn so the new timer cannot observe
        // the map before its own entry is inserted.
        let mut pending = self.pending.lock().unwrap();
        let handle = tokio::spawn({
            let key = key.clone();
            let window = self.window;
            let pending = Arc::clone(&self.pending);
            let on_fire = Arc::clone(&self.on_fire);
            async move {
                tokio::time::sleep(window).await;
                {
                    let mut pending = pending.lock().unwrap();
                    match pending.get(&key) {
                        // Still the armed timer for this key: claim the fire.
                        Some(timer) if timer.seq == seq => {
                            pending.remove(&key);
                        }
                        // Superseded while waking; the newer timer owns the key.
                        _ => return,
                    }
                }
                (*on_fire)(key);
            }
        });

        if let Some(old) = pending.insert(key, PendingTimer { seq, handle }) {
            old.handle.abort();
        }
    }

    /// Number of keys with an armed timer.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Discard every pending timer without firing it.
    pub fn cancel_all(&self) {
        let mut pending = self.pending.lock().unwrap();
        for (_, timer) in pending.drain() {
            timer.handle.abort();
        }
    }
}

impl<K> Drop for Coalescer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl<K> fmt::Debug for Coalescer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coalescer")
            .field("window", &self.window)
            .field("pending", &self.pending_len())
            .finish()
    }
}
