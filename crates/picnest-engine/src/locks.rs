//! Per-event serialization.
//!
//! The perceptual scan is check-then-act over the event's image rows, so two
//! concurrent uploads into the same event could both decide "no match" and
//! store near-duplicates. Holding the event's lock across the scan and the
//! record write closes that window. Uploads into different events never
//! contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

// Map size at which uncontended entries get pruned.
const SWEEP_THRESHOLD: usize = 64;

#[derive(Clone, Default)]
pub struct EventLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one event, creating it on first use. The guard
    /// is owned so it can be held across awaits.
    ///
    /// Entries whose lock nobody holds or waits on are swept once the map
    /// grows past a threshold, so the map tracks live events rather than
    /// every event id ever seen.
    pub async fn acquire(&self, event_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if map.len() >= SWEEP_THRESHOLD {
                // A holder or waiter keeps a clone of the Arc alive.
                map.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            map.entry(event_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}
