//! Per-car mutual exclusion
//!
//! Every engine command that reads and then writes a car's usage state runs
//! while holding that car's lock, so two commands for the same car never
//! interleave. Commands for different cars proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::CarId;

/// Registry size above which idle locks are dropped on the next acquisition
const PRUNE_THRESHOLD: usize = 1024;

/// Registry of one async mutex per car
#[derive(Debug, Default)]
pub struct CarLocks {
    locks: Mutex<HashMap<CarId, Arc<Mutex<()>>>>,
}

impl CarLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `car_id`
    ///
    /// The returned guard releases the lock when dropped.
    pub async fn acquire(&self, car_id: CarId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() > PRUNE_THRESHOLD {
                // Only the registry holds an idle lock
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(car_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of cars with a registered lock
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
