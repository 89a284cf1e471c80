//! Per-unit write locks and cooperative cancellation.

use crate::error::{PitchError, Result};
use crate::storage::SyncUnit;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per (team, season). Runs sharing a `UnitLocks` never
/// write the same unit concurrently.
#[derive(Debug, Clone, Default)]
pub struct UnitLocks {
    inner: Arc<Mutex<HashMap<SyncUnit, Arc<AsyncMutex<()>>>>>,
}

impl UnitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `unit`.
    pub async fn lock(&self, unit: &SyncUnit) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut map = self.inner.lock().map_err(|_| PitchError::StoreUnavailable {
                message: "unit lock table poisoned".to_string(),
            })?;
            Arc::clone(map.entry(unit.clone()).or_default())
        };
        Ok(lock.lock_owned().await)
    }

    /// Whether another holder currently owns `unit`.
    pub fn is_locked(&self, unit: &SyncUnit) -> bool {
        self.inner
            .lock()
            .ok()
            .and_then(|map| map.get(unit).map(|l| l.try_lock().is_err()))
            .unwrap_or(false)
    }
}

/// Shared flag checked between units.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
