//! Process-wide exclusion for discovery runs.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Allows at most one discovery run at a time. Clones share the same lock.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    lock: Arc<Mutex<()>>,
}

/// Held for the duration of a run; dropping it releases the guard.
#[derive(Debug)]
pub struct RunPermit {
    _guard: OwnedMutexGuard<()>,
}

impl RunGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another run holds the guard.
    #[must_use]
    pub fn try_acquire(&self) -> Option<RunPermit> {
        Arc::clone(&self.lock)
            .try_lock_owned()
            .ok()
            .map(|guard| RunPermit { _guard: guard })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Resolves once no run holds the guard.
    pub async fn wait_idle(&self) {
        drop(self.lock.lock().await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_permit_dropped() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().expect("first acquire");
        assert!(guard.is_busy());
        assert!(guard.clone().try_acquire().is_none());
        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn wait_idle_resolves_after_release() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().expect("acquire");
        let waiter = {
            let guard = guard.clone();
            tokio::spawn(async move { guard.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(permit);
        waiter.await.expect("waiter joined");
        assert!(!guard.is_busy());
    }
}
