//! Run-scoped counter of outbound Places calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counts {
    calls: AtomicU64,
    failures: AtomicU64,
}

/// Shared, resettable call counter.
///
/// Clones share the same counts. The client only ever increments; resetting
/// is left to whoever owns the run.
#[derive(Debug, Clone, Default)]
pub struct ApiCallCounter {
    inner: Arc<Counts>,
}

impl ApiCallCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one attempt that went out to the network.
    pub fn record_call(&self) {
        self.inner.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one request that gave up (retries exhausted or not retriable).
    pub fn record_failure(&self) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn calls(&self) -> u64 {
        self.inner.calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.inner.calls.store(0, Ordering::Relaxed);
        self.inner.failures.store(0, Ordering::Relaxed);
    }
}
