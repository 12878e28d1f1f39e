//! Replay protection for settled payments.
//!
//! Every scheme derives a stable replay key from the payment payload
//! (transaction ID for Hedera, transaction hash for TON) and records it
//! here exactly once, at the moment settlement succeeds. Verification
//! consults the store read-only; a key that is already present makes the
//! payment invalid with reason `invalid_transaction_state`.

use dashmap::DashSet;

use crate::facilitator::{BoxFuture, FacilitatorError};

/// Records payment identifiers that have already been settled.
///
/// Implementations must make [`ReplayStore::try_consume`] atomic: when two
/// settlements race on the same key, exactly one observes `true`.
pub trait ReplayStore: Send + Sync {
    /// Returns `true` if the key has already been consumed.
    fn has(&self, key: &str) -> BoxFuture<'_, Result<bool, FacilitatorError>>;

    /// Records the key unconditionally.
    fn mark(&self, key: &str) -> BoxFuture<'_, Result<(), FacilitatorError>>;

    /// Atomically records the key, returning `true` if this call inserted it
    /// and `false` if it was already present.
    fn try_consume(&self, key: &str) -> BoxFuture<'_, Result<bool, FacilitatorError>>;

    /// Removes a previously consumed key.
    ///
    /// Settlement consumes the key before broadcasting and releases it when
    /// the broadcast fails, so a payment that never reached the network stays
    /// retryable.
    fn release(&self, key: &str) -> BoxFuture<'_, Result<(), FacilitatorError>>;
}

/// In-process replay store backed by a concurrent set.
///
/// Suitable for a single facilitator instance. Deployments running multiple
/// instances behind a load balancer need a shared implementation; the trait
/// returns futures so such a backend can do I/O.
#[derive(Debug, Default)]
pub struct MemoryReplayStore {
    consumed: DashSet<String>,
}

impl MemoryReplayStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplayStore for MemoryReplayStore {
    fn has(&self, key: &str) -> BoxFuture<'_, Result<bool, FacilitatorError>> {
        let present = self.consumed.contains(key);
        Box::pin(async move { Ok(present) })
    }

    fn mark(&self, key: &str) -> BoxFuture<'_, Result<(), FacilitatorError>> {
        self.consumed.insert(key.to_owned());
        Box::pin(async { Ok(()) })
    }

    fn try_consume(&self, key: &str) -> BoxFuture<'_, Result<bool, FacilitatorError>> {
        // DashSet::insert returns false when the value was already present.
        let inserted = self.consumed.insert(key.to_owned());
        Box::pin(async move { Ok(inserted) })
    }

    fn release(&self, key: &str) -> BoxFuture<'_, Result<(), FacilitatorError>> {
        self.consumed.remove(key);
        Box::pin(async { Ok(()) })
    }
}

impl<T: ReplayStore + ?Sized> ReplayStore for std::sync::Arc<T> {
    fn has(&self, key: &str) -> BoxFuture<'_, Result<bool, FacilitatorError>> {
        (**self).has(key)
    }

    fn mark(&self, key: &str) -> BoxFuture<'_, Result<(), FacilitatorError>> {
        (**self).mark(key)
    }

    fn try_consume(&self, key: &str) -> BoxFuture<'_, Result<bool, FacilitatorError>> {
        (**self).try_consume(key)
    }

    fn release(&self, key: &str) -> BoxFuture<'_, Result<(), FacilitatorError>> {
        (**self).release(key)
    }
}
