//! Thread-safe handle over a [`StakingLedger`].
//!
//! Operations mutate through `&mut self`, so a ledger shared across
//! threads needs interior mutability. `parking_lot::Mutex` serializes
//! callers. The lock is held for exactly one closure, which should contain
//! exactly one ledger operation.

use std::fmt;
use std::sync::Arc;

use dsdn_common::TokenLedger;
use parking_lot::Mutex;

use crate::state::StakingLedger;

pub struct SharedLedger<T: TokenLedger> {
    inner: Arc<Mutex<StakingLedger<T>>>,
}

impl<T: TokenLedger> Clone for SharedLedger<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: TokenLedger> fmt::Debug for SharedLedger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLedger")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

impl<T: TokenLedger> SharedLedger<T> {
    pub fn new(ledger: StakingLedger<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut StakingLedger<T>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Run a read-only `f`.
    pub fn read<R>(&self, f: impl FnOnce(&StakingLedger<T>) -> R) -> R {
        let guard = self.inner.lock();
        f(&guard)
    }

    /// Unwrap the ledger if this is the last handle.
    pub fn try_into_inner(self) -> Result<StakingLedger<T>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
