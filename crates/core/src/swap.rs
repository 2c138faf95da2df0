//! Hot-swappable shared reference.
//!
//! Policies such as the template schedule policy or the audit sink are injected
//! into long-lived services and may be replaced at runtime (e.g. when a license
//! is applied). Readers take a cheap `Arc` snapshot; a concurrent `store` never
//! invalidates a snapshot already handed out.

use std::sync::{Arc, PoisonError, RwLock};

pub struct SwapCell<T: ?Sized> {
    inner: RwLock<Arc<T>>,
}

impl<T: ?Sized> SwapCell<T> {
    pub fn new(value: Arc<T>) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    /// Snapshot the current value.
    pub fn load(&self) -> Arc<T> {
        // A writer cannot leave the slot half-written: the Arc swap is a single move.
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current value, returning the previous one.
    pub fn store(&self, value: Arc<T>) -> Arc<T> {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, value)
    }
}

impl<T: ?Sized> core::fmt::Debug for SwapCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SwapCell").finish_non_exhaustive()
    }
}
