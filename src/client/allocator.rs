//! Transfer-ID allocation.
//!
//! Not a distinct runtime component: just a counter plus a modulus, folded
//! together inline wherever [`crate::client::client_impl::ClientImpl::call`]
//! needs a fresh transfer ID.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A 64-bit counter shared by every `ClientImpl` bound to the same
/// [`crate::transport::SessionSpecifier`] (a transport-layer property, not
/// owned by any single impl). `Clone` is cheap; clones share the same
/// underlying counter.
#[derive(Clone, Debug, Default)]
pub struct TransferIdCounter(Arc<AtomicU64>);

impl TransferIdCounter {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(0)))
    }

    /// Atomically read the current value and increment it. Two concurrent
    /// callers always observe distinct values.
    pub fn get_then_increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// A zero-argument function yielding the transfer-ID modulus currently in
/// effect. Evaluated fresh on every call because the transport may be
/// reconfigured at runtime; a cached value risks silent TID collisions.
#[derive(Clone)]
pub struct ModulusSource(Arc<dyn Fn() -> u64 + Send + Sync>);

impl ModulusSource {
    pub fn new(f: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A modulus source that always returns the same value, for transports
    /// whose transfer-ID space does not change at runtime.
    pub fn fixed(modulus: u64) -> Self {
        Self::new(move || modulus)
    }

    /// Evaluate the modulus. Always at least 1, so `% modulus` never divides
    /// by zero even if a misbehaving source returns 0.
    pub fn get(&self) -> u64 {
        (self.0)().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_yields_distinct_increasing_values() {
        let counter = TransferIdCounter::new();
        let a = counter.get_then_increment();
        let b = counter.get_then_increment();
        let c = counter.get_then_increment();
        assert_eq!((a, b, c), (0, 1, 2));
    }

    #[test]
    fn clones_share_state() {
        let counter = TransferIdCounter::new();
        let clone = counter.clone();
        assert_eq!(counter.get_then_increment(), 0);
        assert_eq!(clone.get_then_increment(), 1);
    }

    #[test]
    fn fixed_modulus_is_reread_every_call_but_constant() {
        let modulus = ModulusSource::fixed(32);
        assert_eq!(modulus.get(), 32);
        assert_eq!(modulus.get(), 32);
    }

    #[test]
    fn zero_modulus_is_clamped_to_one() {
        let modulus = ModulusSource::fixed(0);
        assert_eq!(modulus.get(), 1);
    }
}
