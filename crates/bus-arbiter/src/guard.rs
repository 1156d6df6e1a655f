use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::arbiter::BusArbiter;

/// RAII proof that the caller holds the bus.
///
/// Dropping the guard releases the arbiter. APIs that must only run while the
/// bus is held can take `&BusGuard` to make the precondition part of the type.
#[must_use = "the bus is released as soon as the guard is dropped"]
pub struct BusGuard<'a, M: RawMutex> {
    arbiter: &'a BusArbiter<M>,
}

impl<'a, M: RawMutex> BusGuard<'a, M> {
    /// Create a new guard. Only called by `BusArbiter` after a successful lock.
    pub(crate) fn new(arbiter: &'a BusArbiter<M>) -> Self {
        Self { arbiter }
    }

    /// Returns the arbiter this guard holds.
    #[inline]
    pub fn arbiter(&self) -> &'a BusArbiter<M> {
        self.arbiter
    }
}

impl<M: RawMutex> Drop for BusGuard<'_, M> {
    fn drop(&mut self) {
        self.arbiter.release();
    }
}
