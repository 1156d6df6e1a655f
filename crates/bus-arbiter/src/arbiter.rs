use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicUsize, Ordering};

use crate::error::BusError;
use crate::guard::BusGuard;

/// Advisory exclusive-access flag for one shared bus.
///
/// The test-and-set runs under the raw mutex `M`. Use
/// `CriticalSectionRawMutex` when the bus is shared with interrupt handlers so
/// the check cannot be interrupted halfway; `NoopRawMutex` is enough when every
/// caller runs in the same execution context.
///
/// The arbiter guards nothing by itself. Code that touches the bus is expected
/// to hold the lock; the transfer engine does not check.
pub struct BusArbiter<M: RawMutex> {
    locked: Mutex<M, Cell<bool>>,
    rejected: AtomicUsize,
}

impl<M: RawMutex> BusArbiter<M> {
    /// Create a new, unlocked arbiter.
    pub const fn new() -> Self {
        Self {
            locked: Mutex::new(Cell::new(false)),
            rejected: AtomicUsize::new(0),
        }
    }

    /// Try to take exclusive use of the bus.
    ///
    /// Returns `true` if the lock was clear and is now held by the caller,
    /// `false` if someone else holds it. A `false` result leaves the lock
    /// untouched.
    pub fn try_lock(&self) -> bool {
        let acquired = self.locked.lock(|locked| {
            if locked.get() {
                false
            } else {
                locked.set(true);
                true
            }
        });

        if !acquired {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "defmt")]
            defmt::trace!("bus arbiter: acquire rejected, bus busy");
        }

        acquired
    }

    /// Release the bus.
    ///
    /// Clears the lock unconditionally. Releasing a lock that is not held is
    /// a no-op.
    pub fn release(&self) {
        self.locked.lock(|locked| locked.set(false));
    }

    /// Take exclusive use of the bus, returning a guard that releases it on
    /// drop.
    pub fn acquire(&self) -> Result<BusGuard<'_, M>, BusError> {
        if self.try_lock() {
            Ok(BusGuard::new(self))
        } else {
            Err(BusError::Busy)
        }
    }

    /// Returns `true` if the bus is currently held.
    ///
    /// The answer may be stale by the time the caller looks at it.
    pub fn is_locked(&self) -> bool {
        self.locked.lock(Cell::get)
    }

    /// Number of acquire attempts rejected because the bus was busy.
    pub fn contention_count(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl<M: RawMutex> Default for BusArbiter<M> {
    fn default() -> Self {
        Self::new()
    }
}
