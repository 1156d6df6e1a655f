//! Bounds for hardware readiness waits.
//!
//! Every busy-wait in the engine asks its [`TimeoutPolicy`] for a fresh
//! [`Waiter`] and polls the hardware until the flag is seen or the waiter
//! expires.

/// Default number of readiness polls before a wait gives up.
pub const DEFAULT_POLL_LIMIT: u32 = 15_000;

/// Budget for a single polled wait.
pub trait Waiter {
    /// Record one unsuccessful poll. Returns `true` once the budget is spent.
    fn expired(&mut self) -> bool;
}

/// Source of [`Waiter`]s, injected into the engine.
pub trait TimeoutPolicy {
    type Waiter: Waiter;

    /// Start the budget for a new wait.
    fn start(&self) -> Self::Waiter;
}

/// Give up after a fixed number of polls.
///
/// A wait performs exactly `n` readiness checks before reporting a timeout.
/// A limit of zero is treated as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollLimit(pub u32);

impl Default for PollLimit {
    fn default() -> Self {
        PollLimit(DEFAULT_POLL_LIMIT)
    }
}

/// Remaining polls of a [`PollLimit`] wait.
#[derive(Debug)]
pub struct PollCountdown {
    remaining: u32,
}

impl Waiter for PollCountdown {
    fn expired(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

impl TimeoutPolicy for PollLimit {
    type Waiter = PollCountdown;

    fn start(&self) -> PollCountdown {
        PollCountdown { remaining: self.0.max(1) }
    }
}

#[cfg(feature = "embassy-time")]
pub use deadline::{Deadline, DeadlineWaiter};

#[cfg(feature = "embassy-time")]
mod deadline {
    use embassy_time::{Duration, Instant};

    use super::{TimeoutPolicy, Waiter};

    /// Give up once a wall-clock duration has elapsed.
    ///
    /// Durations reaching past the end of the clock never expire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Deadline(pub Duration);

    #[derive(Debug)]
    pub struct DeadlineWaiter {
        until: Instant,
    }

    impl Waiter for DeadlineWaiter {
        fn expired(&mut self) -> bool {
            Instant::now() >= self.until
        }
    }

    impl TimeoutPolicy for Deadline {
        type Waiter = DeadlineWaiter;

        fn start(&self) -> DeadlineWaiter {
            let until =
                Instant::now().checked_add(self.0).unwrap_or(Instant::MAX);
            DeadlineWaiter { until }
        }
    }
}
