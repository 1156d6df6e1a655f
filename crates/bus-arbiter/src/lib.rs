#![no_std]
//! Exclusive-access arbitration for a shared peripheral bus.
//!
//! A [`BusArbiter`] is a single advisory lock flag. Acquiring it never blocks:
//! a caller that finds the bus held gets [`BusError::Busy`] (or `false` from
//! [`BusArbiter::try_lock`]) and decides for itself when to try again.

mod arbiter;
mod error;
mod guard;

pub use arbiter::BusArbiter;
pub use error::BusError;
pub use guard::BusGuard;
