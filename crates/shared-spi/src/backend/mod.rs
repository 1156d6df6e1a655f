//! Controller variants that can drive the shared bus.
//!
//! The engine only talks to a [`Backend`]. Each variant hides its own register
//! set behind the same configure/select/exchange primitives, so the polling,
//! timeout and chip-select sequencing live in one place.

use crate::device::{DeviceDescriptor, SpiMode, WordWidth};

pub mod spi;
pub mod usart;

pub use spi::StandardController;
pub use usart::UsartController;

/// Hardware readiness condition polled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Condition {
    /// Transmit holding register can accept a unit.
    TxReady,
    /// Transmit path fully drained, including the shift register.
    TxEmpty,
    /// A received unit is waiting in the receive register.
    RxReady,
}

impl core::fmt::Display for Condition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Condition::TxReady => "transmit ready",
            Condition::TxEmpty => "transmit empty",
            Condition::RxReady => "receive ready",
        };
        f.write_str(name)
    }
}

/// Register-level operations of one bus controller variant.
pub trait Backend {
    /// Widest transfer unit the controller can shift.
    const MAX_WIDTH: WordWidth;

    /// One-time bring-up: pins, clock, reset, master mode, neutral select.
    fn init(&mut self, system_clock_hz: u32);

    /// Integer clock divisor for `baud_hz`, or `None` if out of range.
    fn clock_divisor(system_clock_hz: u32, baud_hz: u32) -> Option<u32>;

    /// Reset the controller and apply one device's settings, then enable it.
    ///
    /// `divisor` has already been validated by [`Backend::clock_divisor`].
    fn configure(
        &mut self,
        device: &DeviceDescriptor,
        mode: SpiMode,
        divisor: u32,
    );

    /// Controller-side part of selecting `device`.
    fn select(&mut self, device: &DeviceDescriptor);

    /// Controller-side part of deselecting, run after the transmitter drained.
    fn end_transfer(&mut self);

    fn is_ready(&mut self, condition: Condition) -> bool;

    /// Write one unit to the transmit register. `last` marks the final unit
    /// of a request.
    fn write_unit(&mut self, unit: u16, last: bool);

    fn read_unit(&mut self) -> u16;
}

/// Backends able to shift 16-bit units.
pub trait WideBackend: Backend {}

/// Backends whose data registers can be serviced by the DMA controller.
pub trait DmaPort: Backend {
    /// Peripheral handshake number for the transmit direction.
    const TX_HANDSHAKE: u8;
    /// Peripheral handshake number for the receive direction.
    const RX_HANDSHAKE: u8;

    fn tx_data_address(&self) -> usize;

    fn rx_data_address(&self) -> usize;

    /// Read the status register so a stale overrun does not stall the channel.
    fn clear_overrun(&mut self);
}
