#![no_std]
//! Synchronous transfers over one SPI bus shared by several peripherals.
//!
//! Callers take the bus with a [`BusArbiter`], then drive a [`SharedSpi`]
//! through configure → select → transceive → deselect for one device, and
//! release the arbiter. Every device may need a different clock rate, mode
//! and word width, so the controller is reconfigured on each selection.
//!
//! All hardware waits are bounded by an injected [`TimeoutPolicy`] and end in
//! [`SpiError::Timeout`] instead of hanging.
//!
//! Two controller variants are provided: a dedicated SPI block
//! ([`StandardController`]) and a USART in SPI master mode
//! ([`UsartController`]).

pub mod backend;
mod cs;
mod device;
pub mod dma;
mod engine;
mod error;
mod hal;
mod session;
pub mod timeout;

pub use backend::{
    Backend, Condition, DmaPort, StandardController, UsartController,
    WideBackend,
};
pub use bus_arbiter::{BusArbiter, BusError, BusGuard};
pub use cs::ChipSelect;
pub use device::{DeviceDescriptor, Phase, Polarity, SpiMode, WordWidth};
pub use engine::{BusState, CallOrder, Config, SharedSpi, Word};
pub use error::{Misuse, SpiError};
pub use session::DeviceSession;
pub use timeout::{PollLimit, TimeoutPolicy, Waiter};
