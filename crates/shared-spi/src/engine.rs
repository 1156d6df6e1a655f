use crate::backend::{Backend, Condition, WideBackend};
use crate::cs::ChipSelect;
use crate::device::{DeviceDescriptor, SpiMode, WordWidth};
use crate::error::{Misuse, SpiError};
use crate::timeout::{PollLimit, TimeoutPolicy, Waiter};

/// Main clock of the controller when no other value is configured.
pub const DEFAULT_SYSTEM_CLOCK_HZ: u32 = 84_000_000;

/// How the engine treats calls made out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallOrder {
    /// Out-of-order calls are carried out anyway. Their effect on the bus is
    /// undefined.
    #[default]
    Permissive,
    /// Out-of-order calls are rejected with [`SpiError::Misuse`].
    Strict,
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Clock feeding the controller, used to derive clock divisors.
    pub system_clock_hz: u32,
    /// Whether out-of-order calls are rejected.
    pub call_order: CallOrder,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system_clock_hz: DEFAULT_SYSTEM_CLOCK_HZ,
            call_order: CallOrder::Permissive,
        }
    }
}

/// Session state of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// `init_bus` has not run yet.
    Uninitialized,
    /// Initialized, no device configured yet.
    Idle,
    /// Controller holds the settings of the last configured device.
    Configured,
    /// Chip select of a device is asserted.
    Selected,
    /// Chip select released; the last device may be selected again.
    Deselected,
    /// A transfer timed out while selected. Deselect to recover.
    Faulted,
}

/// Unit type moved by one bus exchange.
pub trait Word: Copy + sealed::Sealed {
    /// Sent when the caller has no transmit data.
    const FILLER: Self;

    fn into_unit(self) -> u16;

    fn from_unit(unit: u16) -> Self;
}

impl Word for u8 {
    const FILLER: Self = 0xFF;

    fn into_unit(self) -> u16 {
        u16::from(self)
    }

    fn from_unit(unit: u16) -> Self {
        unit as u8
    }
}

impl Word for u16 {
    const FILLER: Self = 0x00FF;

    fn into_unit(self) -> u16 {
        self
    }

    fn from_unit(unit: u16) -> Self {
        unit
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// Synchronous transfer engine for one shared bus.
///
/// The engine assumes the caller holds the bus arbiter for the whole
/// configure → select → transceive → deselect sequence. It never touches
/// the arbiter itself.
///
/// Every hardware wait is bounded by the timeout policy `T`.
pub struct SharedSpi<B, C, T = PollLimit> {
    backend: B,
    cs: C,
    timeout: T,
    config: Config,
    initialized: bool,
    state: BusState,
    configured: Option<DeviceDescriptor>,
}

impl<B: Backend, C: ChipSelect> SharedSpi<B, C, PollLimit> {
    /// Create an engine with the default poll limit.
    pub fn new(backend: B, cs: C, config: Config) -> Self {
        Self::with_timeout(backend, cs, config, PollLimit::default())
    }
}

impl<B: Backend, C: ChipSelect, T: TimeoutPolicy> SharedSpi<B, C, T> {
    /// Create an engine whose waits are bounded by `timeout`.
    pub fn with_timeout(
        backend: B,
        cs: C,
        config: Config,
        timeout: T,
    ) -> Self {
        Self {
            backend,
            cs,
            timeout,
            config,
            initialized: false,
            state: BusState::Uninitialized,
            configured: None,
        }
    }

    /// Configuration the engine was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current session state, tracked in every call order.
    pub fn state(&self) -> BusState {
        self.state
    }

    /// Controller backend driven by the engine.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend, bypassing the state checks.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Manually driven chip-select lines.
    pub fn chip_selects(&self) -> &C {
        &self.cs
    }

    /// Give back the controller and the chip-select lines.
    pub fn release(self) -> (B, C) {
        (self.backend, self.cs)
    }

    /// Bring up the controller and resolve the word width for `bits`.
    ///
    /// The hardware is only touched on the first call. Unsupported widths map
    /// to 8 bits, and widths the controller cannot shift are clamped to the
    /// widest it can.
    pub fn init_bus(&mut self, bits: u32) -> WordWidth {
        if !self.initialized {
            self.backend.init(self.config.system_clock_hz);
            self.initialized = true;
            self.state = BusState::Idle;
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "shared spi: initialized, system clock {} Hz",
                self.config.system_clock_hz
            );
        }
        WordWidth::from_bits(bits).min(B::MAX_WIDTH)
    }

    /// Apply one device's clock, mode and word width to the controller.
    ///
    /// Settings are global to the controller, so this must be re-run every
    /// time a different device is addressed.
    pub fn configure_device(
        &mut self,
        device: &DeviceDescriptor,
        mode: SpiMode,
        baud_hz: u32,
    ) -> Result<(), SpiError> {
        if self.strict() {
            if !self.initialized {
                return Err(SpiError::Misuse(Misuse::NotInitialized));
            }
            if matches!(self.state, BusState::Selected | BusState::Faulted) {
                return Err(SpiError::Misuse(Misuse::StillSelected));
            }
        }

        let divisor = B::clock_divisor(self.config.system_clock_hz, baud_hz)
            .ok_or(SpiError::InvalidBaudRate(baud_hz))?;

        self.backend.configure(device, mode, divisor);
        self.configured = Some(*device);
        self.state = BusState::Configured;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "shared spi: device {} configured, {} Hz, divisor {}, {}",
            device.id,
            baud_hz,
            divisor,
            mode
        );
        Ok(())
    }

    /// Assert the device's chip select.
    ///
    /// The controller must already be configured for this device.
    pub fn select_device(
        &mut self,
        device: &DeviceDescriptor,
    ) -> Result<(), SpiError> {
        if self.strict() {
            if matches!(self.state, BusState::Selected | BusState::Faulted) {
                return Err(SpiError::Misuse(Misuse::StillSelected));
            }
            let ready = matches!(
                self.state,
                BusState::Configured | BusState::Deselected
            );
            if !ready || self.configured != Some(*device) {
                return Err(SpiError::Misuse(Misuse::NotConfigured));
            }
        }

        self.backend.select(device);
        self.cs.assert(device.cs_line);
        self.state = BusState::Selected;
        #[cfg(feature = "defmt")]
        defmt::trace!("shared spi: device {} selected", device.id);
        Ok(())
    }

    /// Drain the transmitter and release the device's chip select.
    ///
    /// The select line is released even if the drain wait times out; the
    /// timeout is still reported.
    pub fn deselect_device(
        &mut self,
        device: &DeviceDescriptor,
    ) -> Result<(), SpiError> {
        if self.strict()
            && !matches!(self.state, BusState::Selected | BusState::Faulted)
        {
            return Err(SpiError::Misuse(Misuse::NotSelected));
        }

        let drained = self.wait(Condition::TxEmpty);
        self.backend.end_transfer();
        self.cs.deassert(device.cs_line);
        self.state = BusState::Deselected;
        #[cfg(feature = "defmt")]
        defmt::trace!("shared spi: device {} deselected", device.id);
        drained
    }

    /// Exchange `len` bytes with the selected device.
    ///
    /// Without `tx` the filler `0xFF` is clocked out. Without `rx` received
    /// bytes are dropped. On a timeout `rx[..i]` holds the bytes received
    /// before the failing index.
    pub fn transceive(
        &mut self,
        tx: Option<&[u8]>,
        rx: Option<&mut [u8]>,
        len: usize,
    ) -> Result<(), SpiError> {
        self.transceive_units(tx, rx, len)
    }

    /// Wait until every queued unit has left the shift register.
    pub fn flush(&mut self) -> Result<(), SpiError> {
        self.wait(Condition::TxEmpty)
    }

    pub(crate) fn transceive_units<W: Word>(
        &mut self,
        tx: Option<&[W]>,
        mut rx: Option<&mut [W]>,
        len: usize,
    ) -> Result<(), SpiError> {
        check_len(tx.map(<[W]>::len), len)?;
        check_len(rx.as_deref().map(<[W]>::len), len)?;

        self.exchange(
            len,
            |i| tx.map_or(W::FILLER, |tx| tx[i]),
            |i, word| {
                if let Some(rx) = rx.as_deref_mut() {
                    rx[i] = word;
                }
            },
        )
    }

    /// Shift `len` units, taking output from `next` and handing input to
    /// `store`. Only the final unit carries the last-transfer marker.
    pub(crate) fn exchange<W, N, S>(
        &mut self,
        len: usize,
        mut next: N,
        mut store: S,
    ) -> Result<(), SpiError>
    where
        W: Word,
        N: FnMut(usize) -> W,
        S: FnMut(usize, W),
    {
        if self.strict() {
            match self.state {
                BusState::Selected => {}
                BusState::Faulted => {
                    return Err(SpiError::Misuse(Misuse::Faulted))
                }
                _ => return Err(SpiError::Misuse(Misuse::NotSelected)),
            }
        }

        for i in 0..len {
            self.wait_in_transfer(Condition::TxReady)?;
            self.backend.write_unit(next(i).into_unit(), i + 1 == len);

            self.wait_in_transfer(Condition::RxReady)?;
            store(i, W::from_unit(self.backend.read_unit()));
        }
        Ok(())
    }

    fn wait_in_transfer(
        &mut self,
        condition: Condition,
    ) -> Result<(), SpiError> {
        let result = self.wait(condition);
        if result.is_err() && self.state == BusState::Selected {
            self.state = BusState::Faulted;
        }
        result
    }

    fn wait(&mut self, condition: Condition) -> Result<(), SpiError> {
        let mut waiter = self.timeout.start();
        loop {
            if self.backend.is_ready(condition) {
                return Ok(());
            }
            if waiter.expired() {
                #[cfg(feature = "defmt")]
                defmt::warn!("shared spi: timed out waiting for {}", condition);
                return Err(SpiError::Timeout(condition));
            }
        }
    }

    fn strict(&self) -> bool {
        self.config.call_order == CallOrder::Strict
    }
}

impl<B: WideBackend, C: ChipSelect, T: TimeoutPolicy> SharedSpi<B, C, T> {
    /// Exchange `len` 16-bit words with the selected device.
    ///
    /// Same contract as [`transceive`](Self::transceive); the filler word is
    /// `0x00FF`.
    pub fn transceive16(
        &mut self,
        tx: Option<&[u16]>,
        rx: Option<&mut [u16]>,
        len: usize,
    ) -> Result<(), SpiError> {
        self.transceive_units(tx, rx, len)
    }
}

pub(crate) fn check_len(
    available: Option<usize>,
    needed: usize,
) -> Result<(), SpiError> {
    match available {
        Some(available) if available < needed => {
            Err(SpiError::BufferTooShort { needed, available })
        }
        _ => Ok(()),
    }
}
