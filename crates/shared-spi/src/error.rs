use bus_arbiter::BusError;

use crate::backend::Condition;

/// Errors that can occur during shared bus operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiError {
    /// The bus arbiter is held by another caller.
    Busy,
    /// A hardware readiness flag was not observed within the wait budget.
    Timeout(Condition),
    /// A call was made out of order while strict ordering is enabled.
    Misuse(Misuse),
    /// No legal clock divisor exists for the requested baud rate.
    InvalidBaudRate(u32),
    /// A caller buffer holds fewer units than the requested length.
    BufferTooShort { needed: usize, available: usize },
    /// Requested DMA length exceeds what a single descriptor can move.
    TransferTooLong(usize),
}

/// Out-of-order calls detected under
/// [`CallOrder::Strict`](crate::CallOrder::Strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Misuse {
    /// `init_bus` has not run yet.
    NotInitialized,
    /// The device being selected is not the one last configured.
    NotConfigured,
    /// A device is still selected.
    StillSelected,
    /// No device is selected.
    NotSelected,
    /// A transfer timed out; the device must be deselected first.
    Faulted,
}

impl From<BusError> for SpiError {
    fn from(e: BusError) -> Self {
        match e {
            BusError::Busy => SpiError::Busy,
        }
    }
}

impl core::fmt::Display for SpiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SpiError::Busy => write!(f, "SPI bus is busy"),
            SpiError::Timeout(condition) => {
                write!(f, "timed out waiting for {}", condition)
            }
            SpiError::Misuse(misuse) => write!(f, "bus misuse: {}", misuse),
            SpiError::InvalidBaudRate(baud) => {
                write!(f, "no clock divisor for baud rate {} Hz", baud)
            }
            SpiError::BufferTooShort { needed, available } => write!(
                f,
                "buffer holds {} units but {} were requested",
                available, needed
            ),
            SpiError::TransferTooLong(len) => {
                write!(f, "DMA transfer of {} bytes is too long", len)
            }
        }
    }
}

impl core::fmt::Display for Misuse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Misuse::NotInitialized => "bus not initialized",
            Misuse::NotConfigured => "device not configured",
            Misuse::StillSelected => "a device is still selected",
            Misuse::NotSelected => "no device selected",
            Misuse::Faulted => "transfer faulted, deselect first",
        };
        f.write_str(msg)
    }
}

impl embedded_hal::spi::Error for SpiError {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}
