/// Number of bits shifted per transfer unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WordWidth {
    /// 8-bit units.
    Eight,
    /// 16-bit units.
    Sixteen,
}

impl WordWidth {
    /// Map a requested bit count to a supported width.
    ///
    /// Only 8 and 16 bit transfers are supported; any other count falls back
    /// to 8 bits.
    pub const fn from_bits(bits: u32) -> Self {
        match bits {
            16 => WordWidth::Sixteen,
            _ => WordWidth::Eight,
        }
    }

    /// Number of bits per unit.
    pub const fn bits(self) -> u32 {
        match self {
            WordWidth::Eight => 8,
            WordWidth::Sixteen => 16,
        }
    }
}

/// Idle level of the bus clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low. CPOL = 0.
    IdleLow,
    /// Clock idles high. CPOL = 1.
    IdleHigh,
}

/// Clock edge on which data is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Sample on the first (leading) clock edge. CPHA = 0.
    CaptureOnFirstTransition,
    /// Sample on the second (trailing) clock edge. CPHA = 1.
    CaptureOnSecondTransition,
}

/// SPI clock polarity and phase combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiMode {
    /// CPOL = 0, CPHA = 0
    Mode0,
    /// CPOL = 0, CPHA = 1
    Mode1,
    /// CPOL = 1, CPHA = 0
    Mode2,
    /// CPOL = 1, CPHA = 1
    Mode3,
}

impl SpiMode {
    /// Decode the conventional 2-bit mode number. Higher bits are ignored.
    pub const fn from_bits(mode: u8) -> Self {
        match mode & 0b11 {
            0 => SpiMode::Mode0,
            1 => SpiMode::Mode1,
            2 => SpiMode::Mode2,
            _ => SpiMode::Mode3,
        }
    }

    /// Conventional 2-bit mode number.
    pub const fn bits(self) -> u8 {
        match self {
            SpiMode::Mode0 => 0,
            SpiMode::Mode1 => 1,
            SpiMode::Mode2 => 2,
            SpiMode::Mode3 => 3,
        }
    }

    /// Bit 1 of the mode number.
    pub const fn polarity(self) -> Polarity {
        if self.bits() & 0b10 != 0 {
            Polarity::IdleHigh
        } else {
            Polarity::IdleLow
        }
    }

    /// Bit 0 of the mode number.
    pub const fn phase(self) -> Phase {
        if self.bits() & 0b01 != 0 {
            Phase::CaptureOnSecondTransition
        } else {
            Phase::CaptureOnFirstTransition
        }
    }

    /// Value for controllers whose phase bit means "capture on leading edge"
    /// (NCPHA), which is the inverse of CPHA.
    pub const fn capture_on_leading_edge(self) -> bool {
        matches!(self.phase(), Phase::CaptureOnFirstTransition)
    }
}

impl From<embedded_hal::spi::Mode> for SpiMode {
    fn from(mode: embedded_hal::spi::Mode) -> Self {
        use embedded_hal::spi::{Phase as HalPhase, Polarity as HalPolarity};

        match (mode.polarity, mode.phase) {
            (HalPolarity::IdleLow, HalPhase::CaptureOnFirstTransition) => {
                SpiMode::Mode0
            }
            (HalPolarity::IdleLow, HalPhase::CaptureOnSecondTransition) => {
                SpiMode::Mode1
            }
            (HalPolarity::IdleHigh, HalPhase::CaptureOnFirstTransition) => {
                SpiMode::Mode2
            }
            (HalPolarity::IdleHigh, HalPhase::CaptureOnSecondTransition) => {
                SpiMode::Mode3
            }
        }
    }
}

/// Static description of one peripheral on the shared bus.
///
/// Owned by the caller and only ever read by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceDescriptor {
    /// Controller peripheral-select number.
    pub id: u8,
    /// Index of the manually driven chip-select line.
    pub cs_line: u8,
    /// Unit width the device expects.
    pub width: WordWidth,
}

impl DeviceDescriptor {
    /// Describe a device with select number `id` on chip-select line
    /// `cs_line`.
    pub const fn new(id: u8, cs_line: u8, width: WordWidth) -> Self {
        Self { id, cs_line, width }
    }
}
