//! USART running in SPI master mode.
//!
//! Only 8-bit units are supported and the USART has no select outputs of its
//! own, so every device is selected through its GPIO line.

use bitflags::bitflags;

use super::{Backend, Condition};
use crate::device::{DeviceDescriptor, Polarity, SpiMode, WordWidth};

/// Bus clock used between bring-up and the first device configuration.
pub const INIT_BAUD_HZ: u32 = 1_000_000;
/// Largest clock divisor the baud rate generator accepts.
pub const MAX_DIVISOR: u32 = 0xFFFF;

/// USART registers used in SPI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsartReg {
    Cr,
    Mr,
    Idr,
    /// Channel status.
    Csr,
    Rhr,
    Thr,
    Brgr,
}

impl UsartReg {
    /// Byte offset from the USART base address.
    pub const fn offset(self) -> usize {
        match self {
            UsartReg::Cr => 0x00,
            UsartReg::Mr => 0x04,
            UsartReg::Idr => 0x0C,
            UsartReg::Csr => 0x14,
            UsartReg::Rhr => 0x18,
            UsartReg::Thr => 0x1C,
            UsartReg::Brgr => 0x20,
        }
    }
}

/// Platform access to the USART registers.
pub trait UsartRegisters {
    /// Route the bus pins and enable the USART's peripheral clock.
    fn enable_peripheral(&mut self) {}

    fn read(&mut self, reg: UsartReg) -> u32;

    fn write(&mut self, reg: UsartReg, value: u32);
}

/// Memory-mapped USART register block.
pub struct UsartMmio {
    base: usize,
}

impl UsartMmio {
    /// # Safety
    ///
    /// `base` must be the address of a USART register block that no other
    /// code accesses while this value exists.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }
}

impl UsartRegisters for UsartMmio {
    fn read(&mut self, reg: UsartReg) -> u32 {
        // SAFETY: `new` requires `base` to point at the register block.
        unsafe {
            core::ptr::read_volatile((self.base + reg.offset()) as *const u32)
        }
    }

    fn write(&mut self, reg: UsartReg, value: u32) {
        // SAFETY: `new` requires `base` to point at the register block.
        unsafe {
            core::ptr::write_volatile(
                (self.base + reg.offset()) as *mut u32,
                value,
            )
        }
    }
}

bitflags! {
    /// US_CR
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Cr: u32 {
        const RSTRX  = 1 << 2;
        const RSTTX  = 1 << 3;
        const RXEN   = 1 << 4;
        const RXDIS  = 1 << 5;
        const TXEN   = 1 << 6;
        const TXDIS  = 1 << 7;
        const RSTSTA = 1 << 8;
    }
}

bitflags! {
    /// US_MR, SPI mode layout
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Mr: u32 {
        const USART_MODE = 0xF;
        const USCLKS     = 0x3 << 4;
        const CHRL       = 0x3 << 6;
        const CPHA       = 1 << 8;
        const CHMODE     = 0x3 << 14;
        const CPOL       = 1 << 16;
        const CLKO       = 1 << 18;
    }
}

impl Mr {
    const MODE_SPI_MASTER: u32 = 0xE;
    const CHRL_8_BIT: u32 = 0x3 << 6;

    /// SPI master, master clock source, 8-bit characters, normal channel mode.
    pub const fn spi_master() -> Self {
        Self::from_bits_retain(Self::MODE_SPI_MASTER | Self::CHRL_8_BIT)
    }

    pub const fn with_cpol(self, idle_high: bool) -> Self {
        let reg = self.difference(Self::CPOL);
        match idle_high {
            false => reg,
            true => reg.union(Self::CPOL),
        }
    }

    /// The USART phase bit means "capture on leading edge".
    pub const fn with_cpha(self, leading: bool) -> Self {
        let reg = self.difference(Self::CPHA);
        match leading {
            false => reg,
            true => reg.union(Self::CPHA),
        }
    }
}

bitflags! {
    /// US_CSR
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Csr: u32 {
        const RXRDY   = 1 << 0;
        const TXRDY   = 1 << 1;
        const OVRE    = 1 << 5;
        const TXEMPTY = 1 << 9;
    }
}

/// USART borrowed as an 8-bit SPI master.
pub struct UsartController<R> {
    regs: R,
}

impl<R: UsartRegisters> UsartController<R> {
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Give back the register block.
    pub fn release(self) -> R {
        self.regs
    }

    fn command(&mut self, cr: Cr) {
        self.regs.write(UsartReg::Cr, cr.bits());
    }
}

impl<R: UsartRegisters> Backend for UsartController<R> {
    const MAX_WIDTH: WordWidth = WordWidth::Eight;

    fn init(&mut self, system_clock_hz: u32) {
        self.regs.enable_peripheral();

        self.regs.write(UsartReg::Idr, !0);
        self.command(Cr::RSTRX | Cr::RSTTX | Cr::RXDIS | Cr::TXDIS);
        self.regs.write(UsartReg::Mr, Mr::spi_master().bits());
        let divisor = Self::clock_divisor(system_clock_hz, INIT_BAUD_HZ)
            .unwrap_or(MAX_DIVISOR);
        self.regs.write(UsartReg::Brgr, divisor);
        self.command(
            Cr::RSTRX | Cr::RSTTX | Cr::RXDIS | Cr::TXDIS | Cr::RSTSTA,
        );
    }

    fn clock_divisor(system_clock_hz: u32, baud_hz: u32) -> Option<u32> {
        if baud_hz == 0 {
            return None;
        }
        let divisor = system_clock_hz / baud_hz;
        (1..=MAX_DIVISOR).contains(&divisor).then_some(divisor)
    }

    fn configure(
        &mut self,
        _device: &DeviceDescriptor,
        mode: SpiMode,
        divisor: u32,
    ) {
        self.command(Cr::RSTRX | Cr::RSTTX);
        let mr = Mr::spi_master()
            .union(Mr::CLKO)
            .with_cpol(mode.polarity() == Polarity::IdleHigh)
            .with_cpha(mode.capture_on_leading_edge());
        self.regs.write(UsartReg::Mr, mr.bits());
        self.regs.write(UsartReg::Brgr, divisor);
        self.command(Cr::RXEN | Cr::TXEN);
    }

    fn select(&mut self, _device: &DeviceDescriptor) {}

    fn end_transfer(&mut self) {}

    fn is_ready(&mut self, condition: Condition) -> bool {
        let csr = Csr::from_bits_retain(self.regs.read(UsartReg::Csr));
        match condition {
            Condition::TxReady => csr.contains(Csr::TXRDY),
            Condition::TxEmpty => csr.contains(Csr::TXEMPTY),
            Condition::RxReady => csr.contains(Csr::RXRDY),
        }
    }

    fn write_unit(&mut self, unit: u16, _last: bool) {
        self.regs.write(UsartReg::Thr, u32::from(unit & 0xFF));
    }

    fn read_unit(&mut self) -> u16 {
        (self.regs.read(UsartReg::Rhr) & 0xFF) as u16
    }
}
