//! Dedicated SPI controller with four peripheral-select outputs.

use bitflags::bitflags;

use super::{Backend, Condition, DmaPort, WideBackend};
use crate::device::{DeviceDescriptor, Polarity, SpiMode, WordWidth};

/// Number of devices addressable through the controller's own select outputs.
pub const DIRECT_SELECT_LINES: u8 = 4;
/// Peripheral-select pattern with every output deasserted.
pub const NO_CHIP_SELECT: u8 = 0x0F;
/// Peripheral-select value programmed at bring-up.
pub const DEFAULT_CHIP_ID: u8 = 1;
/// Largest serial clock divisor.
pub const MAX_DIVISOR: u32 = 255;

/// DMA hardware handshake number of the transmit register.
pub const TX_HANDSHAKE: u8 = 1;
/// DMA hardware handshake number of the receive register.
pub const RX_HANDSHAKE: u8 = 2;

/// Controller registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiReg {
    Cr,
    Mr,
    Rdr,
    Tdr,
    Sr,
    /// Chip-select register 0..=3.
    Csr(u8),
}

impl SpiReg {
    /// Byte offset from the controller base address.
    pub const fn offset(self) -> usize {
        match self {
            SpiReg::Cr => 0x00,
            SpiReg::Mr => 0x04,
            SpiReg::Rdr => 0x08,
            SpiReg::Tdr => 0x0C,
            SpiReg::Sr => 0x10,
            SpiReg::Csr(n) => 0x30 + 4 * (n & 0x03) as usize,
        }
    }
}

/// Platform access to the controller registers.
pub trait SpiRegisters {
    /// Route the bus pins and enable the controller's peripheral clock.
    fn enable_peripheral(&mut self) {}

    fn read(&mut self, reg: SpiReg) -> u32;

    fn write(&mut self, reg: SpiReg, value: u32);
}

/// Bus addresses of the data registers, for DMA.
pub trait SpiDataAddresses {
    fn address_of(&self, reg: SpiReg) -> usize;
}

/// Memory-mapped register block.
pub struct SpiMmio {
    base: usize,
}

impl SpiMmio {
    /// # Safety
    ///
    /// `base` must be the address of a controller register block that no other
    /// code accesses while this value exists.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }
}

impl SpiRegisters for SpiMmio {
    fn read(&mut self, reg: SpiReg) -> u32 {
        // SAFETY: `new` requires `base` to point at the register block.
        unsafe {
            core::ptr::read_volatile((self.base + reg.offset()) as *const u32)
        }
    }

    fn write(&mut self, reg: SpiReg, value: u32) {
        // SAFETY: `new` requires `base` to point at the register block.
        unsafe {
            core::ptr::write_volatile(
                (self.base + reg.offset()) as *mut u32,
                value,
            )
        }
    }
}

impl SpiDataAddresses for SpiMmio {
    fn address_of(&self, reg: SpiReg) -> usize {
        self.base + reg.offset()
    }
}

bitflags! {
    /// SPI_CR
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Cr: u32 {
        const SPIEN    = 1 << 0;
        const SPIDIS   = 1 << 1;
        const SWRST    = 1 << 7;
        const LASTXFER = 1 << 24;
    }
}

bitflags! {
    /// SPI_MR
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Mr: u32 {
        const MSTR    = 1 << 0;
        const PS      = 1 << 1;
        const PCSDEC  = 1 << 2;
        const MODFDIS = 1 << 4;
        const WDRBT   = 1 << 5;
        const LLB     = 1 << 7;

        const PCS = 0xF << 16;
    }
}

impl Mr {
    pub const fn pcs(&self) -> u8 {
        (self.intersection(Self::PCS).bits() >> 16) as u8
    }

    pub const fn with_pcs(self, value: u8) -> Self {
        let reg = self.difference(Self::PCS);
        Self::from_bits_retain(reg.bits() | ((value & 0x0F) as u32) << 16)
    }
}

bitflags! {
    /// SPI_SR
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Sr: u32 {
        const RDRF    = 1 << 0;
        const TDRE    = 1 << 1;
        const MODF    = 1 << 2;
        const OVRES   = 1 << 3;
        const NSSR    = 1 << 8;
        const TXEMPTY = 1 << 9;
        const SPIENS  = 1 << 16;
    }
}

bitflags! {
    /// SPI_TDR
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Tdr: u32 {
        const TD       = 0xFFFF;
        const PCS      = 0xF << 16;
        const LASTXFER = 1 << 24;
    }
}

bitflags! {
    /// SPI_CSRx
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Csr: u32 {
        const CPOL   = 1 << 0;
        const NCPHA  = 1 << 1;
        const CSNAAT = 1 << 2;
        const CSAAT  = 1 << 3;

        const BITS   = 0xF << 4;
        const SCBR   = 0xFF << 8;
        const DLYBS  = 0xFF << 16;
        const DLYBCT = 0xFF << 24;
    }
}

impl Csr {
    const BITS_16: u32 = 8 << 4;

    pub const fn cpol(&self) -> bool {
        self.contains(Self::CPOL)
    }

    pub const fn with_cpol(self, idle_high: bool) -> Self {
        let reg = self.difference(Self::CPOL);
        match idle_high {
            false => reg,
            true => reg.union(Self::CPOL),
        }
    }

    pub const fn ncpha(&self) -> bool {
        self.contains(Self::NCPHA)
    }

    pub const fn with_ncpha(self, leading: bool) -> Self {
        let reg = self.difference(Self::NCPHA);
        match leading {
            false => reg,
            true => reg.union(Self::NCPHA),
        }
    }

    pub const fn width(&self) -> WordWidth {
        match self.intersection(Self::BITS).bits() {
            Self::BITS_16 => WordWidth::Sixteen,
            _ => WordWidth::Eight,
        }
    }

    pub const fn with_width(self, width: WordWidth) -> Self {
        let reg = self.difference(Self::BITS);
        match width {
            WordWidth::Eight => reg,
            WordWidth::Sixteen => {
                Self::from_bits_retain(reg.bits() | Self::BITS_16)
            }
        }
    }

    pub const fn scbr(&self) -> u8 {
        (self.intersection(Self::SCBR).bits() >> 8) as u8
    }

    pub const fn with_scbr(self, divisor: u8) -> Self {
        let reg = self.difference(Self::SCBR);
        Self::from_bits_retain(reg.bits() | (divisor as u32) << 8)
    }
}

/// Chip-select register that holds settings for `id`.
///
/// Ids past the direct range share slots; only their GPIO line tells them
/// apart.
pub const fn csr_index(id: u8) -> u8 {
    id % DIRECT_SELECT_LINES
}

/// Active-low peripheral-select pattern that makes the controller use the
/// settings slot of `id`.
pub const fn select_pattern(id: u8) -> u8 {
    !(1u8 << csr_index(id)) & NO_CHIP_SELECT
}

/// Controller driven through its dedicated SPI register block.
///
/// Supports 8 and 16 bit units and DMA. Selecting a device programs the
/// peripheral-select pattern of its settings slot, so ids from
/// [`DIRECT_SELECT_LINES`] up share a slot and the matching select output with
/// a lower id and rely on their GPIO line.
pub struct StandardController<R> {
    regs: R,
}

impl<R: SpiRegisters> StandardController<R> {
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
        self.regs.write(SpiReg::Cr, cr.bits());
    }

    fn modify_mr<F>(&mut self, f: F)
    where
        F: FnOnce(Mr) -> Mr,
    {
        let mr = Mr::from_bits_retain(self.regs.read(SpiReg::Mr));
        self.regs.write(SpiReg::Mr, f(mr).bits());
    }

    fn modify_csr<F>(&mut self, index: u8, f: F)
    where
        F: FnOnce(Csr) -> Csr,
    {
        let reg = SpiReg::Csr(index);
        let csr = Csr::from_bits_retain(self.regs.read(reg));
        self.regs.write(reg, f(csr).bits());
    }
}

impl<R: SpiRegisters> Backend for StandardController<R> {
    const MAX_WIDTH: WordWidth = WordWidth::Sixteen;

    fn init(&mut self, _system_clock_hz: u32) {
        self.regs.enable_peripheral();
        self.command(Cr::SWRST);

        // Master, fixed peripheral select, no decoder, no mode fault and no
        // loopback.
        self.modify_mr(|mr| {
            mr.union(Mr::MSTR | Mr::MODFDIS)
                .difference(Mr::LLB | Mr::PS | Mr::PCSDEC)
                .with_pcs(DEFAULT_CHIP_ID)
        });
    }

    fn clock_divisor(system_clock_hz: u32, baud_hz: u32) -> Option<u32> {
        if baud_hz == 0 {
            return None;
        }
        let divisor = system_clock_hz.div_ceil(baud_hz);
        (1..=MAX_DIVISOR).contains(&divisor).then_some(divisor)
    }

    fn configure(
        &mut self,
        device: &DeviceDescriptor,
        mode: SpiMode,
        divisor: u32,
    ) {
        self.command(Cr::SWRST);
        // Software reset clears MR as well, PCS included.
        self.modify_mr(|mr| {
            mr.union(Mr::MSTR | Mr::MODFDIS)
                .with_pcs(select_pattern(device.id))
        });
        self.modify_csr(csr_index(device.id), |csr| {
            csr.with_width(device.width)
                .with_scbr(divisor as u8)
                .with_cpol(mode.polarity() == Polarity::IdleHigh)
                .with_ncpha(mode.capture_on_leading_edge())
        });
        self.command(Cr::SPIEN);
    }

    fn select(&mut self, device: &DeviceDescriptor) {
        // The pattern picks the settings slot as well as the select output.
        self.modify_mr(|mr| mr.with_pcs(select_pattern(device.id)));
    }

    fn end_transfer(&mut self) {
        self.command(Cr::LASTXFER);
        self.modify_mr(|mr| mr.with_pcs(NO_CHIP_SELECT));
    }

    fn is_ready(&mut self, condition: Condition) -> bool {
        let sr = Sr::from_bits_retain(self.regs.read(SpiReg::Sr));
        match condition {
            Condition::TxReady => sr.contains(Sr::TDRE),
            Condition::TxEmpty => sr.contains(Sr::TXEMPTY),
            Condition::RxReady => sr.contains(Sr::RDRF),
        }
    }

    fn write_unit(&mut self, unit: u16, last: bool) {
        let mut tdr = Tdr::from_bits_retain(u32::from(unit));
        if last {
            tdr |= Tdr::LASTXFER;
        }
        self.regs.write(SpiReg::Tdr, tdr.bits());
    }

    fn read_unit(&mut self) -> u16 {
        self.regs.read(SpiReg::Rdr) as u16
    }
}

impl<R: SpiRegisters> WideBackend for StandardController<R> {}

impl<R: SpiRegisters + SpiDataAddresses> DmaPort for StandardController<R> {
    const TX_HANDSHAKE: u8 = TX_HANDSHAKE;
    const RX_HANDSHAKE: u8 = RX_HANDSHAKE;

    fn tx_data_address(&self) -> usize {
        self.regs.address_of(SpiReg::Tdr)
    }

    fn rx_data_address(&self) -> usize {
        self.regs.address_of(SpiReg::Rdr)
    }

    fn clear_overrun(&mut self) {
        let _ = self.regs.read(SpiReg::Sr);
    }
}
