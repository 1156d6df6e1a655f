#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use shared_spi::backend::spi::{
    self, Csr, Mr, Sr, SpiDataAddresses, SpiReg, SpiRegisters,
};
use shared_spi::backend::usart::{self, UsartReg, UsartRegisters};
use shared_spi::dma::{ChannelConfig, DmaController, TransferDescriptor};
use shared_spi::{
    ChipSelect, Condition, Config, SharedSpi, StandardController,
    UsartController,
};

pub const SPI_BASE: usize = 0x4000_8000;

// ---------------------------------------------------------------------------
// Shared event trace
// ---------------------------------------------------------------------------

/// Everything the simulated hardware observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Status register read, with the value returned.
    Status(u32),
    /// Control register write.
    Command(u32),
    /// Transmit register write.
    Transmit(u32),
    ChipSelect { line: u8, high: bool },
}

pub type Trace = Rc<RefCell<Vec<Event>>>;

pub fn new_trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

// ---------------------------------------------------------------------------
// Simulated SPI controller
// ---------------------------------------------------------------------------

/// Register-level model of the standard controller.
///
/// In loopback mode every transmitted unit comes straight back in the receive
/// register; otherwise units are taken from `miso`.
pub struct SimSpi {
    pub trace: Trace,
    pub mr: u32,
    pub csr: [u32; 4],
    pub commands: Vec<u32>,
    pub tdr_writes: Vec<u32>,
    /// Settings slot in effect for each transmitted unit, `None` when the
    /// select pattern addressed no slot.
    pub tdr_settings: Vec<Option<Csr>>,
    pub sr_reads: usize,
    pub peripheral_enabled: bool,
    pub loopback: bool,
    pub miso: VecDeque<u16>,
    /// Condition that is never reported ready.
    pub stalled: Option<Condition>,
    /// Number of upcoming status reads that report the transmitter busy.
    pub tx_empty_delay: usize,
    /// Stop answering after this many transmitted units.
    pub respond_limit: Option<usize>,
    rdr: u32,
    rdrf: bool,
}

impl SimSpi {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            mr: 0,
            csr: [0; 4],
            commands: Vec::new(),
            tdr_writes: Vec::new(),
            tdr_settings: Vec::new(),
            sr_reads: 0,
            peripheral_enabled: false,
            loopback: true,
            miso: VecDeque::new(),
            stalled: None,
            tx_empty_delay: 0,
            respond_limit: None,
            rdr: 0,
            rdrf: false,
        }
    }

    pub fn mr(&self) -> Mr {
        Mr::from_bits_retain(self.mr)
    }

    pub fn csr(&self, index: usize) -> Csr {
        Csr::from_bits_retain(self.csr[index])
    }

    /// Slot picked by the fixed peripheral-select field: the lowest zero bit
    /// of PCS, none for `0b1111`.
    pub fn active_slot(&self) -> Option<usize> {
        let pcs = self.mr().pcs();
        (0..4).find(|slot| pcs & (1 << slot) == 0)
    }

    pub fn active_csr(&self) -> Option<Csr> {
        self.active_slot().map(|slot| self.csr(slot))
    }

    fn status(&mut self) -> u32 {
        let mut sr = Sr::empty();
        if self.stalled != Some(Condition::TxReady) {
            sr |= Sr::TDRE;
        }
        if self.stalled != Some(Condition::TxEmpty) {
            if self.tx_empty_delay == 0 {
                sr |= Sr::TXEMPTY;
            } else {
                self.tx_empty_delay -= 1;
            }
        }
        if self.rdrf && self.stalled != Some(Condition::RxReady) {
            sr |= Sr::RDRF;
        }
        sr.bits()
    }
}

impl SpiRegisters for SimSpi {
    fn enable_peripheral(&mut self) {
        self.peripheral_enabled = true;
    }

    fn read(&mut self, reg: SpiReg) -> u32 {
        match reg {
            SpiReg::Sr => {
                self.sr_reads += 1;
                let sr = self.status();
                self.trace.borrow_mut().push(Event::Status(sr));
                sr
            }
            SpiReg::Rdr => {
                self.rdrf = false;
                self.rdr
            }
            SpiReg::Mr => self.mr,
            SpiReg::Csr(n) => self.csr[usize::from(n & 3)],
            SpiReg::Cr | SpiReg::Tdr => 0,
        }
    }

    fn write(&mut self, reg: SpiReg, value: u32) {
        match reg {
            SpiReg::Cr => {
                self.commands.push(value);
                self.trace.borrow_mut().push(Event::Command(value));
                if value & spi::Cr::SWRST.bits() != 0 {
                    self.mr = 0;
                    self.csr = [0; 4];
                    self.rdrf = false;
                }
            }
            SpiReg::Mr => self.mr = value,
            SpiReg::Csr(n) => self.csr[usize::from(n & 3)] = value,
            SpiReg::Tdr => {
                self.tdr_writes.push(value);
                self.tdr_settings.push(self.active_csr());
                self.trace.borrow_mut().push(Event::Transmit(value));
                let answered = self
                    .respond_limit
                    .map_or(true, |limit| self.tdr_writes.len() <= limit);
                if answered {
                    self.rdr = if self.loopback {
                        value & 0xFFFF
                    } else {
                        u32::from(self.miso.pop_front().unwrap_or(0))
                    };
                    self.rdrf = true;
                }
            }
            SpiReg::Rdr | SpiReg::Sr => {}
        }
    }
}

impl SpiDataAddresses for SimSpi {
    fn address_of(&self, reg: SpiReg) -> usize {
        SPI_BASE + reg.offset()
    }
}

// ---------------------------------------------------------------------------
// Simulated USART
// ---------------------------------------------------------------------------

pub struct SimUsart {
    pub trace: Trace,
    pub mr: u32,
    pub brgr: u32,
    pub idr: u32,
    pub commands: Vec<u32>,
    pub thr_writes: Vec<u32>,
    pub csr_reads: usize,
    pub peripheral_enabled: bool,
    pub stalled: Option<Condition>,
    rhr: u32,
    rxrdy: bool,
}

impl SimUsart {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            mr: 0,
            brgr: 0,
            idr: 0,
            commands: Vec::new(),
            thr_writes: Vec::new(),
            csr_reads: 0,
            peripheral_enabled: false,
            stalled: None,
            rhr: 0,
            rxrdy: false,
        }
    }

    pub fn mr(&self) -> usart::Mr {
        usart::Mr::from_bits_retain(self.mr)
    }
}

impl UsartRegisters for SimUsart {
    fn enable_peripheral(&mut self) {
        self.peripheral_enabled = true;
    }

    fn read(&mut self, reg: UsartReg) -> u32 {
        match reg {
            UsartReg::Csr => {
                self.csr_reads += 1;
                let mut csr = usart::Csr::empty();
                if self.stalled != Some(Condition::TxReady) {
                    csr |= usart::Csr::TXRDY;
                }
                if self.stalled != Some(Condition::TxEmpty) {
                    csr |= usart::Csr::TXEMPTY;
                }
                if self.rxrdy && self.stalled != Some(Condition::RxReady) {
                    csr |= usart::Csr::RXRDY;
                }
                self.trace.borrow_mut().push(Event::Status(csr.bits()));
                csr.bits()
            }
            UsartReg::Rhr => {
                self.rxrdy = false;
                self.rhr
            }
            UsartReg::Mr => self.mr,
            UsartReg::Brgr => self.brgr,
            UsartReg::Cr | UsartReg::Idr | UsartReg::Thr => 0,
        }
    }

    fn write(&mut self, reg: UsartReg, value: u32) {
        match reg {
            UsartReg::Cr => {
                self.commands.push(value);
                self.trace.borrow_mut().push(Event::Command(value));
            }
            UsartReg::Mr => self.mr = value,
            UsartReg::Brgr => self.brgr = value,
            UsartReg::Idr => self.idr = value,
            UsartReg::Thr => {
                self.thr_writes.push(value);
                self.trace.borrow_mut().push(Event::Transmit(value));
                self.rhr = value & 0xFF;
                self.rxrdy = true;
            }
            UsartReg::Csr | UsartReg::Rhr => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Chip-select lines
// ---------------------------------------------------------------------------

/// Eight select lines, all idle high.
pub struct SimPins {
    pub trace: Trace,
    pub high: [bool; 8],
}

impl SimPins {
    pub fn new(trace: Trace) -> Self {
        Self { trace, high: [true; 8] }
    }
}

impl ChipSelect for SimPins {
    fn assert(&mut self, line: u8) {
        self.high[usize::from(line)] = false;
        self.trace.borrow_mut().push(Event::ChipSelect { line, high: false });
    }

    fn deassert(&mut self, line: u8) {
        self.high[usize::from(line)] = true;
        self.trace.borrow_mut().push(Event::ChipSelect { line, high: true });
    }
}

// ---------------------------------------------------------------------------
// DMA controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DmaOp {
    Enable,
    Disable,
    FixedPriority,
    DisableChannel(u8),
    Configure(u8, ChannelConfig),
    Load(u8, TransferDescriptor),
    EnableChannel(u8),
}

#[derive(Default)]
pub struct SimDma {
    pub ops: Vec<DmaOp>,
}

impl SimDma {
    pub fn loaded(&self) -> Option<TransferDescriptor> {
        self.ops.iter().rev().find_map(|op| match op {
            DmaOp::Load(_, desc) => Some(*desc),
            _ => None,
        })
    }
}

impl DmaController for SimDma {
    fn enable(&mut self) {
        self.ops.push(DmaOp::Enable);
    }

    fn disable(&mut self) {
        self.ops.push(DmaOp::Disable);
    }

    fn use_fixed_priority(&mut self) {
        self.ops.push(DmaOp::FixedPriority);
    }

    fn disable_channel(&mut self, channel: u8) {
        self.ops.push(DmaOp::DisableChannel(channel));
    }

    fn configure_channel(&mut self, channel: u8, config: &ChannelConfig) {
        self.ops.push(DmaOp::Configure(channel, *config));
    }

    fn load_single_buffer(
        &mut self,
        channel: u8,
        descriptor: &TransferDescriptor,
    ) {
        self.ops.push(DmaOp::Load(channel, *descriptor));
    }

    fn enable_channel(&mut self, channel: u8) {
        self.ops.push(DmaOp::EnableChannel(channel));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub type StandardBus = SharedSpi<StandardController<SimSpi>, SimPins>;
pub type UsartBus = SharedSpi<UsartController<SimUsart>, SimPins>;

pub fn standard_bus(config: Config) -> (StandardBus, Trace) {
    let trace = new_trace();
    let bus = SharedSpi::new(
        StandardController::new(SimSpi::new(trace.clone())),
        SimPins::new(trace.clone()),
        config,
    );
    (bus, trace)
}

pub fn usart_bus(config: Config) -> (UsartBus, Trace) {
    let trace = new_trace();
    let bus = SharedSpi::new(
        UsartController::new(SimUsart::new(trace.clone())),
        SimPins::new(trace.clone()),
        config,
    );
    (bus, trace)
}

pub fn sim(bus: &StandardBus) -> &SimSpi {
    bus.backend().registers()
}

pub fn sim_mut(bus: &mut StandardBus) -> &mut SimSpi {
    bus.backend_mut().registers_mut()
}

pub fn usart_sim(bus: &UsartBus) -> &SimUsart {
    bus.backend().registers()
}

pub fn usart_sim_mut(bus: &mut UsartBus) -> &mut SimUsart {
    bus.backend_mut().registers_mut()
}
