//! Arming bulk transfers on a DMA channel.
//!
//! These calls only start a transfer. Waiting for completion, and keeping the
//! buffer alive until then, is up to the caller.

use crate::backend::DmaPort;
use crate::cs::ChipSelect;
use crate::engine::{check_len, SharedSpi};
use crate::error::SpiError;
use crate::timeout::TimeoutPolicy;

/// Largest number of bytes one single-buffer descriptor can move.
pub const MAX_DMA_LEN: usize = u16::MAX as usize;

/// Source of the filler clocked out by a transmit without data.
static FILLER: u8 = 0xFF;

/// Which side of the channel is paced by the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handshake {
    /// The peripheral with this handshake number consumes the data.
    Destination(u8),
    /// The peripheral with this handshake number produces the data.
    Source(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoMode {
    /// Fill the channel FIFO as much as possible before writing out.
    LargestBurst,
    /// Move data out of the channel FIFO as soon as possible.
    AsSoonAsPossible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    pub handshake: Handshake,
    pub fifo: FifoMode,
    /// Stop the channel once the descriptor completes.
    pub stop_on_done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressMode {
    Incrementing,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowControl {
    MemoryToPeripheral,
    PeripheralToMemory,
}

/// Single-buffer transfer of `count` bytes, byte-wide on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferDescriptor {
    pub source: usize,
    pub destination: usize,
    pub count: u16,
    pub source_mode: AddressMode,
    pub destination_mode: AddressMode,
    pub flow: FlowControl,
}

/// Platform access to the DMA controller.
pub trait DmaController {
    fn enable(&mut self);

    fn disable(&mut self);

    /// Arbitrate channels by fixed priority.
    fn use_fixed_priority(&mut self);

    fn disable_channel(&mut self, channel: u8);

    fn configure_channel(&mut self, channel: u8, config: &ChannelConfig);

    fn load_single_buffer(
        &mut self,
        channel: u8,
        descriptor: &TransferDescriptor,
    );

    fn enable_channel(&mut self, channel: u8);
}

fn descriptor_count(len: usize) -> Result<u16, SpiError> {
    u16::try_from(len).map_err(|_| SpiError::TransferTooLong(len))
}

impl<B: DmaPort, C: ChipSelect, T: TimeoutPolicy> SharedSpi<B, C, T> {
    /// Prepare the DMA controller for bus transfers.
    pub fn init_dma<D: DmaController>(&mut self, dma: &mut D) {
        dma.disable();
        dma.use_fixed_priority();
        dma.enable();
    }

    /// Arm `channel` to feed `len` bytes into the transmit register.
    ///
    /// Without `src` the channel repeatedly sends `0xFF` from a fixed address.
    ///
    /// # Safety
    ///
    /// `src` must stay valid and unmodified until the caller has observed
    /// completion of the transfer.
    pub unsafe fn start_transmit_dma<D: DmaController>(
        &mut self,
        dma: &mut D,
        channel: u8,
        src: Option<&[u8]>,
        len: usize,
    ) -> Result<(), SpiError> {
        let count = descriptor_count(len)?;
        check_len(src.map(<[u8]>::len), len)?;

        let (source, source_mode) = match src {
            Some(buf) => (buf.as_ptr() as usize, AddressMode::Incrementing),
            None => (&FILLER as *const u8 as usize, AddressMode::Fixed),
        };

        dma.enable();
        dma.disable_channel(channel);
        dma.configure_channel(
            channel,
            &ChannelConfig {
                handshake: Handshake::Destination(B::TX_HANDSHAKE),
                fifo: FifoMode::LargestBurst,
                stop_on_done: true,
            },
        );
        dma.load_single_buffer(
            channel,
            &TransferDescriptor {
                source,
                destination: self.backend().tx_data_address(),
                count,
                source_mode,
                destination_mode: AddressMode::Fixed,
                flow: FlowControl::MemoryToPeripheral,
            },
        );
        dma.enable_channel(channel);

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "shared spi: tx dma armed on channel {}, {} bytes",
            channel,
            len
        );
        Ok(())
    }

    /// Arm `channel` to drain `len` bytes from the receive register into `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must stay valid and must not be accessed until the caller has
    /// observed completion of the transfer.
    pub unsafe fn start_receive_dma<D: DmaController>(
        &mut self,
        dma: &mut D,
        channel: u8,
        dst: &mut [u8],
        len: usize,
    ) -> Result<(), SpiError> {
        let count = descriptor_count(len)?;
        check_len(Some(dst.len()), len)?;

        self.backend_mut().clear_overrun();

        dma.enable();
        dma.disable_channel(channel);
        dma.configure_channel(
            channel,
            &ChannelConfig {
                handshake: Handshake::Source(B::RX_HANDSHAKE),
                fifo: FifoMode::AsSoonAsPossible,
                stop_on_done: true,
            },
        );
        dma.load_single_buffer(
            channel,
            &TransferDescriptor {
                source: self.backend().rx_data_address(),
                destination: dst.as_mut_ptr() as usize,
                count,
                source_mode: AddressMode::Fixed,
                destination_mode: AddressMode::Incrementing,
                flow: FlowControl::PeripheralToMemory,
            },
        );
        dma.enable_channel(channel);

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "shared spi: rx dma armed on channel {}, {} bytes",
            channel,
            len
        );
        Ok(())
    }
}
