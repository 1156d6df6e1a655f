//! `embedded-hal` bus implementation.
//!
//! The engine acts as an [`SpiBus`] for whichever device it was last
//! configured for, so it can sit underneath `embedded-hal-bus` device
//! adapters and drivers written against `embedded-hal`. Chip select is left
//! to the adapter; with [`CallOrder::Strict`](crate::CallOrder::Strict) a
//! device must be selected through the engine first.

use core::cell::Cell;

use embedded_hal::spi::{ErrorType, SpiBus};

use crate::backend::{Backend, WideBackend};
use crate::cs::ChipSelect;
use crate::engine::{SharedSpi, Word};
use crate::error::SpiError;
use crate::timeout::TimeoutPolicy;

impl<B: Backend, C: ChipSelect, T: TimeoutPolicy> ErrorType
    for SharedSpi<B, C, T>
{
    type Error = SpiError;
}

impl<B: Backend, C: ChipSelect, T: TimeoutPolicy> SharedSpi<B, C, T> {
    fn bus_read<W: Word>(&mut self, words: &mut [W]) -> Result<(), SpiError> {
        let len = words.len();
        self.transceive_units(None, Some(words), len)
    }

    fn bus_write<W: Word>(&mut self, words: &[W]) -> Result<(), SpiError> {
        self.transceive_units(Some(words), None, words.len())
    }

    /// Shift `max(read.len(), write.len())` units. The write side is padded
    /// with filler and surplus reads are dropped.
    fn bus_transfer<W: Word>(
        &mut self,
        read: &mut [W],
        write: &[W],
    ) -> Result<(), SpiError> {
        let len = read.len().max(write.len());
        self.exchange(
            len,
            |i| write.get(i).copied().unwrap_or(W::FILLER),
            |i, word| {
                if let Some(slot) = read.get_mut(i) {
                    *slot = word;
                }
            },
        )
    }

    fn bus_transfer_in_place<W: Word>(
        &mut self,
        words: &mut [W],
    ) -> Result<(), SpiError> {
        let cells = Cell::from_mut(words).as_slice_of_cells();
        self.exchange(
            cells.len(),
            |i| cells[i].get(),
            |i, word| cells[i].set(word),
        )
    }
}

impl<B: Backend, C: ChipSelect, T: TimeoutPolicy> SpiBus<u8>
    for SharedSpi<B, C, T>
{
    fn read(&mut self, words: &mut [u8]) -> Result<(), SpiError> {
        self.bus_read(words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), SpiError> {
        self.bus_write(words)
    }

    fn transfer(
        &mut self,
        read: &mut [u8],
        write: &[u8],
    ) -> Result<(), SpiError> {
        self.bus_transfer(read, write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), SpiError> {
        self.bus_transfer_in_place(words)
    }

    fn flush(&mut self) -> Result<(), SpiError> {
        SharedSpi::flush(self)
    }
}

impl<B: WideBackend, C: ChipSelect, T: TimeoutPolicy> SpiBus<u16>
    for SharedSpi<B, C, T>
{
    fn read(&mut self, words: &mut [u16]) -> Result<(), SpiError> {
        self.bus_read(words)
    }

    fn write(&mut self, words: &[u16]) -> Result<(), SpiError> {
        self.bus_write(words)
    }

    fn transfer(
        &mut self,
        read: &mut [u16],
        write: &[u16],
    ) -> Result<(), SpiError> {
        self.bus_transfer(read, write)
    }

    fn transfer_in_place(
        &mut self,
        words: &mut [u16],
    ) -> Result<(), SpiError> {
        self.bus_transfer_in_place(words)
    }

    fn flush(&mut self) -> Result<(), SpiError> {
        SharedSpi::flush(self)
    }
}
