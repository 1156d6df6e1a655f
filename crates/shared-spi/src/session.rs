use bus_arbiter::BusGuard;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::backend::{Backend, WideBackend};
use crate::cs::ChipSelect;
use crate::device::{DeviceDescriptor, SpiMode};
use crate::engine::SharedSpi;
use crate::error::SpiError;
use crate::timeout::TimeoutPolicy;

/// A configured and selected device.
///
/// Created by [`SharedSpi::open`], which needs a live [`BusGuard`], so the
/// arbiter is held for as long as the session exists. The device is
/// deselected by [`close`](Self::close) or, discarding any drain timeout, on
/// drop.
pub struct DeviceSession<'a, B: Backend, C: ChipSelect, T: TimeoutPolicy> {
    spi: &'a mut SharedSpi<B, C, T>,
    device: &'a DeviceDescriptor,
    open: bool,
}

impl<B: Backend, C: ChipSelect, T: TimeoutPolicy> SharedSpi<B, C, T> {
    /// Configure and select `device` while the bus is held.
    pub fn open<'a, M: RawMutex>(
        &'a mut self,
        _guard: &'a BusGuard<'_, M>,
        device: &'a DeviceDescriptor,
        mode: SpiMode,
        baud_hz: u32,
    ) -> Result<DeviceSession<'a, B, C, T>, SpiError> {
        self.configure_device(device, mode, baud_hz)?;
        self.select_device(device)?;
        Ok(DeviceSession { spi: self, device, open: true })
    }
}

impl<B: Backend, C: ChipSelect, T: TimeoutPolicy> DeviceSession<'_, B, C, T> {
    /// Device this session has selected.
    pub fn device(&self) -> &DeviceDescriptor {
        self.device
    }

    /// Exchange `len` bytes, see [`SharedSpi::transceive`].
    pub fn transceive(
        &mut self,
        tx: Option<&[u8]>,
        rx: Option<&mut [u8]>,
        len: usize,
    ) -> Result<(), SpiError> {
        self.spi.transceive(tx, rx, len)
    }

    /// Deselect the device, reporting a drain timeout.
    pub fn close(mut self) -> Result<(), SpiError> {
        self.open = false;
        self.spi.deselect_device(self.device)
    }
}

impl<B: WideBackend, C: ChipSelect, T: TimeoutPolicy>
    DeviceSession<'_, B, C, T>
{
    /// Exchange `len` 16-bit words, see [`SharedSpi::transceive16`].
    pub fn transceive16(
        &mut self,
        tx: Option<&[u16]>,
        rx: Option<&mut [u16]>,
        len: usize,
    ) -> Result<(), SpiError> {
        self.spi.transceive16(tx, rx, len)
    }
}

impl<B: Backend, C: ChipSelect, T: TimeoutPolicy> Drop
    for DeviceSession<'_, B, C, T>
{
    fn drop(&mut self) {
        if self.open {
            let _ = self.spi.deselect_device(self.device);
        }
    }
}
