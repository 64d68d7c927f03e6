//! Device trait for memory-mapped I/O.
//!
//! This module defines the contract every MMIO device satisfies. It provides:
//! 1. **Identification:** `name` and `size` for registration on the shadow map.
//! 2. **Access:** Byte, half, word and doubleword read/write at device-relative offsets.
//!    Every access defaults to an access fault, so a device implements only the widths it
//!    supports.
//! 3. **Lifecycle:** `update` once per device-update period and `free` at teardown.
//! 4. **Side Effects:** A [`DeviceContext`] through which a device sets `mip` bits, raises
//!    interrupt-aggregator sources and requests power events.

use std::fmt;

use crate::common::Trap;
use crate::soc::devices::{Plic, Uart};

/// A power transition requested by a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerEvent {
    /// Stop the machine.
    PowerOff,
    /// Stop the machine and rebuild it from the same configuration.
    Reboot,
}

/// Side effects collected from devices during one access or update pass.
#[derive(Debug, Default)]
pub struct DeviceEvents {
    /// Interrupt-aggregator sources raised, in order.
    pub irqs: Vec<u32>,
    /// Latest power request.
    pub power: Option<PowerEvent>,
}

/// What a device may touch outside itself while handling an access.
#[derive(Debug)]
pub struct DeviceContext<'a> {
    base: u64,
    /// The hart's `mip` register.
    pub mip: &'a mut u64,
    events: &'a mut DeviceEvents,
}

impl<'a> DeviceContext<'a> {
    /// Creates a context for the device mapped at `base`.
    pub fn new(base: u64, mip: &'a mut u64, events: &'a mut DeviceEvents) -> Self {
        Self { base, mip, events }
    }

    /// Load access fault for `offset`, carrying the absolute physical address.
    pub fn load_fault(&self, offset: u64) -> Trap {
        Trap::LoadAccessFault(self.base.wrapping_add(offset))
    }

    /// Store access fault for `offset`, carrying the absolute physical address.
    pub fn store_fault(&self, offset: u64) -> Trap {
        Trap::StoreAccessFault(self.base.wrapping_add(offset))
    }

    /// Sets or clears a `mip` bit.
    pub fn set_mip(&mut self, mask: u64, on: bool) {
        if on {
            *self.mip |= mask;
        } else {
            *self.mip &= !mask;
        }
    }

    /// Marks `source` pending on the interrupt aggregator.
    pub fn raise_irq(&mut self, source: u32) {
        self.events.irqs.push(source);
    }

    /// Requests a power transition.
    pub fn request_power(&mut self, event: PowerEvent) {
        self.events.power = Some(event);
    }
}

/// Trait for memory-mapped I/O devices attached to the shadow map.
pub trait Device: fmt::Debug {
    /// Returns a short name for this device (e.g., `"UART0"`).
    fn name(&self) -> &str;

    /// Size in bytes of the device's region; a multiple of the page size.
    fn size(&self) -> u64;

    /// Reads one byte at `offset`.
    fn read_u8(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u8, Trap> {
        Err(ctx.load_fault(offset))
    }
    /// Reads two bytes at `offset`.
    fn read_u16(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u16, Trap> {
        Err(ctx.load_fault(offset))
    }
    /// Reads four bytes at `offset`.
    fn read_u32(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u32, Trap> {
        Err(ctx.load_fault(offset))
    }
    /// Reads eight bytes at `offset`.
    fn read_u64(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u64, Trap> {
        Err(ctx.load_fault(offset))
    }

    /// Writes one byte at `offset`.
    fn write_u8(&mut self, offset: u64, _val: u8, ctx: &mut DeviceContext<'_>) -> Result<(), Trap> {
        Err(ctx.store_fault(offset))
    }
    /// Writes two bytes at `offset`.
    fn write_u16(
        &mut self,
        offset: u64,
        _val: u16,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Trap> {
        Err(ctx.store_fault(offset))
    }
    /// Writes four bytes at `offset`.
    fn write_u32(
        &mut self,
        offset: u64,
        _val: u32,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Trap> {
        Err(ctx.store_fault(offset))
    }
    /// Writes eight bytes at `offset`.
    fn write_u64(
        &mut self,
        offset: u64,
        _val: u64,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Trap> {
        Err(ctx.store_fault(offset))
    }

    /// Called once per device-update period.
    fn update(&mut self, _ctx: &mut DeviceContext<'_>) {}

    /// Releases host resources at machine teardown.
    fn free(&mut self) {}

    /// Returns a mutable reference as `Plic` if this device is the PLIC; otherwise `None`.
    fn as_plic_mut(&mut self) -> Option<&mut Plic> {
        None
    }
    /// Returns a mutable reference as `Uart` if this device is a UART; otherwise `None`.
    fn as_uart_mut(&mut self) -> Option<&mut Uart> {
        None
    }
}
