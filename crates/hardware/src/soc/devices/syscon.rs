//! System Controller (SysCon).
//!
//! A single write-only command register used by guests to power off or reboot the machine.
//!
//! # Registers
//!
//! * `0x00`: Command Register (32-bit)
//!   * `0x5555`: Power Off
//!   * `0x7777`: Reboot

use crate::common::Trap;
use crate::soc::traits::{Device, DeviceContext, PowerEvent};

/// Magic value requesting power off.
pub const SYSCON_POWEROFF: u32 = 0x5555;
/// Magic value requesting a reboot.
pub const SYSCON_REBOOT: u32 = 0x7777;

/// Size of the SysCon region.
pub const SYSCON_SIZE: u64 = 0x1000;

/// SysCon device structure.
#[derive(Debug, Default)]
pub struct SysCon;

impl SysCon {
    /// Creates a SysCon device.
    pub fn new() -> Self {
        Self
    }
}

impl Device for SysCon {
    fn name(&self) -> &str {
        "SysCon"
    }

    fn size(&self) -> u64 {
        SYSCON_SIZE
    }

    fn read_u32(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u32, Trap> {
        if offset == 0 { Ok(0) } else { Err(ctx.load_fault(offset)) }
    }

    fn write_u32(
        &mut self,
        offset: u64,
        val: u32,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Trap> {
        let event = match (offset, val) {
            (0, SYSCON_POWEROFF) => PowerEvent::PowerOff,
            (0, SYSCON_REBOOT) => PowerEvent::Reboot,
            _ => return Err(ctx.store_fault(offset)),
        };
        tracing::info!("syscon: {event:?} requested");
        ctx.request_power(event);
        Ok(())
    }
}
