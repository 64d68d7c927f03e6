//! Core Local Interruptor (CLINT).
//!
//! The CLINT holds the machine software interrupt bit and the machine timer. `mtime` runs
//! at 10 MHz off the host monotonic clock; it is not tied to retired instructions.
//!
//! # Memory Map
//!
//! * `0x0000`: MSIP (32-bit), mirrors `mip.MSIP`
//! * `0x4000`: MTIMECMP (64-bit)
//! * `0xBFF8`: MTIME (64-bit)

use std::time::Instant;

use crate::common::Trap;
use crate::core::arch::csr::{MIP_MSIP, MIP_MTIP};
use crate::soc::traits::{Device, DeviceContext};

/// Offset for the Machine Software Interrupt Pending register.
const MSIP_OFFSET: u64 = 0x0000;
/// Offset for the Machine Time Compare register.
const MTIMECMP_OFFSET: u64 = 0x4000;
/// Offset for the Machine Time register.
const MTIME_OFFSET: u64 = 0xBFF8;

/// Size of the CLINT region.
pub const CLINT_SIZE: u64 = 0x10000;

/// Host nanoseconds per `mtime` tick.
const NANOS_PER_TICK: u128 = 100;

/// CLINT device structure.
#[derive(Debug)]
pub struct Clint {
    epoch: Instant,
    /// Host tick count at which `mtime` read zero.
    time_base: u64,
    mtimecmp: u64,
}

impl Default for Clint {
    fn default() -> Self {
        Self::new()
    }
}

impl Clint {
    /// Creates a CLINT whose `mtime` starts at zero now.
    pub fn new() -> Self {
        Self { epoch: Instant::now(), time_base: 0, mtimecmp: u64::MAX }
    }

    fn host_ticks(&self) -> u64 {
        (self.epoch.elapsed().as_nanos() / NANOS_PER_TICK) as u64
    }

    /// Current `mtime`.
    pub fn mtime(&self) -> u64 {
        self.host_ticks().wrapping_sub(self.time_base)
    }

    /// Current `mtimecmp`.
    pub fn mtimecmp(&self) -> u64 {
        self.mtimecmp
    }

    fn update_mtip(&self, ctx: &mut DeviceContext<'_>) {
        ctx.set_mip(MIP_MTIP, self.mtimecmp <= self.mtime());
    }
}

impl Device for Clint {
    fn name(&self) -> &str {
        "CLINT"
    }

    fn size(&self) -> u64 {
        CLINT_SIZE
    }

    fn read_u32(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u32, Trap> {
        match offset {
            MSIP_OFFSET => Ok(u32::from(*ctx.mip & MIP_MSIP != 0)),
            _ => Err(ctx.load_fault(offset)),
        }
    }

    fn read_u64(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u64, Trap> {
        match offset {
            MTIMECMP_OFFSET => Ok(self.mtimecmp),
            MTIME_OFFSET => Ok(self.mtime()),
            _ => Err(ctx.load_fault(offset)),
        }
    }

    fn write_u32(
        &mut self,
        offset: u64,
        val: u32,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Trap> {
        match offset {
            MSIP_OFFSET => {
                ctx.set_mip(MIP_MSIP, val & 1 != 0);
                Ok(())
            }
            _ => Err(ctx.store_fault(offset)),
        }
    }

    fn write_u64(
        &mut self,
        offset: u64,
        val: u64,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Trap> {
        match offset {
            MTIMECMP_OFFSET => self.mtimecmp = val,
            // mtime reads `now - base`, so writing v moves the base to `now - v`.
            MTIME_OFFSET => self.time_base = self.host_ticks().wrapping_sub(val),
            _ => return Err(ctx.store_fault(offset)),
        }
        self.update_mtip(ctx);
        Ok(())
    }

    fn update(&mut self, ctx: &mut DeviceContext<'_>) {
        self.update_mtip(ctx);
    }
}
