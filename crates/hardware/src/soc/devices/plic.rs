//! Platform-Level Interrupt Controller (PLIC).
//!
//! The PLIC aggregates external interrupt sources and hands them to two contexts of the
//! single hart: context 0 drives `mip.MEIP`, context 1 drives `mip.SEIP`. Only 32-bit
//! accesses are supported.
//!
//! # Memory Map
//!
//! * `0x000000`: Source priorities, one word per source
//! * `0x001000`: Pending bits
//! * `0x002000`: Context 0 enables
//! * `0x002080`: Context 1 enables
//! * `0x200000`: Context 0 threshold, claim/complete at `+4`
//! * `0x201000`: Context 1 threshold, claim/complete at `+4`

use crate::common::Trap;
use crate::core::arch::csr::{MIP_MEIP, MIP_SEIP};
use crate::soc::traits::{Device, DeviceContext};

/// Number of interrupt sources; source 0 is reserved.
pub const PLIC_SOURCES: u32 = 32;

/// Size of the PLIC region.
pub const PLIC_SIZE: u64 = 0x400_0000;

const PRIORITY_BASE: u64 = 0x00_0000;
const PRIORITY_END: u64 = PRIORITY_BASE + 4 * PLIC_SOURCES as u64;
const PENDING_BASE: u64 = 0x00_1000;
const ENABLE_BASE: [u64; 2] = [0x00_2000, 0x00_2080];
const THRESHOLD_BASE: [u64; 2] = [0x20_0000, 0x20_1000];
const CLAIM_OFFSET: u64 = 4;

/// `mip` bit each context drives.
const CONTEXT_MIP: [u64; 2] = [MIP_MEIP, MIP_SEIP];

#[derive(Clone, Copy, Debug, Default)]
struct Context {
    enable: u32,
    threshold: u32,
    claim: u32,
}

/// PLIC device structure.
#[derive(Debug, Default)]
pub struct Plic {
    priorities: [u32; PLIC_SOURCES as usize],
    pending: u32,
    contexts: [Context; 2],
}

enum Register {
    Priority(usize),
    Pending,
    Enable(usize),
    Threshold(usize),
    Claim(usize),
}

fn register(offset: u64) -> Option<Register> {
    if offset & 3 != 0 {
        return None;
    }
    if offset < PRIORITY_END {
        return Some(Register::Priority(((offset - PRIORITY_BASE) / 4) as usize));
    }
    if offset == PENDING_BASE {
        return Some(Register::Pending);
    }
    for ctx in 0..2 {
        if offset == ENABLE_BASE[ctx] {
            return Some(Register::Enable(ctx));
        }
        if offset == THRESHOLD_BASE[ctx] {
            return Some(Register::Threshold(ctx));
        }
        if offset == THRESHOLD_BASE[ctx] + CLAIM_OFFSET {
            return Some(Register::Claim(ctx));
        }
    }
    None
}

impl Plic {
    /// Creates a PLIC with every source masked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `source` pending. Source 0 and out-of-range sources are ignored.
    pub fn raise(&mut self, source: u32) {
        if source == 0 || source >= PLIC_SOURCES {
            return;
        }
        self.pending |= 1 << source;
    }

    /// Pending bitmap.
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Source currently claimed by context `ctx` (0 when none).
    pub fn claimed(&self, ctx: usize) -> u32 {
        self.contexts.get(ctx).map_or(0, |c| c.claim)
    }

    fn is_claimed(&self, source: u32) -> bool {
        self.contexts.iter().any(|c| c.claim == source)
    }

    fn complete(&mut self, ctx: usize, source: u32, dc: &mut DeviceContext<'_>) {
        let Some(context) = self.contexts.get_mut(ctx) else {
            return;
        };
        if context.claim == 0 || source != context.claim {
            return;
        }
        self.pending &= !(1 << source);
        context.claim = 0;
        dc.set_mip(CONTEXT_MIP[ctx], false);
    }
}

impl Device for Plic {
    fn name(&self) -> &str {
        "PLIC"
    }

    fn size(&self) -> u64 {
        PLIC_SIZE
    }

    fn read_u32(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u32, Trap> {
        let value = match register(offset) {
            Some(Register::Priority(src)) => self.priorities[src],
            Some(Register::Pending) => self.pending,
            Some(Register::Enable(c)) => self.contexts[c].enable,
            Some(Register::Threshold(c)) => self.contexts[c].threshold,
            Some(Register::Claim(c)) => self.contexts[c].claim,
            None => return Err(ctx.load_fault(offset)),
        };
        Ok(value)
    }

    fn write_u32(
        &mut self,
        offset: u64,
        val: u32,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Trap> {
        match register(offset) {
            Some(Register::Priority(src)) => self.priorities[src] = val,
            Some(Register::Pending) => self.pending = val & !1,
            Some(Register::Enable(c)) => self.contexts[c].enable = val,
            Some(Register::Threshold(c)) => self.contexts[c].threshold = val,
            Some(Register::Claim(c)) => self.complete(c, val, ctx),
            None => return Err(ctx.store_fault(offset)),
        }
        Ok(())
    }

    /// Delivers pending sources to contexts with no outstanding claim. A source is held by
    /// at most one context until that context completes it.
    fn update(&mut self, ctx: &mut DeviceContext<'_>) {
        for source in 1..PLIC_SOURCES {
            if self.pending & (1 << source) == 0 || self.is_claimed(source) {
                continue;
            }
            let priority = self.priorities[source as usize];
            let taker = self.contexts.iter().position(|c| {
                c.enable & (1 << source) != 0 && c.threshold < priority && c.claim == 0
            });
            if let Some(idx) = taker {
                self.contexts[idx].claim = source;
                ctx.set_mip(CONTEXT_MIP[idx], true);
            }
        }
    }

    fn as_plic_mut(&mut self) -> Option<&mut Plic> {
        Some(self)
    }
}
