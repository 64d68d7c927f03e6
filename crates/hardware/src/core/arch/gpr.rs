//! RISC-V General-Purpose Register File.
//!
//! Holds the 32 integer registers. Writes to `x0` are discarded here, and the executor
//! additionally forces `x0` back to zero after every instruction.

use std::io::{self, Write};

use crate::common::constants::REG_COUNT;

/// General-Purpose Register file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gpr {
    regs: [u64; REG_COUNT],
}

impl Gpr {
    /// Creates a register file with every register at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a register. `x0` always reads 0; out-of-range indices read 0.
    #[inline(always)]
    pub fn read(&self, idx: usize) -> u64 {
        if idx == 0 { 0 } else { self.regs.get(idx).copied().unwrap_or(0) }
    }

    /// Writes a register. Writes to `x0` are discarded.
    #[inline(always)]
    pub fn write(&mut self, idx: usize, val: u64) {
        if idx == 0 {
            return;
        }
        if let Some(slot) = self.regs.get_mut(idx) {
            *slot = val;
        }
    }

    /// Restores the `x0 == 0` invariant.
    #[inline(always)]
    pub fn clear_zero(&mut self) {
        self.regs[0] = 0;
    }

    /// All register values, `x0` first.
    pub fn values(&self) -> &[u64; REG_COUNT] {
        &self.regs
    }

    /// Writes every register as `x{i}: 0x{value:x}`, one per line.
    pub fn dump_to(&self, out: &mut dyn Write) -> io::Result<()> {
        for (i, value) in self.regs.iter().enumerate() {
            writeln!(out, "x{i}: 0x{value:x}")?;
        }
        Ok(())
    }

    /// Writes the registers two per line with ABI-aligned padding, for diagnostics.
    pub fn dump_pairs(&self, out: &mut dyn Write) -> io::Result<()> {
        for i in (0..REG_COUNT).step_by(2) {
            writeln!(
                out,
                "x{:<2}={:#018x} x{:<2}={:#018x}",
                i,
                self.regs[i],
                i + 1,
                self.regs[i + 1]
            )?;
        }
        Ok(())
    }
}
