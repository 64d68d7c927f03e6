//! CSR Access Logic.
//!
//! This module implements the Zicsr instructions on top of the CSR bank. It performs the
//! following:
//! 1. **Read Operations:** Privilege-checked reads, with the `mstatus.TVM` gate on `satp`.
//! 2. **Write Operations:** Masked writes; a `satp` write flushes the TLB and the
//!    decoded-instruction cache.
//! 3. **Read-Modify-Write:** Exchange, set-bits and clear-bits with the `rd = x0` and
//!    zero-source rules that suppress the read or the write.

use super::Cpu;
use crate::common::Trap;
use crate::core::arch::csr::{self, MSTATUS_TVM};
use crate::core::arch::mode::PrivilegeMode;
use crate::isa::table::Op;

/// Read-modify-write flavour of a CSR instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsrOp {
    /// CSRRW / CSRRWI.
    Exchange,
    /// CSRRS / CSRRSI.
    SetBits,
    /// CSRRC / CSRRCI.
    ClearBits,
}

impl CsrOp {
    /// Maps a CSR instruction to its flavour and whether its source is an immediate.
    pub const fn from_op(op: Op) -> Option<(CsrOp, bool)> {
        Some(match op {
            Op::Csrrw => (CsrOp::Exchange, false),
            Op::Csrrs => (CsrOp::SetBits, false),
            Op::Csrrc => (CsrOp::ClearBits, false),
            Op::Csrrwi => (CsrOp::Exchange, true),
            Op::Csrrsi => (CsrOp::SetBits, true),
            Op::Csrrci => (CsrOp::ClearBits, true),
            _ => return None,
        })
    }
}

impl Cpu {
    fn check_satp_access(&self, num: u32) -> Result<(), Trap> {
        if num == csr::SATP
            && self.privilege == PrivilegeMode::Supervisor
            && self.csr.mstatus() & MSTATUS_TVM != 0
        {
            return Err(Trap::IllegalInstruction(0));
        }
        Ok(())
    }

    /// Reads a CSR at the current privilege.
    ///
    /// # Returns
    ///
    /// The value, or `IllegalInstruction(0)` for an undeclared CSR, insufficient privilege
    /// or a trapped `satp` access.
    pub fn csr_read(&self, num: u32) -> Result<u64, Trap> {
        self.check_satp_access(num)?;
        self.csr.read(num, self.privilege)
    }

    /// Writes a CSR at the current privilege.
    pub fn csr_write(&mut self, num: u32, value: u64) -> Result<(), Trap> {
        self.check_satp_access(num)?;
        self.csr.write(num, value, self.privilege)?;
        if num == csr::SATP {
            self.flush_translation();
        }
        Ok(())
    }

    /// Executes one Zicsr instruction.
    ///
    /// # Arguments
    ///
    /// * `op` - Exchange, set-bits or clear-bits.
    /// * `rd` - Destination register; the exchange skips its read when this is x0.
    /// * `num` - CSR number.
    /// * `src` - Source value (register value or zero-extended immediate).
    /// * `src_is_zero` - `rs1 = x0` or `zimm = 0`; set/clear skip their write.
    pub fn csr_op(
        &mut self,
        op: CsrOp,
        rd: usize,
        num: u32,
        src: u64,
        src_is_zero: bool,
    ) -> Result<(), Trap> {
        let old = match op {
            CsrOp::Exchange if rd == 0 => None,
            _ => Some(self.csr_read(num)?),
        };
        let new = match (op, old) {
            (CsrOp::Exchange, _) => Some(src),
            (_, _) if src_is_zero => None,
            (CsrOp::SetBits, Some(v)) => Some(v | src),
            (CsrOp::ClearBits, Some(v)) => Some(v & !src),
            (_, None) => None,
        };
        if let Some(value) = new {
            self.csr_write(num, value)?;
        }
        if let Some(value) = old {
            self.regs.write(rd, value);
        }
        Ok(())
    }

    /// Invalidates every cached translation and decoded instruction.
    pub fn flush_translation(&mut self) {
        self.mmu.flush();
        self.decode_cache.flush();
    }
}
