//! Trap Handling Logic.
//!
//! This module implements the trap state machine of the hart. It performs the following:
//! 1. **Exception Entry:** Captures cause, epc and tval, stacks the interrupt enable and
//!    privilege, and vectors to `mtvec`.
//! 2. **Interrupt Polling:** Delivers the lowest pending and enabled `mip` bit.
//! 3. **Return Handling:** `MRET`; `SRET` is refused since traps are handled in Machine mode only.
//! 4. **Fatal Conditions:** Nested traps and any trap in UserOnly mode stop the machine.

use super::Cpu;
use crate::common::constants::CAUSE_INTERRUPT_BIT;
use crate::common::{EmuError, FatalReason, Trap};
use crate::core::arch::csr::{
    self, MSTATUS_MIE, MSTATUS_MPIE, MSTATUS_MPP, MSTATUS_MPP_SHIFT, MSTATUS_MPRV, MSTATUS_TW,
};
use crate::core::arch::mode::PrivilegeMode;
use crate::isa::privileged::cause::interrupt::POLLED_BITS;
use crate::soc::RunState;

const EXCEPTION_CODE_MASK: u64 = 0x3F;

impl Cpu {
    /// Raises a synchronous exception.
    ///
    /// # Errors
    ///
    /// `EmuError::Fatal` when no guest handler can take it: in UserOnly mode, or when an
    /// exception is already pending in this step.
    pub fn raise_exception(&mut self, trap: Trap) -> Result<(), EmuError> {
        if self.user_only {
            return Err(self.fatal(FatalReason::UncaughtTrap(trap)));
        }
        if self.exception_pending {
            return Err(self.fatal(FatalReason::NestedTrap(trap)));
        }
        self.enter_trap(trap, trap.code() & EXCEPTION_CODE_MASK);
        self.exception_pending = true;
        self.stats.exceptions += 1;
        Ok(())
    }

    /// Takes the first pending interrupt the current privilege allows.
    ///
    /// Bits are polled in ascending order. An interrupt is taken when it is pending and
    /// enabled in `mie`, and either the hart is below Machine or `mstatus.MIE` is set.
    ///
    /// # Returns
    ///
    /// `Ok(true)` when an interrupt was taken and the PC now points at the handler.
    pub fn check_interrupts(&mut self) -> Result<bool, EmuError> {
        let pending = self.csr.mip() & self.csr.mie();
        if pending == 0 {
            return Ok(false);
        }
        let globally_enabled = self.privilege < PrivilegeMode::Machine
            || self.csr.mstatus() & MSTATUS_MIE != 0;
        if !globally_enabled {
            return Ok(false);
        }
        for bit in 0..POLLED_BITS {
            if pending & (1 << bit) == 0 {
                continue;
            }
            let Some(trap) = Trap::from_interrupt_bit(bit) else {
                continue;
            };
            if self.user_only {
                return Err(self.fatal(FatalReason::UncaughtTrap(trap)));
            }
            self.enter_trap(trap, CAUSE_INTERRUPT_BIT | bit);
            self.stats.interrupts += 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn enter_trap(&mut self, trap: Trap, cause: u64) {
        let epc = self.pc;
        let from = self.privilege;
        self.csr.set(csr::MCAUSE, cause);
        self.csr.set(csr::MEPC, epc);
        self.csr.set(csr::MTVAL, trap.tval());

        let mut status = self.csr.mstatus();
        let mie = status & MSTATUS_MIE != 0;
        status &= !(MSTATUS_MPP | MSTATUS_MPIE | MSTATUS_MIE);
        status |= u64::from(from.to_u8()) << MSTATUS_MPP_SHIFT;
        if mie {
            status |= MSTATUS_MPIE;
        }
        self.csr.set_mstatus(status);
        self.privilege = PrivilegeMode::Machine;

        let mtvec = self.csr.get(csr::MTVEC);
        let mut target = mtvec & !3;
        if trap.is_interrupt() && mtvec & 1 == 1 {
            target = target.wrapping_add(4 * trap.code());
        }
        self.pc = target;
        self.jump_pending = true;
        self.load_reservation = None;
        tracing::debug!("trap {trap} at pc {epc:#x} from {from}, handler {target:#x}");
    }

    /// Returns from a Machine-mode trap handler.
    pub fn mret(&mut self) -> Result<(), Trap> {
        if self.privilege != PrivilegeMode::Machine {
            return Err(Trap::IllegalInstruction(0));
        }
        let mut status = self.csr.mstatus();
        let target = PrivilegeMode::from_bits(status >> MSTATUS_MPP_SHIFT);
        let mpie = status & MSTATUS_MPIE != 0;
        status &= !(MSTATUS_MPP | MSTATUS_MIE);
        status |= MSTATUS_MPIE;
        if mpie {
            status |= MSTATUS_MIE;
        }
        if target < PrivilegeMode::Machine {
            status &= !MSTATUS_MPRV;
        }
        self.csr.set_mstatus(status);
        self.privilege = target;
        self.pc = self.csr.get(csr::MEPC);
        self.jump_pending = true;
        tracing::debug!("mret to {:#x} in {target}", self.pc);
        Ok(())
    }

    /// `SRET` always raises illegal-instruction: supervisor trap handling is not modelled.
    pub fn sret(&mut self) -> Result<(), Trap> {
        Err(Trap::IllegalInstruction(0))
    }

    /// `WFI`: refused in UserOnly mode, and below Machine while `mstatus.TW` is set.
    /// Otherwise a no-op; the next step's poll delivers any pending interrupt.
    pub fn wfi(&mut self) -> Result<(), Trap> {
        let timeout_wait = self.csr.mstatus() & MSTATUS_TW != 0;
        if self.user_only || (timeout_wait && self.privilege < PrivilegeMode::Machine) {
            return Err(Trap::IllegalInstruction(0));
        }
        Ok(())
    }

    /// Stops the machine on an internal error and builds the error to return.
    pub(crate) fn fatal(&mut self, reason: FatalReason) -> EmuError {
        tracing::error!("fatal emulator error at pc {:#x}: {reason}", self.pc);
        self.bus.state = RunState::Halted;
        EmuError::Fatal { pc: self.pc, reason }
    }
}
