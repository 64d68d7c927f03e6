//! Main Execution Loop.
//!
//! This module implements the per-instruction step of the hart. It performs the following:
//! 1. **Step Prologue:** Clears the per-step flags, checks PC alignment, runs the periodic
//!    device update and polls interrupts.
//! 2. **Dispatch:** Executes one decoded instruction by matching on its [`Op`].
//! 3. **Step Epilogue:** Advances the PC unless the instruction jumped or trapped, restores
//!    `x0`, and advances the counters.

use super::Cpu;
use super::csr::CsrOp;
use crate::common::{AccessType, EmuError, FatalReason, Trap};
use crate::core::arch::csr::MSTATUS_TVM;
use crate::core::arch::mode::PrivilegeMode;
use crate::core::units::alu::{Alu, AluOp};
use crate::core::units::lsu::atomic::{AmoOp, atomic_alu};
use crate::core::units::lsu::unaligned::is_aligned;
use crate::core::units::lsu::{MemWidth, load_kind, store_width};
use crate::isa::disasm::disassemble;
use crate::isa::instruction::{Decoded, Fields};
use crate::isa::table::Op;

/// Why an instruction did not complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecFault {
    /// A guest-visible exception, delivered through the trap controller.
    Trap(Trap),
    /// An internal contract violation that stops the machine.
    Fatal(FatalReason),
}

impl From<Trap> for ExecFault {
    fn from(trap: Trap) -> Self {
        Self::Trap(trap)
    }
}

impl From<FatalReason> for ExecFault {
    fn from(reason: FatalReason) -> Self {
        Self::Fatal(reason)
    }
}

/// Register indices and sign-extended immediate of a decoded instruction.
///
/// Fields a shape does not define are zero, so they read as `x0`.
#[derive(Clone, Copy, Debug)]
struct Operands {
    rd: usize,
    rs1: usize,
    rs2: usize,
    imm: i64,
}

impl Operands {
    fn of(fields: &Fields) -> Self {
        match *fields {
            Fields::R { rd, rs1, rs2, .. } => Self { rd, rs1, rs2, imm: 0 },
            Fields::I { rd, rs1, imm, .. } => Self { rd, rs1, rs2: 0, imm },
            Fields::S { rs1, rs2, imm, .. } | Fields::B { rs1, rs2, imm, .. } => {
                Self { rd: 0, rs1, rs2, imm }
            }
            Fields::U { rd, imm } | Fields::J { rd, imm } => Self { rd, rs1: 0, rs2: 0, imm },
        }
    }
}

const fn amo_width(op: Op) -> MemWidth {
    match op {
        Op::LrW | Op::ScW => MemWidth::Word,
        _ => MemWidth::Double,
    }
}

impl Cpu {
    /// Executes one step.
    ///
    /// A step either takes an interrupt, raises an exception, or executes one instruction.
    /// Steps keep executing after the machine stopped; callers check [`Cpu::is_running`].
    ///
    /// # Errors
    ///
    /// `EmuError::Fatal` when the step hit an internal error; the machine is then `Halted`.
    pub fn step(&mut self) -> Result<(), EmuError> {
        self.exception_pending = false;
        self.jump_pending = false;
        self.stats.record_step(self.privilege);

        if self.pc & 3 != 0 {
            self.csr.bump_counters(false);
            return self.raise_exception(Trap::InstructionAddressMisaligned(self.pc));
        }

        if self.device_ticks & self.device_update_mask == 0 {
            self.bus.bus.update_devices(self.csr.mip_mut());
            self.bus.sync_power();
        }
        self.device_ticks = self.device_ticks.wrapping_add(1);

        if self.check_interrupts()? {
            self.csr.bump_counters(false);
            return Ok(());
        }

        let decoded = match self.fetch() {
            Ok(decoded) => decoded,
            Err(trap) => {
                self.csr.bump_counters(false);
                return self.raise_exception(trap);
            }
        };
        if self.trace {
            tracing::trace!("{:#018x}: {:08x}  {}", self.pc, decoded.raw, disassemble(decoded.raw));
        }

        match self.execute(&decoded) {
            Ok(()) => {}
            Err(ExecFault::Trap(trap)) => self.raise_exception(trap)?,
            Err(ExecFault::Fatal(reason)) => return Err(self.fatal(reason)),
        }
        self.bus.sync_power();

        if !self.jump_pending && !self.exception_pending {
            self.pc = self.pc.wrapping_add(4);
        }
        self.regs.clear_zero();
        let retired = !self.exception_pending;
        if retired {
            self.stats.instructions_retired += 1;
        }
        self.csr.bump_counters(retired);
        Ok(())
    }

    fn jump(&mut self, target: u64) {
        self.pc = target;
        self.jump_pending = true;
    }

    /// Executes one decoded instruction against the hart state.
    pub fn execute(&mut self, d: &Decoded) -> Result<(), ExecFault> {
        let Operands { rd, rs1, rs2, imm } = Operands::of(&d.fields);
        let a = self.regs.read(rs1);
        let b = self.regs.read(rs2);
        let imm_u = imm as u64;
        let pc = self.pc;

        match d.op {
            Op::Lui => self.regs.write(rd, imm_u),
            Op::Auipc => self.regs.write(rd, pc.wrapping_add(imm_u)),
            Op::Jal => {
                self.regs.write(rd, pc.wrapping_add(4));
                self.jump(pc.wrapping_add(imm_u));
            }
            Op::Jalr => {
                let target = a.wrapping_add(imm_u) & !1;
                self.regs.write(rd, pc.wrapping_add(4));
                self.jump(target);
            }
            Op::Beq | Op::Bne | Op::Blt | Op::Bge | Op::Bltu | Op::Bgeu => {
                let taken = match d.op {
                    Op::Beq => a == b,
                    Op::Bne => a != b,
                    Op::Blt => (a as i64) < (b as i64),
                    Op::Bge => (a as i64) >= (b as i64),
                    Op::Bltu => a < b,
                    _ => a >= b,
                };
                if taken {
                    self.jump(pc.wrapping_add(imm_u));
                }
            }
            Op::Lb | Op::Lh | Op::Lw | Op::Ld | Op::Lbu | Op::Lhu | Op::Lwu => {
                let (width, signed) = load_kind(d.op).ok_or(FatalReason::DispatchMismatch(d.raw))?;
                let raw = self.load(a.wrapping_add(imm_u), width)?;
                self.regs.write(rd, width.extend(raw, signed));
            }
            Op::Sb | Op::Sh | Op::Sw | Op::Sd => {
                let width = store_width(d.op).ok_or(FatalReason::DispatchMismatch(d.raw))?;
                self.store(a.wrapping_add(imm_u), width, b)?;
            }
            Op::Fence => {}
            Op::FenceI => self.decode_cache.flush(),
            Op::Ecall => self.ecall()?,
            Op::Ebreak => self.ebreak()?,

            Op::LrW | Op::LrD => {
                let width = amo_width(d.op);
                if !is_aligned(a, width.bytes()) {
                    return Err(Trap::LoadAddressMisaligned(a).into());
                }
                let raw = self.load(a, width)?;
                self.load_reservation = Some(a);
                self.regs.write(rd, width.extend(raw, true));
            }
            Op::ScW | Op::ScD => {
                let width = amo_width(d.op);
                if !is_aligned(a, width.bytes()) {
                    return Err(Trap::StoreAddressMisaligned(a).into());
                }
                let reserved = self.load_reservation.take() == Some(a);
                if reserved {
                    self.store(a, width, b)?;
                }
                self.regs.write(rd, u64::from(!reserved));
            }
            Op::AmoswapW
            | Op::AmoaddW
            | Op::AmoxorW
            | Op::AmoandW
            | Op::AmoorW
            | Op::AmominW
            | Op::AmomaxW
            | Op::AmominuW
            | Op::AmomaxuW
            | Op::AmoswapD
            | Op::AmoaddD
            | Op::AmoxorD
            | Op::AmoandD
            | Op::AmoorD
            | Op::AmominD
            | Op::AmomaxD
            | Op::AmominuD
            | Op::AmomaxuD => {
                let (amo, width) =
                    AmoOp::from_op(d.op).ok_or(FatalReason::DispatchMismatch(d.raw))?;
                if !is_aligned(a, width.bytes()) {
                    return Err(Trap::StoreAddressMisaligned(a).into());
                }
                let paddr = self.translate(a, AccessType::Write)?;
                let old = width.extend(self.read_physical(paddr, width, AccessType::Write)?, true);
                self.write_physical(paddr, width, atomic_alu(amo, old, b, width))?;
                self.regs.write(rd, old);
            }

            Op::Csrrw | Op::Csrrs | Op::Csrrc | Op::Csrrwi | Op::Csrrsi | Op::Csrrci => {
                let (op, immediate) =
                    CsrOp::from_op(d.op).ok_or(FatalReason::DispatchMismatch(d.raw))?;
                let num = d.raw >> 20;
                let src = if immediate { rs1 as u64 } else { a };
                self.csr_op(op, rd, num, src, rs1 == 0)?;
            }

            Op::Mret => self.mret()?,
            Op::Sret => self.sret()?,
            Op::Wfi => self.wfi()?,
            Op::SfenceVma => {
                let trapped = self.privilege == PrivilegeMode::User
                    || (self.privilege == PrivilegeMode::Supervisor
                        && self.csr.mstatus() & MSTATUS_TVM != 0);
                if trapped {
                    return Err(Trap::IllegalInstruction(0).into());
                }
                self.flush_translation();
            }

            op => {
                let (alu, is32) = AluOp::from_op(op).ok_or(FatalReason::DispatchMismatch(d.raw))?;
                let operand = if matches!(d.fields, Fields::I { .. }) { imm_u } else { b };
                self.regs.write(rd, Alu::execute(alu, a, operand, is32));
            }
        }
        Ok(())
    }
}
