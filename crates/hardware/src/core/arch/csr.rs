//! Control and Status Register (CSR) definitions and storage.
//!
//! This module implements the CSR subsystem. It provides:
//! 1. **Address Definitions:** Constants for the machine, supervisor and counter CSRs.
//! 2. **Field Masks:** Bit positions for status, interrupt and translation control.
//! 3. **Declaration Table:** One static row per CSR (number, writable mask, base bits, kind).
//! 4. **Register Storage:** The `CsrBank`, driven entirely by the declaration table.
//!
//! Privilege-dependent side effects (translation flushes, `mstatus.TVM`) live in the CPU;
//! the bank only knows masks and minimum privilege.

use crate::common::Trap;
use crate::core::arch::mode::PrivilegeMode;

/// Supervisor status register (view of `mstatus`).
pub const SSTATUS: u32 = 0x100;
/// Supervisor interrupt enable (view of `mie`).
pub const SIE: u32 = 0x104;
/// Supervisor trap vector base address.
pub const STVEC: u32 = 0x105;
/// Supervisor counter enable.
pub const SCOUNTEREN: u32 = 0x106;
/// Supervisor environment configuration.
pub const SENVCFG: u32 = 0x10A;
/// Supervisor scratch register.
pub const SSCRATCH: u32 = 0x140;
/// Supervisor exception program counter.
pub const SEPC: u32 = 0x141;
/// Supervisor trap cause.
pub const SCAUSE: u32 = 0x142;
/// Supervisor trap value.
pub const STVAL: u32 = 0x143;
/// Supervisor interrupt pending (view of `mip`).
pub const SIP: u32 = 0x144;
/// Supervisor address translation and protection.
pub const SATP: u32 = 0x180;

/// Machine status register.
pub const MSTATUS: u32 = 0x300;
/// Machine ISA register.
pub const MISA: u32 = 0x301;
/// Machine exception delegation.
pub const MEDELEG: u32 = 0x302;
/// Machine interrupt delegation.
pub const MIDELEG: u32 = 0x303;
/// Machine interrupt enable.
pub const MIE: u32 = 0x304;
/// Machine trap vector base address.
pub const MTVEC: u32 = 0x305;
/// Machine counter enable.
pub const MCOUNTEREN: u32 = 0x306;
/// Machine environment configuration.
pub const MENVCFG: u32 = 0x30A;
/// Machine counter inhibit.
pub const MCOUNTINHIBIT: u32 = 0x320;
/// Machine scratch register.
pub const MSCRATCH: u32 = 0x340;
/// Machine exception program counter.
pub const MEPC: u32 = 0x341;
/// Machine trap cause.
pub const MCAUSE: u32 = 0x342;
/// Machine trap value.
pub const MTVAL: u32 = 0x343;
/// Machine interrupt pending.
pub const MIP: u32 = 0x344;
/// First PMP configuration register.
pub const PMPCFG0: u32 = 0x3A0;
/// First PMP address register.
pub const PMPADDR0: u32 = 0x3B0;
/// Machine cycle counter.
pub const MCYCLE: u32 = 0xB00;
/// Machine instructions-retired counter.
pub const MINSTRET: u32 = 0xB02;
/// User-readable cycle counter (view of `mcycle`).
pub const CYCLE: u32 = 0xC00;
/// User-readable instructions-retired counter (view of `minstret`).
pub const INSTRET: u32 = 0xC02;
/// Machine vendor ID.
pub const MVENDORID: u32 = 0xF11;
/// Machine architecture ID.
pub const MARCHID: u32 = 0xF12;
/// Machine implementation ID.
pub const MIMPID: u32 = 0xF13;
/// Hart ID.
pub const MHARTID: u32 = 0xF14;
/// Pointer to the configuration structure.
pub const MCONFIGPTR: u32 = 0xF15;

/// Number of addressable CSRs (12-bit numbers).
pub const CSR_COUNT: usize = 4096;

/// Supervisor interrupt enable bit in `mstatus`.
pub const MSTATUS_SIE: u64 = 1 << 1;
/// Machine interrupt enable bit in `mstatus`.
pub const MSTATUS_MIE: u64 = 1 << 3;
/// Supervisor previous interrupt enable bit in `mstatus`.
pub const MSTATUS_SPIE: u64 = 1 << 5;
/// Machine previous interrupt enable bit in `mstatus`.
pub const MSTATUS_MPIE: u64 = 1 << 7;
/// Supervisor previous privilege bit in `mstatus`.
pub const MSTATUS_SPP: u64 = 1 << 8;
/// Machine previous privilege field in `mstatus`.
pub const MSTATUS_MPP: u64 = 3 << 11;
/// Bit shift of `mstatus.MPP`.
pub const MSTATUS_MPP_SHIFT: u64 = 11;
/// Modify PRiVilege bit in `mstatus`.
pub const MSTATUS_MPRV: u64 = 1 << 17;
/// Supervisor User Memory access bit in `mstatus`.
pub const MSTATUS_SUM: u64 = 1 << 18;
/// Make eXecutable Readable bit in `mstatus`.
pub const MSTATUS_MXR: u64 = 1 << 19;
/// Trap Virtual Memory bit in `mstatus`.
pub const MSTATUS_TVM: u64 = 1 << 20;
/// Timeout Wait bit in `mstatus`.
pub const MSTATUS_TW: u64 = 1 << 21;
/// Trap SRET bit in `mstatus`.
pub const MSTATUS_TSR: u64 = 1 << 22;
/// UXL field fixed to 64-bit.
pub const MSTATUS_UXL_64: u64 = 2 << 32;
/// SXL field fixed to 64-bit.
pub const MSTATUS_SXL_64: u64 = 2 << 34;

/// Supervisor software interrupt bit in `mip`/`mie`.
pub const MIP_SSIP: u64 = 1 << 1;
/// Machine software interrupt bit in `mip`/`mie`.
pub const MIP_MSIP: u64 = 1 << 3;
/// Supervisor timer interrupt bit in `mip`/`mie`.
pub const MIP_STIP: u64 = 1 << 5;
/// Machine timer interrupt bit in `mip`/`mie`.
pub const MIP_MTIP: u64 = 1 << 7;
/// Supervisor external interrupt bit in `mip`/`mie`.
pub const MIP_SEIP: u64 = 1 << 9;
/// Machine external interrupt bit in `mip`/`mie`.
pub const MIP_MEIP: u64 = 1 << 11;

/// Bit shift of the `satp` MODE field.
pub const SATP_MODE_SHIFT: u64 = 60;
/// Mask of the `satp` MODE field (after shifting).
pub const SATP_MODE_MASK: u64 = 0xF;
/// Bare mode (no translation).
pub const SATP_MODE_BARE: u64 = 0;
/// Sv39 mode.
pub const SATP_MODE_SV39: u64 = 8;
/// Root page-table PPN field of `satp`.
pub const SATP_PPN_MASK: u64 = 0xFFF_FFFF_FFFF;

/// `misa` extension bit for atomics.
pub const MISA_EXT_A: u64 = 1 << 0;
/// `misa` extension bit for the base integer set.
pub const MISA_EXT_I: u64 = 1 << 8;
/// `misa` extension bit for multiply/divide.
pub const MISA_EXT_M: u64 = 1 << 12;
/// `misa` extension bit for supervisor mode.
pub const MISA_EXT_S: u64 = 1 << 18;
/// `misa` extension bit for user mode.
pub const MISA_EXT_U: u64 = 1 << 20;
/// `misa` MXL field for RV64.
pub const MISA_XLEN_64: u64 = 2 << 62;

const INTERRUPT_BITS: u64 = MIP_MEIP | MIP_SEIP | MIP_MTIP | MIP_STIP | MIP_MSIP | MIP_SSIP;
const S_INTERRUPT_BITS: u64 = MIP_SEIP | MIP_STIP | MIP_SSIP;
const MSTATUS_MASK: u64 = MSTATUS_TSR
    | MSTATUS_TW
    | MSTATUS_TVM
    | MSTATUS_MXR
    | MSTATUS_SUM
    | MSTATUS_MPRV
    | MSTATUS_MPP
    | MSTATUS_SPP
    | MSTATUS_MPIE
    | MSTATUS_SPIE
    | MSTATUS_MIE
    | MSTATUS_SIE;
const SSTATUS_MASK: u64 = MSTATUS_SUM | MSTATUS_MXR | MSTATUS_SPP | MSTATUS_SPIE | MSTATUS_SIE;
const CAUSE_MASK: u64 = (1 << 63) | 0x3F;

/// How a CSR stores its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsrKind {
    /// Own storage: reads `(stored & mask) | base`, writes replace the masked bits.
    ReadWrite,
    /// Fixed value `base`; writes are accepted and ignored.
    ReadOnly,
    /// Masked window onto another CSR's storage.
    View(u32),
    /// Read-only window onto another CSR's storage.
    Counter(u32),
    /// Like `ReadWrite`, but MODE only accepts Bare or Sv39.
    Satp,
}

/// One row of the declaration table, covering `first..=last` in steps of `step`.
#[derive(Clone, Copy, Debug)]
pub struct CsrDecl {
    /// First CSR number covered.
    pub first: u32,
    /// Last CSR number covered.
    pub last: u32,
    /// Distance between covered numbers.
    pub step: u32,
    /// Writable bits.
    pub mask: u64,
    /// Always-set bits (or the fixed value for read-only CSRs).
    pub base: u64,
    /// Storage kind.
    pub kind: CsrKind,
}

impl CsrDecl {
    const fn covers(&self, num: u32) -> bool {
        num >= self.first && num <= self.last && (num - self.first) % self.step == 0
    }
}

const fn rw(num: u32, mask: u64) -> CsrDecl {
    CsrDecl { first: num, last: num, step: 1, mask, base: 0, kind: CsrKind::ReadWrite }
}

const fn ro(num: u32, value: u64) -> CsrDecl {
    CsrDecl { first: num, last: num, step: 1, mask: 0, base: value, kind: CsrKind::ReadOnly }
}

const fn ro_range(first: u32, last: u32, step: u32) -> CsrDecl {
    CsrDecl { first, last, step, mask: 0, base: 0, kind: CsrKind::ReadOnly }
}

const fn view(num: u32, target: u32, mask: u64, base: u64) -> CsrDecl {
    CsrDecl { first: num, last: num, step: 1, mask, base, kind: CsrKind::View(target) }
}

const fn counter(num: u32, target: u32) -> CsrDecl {
    CsrDecl { first: num, last: num, step: 1, mask: 0, base: 0, kind: CsrKind::Counter(target) }
}

/// Every implemented CSR. Numbers not covered here are illegal.
pub static CSR_TABLE: &[CsrDecl] = &[
    view(SSTATUS, MSTATUS, SSTATUS_MASK, MSTATUS_UXL_64),
    view(SIE, MIE, S_INTERRUPT_BITS, 0),
    rw(STVEC, !2),
    rw(SCOUNTEREN, 0xFFFF_FFFF),
    rw(SENVCFG, 0xF0 | 1),
    rw(SSCRATCH, !0),
    rw(SEPC, !3),
    rw(SCAUSE, CAUSE_MASK),
    rw(STVAL, !0),
    view(SIP, MIP, S_INTERRUPT_BITS, 0),
    CsrDecl {
        first: SATP,
        last: SATP,
        step: 1,
        mask: (SATP_MODE_MASK << SATP_MODE_SHIFT) | SATP_PPN_MASK,
        base: 0,
        kind: CsrKind::Satp,
    },
    ro(MVENDORID, 0),
    ro(MARCHID, 0),
    ro(MIMPID, 0),
    ro(MHARTID, 0),
    ro(MCONFIGPTR, 0),
    CsrDecl {
        first: MSTATUS,
        last: MSTATUS,
        step: 1,
        mask: MSTATUS_MASK,
        base: MSTATUS_SXL_64 | MSTATUS_UXL_64,
        kind: CsrKind::ReadWrite,
    },
    ro(MISA, MISA_XLEN_64 | MISA_EXT_A | MISA_EXT_I | MISA_EXT_M | MISA_EXT_S | MISA_EXT_U),
    rw(MEDELEG, !(1 << 11)),
    rw(MIDELEG, !0),
    rw(MIE, INTERRUPT_BITS),
    rw(MTVEC, !2),
    rw(MCOUNTEREN, 0xFFFF_FFFF),
    rw(MENVCFG, (3 << 62) | (0xF << 4) | 1),
    ro(MCOUNTINHIBIT, 0),
    ro_range(0x323, 0x33F, 1),
    rw(MSCRATCH, !0),
    rw(MEPC, !3),
    rw(MCAUSE, CAUSE_MASK),
    rw(MTVAL, !0),
    rw(MIP, INTERRUPT_BITS),
    ro_range(PMPCFG0, 0x3AE, 2),
    ro_range(PMPADDR0, 0x3EF, 1),
    rw(MCYCLE, !0),
    rw(MINSTRET, !0),
    ro_range(0xB03, 0xB1F, 1),
    counter(CYCLE, MCYCLE),
    counter(INSTRET, MINSTRET),
];

/// Looks up the declaration covering a CSR number.
pub fn declaration(num: u32) -> Option<&'static CsrDecl> {
    CSR_TABLE.iter().find(|decl| decl.covers(num))
}

/// Minimum privilege encoded in bits [9:8] of a CSR number.
#[inline(always)]
pub const fn min_privilege(num: u32) -> u8 {
    ((num >> 8) & 3) as u8
}

/// Control and Status Register storage.
///
/// Holds one 64-bit slot per CSR number. All guest-visible reads and writes go through
/// [`CsrBank::read`] and [`CsrBank::write`], which apply the declaration table; the emulator
/// itself uses the raw accessors for trap entry and counter updates.
#[derive(Clone)]
pub struct CsrBank {
    values: Box<[u64]>,
}

impl Default for CsrBank {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrBank {
    /// Creates a bank with every CSR at its reset value of zero.
    pub fn new() -> Self {
        Self { values: vec![0; CSR_COUNT].into_boxed_slice() }
    }

    /// Reads a CSR as the guest sees it.
    ///
    /// # Arguments
    ///
    /// * `num` - The 12-bit CSR number.
    /// * `privilege` - Effective privilege of the access.
    ///
    /// # Returns
    ///
    /// The value, or `IllegalInstruction(0)` for an undeclared CSR or insufficient privilege.
    pub fn read(&self, num: u32, privilege: PrivilegeMode) -> Result<u64, Trap> {
        let decl = self.check(num, privilege)?;
        Ok(match decl.kind {
            CsrKind::ReadWrite | CsrKind::Satp => (self.get(num) & decl.mask) | decl.base,
            CsrKind::ReadOnly => decl.base,
            CsrKind::View(target) => (self.get(target) & decl.mask) | decl.base,
            CsrKind::Counter(target) => self.get(target),
        })
    }

    /// Writes a CSR as the guest sees it.
    ///
    /// Only the bits in the declared mask change. Writes to read-only CSRs are accepted
    /// and have no effect.
    pub fn write(&mut self, num: u32, value: u64, privilege: PrivilegeMode) -> Result<(), Trap> {
        let decl = self.check(num, privilege)?;
        match decl.kind {
            CsrKind::ReadWrite => self.write_masked(num, decl.mask, value),
            CsrKind::View(target) => self.write_masked(target, decl.mask, value),
            CsrKind::ReadOnly | CsrKind::Counter(_) => {}
            CsrKind::Satp => {
                let mode = (value >> SATP_MODE_SHIFT) & SATP_MODE_MASK;
                let value = if mode == SATP_MODE_BARE || mode == SATP_MODE_SV39 {
                    value
                } else {
                    let kept = self.get(num) & (SATP_MODE_MASK << SATP_MODE_SHIFT);
                    (value & !(SATP_MODE_MASK << SATP_MODE_SHIFT)) | kept
                };
                self.write_masked(num, decl.mask, value);
            }
        }
        Ok(())
    }

    fn check(&self, num: u32, privilege: PrivilegeMode) -> Result<&'static CsrDecl, Trap> {
        let decl = declaration(num).ok_or(Trap::IllegalInstruction(0))?;
        if privilege.to_u8() < min_privilege(num) {
            return Err(Trap::IllegalInstruction(0));
        }
        Ok(decl)
    }

    fn write_masked(&mut self, num: u32, mask: u64, value: u64) {
        let old = self.get(num);
        self.set(num, (old & !mask) | (value & mask));
    }

    /// Raw stored value, bypassing masks and privilege.
    #[inline(always)]
    pub fn get(&self, num: u32) -> u64 {
        self.values.get(num as usize).copied().unwrap_or(0)
    }

    /// Raw store, bypassing masks and privilege.
    #[inline(always)]
    pub fn set(&mut self, num: u32, value: u64) {
        if let Some(slot) = self.values.get_mut(num as usize) {
            *slot = value;
        }
    }

    /// Current `mstatus`, including its fixed XLEN bits.
    #[inline(always)]
    pub fn mstatus(&self) -> u64 {
        self.get(MSTATUS) | MSTATUS_SXL_64 | MSTATUS_UXL_64
    }

    /// Replaces `mstatus` (writable bits only).
    #[inline(always)]
    pub fn set_mstatus(&mut self, value: u64) {
        self.set(MSTATUS, value & MSTATUS_MASK);
    }

    /// Pending interrupts.
    #[inline(always)]
    pub fn mip(&self) -> u64 {
        self.get(MIP)
    }

    /// Mutable access to `mip`, handed to devices during their update pass.
    pub fn mip_mut(&mut self) -> &mut u64 {
        // MIP is below CSR_COUNT, so the slot always exists.
        let idx = MIP as usize;
        &mut self.values[idx]
    }

    /// Enabled interrupts.
    #[inline(always)]
    pub fn mie(&self) -> u64 {
        self.get(MIE)
    }

    /// Current `satp`.
    #[inline(always)]
    pub fn satp(&self) -> u64 {
        self.get(SATP)
    }

    /// Advances `mcycle`, and `minstret` when an instruction retired.
    #[inline(always)]
    pub fn bump_counters(&mut self, retired: bool) {
        self.set(MCYCLE, self.get(MCYCLE).wrapping_add(1));
        if retired {
            self.set(MINSTRET, self.get(MINSTRET).wrapping_add(1));
        }
    }
}
