//! Memory Access Types.
//!
//! This module defines the classification of memory accesses. The kind of access decides:
//! 1. **Permission Validation:** Which PTE bit (R, W or X) the Sv39 translator checks.
//! 2. **Fault Generation:** Which page fault or access fault is raised on failure.
//! 3. **Translation Policy:** Whether `mstatus.MPRV` applies (data accesses only).

use super::error::Trap;

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Instruction fetch. Requires Execute (X) permission.
    Fetch,

    /// Data load. Requires Read (R) permission, or X when `mstatus.MXR` is set.
    Read,

    /// Data store or AMO. Requires Write (W) permission and sets the dirty bit.
    Write,
}

impl AccessType {
    /// Returns `true` for loads and stores, which honour `mstatus.MPRV`.
    #[inline(always)]
    pub const fn is_data(self) -> bool {
        !matches!(self, Self::Fetch)
    }

    /// Page fault raised when translating `vaddr` fails for this access.
    pub const fn page_fault(self, vaddr: u64) -> Trap {
        match self {
            Self::Fetch => Trap::InstructionPageFault(vaddr),
            Self::Read => Trap::LoadPageFault(vaddr),
            Self::Write => Trap::StorePageFault(vaddr),
        }
    }

    /// Access fault raised when `paddr` has no usable backing.
    pub const fn access_fault(self, paddr: u64) -> Trap {
        match self {
            Self::Fetch => Trap::InstructionAccessFault(paddr),
            Self::Read => Trap::LoadAccessFault(paddr),
            Self::Write => Trap::StoreAccessFault(paddr),
        }
    }
}
