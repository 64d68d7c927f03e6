//! Hardware Page Table Walker (PTW) for RISC-V Sv39.
//!
//! Walks the three-level tree rooted at `satp.PPN`, reading every entry through the
//! guest-physical translator. Only pool-backed memory can hold page tables.

use super::PageTableMemory;
use crate::common::constants::{PAGE_LEVELS, PAGE_SHIFT};
use crate::common::VirtAddr;
use crate::core::arch::csr::SATP_PPN_MASK;

/// Page Table Entry valid bit.
pub const PTE_V: u64 = 1 << 0;
/// Page Table Entry read permission bit.
pub const PTE_R: u64 = 1 << 1;
/// Page Table Entry write permission bit.
pub const PTE_W: u64 = 1 << 2;
/// Page Table Entry execute permission bit.
pub const PTE_X: u64 = 1 << 3;
/// Page Table Entry user-accessible bit.
pub const PTE_U: u64 = 1 << 4;
/// Page Table Entry global bit.
pub const PTE_G: u64 = 1 << 5;
/// Page Table Entry accessed bit.
pub const PTE_A: u64 = 1 << 6;
/// Page Table Entry dirty bit.
pub const PTE_D: u64 = 1 << 7;
/// Svpbmt memory-type field (bits 62:61); must be zero.
pub const PTE_PBMT: u64 = 3 << 61;
/// Svnapot bit (bit 63); must be zero.
pub const PTE_N: u64 = 1 << 63;
/// Bit shift of the PPN field.
pub const PTE_PPN_SHIFT: u64 = 10;

const PTE_SIZE: u64 = 8;

/// A raw Sv39 page-table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageTableEntry(pub u64);

impl PageTableEntry {
    /// Returns true if `bit` is set.
    #[inline(always)]
    pub const fn has(self, bit: u64) -> bool {
        self.0 & bit != 0
    }

    /// Physical page number (44 bits).
    #[inline(always)]
    pub const fn ppn(self) -> u64 {
        (self.0 >> PTE_PPN_SHIFT) & SATP_PPN_MASK
    }

    /// A leaf has R or X set.
    #[inline(always)]
    pub const fn is_leaf(self) -> bool {
        self.has(PTE_R) || self.has(PTE_X)
    }

    /// Invalid, write-only, or using reserved encodings.
    #[inline(always)]
    pub const fn is_malformed(self) -> bool {
        !self.has(PTE_V)
            || (!self.has(PTE_R) && self.has(PTE_W))
            || self.0 & (PTE_PBMT | PTE_N) != 0
    }

    /// A superpage whose PPN has nonzero bits below its level.
    pub const fn is_misaligned_superpage(self, level: usize) -> bool {
        match level {
            2 => self.ppn() & 0x3_FFFF != 0,
            1 => self.ppn() & 0x1FF != 0,
            _ => false,
        }
    }
}

/// A leaf found by a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkResult {
    /// The leaf entry.
    pub pte: PageTableEntry,
    /// Guest physical address of the leaf.
    pub pte_addr: u64,
    /// Level at which the leaf sits.
    pub level: usize,
}

/// Walks the page table for `vaddr`.
///
/// # Returns
///
/// The leaf, or `None` when an entry is unreadable, malformed, or the walk runs past
/// level 0. The caller turns `None` into the page fault for its access type.
pub fn walk(vaddr: VirtAddr, satp: u64, mem: &mut dyn PageTableMemory) -> Option<WalkResult> {
    let mut table = (satp & SATP_PPN_MASK) << PAGE_SHIFT;
    for level in (0..PAGE_LEVELS).rev() {
        let pte_addr = table.wrapping_add(vaddr.vpn(level) * PTE_SIZE);
        let pte = PageTableEntry(mem.read_pte(pte_addr)?);
        if pte.is_malformed() {
            return None;
        }
        if pte.is_leaf() {
            return Some(WalkResult { pte, pte_addr, level });
        }
        table = pte.ppn() << PAGE_SHIFT;
    }
    None
}
