//! Memory Management Unit (MMU).
//!
//! Two independent translation stages live here:
//! 1. **Sv39:** guest virtual to guest physical, through the guest's own page tables
//!    ([`ptw`]) and a direct-mapped cache ([`tlb`]).
//! 2. **Shadow map:** guest physical to host, through an emulator-private radix tree
//!    ([`shadow`]) with its own cache.
//!
//! The Sv39 stage reads and updates page-table entries through [`PageTableMemory`], which
//! the machine implements on top of the shadow map.

/// Page table walker for Sv39.
pub mod ptw;

/// Guest-physical to host shadow map.
pub mod shadow;

/// Sv39 translation cache.
pub mod tlb;

use crate::common::{AccessType, Trap, VirtAddr};
use crate::core::arch::csr::{MSTATUS_MXR, MSTATUS_SUM};
use crate::core::arch::mode::PrivilegeMode;

use self::ptw::{PTE_A, PTE_D, PTE_R, PTE_U, PTE_W, PTE_X, PageTableEntry};
use self::tlb::Tlb;

/// Guest-physical memory as seen by the page-table walker.
pub trait PageTableMemory {
    /// Reads an 8-byte entry. `None` unless the address is pool-backed.
    fn read_pte(&mut self, paddr: u64) -> Option<u64>;

    /// Writes an 8-byte entry back. Returns `false` unless the address is pool-backed.
    fn write_pte(&mut self, paddr: u64, pte: u64) -> bool;
}

/// State a translation depends on.
#[derive(Clone, Copy, Debug)]
pub struct TranslationContext {
    /// Current `satp`.
    pub satp: u64,
    /// Current `mstatus` (SUM and MXR are consulted).
    pub mstatus: u64,
    /// Effective privilege (MPP when MPRV applies to a data access).
    pub privilege: PrivilegeMode,
}

/// Sv39 translator with its TLB.
#[derive(Debug)]
pub struct Mmu {
    tlb: Tlb,
    /// Translations served by the TLB.
    pub tlb_hits: u64,
    /// Translations that needed a walk.
    pub tlb_misses: u64,
    /// Page-table walks performed, including A/D re-walks.
    pub walks: u64,
}

impl Mmu {
    /// Creates an MMU whose TLB has `1 << cache_bits` entries.
    pub fn new(cache_bits: u32) -> Self {
        Self { tlb: Tlb::new(cache_bits), tlb_hits: 0, tlb_misses: 0, walks: 0 }
    }

    /// Invalidates the whole TLB.
    pub fn flush(&mut self) {
        tracing::debug!("sv39 tlb flush");
        self.tlb.flush();
    }

    /// Translates a guest virtual address.
    ///
    /// # Arguments
    ///
    /// * `vaddr` - Address to translate.
    /// * `access` - Fetch, Read or Write.
    /// * `ctx` - `satp`, `mstatus` and the effective privilege.
    /// * `mem` - Guest-physical memory holding the page tables.
    ///
    /// # Returns
    ///
    /// The guest physical address, or the page fault for `access` with `vaddr` as tval.
    pub fn translate(
        &mut self,
        vaddr: VirtAddr,
        access: AccessType,
        ctx: &TranslationContext,
        mem: &mut dyn PageTableMemory,
    ) -> Result<u64, Trap> {
        let fault = access.page_fault(vaddr.val());
        if !vaddr.is_canonical() {
            return Err(fault);
        }

        let (mut pte, pte_addr, level, hit) = match self.tlb.lookup(vaddr.val()) {
            Some(entry) => {
                self.tlb_hits += 1;
                (PageTableEntry(entry.pte), entry.pte_addr, entry.level(), true)
            }
            None => {
                self.tlb_misses += 1;
                self.walks += 1;
                let leaf = ptw::walk(vaddr, ctx.satp, mem).ok_or(fault)?;
                self.tlb.insert(vaddr.val(), leaf.level, leaf.pte.0, leaf.pte_addr);
                (leaf.pte, leaf.pte_addr, leaf.level, false)
            }
        };

        if !permitted(pte, access, ctx) || pte.is_misaligned_superpage(level) {
            return Err(fault);
        }

        let is_write = access == AccessType::Write;
        if !pte.has(PTE_A) || (is_write && !pte.has(PTE_D)) {
            if hit {
                // The cached leaf may be stale; only update an entry memory still agrees on.
                self.walks += 1;
                let fresh = ptw::walk(vaddr, ctx.satp, mem).ok_or(fault)?;
                if fresh.pte != pte || fresh.pte_addr != pte_addr {
                    return Err(fault);
                }
            }
            let updated = PageTableEntry(pte.0 | PTE_A | if is_write { PTE_D } else { 0 });
            if !mem.write_pte(pte_addr, updated.0) {
                return Err(fault);
            }
            self.tlb.insert(vaddr.val(), level, updated.0, pte_addr);
            pte = updated;
        }

        let mut paddr = (pte.ppn() << 12) | vaddr.page_offset();
        if level >= 2 {
            paddr |= vaddr.vpn(1) << 21;
        }
        if level >= 1 {
            paddr |= vaddr.vpn(0) << 12;
        }
        Ok(paddr)
    }
}

fn permitted(pte: PageTableEntry, access: AccessType, ctx: &TranslationContext) -> bool {
    match ctx.privilege {
        PrivilegeMode::User if !pte.has(PTE_U) => return false,
        PrivilegeMode::Supervisor if pte.has(PTE_U) => {
            if access == AccessType::Fetch || ctx.mstatus & MSTATUS_SUM == 0 {
                return false;
            }
        }
        _ => {}
    }
    match access {
        AccessType::Read => pte.has(PTE_R) || (pte.has(PTE_X) && ctx.mstatus & MSTATUS_MXR != 0),
        AccessType::Write => pte.has(PTE_W),
        AccessType::Fetch => pte.has(PTE_X),
    }
}
