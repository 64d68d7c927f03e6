//! Translation Lookaside Buffer (TLB) for Sv39.
//!
//! Direct-mapped, indexed by `(vaddr >> 12) & mask`. The tag is the virtual page base
//! with `level + 1` in its low bits, so a zero tag never matches and the leaf level comes
//! back with the hit.

use crate::common::constants::{PAGE_OFFSET_MASK, PAGE_SHIFT};

/// A cached leaf translation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TlbEntry {
    tag: u64,
    /// Leaf page-table entry as last seen in memory.
    pub pte: u64,
    /// Guest physical address the leaf was read from.
    pub pte_addr: u64,
}

impl TlbEntry {
    /// Level at which the leaf was found (2 = 1 GiB, 1 = 2 MiB, 0 = 4 KiB).
    pub const fn level(&self) -> usize {
        ((self.tag & PAGE_OFFSET_MASK) - 1) as usize
    }
}

/// Direct-mapped Sv39 translation cache.
#[derive(Debug)]
pub struct Tlb {
    entries: Vec<TlbEntry>,
    mask: u64,
}

impl Tlb {
    /// Creates a TLB with `1 << bits` entries.
    pub fn new(bits: u32) -> Self {
        let size = 1usize << bits;
        Self { entries: vec![TlbEntry::default(); size], mask: size as u64 - 1 }
    }

    #[inline(always)]
    fn index(&self, vaddr: u64) -> usize {
        ((vaddr >> PAGE_SHIFT) & self.mask) as usize
    }

    /// Looks up the leaf for the page containing `vaddr`.
    #[inline(always)]
    pub fn lookup(&self, vaddr: u64) -> Option<TlbEntry> {
        let entry = self.entries.get(self.index(vaddr))?;
        let hit = entry.tag & PAGE_OFFSET_MASK != 0
            && entry.tag & !PAGE_OFFSET_MASK == vaddr & !PAGE_OFFSET_MASK;
        hit.then_some(*entry)
    }

    /// Caches a leaf found at `level` for the page containing `vaddr`.
    pub fn insert(&mut self, vaddr: u64, level: usize, pte: u64, pte_addr: u64) {
        let idx = self.index(vaddr);
        if let Some(slot) = self.entries.get_mut(idx) {
            let tag = (vaddr & !PAGE_OFFSET_MASK) | (level as u64 + 1);
            *slot = TlbEntry { tag, pte, pte_addr };
        }
    }

    /// Invalidates every entry.
    ///
    /// Called on `SFENCE.VMA` and `satp` writes.
    pub fn flush(&mut self) {
        self.entries.fill(TlbEntry::default());
    }
}
