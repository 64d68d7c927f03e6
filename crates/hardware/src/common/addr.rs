//! Guest Virtual and Guest Physical address types.
//!
//! Strong types keep the two guest address spaces apart. It provides:
//! 1. **Type Safety:** `VirtAddr` is what software issues, `PhysAddr` is what the shadow map resolves.
//! 2. **Field Extraction:** Page offsets, page numbers and the per-level Sv39 indices.
//! 3. **Canonical Checks:** The 39-bit sign-extension rule shared by both translators.

use super::constants::{CANONICAL_HIGH_MASK, PAGE_OFFSET_MASK, PAGE_SHIFT, VPN_BITS, VPN_INDEX_MASK};

/// Returns `true` when bits 63..38 of `addr` are uniformly zero or uniformly one.
#[inline(always)]
pub const fn is_canonical(addr: u64) -> bool {
    let top = addr & CANONICAL_HIGH_MASK;
    top == 0 || top == CANONICAL_HIGH_MASK
}

/// A guest virtual address.
///
/// Virtual addresses are produced by guest software and pass through the Sv39 translator
/// before reaching the guest physical address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u64);

/// A guest physical address.
///
/// Physical addresses index the shadow map, which resolves them to a host pool page or to
/// an MMIO device slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Wraps a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Byte offset within the 4 KiB page.
    #[inline(always)]
    pub const fn page_offset(self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Address with the page offset cleared.
    #[inline(always)]
    pub const fn page_base(self) -> u64 {
        self.0 & !PAGE_OFFSET_MASK
    }

    /// Virtual page number index for the given walk level (0, 1 or 2).
    ///
    /// # Arguments
    ///
    /// * `level` - Page-table level; level 2 is the root.
    ///
    /// # Returns
    ///
    /// The 9-bit index into the table at that level.
    #[inline(always)]
    pub const fn vpn(self, level: usize) -> u64 {
        (self.0 >> (PAGE_SHIFT + VPN_BITS * level as u64)) & VPN_INDEX_MASK
    }

    /// Returns `true` if the address satisfies the Sv39 sign-extension rule.
    #[inline(always)]
    pub const fn is_canonical(self) -> bool {
        is_canonical(self.0)
    }
}

impl PhysAddr {
    /// Wraps a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Byte offset within the 4 KiB page.
    #[inline(always)]
    pub const fn page_offset(self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Address with the page offset cleared.
    #[inline(always)]
    pub const fn page_base(self) -> u64 {
        self.0 & !PAGE_OFFSET_MASK
    }

    /// Physical page number.
    #[inline(always)]
    pub const fn page_number(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    /// Shadow-table index for the given level, using the same 9-bit split as Sv39.
    #[inline(always)]
    pub const fn level_index(self, level: usize) -> usize {
        ((self.0 >> (PAGE_SHIFT + VPN_BITS * level as u64)) & VPN_INDEX_MASK) as usize
    }

    /// Returns `true` if the address satisfies the 39-bit sign-extension rule.
    #[inline(always)]
    pub const fn is_canonical(self) -> bool {
        is_canonical(self.0)
    }

    /// Returns `true` if the address sits on a page boundary.
    #[inline(always)]
    pub const fn is_page_aligned(self) -> bool {
        self.0 & PAGE_OFFSET_MASK == 0
    }
}

impl std::fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v:{:#x}", self.0)
    }
}

impl std::fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p:{:#x}", self.0)
    }
}
