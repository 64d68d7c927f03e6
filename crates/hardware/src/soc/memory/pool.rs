//! Host Page Pool.
//!
//! Guest RAM is handed out one 4 KiB page at a time from this arena. Pages are addressed by
//! a `PoolPage` index, so the shadow map never holds a host pointer. Released pages go on a
//! free list and are zeroed when handed out again.

use crate::common::constants::PAGE_SIZE;

/// Handle to one page of the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolPage(pub u32);

/// Arena of host memory pages backing guest RAM.
#[derive(Debug, Default)]
pub struct PagePool {
    pages: Vec<Box<[u8]>>,
    free: Vec<u32>,
}

impl PagePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a zeroed page.
    pub fn alloc(&mut self) -> PoolPage {
        if let Some(idx) = self.free.pop() {
            if let Some(page) = self.pages.get_mut(idx as usize) {
                page.fill(0);
            }
            return PoolPage(idx);
        }
        let idx = self.pages.len() as u32;
        self.pages.push(vec![0u8; PAGE_SIZE as usize].into_boxed_slice());
        PoolPage(idx)
    }

    /// Returns a page to the free list.
    pub fn release(&mut self, page: PoolPage) {
        if (page.0 as usize) < self.pages.len() && !self.free.contains(&page.0) {
            self.free.push(page.0);
        }
    }

    /// Drops every page.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.free.clear();
    }

    /// Pages currently handed out.
    pub fn in_use(&self) -> usize {
        self.pages.len() - self.free.len()
    }

    /// Reads `bytes` bytes little-endian at `offset` within `page`.
    #[inline(always)]
    pub fn read(&self, page: PoolPage, offset: usize, bytes: usize) -> Option<u64> {
        let src = self.pages.get(page.0 as usize)?.get(offset..offset + bytes)?;
        let mut buf = [0u8; 8];
        buf.get_mut(..bytes)?.copy_from_slice(src);
        Some(u64::from_le_bytes(buf))
    }

    /// Writes the low `bytes` bytes of `val` little-endian at `offset` within `page`.
    #[inline(always)]
    pub fn write(&mut self, page: PoolPage, offset: usize, bytes: usize, val: u64) -> bool {
        let Some(dst) = self
            .pages
            .get_mut(page.0 as usize)
            .and_then(|p| p.get_mut(offset..offset + bytes))
        else {
            return false;
        };
        let src = val.to_le_bytes();
        match src.get(..bytes) {
            Some(src) => {
                dst.copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    /// Mutable view of a whole page.
    pub fn page_mut(&mut self, page: PoolPage) -> Option<&mut [u8]> {
        self.pages.get_mut(page.0 as usize).map(|p| &mut p[..])
    }
}
