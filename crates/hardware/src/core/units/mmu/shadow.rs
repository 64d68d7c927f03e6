//! Guest-Physical to Host shadow map.
//!
//! An emulator-private, three-level radix tree over 4 KiB guest physical pages, using the
//! same 9-bit index split as Sv39. Leaves name either a host pool page or a page of an
//! MMIO device. Nodes live in an index-addressed arena; intermediate nodes are allocated
//! on first use. A node left empty by an unmap goes to a spare list and is reused by the
//! next allocation, so the arena never outgrows the largest set of live mappings.
//!
//! Lookups go through a direct-mapped cache tagged with the exact page number.

use crate::common::constants::PAGE_LEVELS;
use crate::common::constants::ENTRIES_PER_TABLE;
use crate::common::{MapError, PhysAddr};
use crate::soc::memory::PoolPage;

/// What a guest physical page resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowEntry {
    /// Host memory from the page pool.
    Pool(PoolPage),
    /// Page `page` of device `device`.
    Mmio {
        /// Index of the device in the machine's device list.
        device: u16,
        /// Page offset within the device's region.
        page: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Empty,
    Table(u32),
    Leaf(ShadowEntry),
}

type Node = Box<[Slot]>;

fn empty_node() -> Node {
    vec![Slot::Empty; ENTRIES_PER_TABLE].into_boxed_slice()
}

/// The shadow map and its translation cache.
#[derive(Debug)]
pub struct ShadowMap {
    nodes: Vec<Node>,
    /// Arena slots of reclaimed nodes, all `Empty`.
    spare: Vec<u32>,
    cache: Vec<Option<(u64, ShadowEntry)>>,
    mask: u64,
    /// Lookups served by the cache.
    pub hits: u64,
    /// Lookups that walked the tree.
    pub misses: u64,
}

impl ShadowMap {
    /// Creates an empty map whose cache has `1 << cache_bits` entries.
    pub fn new(cache_bits: u32) -> Self {
        let size = 1usize << cache_bits;
        Self {
            nodes: vec![empty_node()],
            spare: Vec::new(),
            cache: vec![None; size],
            mask: size as u64 - 1,
            hits: 0,
            misses: 0,
        }
    }

    fn check(gpa: PhysAddr) -> Result<(), MapError> {
        if !gpa.is_page_aligned() {
            return Err(MapError::Misaligned(gpa.val()));
        }
        if !gpa.is_canonical() {
            return Err(MapError::NonCanonical(gpa.val()));
        }
        Ok(())
    }

    #[inline(always)]
    fn cache_index(&self, gpa: PhysAddr) -> usize {
        (gpa.page_number() & self.mask) as usize
    }

    /// Index of the level-0 node covering `gpa`, allocating missing levels if `create`.
    fn leaf_node(&mut self, gpa: PhysAddr, create: bool) -> Option<usize> {
        let mut node = 0usize;
        for level in (1..PAGE_LEVELS).rev() {
            let idx = gpa.level_index(level);
            node = match self.nodes[node][idx] {
                Slot::Table(next) => next as usize,
                Slot::Empty if create => {
                    let next = match self.spare.pop() {
                        Some(spare) => spare as usize,
                        None => {
                            self.nodes.push(empty_node());
                            self.nodes.len() - 1
                        }
                    };
                    self.nodes[node][idx] = Slot::Table(next as u32);
                    next
                }
                _ => return None,
            };
        }
        Some(node)
    }

    /// Node indices from the root down to the level-0 node covering `gpa`.
    fn path(&self, gpa: PhysAddr) -> Option<[usize; PAGE_LEVELS]> {
        let mut path = [0usize; PAGE_LEVELS];
        for (depth, level) in (1..PAGE_LEVELS).rev().enumerate() {
            let Slot::Table(next) = self.nodes[path[depth]][gpa.level_index(level)] else {
                return None;
            };
            path[depth + 1] = next as usize;
        }
        Some(path)
    }

    /// Detaches nodes on `path` that no longer hold anything, deepest first.
    fn reclaim(&mut self, gpa: PhysAddr, path: &[usize; PAGE_LEVELS]) {
        for depth in (1..PAGE_LEVELS).rev() {
            let node = path[depth];
            if self.nodes[node].iter().any(|slot| *slot != Slot::Empty) {
                return;
            }
            self.nodes[path[depth - 1]][gpa.level_index(PAGE_LEVELS - depth)] = Slot::Empty;
            self.spare.push(node as u32);
        }
    }

    fn insert(&mut self, gpa: PhysAddr, entry: ShadowEntry) -> Result<(), MapError> {
        Self::check(gpa)?;
        let Some(node) = self.leaf_node(gpa, true) else {
            return Err(MapError::AlreadyMapped(gpa.val()));
        };
        let slot = &mut self.nodes[node][gpa.level_index(0)];
        if *slot != Slot::Empty {
            return Err(MapError::AlreadyMapped(gpa.val()));
        }
        *slot = Slot::Leaf(entry);
        Ok(())
    }

    /// Maps the page at `gpa` to a pool page.
    ///
    /// # Errors
    ///
    /// `Misaligned`, `NonCanonical` or `AlreadyMapped`.
    pub fn map(&mut self, gpa: PhysAddr, page: PoolPage) -> Result<(), MapError> {
        self.insert(gpa, ShadowEntry::Pool(page))
    }

    /// Maps the page at `gpa` to page `page` of device `device`.
    ///
    /// # Errors
    ///
    /// `Misaligned`, `NonCanonical` or `AlreadyMapped`.
    pub fn map_mmio(&mut self, gpa: PhysAddr, page: u32, device: u16) -> Result<(), MapError> {
        self.insert(gpa, ShadowEntry::Mmio { device, page })
    }

    /// Removes the mapping of the page at `gpa` and drops it from the cache.
    ///
    /// Table nodes left empty are reclaimed.
    ///
    /// # Returns
    ///
    /// The released entry; a pool page in it is now the caller's to return to the pool.
    pub fn unmap(&mut self, gpa: PhysAddr) -> Result<ShadowEntry, MapError> {
        Self::check(gpa)?;
        let path = self.path(gpa).ok_or(MapError::NotMapped(gpa.val()))?;
        let slot = &mut self.nodes[path[PAGE_LEVELS - 1]][gpa.level_index(0)];
        let Slot::Leaf(entry) = *slot else {
            return Err(MapError::NotMapped(gpa.val()));
        };
        *slot = Slot::Empty;
        self.reclaim(gpa, &path);

        let idx = self.cache_index(gpa);
        if let Some(cached) = self.cache.get_mut(idx) {
            if matches!(cached, Some((page, _)) if *page == gpa.page_number()) {
                *cached = None;
            }
        }
        Ok(entry)
    }

    /// Resolves the page containing `gpa`.
    #[inline(always)]
    pub fn get_entry(&mut self, gpa: PhysAddr) -> Option<ShadowEntry> {
        if !gpa.is_canonical() {
            return None;
        }
        let page = gpa.page_number();
        let idx = self.cache_index(gpa);
        if let Some(Some((tag, entry))) = self.cache.get(idx) {
            if *tag == page {
                self.hits += 1;
                return Some(*entry);
            }
        }
        self.misses += 1;
        let node = self.leaf_node(gpa, false)?;
        let Slot::Leaf(entry) = self.nodes[node][gpa.level_index(0)] else {
            return None;
        };
        if let Some(cached) = self.cache.get_mut(idx) {
            *cached = Some((page, entry));
        }
        Some(entry)
    }

    /// Releases every table level and empties the cache.
    ///
    /// Pool pages referenced by the map are not touched; the pool is released with it.
    pub fn free(&mut self) {
        self.nodes.clear();
        self.nodes.push(empty_node());
        self.spare.clear();
        self.cache.fill(None);
    }

    /// Number of live tree nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.spare.len()
    }
}
