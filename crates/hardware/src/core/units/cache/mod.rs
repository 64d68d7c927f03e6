//! Decoded-Instruction Cache.
//!
//! A direct-mapped cache of decoded instructions keyed by the physical fetch address.
//! Each line holds the tag (the full physical address) and the decoded record, so a hit
//! skips both the memory read and the decoder.
//!
//! Coherence is maintained by the CPU: a store invalidates the line of the word it
//! touches; FENCE.I, `satp` writes and SFENCE.VMA flush everything.

use crate::isa::instruction::Decoded;

#[derive(Clone, Copy, Debug)]
struct CacheLine {
    tag: u64,
    decoded: Option<Decoded>,
}

const EMPTY: CacheLine = CacheLine { tag: 0, decoded: None };

/// Direct-mapped decoded-instruction cache.
#[derive(Debug)]
pub struct DecodeCache {
    lines: Vec<CacheLine>,
    mask: u64,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that fell through to memory.
    pub misses: u64,
}

impl DecodeCache {
    /// Creates a cache with `1 << bits` lines.
    pub fn new(bits: u32) -> Self {
        let size = 1usize << bits;
        Self { lines: vec![EMPTY; size], mask: size as u64 - 1, hits: 0, misses: 0 }
    }

    #[inline(always)]
    fn index(&self, paddr: u64) -> usize {
        ((paddr >> 2) & self.mask) as usize
    }

    /// Returns the cached decode of the word at `paddr`.
    #[inline(always)]
    pub fn lookup(&mut self, paddr: u64) -> Option<Decoded> {
        let idx = self.index(paddr);
        match self.lines.get(idx) {
            Some(CacheLine { tag, decoded: Some(d) }) if *tag == paddr => {
                self.hits += 1;
                Some(*d)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Records the decode of the word at `paddr`.
    pub fn insert(&mut self, paddr: u64, decoded: Decoded) {
        let idx = self.index(paddr);
        if let Some(line) = self.lines.get_mut(idx) {
            *line = CacheLine { tag: paddr, decoded: Some(decoded) };
        }
    }

    /// Drops any line caching a word overlapped by a store of `size` bytes at `paddr`.
    pub fn invalidate(&mut self, paddr: u64, size: u64) {
        let first = paddr & !3;
        let last = paddr.wrapping_add(size.saturating_sub(1)) & !3;
        let mut word = first;
        loop {
            let idx = self.index(word);
            if let Some(line) = self.lines.get_mut(idx) {
                if line.tag == word {
                    *line = EMPTY;
                }
            }
            if word == last {
                break;
            }
            word = word.wrapping_add(4);
        }
    }

    /// Invalidates every line.
    pub fn flush(&mut self) {
        self.lines.fill(EMPTY);
    }
}
