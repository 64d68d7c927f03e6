//! Memory Access Helpers.
//!
//! This module provides the interface between the hart and the guest-physical bus.
//! It performs the following:
//! 1. **Address Translation:** Decides whether Sv39 applies and with which privilege
//!    (`mstatus.MPRV`), then translates through the MMU.
//! 2. **Data Access:** 1/2/4/8-byte loads and stores. Naturally aligned accesses never cross
//!    a page; misaligned ones are split into byte accesses, each translated on its own.
//! 3. **Instruction Fetch:** Translation, then the decoded-instruction cache, then memory
//!    and the decoder.
//! 4. **Coherence:** Stores invalidate decoded instructions at the physical address they hit;
//!    any remapping or reload of guest pages on the bus flushes them all before the next fetch.

use super::Cpu;
use crate::common::{AccessType, Trap, VirtAddr};
use crate::core::arch::csr::{
    MSTATUS_MPP_SHIFT, MSTATUS_MPRV, SATP_MODE_MASK, SATP_MODE_SHIFT, SATP_MODE_SV39,
};
use crate::core::arch::mode::PrivilegeMode;
use crate::core::units::lsu::MemWidth;
use crate::core::units::lsu::unaligned::{is_aligned, split_load, split_store};
use crate::core::units::mmu::TranslationContext;
use crate::isa::decode::decode;
use crate::isa::instruction::Decoded;

impl Cpu {
    /// Returns `true` when accesses of this kind go through Sv39.
    ///
    /// `satp` must select Sv39, and the hart must be below Machine or, for data accesses,
    /// have `mstatus.MPRV` set with `MPP` below Machine. UserOnly never translates.
    pub fn should_translate(&self, is_data: bool) -> bool {
        if self.user_only {
            return false;
        }
        let mode = (self.csr.satp() >> SATP_MODE_SHIFT) & SATP_MODE_MASK;
        if mode != SATP_MODE_SV39 {
            return false;
        }
        if self.privilege < PrivilegeMode::Machine {
            return true;
        }
        is_data && self.mprv_privilege().is_some_and(|p| p < PrivilegeMode::Machine)
    }

    fn mprv_privilege(&self) -> Option<PrivilegeMode> {
        let status = self.csr.mstatus();
        (status & MSTATUS_MPRV != 0).then(|| PrivilegeMode::from_bits(status >> MSTATUS_MPP_SHIFT))
    }

    fn effective_privilege(&self, access: AccessType) -> PrivilegeMode {
        if access.is_data() && self.privilege == PrivilegeMode::Machine {
            if let Some(mpp) = self.mprv_privilege() {
                return mpp;
            }
        }
        self.privilege
    }

    /// Translates a guest virtual address, or passes it through when translation is off.
    ///
    /// # Returns
    ///
    /// The guest physical address, or the page fault for `access` with `vaddr` as tval.
    pub fn translate(&mut self, vaddr: u64, access: AccessType) -> Result<u64, Trap> {
        if !self.should_translate(access.is_data()) {
            return Ok(vaddr);
        }
        let ctx = TranslationContext {
            satp: self.csr.satp(),
            mstatus: self.csr.mstatus(),
            privilege: self.effective_privilege(access),
        };
        self.mmu.translate(VirtAddr::new(vaddr), access, &ctx, &mut self.bus.bus)
    }

    /// Reads a naturally aligned value at a guest physical address.
    ///
    /// `access` selects the fault raised for an unbacked address (AMOs pass `Write`).
    pub fn read_physical(
        &mut self,
        paddr: u64,
        width: MemWidth,
        access: AccessType,
    ) -> Result<u64, Trap> {
        self.bus.bus.read(paddr, width, access, self.csr.mip_mut())
    }

    /// Writes a naturally aligned value at a guest physical address.
    pub fn write_physical(&mut self, paddr: u64, width: MemWidth, val: u64) -> Result<(), Trap> {
        self.decode_cache.invalidate(paddr, width.bytes());
        self.bus.bus.write(paddr, width, val, self.csr.mip_mut())
    }

    fn load_aligned(&mut self, vaddr: u64, width: MemWidth) -> Result<u64, Trap> {
        let paddr = self.translate(vaddr, AccessType::Read)?;
        self.read_physical(paddr, width, AccessType::Read)
    }

    fn store_aligned(&mut self, vaddr: u64, width: MemWidth, val: u64) -> Result<(), Trap> {
        let paddr = self.translate(vaddr, AccessType::Write)?;
        self.write_physical(paddr, width, val)
    }

    /// Loads `width` bytes at a guest virtual address, zero-extended.
    ///
    /// Misaligned loads are assembled from byte loads and fault at the first failing byte.
    pub fn load(&mut self, vaddr: u64, width: MemWidth) -> Result<u64, Trap> {
        let size = width.bytes();
        if is_aligned(vaddr, size) {
            return self.load_aligned(vaddr, width);
        }
        split_load(vaddr, size, |addr| {
            self.load_aligned(addr, MemWidth::Byte).map(|byte| byte as u8)
        })
    }

    /// Stores the low `width` bytes of `val` at a guest virtual address.
    ///
    /// Misaligned stores are split into byte stores; bytes before a faulting byte stay written.
    pub fn store(&mut self, vaddr: u64, width: MemWidth, val: u64) -> Result<(), Trap> {
        let size = width.bytes();
        if is_aligned(vaddr, size) {
            return self.store_aligned(vaddr, width, val);
        }
        split_store(vaddr, size, val, |addr, byte| {
            self.store_aligned(addr, MemWidth::Byte, u64::from(byte))
        })
    }

    /// Drops every decoded instruction once the bus has remapped, reloaded or rewritten
    /// guest pages behind the hart's back.
    fn sync_decode_cache(&mut self) {
        let generation = self.bus.bus.generation();
        if generation != self.bus_generation {
            self.decode_cache.flush();
            self.bus_generation = generation;
        }
    }

    /// Fetches and decodes the instruction at the current PC.
    ///
    /// # Returns
    ///
    /// The decoded instruction, `InstructionPageFault(pc)` / `InstructionAccessFault(paddr)`
    /// for fetch failures, or `IllegalInstruction(word)` for an undecodable word.
    pub fn fetch(&mut self) -> Result<Decoded, Trap> {
        self.sync_decode_cache();
        let paddr = self.translate(self.pc, AccessType::Fetch)?;
        if let Some(decoded) = self.decode_cache.lookup(paddr) {
            return Ok(decoded);
        }
        let word = self.read_physical(paddr, MemWidth::Word, AccessType::Fetch)? as u32;
        let decoded = decode(word).ok_or(Trap::IllegalInstruction(u64::from(word)))?;
        self.decode_cache.insert(paddr, decoded);
        Ok(decoded)
    }
}
