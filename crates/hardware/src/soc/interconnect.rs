//! System interconnect for memory and MMIO access.
//!
//! This module implements the bus that routes guest physical accesses. It provides:
//! 1. **Registration:** RAM regions backed page-by-page from the pool, and MMIO devices
//!    mapped page-by-page onto their device index. Either rolls back on failure.
//! 2. **Access Routing:** 8/16/32/64-bit reads and writes resolved through the shadow map
//!    to a pool page or to the owning device.
//! 3. **Device Updates:** The periodic `update` pass, with interrupt sources forwarded to
//!    the interrupt aggregator.
//! 4. **Page Tables:** The [`PageTableMemory`] view used by the Sv39 walker.
//!
//! Every change to what backs a guest page (map, unmap, image load, teardown) bumps the
//! bus generation. Caches keyed by guest physical address outside the bus compare it
//! before trusting their contents.

use crate::common::constants::{PAGE_OFFSET_MASK, PAGE_SIZE};
use crate::common::{AccessType, LoadError, MapError, PhysAddr, Trap};
use crate::core::units::lsu::MemWidth;
use crate::core::units::mmu::PageTableMemory;
use crate::core::units::mmu::shadow::{ShadowEntry, ShadowMap};
use crate::soc::devices::{Device, Plic, Uart};
use crate::soc::memory::PagePool;
use crate::soc::traits::{DeviceContext, DeviceEvents, PowerEvent};

#[derive(Debug)]
struct MappedDevice {
    base: u64,
    device: Box<dyn Device>,
}

/// Guest-physical bus: shadow map, page pool and MMIO devices.
#[derive(Debug)]
pub struct Bus {
    shadow: ShadowMap,
    pool: PagePool,
    devices: Vec<MappedDevice>,
    plic_idx: Option<usize>,
    events: DeviceEvents,
    generation: u64,
}

fn check_region(base: u64, size: u64) -> Result<(), MapError> {
    if base & PAGE_OFFSET_MASK != 0 {
        return Err(MapError::Misaligned(base));
    }
    if size & PAGE_OFFSET_MASK != 0 {
        return Err(MapError::MisalignedSize(size));
    }
    Ok(())
}

impl Bus {
    /// Creates an empty bus whose shadow-map cache has `1 << cache_bits` entries.
    pub fn new(cache_bits: u32) -> Self {
        Self {
            shadow: ShadowMap::new(cache_bits),
            pool: PagePool::new(),
            devices: Vec::new(),
            plic_idx: None,
            events: DeviceEvents::default(),
            generation: 0,
        }
    }

    /// Backs `[base, base + size)` with fresh zeroed pool pages.
    ///
    /// # Errors
    ///
    /// Misaligned base or size, non-canonical or already-mapped pages. Pages mapped before
    /// the failure are unmapped again and returned to the pool.
    pub fn map_memory(&mut self, base: u64, size: u64) -> Result<(), MapError> {
        check_region(base, size)?;
        let pages = size / PAGE_SIZE;
        for i in 0..pages {
            let gpa = PhysAddr::new(base.wrapping_add(i * PAGE_SIZE));
            let page = self.pool.alloc();
            if let Err(err) = self.shadow.map(gpa, page) {
                self.pool.release(page);
                self.rollback(base, i);
                tracing::warn!("memory mapping {base:#x}+{size:#x} rejected: {err}");
                return Err(err);
            }
        }
        self.generation += 1;
        tracing::debug!("mapped {size:#x} bytes of memory at {base:#x}");
        Ok(())
    }

    /// Maps `device` at `base` over `device.size()` bytes.
    ///
    /// # Returns
    ///
    /// The device index.
    ///
    /// # Errors
    ///
    /// As for [`Bus::map_memory`], plus `DuplicateAggregator` for a second PLIC. A rejected
    /// device is freed before it is dropped.
    pub fn add_mmio_device(
        &mut self,
        base: u64,
        mut device: Box<dyn Device>,
    ) -> Result<usize, MapError> {
        match self.map_device(base, device.as_mut()) {
            Ok(index) => {
                self.devices.push(MappedDevice { base, device });
                Ok(index)
            }
            Err(err) => {
                tracing::warn!("mapping {} at {base:#x} rejected: {err}", device.name());
                device.free();
                Err(err)
            }
        }
    }

    fn map_device(&mut self, base: u64, device: &mut dyn Device) -> Result<usize, MapError> {
        let size = device.size();
        check_region(base, size)?;
        let is_plic = device.as_plic_mut().is_some();
        if is_plic && self.plic_idx.is_some() {
            return Err(MapError::DuplicateAggregator);
        }
        let index = self.devices.len();
        let slot = u16::try_from(index).map_err(|_| MapError::AlreadyMapped(base))?;
        let pages = size / PAGE_SIZE;
        for i in 0..pages {
            let gpa = PhysAddr::new(base.wrapping_add(i * PAGE_SIZE));
            if let Err(err) = self.shadow.map_mmio(gpa, i as u32, slot) {
                self.rollback(base, i);
                return Err(err);
            }
        }
        tracing::debug!("attached {} at {base:#x}+{size:#x}", device.name());
        if is_plic {
            self.plic_idx = Some(index);
        }
        self.generation += 1;
        Ok(index)
    }

    fn rollback(&mut self, base: u64, mapped: u64) {
        for j in 0..mapped {
            let _ = self.unmap(base.wrapping_add(j * PAGE_SIZE));
        }
    }

    /// Removes the mapping of one page; a pool page goes back to the pool.
    ///
    /// # Errors
    ///
    /// `NotMapped` when nothing backs `gpa`, plus the address checks of the shadow map.
    pub fn unmap(&mut self, gpa: u64) -> Result<(), MapError> {
        if let ShadowEntry::Pool(page) = self.shadow.unmap(PhysAddr::new(gpa))? {
            self.pool.release(page);
        }
        self.generation += 1;
        Ok(())
    }

    /// Counter bumped by every change to the backing of guest pages.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves a guest physical address through the shadow map.
    #[inline(always)]
    pub fn resolve(&mut self, paddr: u64) -> Option<ShadowEntry> {
        self.shadow.get_entry(PhysAddr::new(paddr))
    }

    /// Reads `width` bytes at a naturally aligned guest physical address.
    ///
    /// Unmapped addresses raise the access fault for `access` with `paddr` as tval.
    pub fn read(
        &mut self,
        paddr: u64,
        width: MemWidth,
        access: AccessType,
        mip: &mut u64,
    ) -> Result<u64, Trap> {
        let fault = access.access_fault(paddr);
        let offset = paddr & PAGE_OFFSET_MASK;
        match self.resolve(paddr).ok_or(fault)? {
            ShadowEntry::Pool(page) => {
                let len = width.bytes() as usize;
                self.pool.read(page, offset as usize, len).ok_or(fault)
            }
            ShadowEntry::Mmio { device, page } => {
                let dev_offset = u64::from(page) * PAGE_SIZE + offset;
                let slot = self.devices.get_mut(usize::from(device)).ok_or(fault)?;
                let mut ctx = DeviceContext::new(slot.base, mip, &mut self.events);
                let dev = &mut slot.device;
                let result = match width {
                    MemWidth::Byte => dev.read_u8(dev_offset, &mut ctx).map(u64::from),
                    MemWidth::Half => dev.read_u16(dev_offset, &mut ctx).map(u64::from),
                    MemWidth::Word => dev.read_u32(dev_offset, &mut ctx).map(u64::from),
                    MemWidth::Double => dev.read_u64(dev_offset, &mut ctx),
                };
                self.forward_irqs();
                // A device refusing an instruction fetch is an instruction access fault.
                match (result, access) {
                    (Err(_), AccessType::Fetch) => Err(fault),
                    (r, _) => r,
                }
            }
        }
    }

    /// Writes the low `width` bytes of `val` at a naturally aligned guest physical address.
    pub fn write(
        &mut self,
        paddr: u64,
        width: MemWidth,
        val: u64,
        mip: &mut u64,
    ) -> Result<(), Trap> {
        let fault = Trap::StoreAccessFault(paddr);
        let offset = paddr & PAGE_OFFSET_MASK;
        match self.resolve(paddr).ok_or(fault)? {
            ShadowEntry::Pool(page) => {
                if self.pool.write(page, offset as usize, width.bytes() as usize, val) {
                    Ok(())
                } else {
                    Err(fault)
                }
            }
            ShadowEntry::Mmio { device, page } => {
                let dev_offset = u64::from(page) * PAGE_SIZE + offset;
                let slot = self.devices.get_mut(usize::from(device)).ok_or(fault)?;
                let mut ctx = DeviceContext::new(slot.base, mip, &mut self.events);
                let dev = &mut slot.device;
                let result = match width {
                    MemWidth::Byte => dev.write_u8(dev_offset, val as u8, &mut ctx),
                    MemWidth::Half => dev.write_u16(dev_offset, val as u16, &mut ctx),
                    MemWidth::Word => dev.write_u32(dev_offset, val as u32, &mut ctx),
                    MemWidth::Double => dev.write_u64(dev_offset, val, &mut ctx),
                };
                self.forward_irqs();
                result
            }
        }
    }

    /// Copies an image into pool-backed guest memory.
    ///
    /// # Errors
    ///
    /// `LoadError::Unmapped` for the first byte that is not pool-backed.
    pub fn load_bytes(&mut self, paddr: u64, data: &[u8]) -> Result<(), LoadError> {
        self.generation += 1;
        let mut addr = paddr;
        let mut rest = data;
        while !rest.is_empty() {
            let offset = (addr & PAGE_OFFSET_MASK) as usize;
            let chunk = rest.len().min(PAGE_SIZE as usize - offset);
            let Some(ShadowEntry::Pool(page)) = self.resolve(addr) else {
                return Err(LoadError::Unmapped(addr));
            };
            let dst = self
                .pool
                .page_mut(page)
                .and_then(|p| p.get_mut(offset..offset + chunk))
                .ok_or(LoadError::Unmapped(addr))?;
            let (head, tail) = rest.split_at(chunk);
            dst.copy_from_slice(head);
            rest = tail;
            addr = addr.wrapping_add(chunk as u64);
        }
        Ok(())
    }

    /// Runs every device's `update`, in registration order.
    pub fn update_devices(&mut self, mip: &mut u64) {
        for idx in 0..self.devices.len() {
            if let Some(slot) = self.devices.get_mut(idx) {
                let mut ctx = DeviceContext::new(slot.base, mip, &mut self.events);
                slot.device.update(&mut ctx);
            }
            self.forward_irqs();
        }
    }

    /// Marks `source` pending on the interrupt aggregator, if one is attached.
    pub fn raise_irq(&mut self, source: u32) {
        if let Some(plic) = self.plic_mut() {
            plic.raise(source);
        }
    }

    fn forward_irqs(&mut self) {
        if self.events.irqs.is_empty() {
            return;
        }
        let mut irqs = std::mem::take(&mut self.events.irqs);
        for source in irqs.drain(..) {
            self.raise_irq(source);
        }
        self.events.irqs = irqs;
    }

    /// Takes the latest power request made by a device.
    pub fn take_power_event(&mut self) -> Option<PowerEvent> {
        self.events.power.take()
    }

    /// The interrupt aggregator, if attached.
    pub fn plic_mut(&mut self) -> Option<&mut Plic> {
        let idx = self.plic_idx?;
        self.devices.get_mut(idx)?.device.as_plic_mut()
    }

    /// The first UART, if attached.
    pub fn uart_mut(&mut self) -> Option<&mut Uart> {
        self.devices.iter_mut().find_map(|d| d.device.as_uart_mut())
    }

    /// Number of attached devices.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Pool pages currently backing guest memory.
    pub fn pages_in_use(&self) -> usize {
        self.pool.in_use()
    }

    /// Shadow-map cache hits and misses.
    pub fn shadow_stats(&self) -> (u64, u64) {
        (self.shadow.hits, self.shadow.misses)
    }

    /// Frees every device, the shadow map and the pool.
    pub fn free(&mut self) {
        for slot in &mut self.devices {
            slot.device.free();
        }
        self.devices.clear();
        self.plic_idx = None;
        self.shadow.free();
        self.pool.clear();
        self.generation += 1;
    }
}

impl PageTableMemory for Bus {
    fn read_pte(&mut self, paddr: u64) -> Option<u64> {
        match self.resolve(paddr)? {
            ShadowEntry::Pool(page) => {
                self.pool.read(page, (paddr & PAGE_OFFSET_MASK) as usize, 8)
            }
            ShadowEntry::Mmio { .. } => None,
        }
    }

    fn write_pte(&mut self, paddr: u64, pte: u64) -> bool {
        match self.resolve(paddr) {
            Some(ShadowEntry::Pool(page)) => {
                self.generation += 1;
                self.pool.write(page, (paddr & PAGE_OFFSET_MASK) as usize, 8, pte)
            }
            _ => false,
        }
    }
}
