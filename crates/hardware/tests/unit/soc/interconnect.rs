//! Bus Tests.
//!
//! Covers registration on the shadow map, access routing and device lifecycle:
//! - Mapping errors and rollback of partially mapped regions
//! - Routing to pool pages and to devices at device-relative offsets
//! - Fault types for unmapped and refused accesses
//! - Interrupt forwarding from devices to the aggregator
//! - Teardown

use pretty_assertions::assert_eq;

use rvemu_core::common::{AccessType, LoadError, MapError, Trap};
use rvemu_core::core::arch::csr::MIP_MEIP;
use rvemu_core::core::units::lsu::MemWidth;
use rvemu_core::core::units::mmu::PageTableMemory;
use rvemu_core::core::units::mmu::shadow::ShadowEntry;
use rvemu_core::soc::devices::{Plic, SysCon};
use rvemu_core::soc::{Bus, System};

use crate::common::mocks::device::{Access, ScratchDevice};

const RAM: u64 = 0x8000_0000;
const DEV: u64 = 0x1000_0000;

fn bus_with_ram(pages: u64) -> Bus {
    let mut bus = Bus::new(4);
    bus.map_memory(RAM, pages * 0x1000).unwrap();
    bus
}

// ══════════════════════════════════════════════════════════
// 1. Registration
// ══════════════════════════════════════════════════════════

#[test]
fn memory_regions_must_be_page_granular() {
    let mut bus = Bus::new(4);
    assert_eq!(bus.map_memory(RAM + 8, 0x1000), Err(MapError::Misaligned(RAM + 8)));
    assert_eq!(bus.map_memory(RAM, 0x1001), Err(MapError::MisalignedSize(0x1001)));
    assert_eq!(bus.pages_in_use(), 0);
}

#[test]
fn failed_memory_mapping_rolls_back() {
    let mut bus = bus_with_ram(2);

    assert_eq!(
        bus.map_memory(RAM - 0x2000, 0x4000),
        Err(MapError::AlreadyMapped(RAM))
    );
    assert_eq!(bus.pages_in_use(), 2);
    assert_eq!(bus.resolve(RAM - 0x2000), None);
    assert_eq!(bus.resolve(RAM - 0x1000), None);
}

#[test]
fn failed_device_mapping_rolls_back() {
    let mut bus = Bus::new(4);
    bus.map_memory(DEV + 0x1000, 0x1000).unwrap();
    let (device, log) = ScratchDevice::new(2);

    assert_eq!(
        bus.add_mmio_device(DEV, Box::new(device)),
        Err(MapError::AlreadyMapped(DEV + 0x1000))
    );
    assert!(log.freed());
    assert_eq!(bus.device_count(), 0);
    assert_eq!(bus.resolve(DEV), None);
    assert!(matches!(bus.resolve(DEV + 0x1000), Some(ShadowEntry::Pool(_))));
}

#[test]
fn backing_changes_advance_the_generation() {
    let mut bus = Bus::new(4);
    let start = bus.generation();

    bus.map_memory(RAM, 0x2000).unwrap();
    let mapped = bus.generation();
    assert!(mapped > start);

    let mut mip = 0;
    bus.write(RAM, MemWidth::Word, 1, &mut mip).unwrap();
    let _ = bus.read(RAM, MemWidth::Word, AccessType::Read, &mut mip).unwrap();
    assert_eq!(bus.generation(), mapped);

    bus.load_bytes(RAM, &[0x13, 0, 0, 0]).unwrap();
    let loaded = bus.generation();
    assert!(loaded > mapped);

    bus.unmap(RAM + 0x1000).unwrap();
    assert!(bus.generation() > loaded);
}

#[test]
fn only_one_interrupt_aggregator() {
    let mut bus = Bus::new(4);
    assert_eq!(bus.add_mmio_device(0x0C00_0000, Box::new(Plic::new())), Ok(0));
    assert_eq!(
        bus.add_mmio_device(0x3000_0000, Box::new(Plic::new())),
        Err(MapError::DuplicateAggregator)
    );
    assert_eq!(bus.device_count(), 1);
    assert!(bus.plic_mut().is_some());
}

#[test]
fn ram_page_can_be_replaced_by_a_device() {
    let mut bus = bus_with_ram(2);
    let mut mip = 0;
    bus.write(RAM + 0x1004, MemWidth::Word, 0x5A5A, &mut mip).unwrap();
    assert_eq!(bus.read(RAM + 0x1004, MemWidth::Word, AccessType::Read, &mut mip), Ok(0x5A5A));

    bus.unmap(RAM + 0x1000).unwrap();
    assert_eq!(bus.pages_in_use(), 1);

    let (device, log) = ScratchDevice::new(1);
    assert_eq!(bus.add_mmio_device(RAM + 0x1000, Box::new(device)), Ok(0));

    // The old page contents are gone: reads reach the device.
    assert_eq!(bus.read(RAM + 0x1004, MemWidth::Word, AccessType::Read, &mut mip), Ok(0));
    bus.write(RAM + 0x1004, MemWidth::Word, 9, &mut mip).unwrap();
    assert_eq!(log.accesses(), vec![Access::Read(4), Access::Write(4, 9)]);
    assert_eq!(bus.unmap(RAM + 0x3000), Err(MapError::NotMapped(RAM + 0x3000)));
}

// ══════════════════════════════════════════════════════════
// 2. Routing
// ══════════════════════════════════════════════════════════

#[test]
fn memory_accesses_are_little_endian() {
    let mut bus = bus_with_ram(1);
    let mut mip = 0;
    bus.write(RAM + 8, MemWidth::Double, 0x1122_3344_5566_7788, &mut mip).unwrap();

    assert_eq!(bus.read(RAM + 8, MemWidth::Byte, AccessType::Read, &mut mip), Ok(0x88));
    assert_eq!(bus.read(RAM + 14, MemWidth::Half, AccessType::Read, &mut mip), Ok(0x1122));
    assert_eq!(bus.read(RAM + 12, MemWidth::Word, AccessType::Read, &mut mip), Ok(0x1122_3344));
}

#[test]
fn device_sees_offsets_relative_to_its_base() {
    let mut bus = Bus::new(4);
    let (device, log) = ScratchDevice::new(2);
    let _ = bus.add_mmio_device(DEV, Box::new(device)).unwrap();
    let mut mip = 0;

    bus.write(DEV + 0x1008, MemWidth::Word, 0xABCD, &mut mip).unwrap();
    assert_eq!(bus.read(DEV + 0x1008, MemWidth::Word, AccessType::Read, &mut mip), Ok(0xABCD));
    assert_eq!(log.accesses(), vec![Access::Write(0x1008, 0xABCD), Access::Read(0x1008)]);
}

#[test]
fn unsupported_device_width_faults_with_the_absolute_address() {
    let mut bus = Bus::new(4);
    let (device, _log) = ScratchDevice::new(1);
    let _ = bus.add_mmio_device(DEV, Box::new(device)).unwrap();
    let mut mip = 0;

    assert_eq!(
        bus.read(DEV + 2, MemWidth::Half, AccessType::Read, &mut mip),
        Err(Trap::LoadAccessFault(DEV + 2))
    );
    assert_eq!(bus.write(DEV, MemWidth::Byte, 0, &mut mip), Err(Trap::StoreAccessFault(DEV)));
}

#[test]
fn unmapped_access_faults_by_access_type() {
    let mut bus = bus_with_ram(1);
    let mut mip = 0;
    let hole = 0x4000_0000;

    assert_eq!(
        bus.read(hole, MemWidth::Word, AccessType::Read, &mut mip),
        Err(Trap::LoadAccessFault(hole))
    );
    assert_eq!(
        bus.read(hole, MemWidth::Word, AccessType::Fetch, &mut mip),
        Err(Trap::InstructionAccessFault(hole))
    );
    assert_eq!(bus.write(hole, MemWidth::Word, 0, &mut mip), Err(Trap::StoreAccessFault(hole)));
}

#[test]
fn refused_fetch_from_a_device_is_an_instruction_access_fault() {
    let mut bus = Bus::new(4);
    let _ = bus.add_mmio_device(0x6000_0000, Box::new(SysCon::new())).unwrap();
    let mut mip = 0;

    assert_eq!(
        bus.read(0x6000_0004, MemWidth::Word, AccessType::Fetch, &mut mip),
        Err(Trap::InstructionAccessFault(0x6000_0004))
    );
    assert_eq!(
        bus.read(0x6000_0004, MemWidth::Word, AccessType::Read, &mut mip),
        Err(Trap::LoadAccessFault(0x6000_0004))
    );
}

#[test]
fn shadow_cache_counts_repeated_pages() {
    let mut bus = bus_with_ram(1);
    let mut mip = 0;
    for offset in [0, 8, 16] {
        let _ = bus.read(RAM + offset, MemWidth::Double, AccessType::Read, &mut mip).unwrap();
    }
    assert_eq!(bus.shadow_stats(), (2, 1));
}

// ══════════════════════════════════════════════════════════
// 3. Images and page tables
// ══════════════════════════════════════════════════════════

#[test]
fn load_bytes_spans_pages() {
    let mut bus = bus_with_ram(2);
    let mut mip = 0;
    bus.load_bytes(RAM + 0xFFE, &[1, 2, 3, 4]).unwrap();

    assert_eq!(bus.read(RAM + 0xFFE, MemWidth::Half, AccessType::Read, &mut mip), Ok(0x0201));
    assert_eq!(bus.read(RAM + 0x1000, MemWidth::Half, AccessType::Read, &mut mip), Ok(0x0403));
}

#[test]
fn load_bytes_stops_at_the_first_unbacked_page() {
    let mut bus = bus_with_ram(1);
    let result = bus.load_bytes(RAM + 0xFFC, &[0; 8]);
    assert!(matches!(result, Err(LoadError::Unmapped(addr)) if addr == RAM + 0x1000));

    let (device, _log) = ScratchDevice::new(1);
    let _ = bus.add_mmio_device(DEV, Box::new(device)).unwrap();
    assert!(matches!(bus.load_bytes(DEV, &[0]), Err(LoadError::Unmapped(addr)) if addr == DEV));
}

#[test]
fn page_tables_live_only_in_pool_memory() {
    let mut bus = bus_with_ram(1);
    let (device, log) = ScratchDevice::new(1);
    let _ = bus.add_mmio_device(DEV, Box::new(device)).unwrap();

    assert!(bus.write_pte(RAM + 0x10, 0xDEAD_BEEF));
    assert_eq!(bus.read_pte(RAM + 0x10), Some(0xDEAD_BEEF));

    assert_eq!(bus.read_pte(DEV), None);
    assert!(!bus.write_pte(DEV, 1));
    assert_eq!(bus.read_pte(0x4000_0000), None);
    assert_eq!(log.accesses(), Vec::new());
}

// ══════════════════════════════════════════════════════════
// 4. Updates and interrupts
// ══════════════════════════════════════════════════════════

#[test]
fn update_forwards_device_interrupts_to_the_aggregator() {
    let mut bus = Bus::new(4);
    let _ = bus.add_mmio_device(0x0C00_0000, Box::new(Plic::new())).unwrap();
    let (device, log) = ScratchDevice::new(1);
    let _ = bus.add_mmio_device(DEV, Box::new(device.raising(4))).unwrap();
    let mut mip = 0;

    bus.update_devices(&mut mip);
    assert_eq!(log.updates(), 1);
    assert_eq!(bus.plic_mut().map(|p| p.pending()), Some(1 << 4));
    assert_eq!(mip, 0);

    // Priority 1 and enable for context 0; the next pass delivers it.
    bus.write(0x0C00_0000 + 16, MemWidth::Word, 1, &mut mip).unwrap();
    bus.write(0x0C00_2000, MemWidth::Word, 1 << 4, &mut mip).unwrap();
    bus.update_devices(&mut mip);
    assert_eq!(mip, MIP_MEIP);
}

#[test]
fn interrupts_without_an_aggregator_are_dropped() {
    let mut bus = Bus::new(4);
    let (device, log) = ScratchDevice::new(1);
    let _ = bus.add_mmio_device(DEV, Box::new(device.raising(4))).unwrap();
    let mut mip = 0;

    bus.update_devices(&mut mip);
    bus.raise_irq(2);
    assert_eq!(log.updates(), 1);
    assert_eq!(mip, 0);
    assert!(bus.plic_mut().is_none());
}

// ══════════════════════════════════════════════════════════
// 5. Teardown
// ══════════════════════════════════════════════════════════

#[test]
fn free_releases_devices_and_memory() {
    let mut bus = bus_with_ram(3);
    let (device, log) = ScratchDevice::new(1);
    let _ = bus.add_mmio_device(DEV, Box::new(device)).unwrap();

    bus.free();
    assert!(log.freed());
    assert_eq!(bus.device_count(), 0);
    assert_eq!(bus.pages_in_use(), 0);
    assert_eq!(bus.resolve(RAM), None);
}

#[test]
fn dropping_the_system_frees_its_devices() {
    let (device, log) = ScratchDevice::new(1);
    {
        let mut system = System::new(4);
        let _ = system.bus.add_mmio_device(DEV, Box::new(device)).unwrap();
        assert!(!log.freed());
    }
    assert!(log.freed());
}
