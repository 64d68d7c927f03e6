//! RV64A tests: load-reserved/store-conditional pairs and AMOs.

use pretty_assertions::assert_eq;

use rvemu_core::core::arch::csr;
use rvemu_core::core::units::lsu::MemWidth;

use crate::common::builder::instruction::{self as asm, A0, A1, T0, T1};
use crate::common::harness::{RAM_BASE, ROM_BASE, TestContext};

const HANDLER: u64 = ROM_BASE + 0x100;

fn atomic_context(program: &[u32], initial: u64) -> TestContext {
    let mut tc = TestContext::new().load_program(program);
    tc.set_trap_handler(HANDLER);
    tc.write_phys(RAM_BASE, MemWidth::Double, initial);
    tc.set_reg(A0 as usize, RAM_BASE);
    tc
}

#[test]
fn lr_sc_pair_succeeds() {
    let mut tc = atomic_context(
        &[asm::lr_d(T0, A0), asm::addi(T0, T0, 1), asm::sc_d(T1, A0, T0)],
        5,
    );
    tc.set_reg(T1 as usize, 0xFF);
    tc.run(3).unwrap();

    assert_eq!(tc.reg(T1 as usize), 0);
    assert_eq!(tc.read_phys(RAM_BASE, MemWidth::Double), 6);
    assert_eq!(tc.cpu.load_reservation, None);
}

#[test]
fn sc_without_reservation_fails() {
    let mut tc = atomic_context(&[asm::sc_d(T1, A0, A1)], 5);
    tc.set_reg(A1 as usize, 9);
    tc.step().unwrap();

    assert_eq!(tc.reg(T1 as usize), 1);
    assert_eq!(tc.read_phys(RAM_BASE, MemWidth::Double), 5);
}

#[test]
fn sc_to_another_address_fails_and_drops_the_reservation() {
    let mut tc = atomic_context(
        &[asm::lr_d(T0, A0), asm::addi(A0, A0, 8), asm::sc_d(T1, A0, A1)],
        5,
    );
    tc.set_reg(A1 as usize, 9);
    tc.run(3).unwrap();

    assert_eq!(tc.reg(T1 as usize), 1);
    assert_eq!(tc.read_phys(RAM_BASE + 8, MemWidth::Double), 0);
    assert_eq!(tc.cpu.load_reservation, None);
}

#[test]
fn trap_between_lr_and_sc_drops_the_reservation() {
    let mut tc = atomic_context(&[asm::lr_d(T0, A0), asm::ecall()], 5);
    tc.run(2).unwrap();

    assert_eq!(tc.cpu.pc, HANDLER);
    assert_eq!(tc.cpu.load_reservation, None);
}

#[test]
fn lr_w_sign_extends() {
    let mut tc = atomic_context(&[asm::lr_w(T0, A0)], 0xFFFF_FFFF);
    tc.step().unwrap();

    assert_eq!(tc.reg(T0 as usize), u64::MAX);
    assert_eq!(tc.cpu.load_reservation, Some(RAM_BASE));
}

#[test]
fn amoadd_w_returns_the_sign_extended_old_value() {
    let mut tc = atomic_context(&[asm::amoadd_w(T0, A0, A1)], 0xFFFF_FFFF);
    tc.set_reg(A1 as usize, 2);
    tc.step().unwrap();

    assert_eq!(tc.reg(T0 as usize), u64::MAX);
    assert_eq!(tc.read_phys(RAM_BASE, MemWidth::Word), 1);
}

#[test]
fn amomaxu_d_keeps_the_larger_unsigned_value() {
    let mut tc = atomic_context(&[asm::amomaxu_d(T0, A0, A1)], 7);
    tc.set_reg(A1 as usize, u64::MAX);
    tc.step().unwrap();

    assert_eq!(tc.reg(T0 as usize), 7);
    assert_eq!(tc.read_phys(RAM_BASE, MemWidth::Double), u64::MAX);
}

#[test]
fn amoswap_d_exchanges() {
    let mut tc = atomic_context(&[asm::amoswap_d(T0, A0, A1)], 0x1111);
    tc.set_reg(A1 as usize, 0x2222);
    tc.step().unwrap();

    assert_eq!(tc.reg(T0 as usize), 0x1111);
    assert_eq!(tc.read_phys(RAM_BASE, MemWidth::Double), 0x2222);
}

#[test]
fn misaligned_amo_is_a_store_misalignment() {
    let mut tc = atomic_context(&[asm::amoswap_d(T0, A0, A1)], 0);
    tc.set_reg(A0 as usize, RAM_BASE + 4);
    tc.step().unwrap();

    assert_eq!(tc.csr(csr::MCAUSE), 6);
    assert_eq!(tc.csr(csr::MTVAL), RAM_BASE + 4);
}

#[test]
fn misaligned_lr_is_a_load_misalignment() {
    let mut tc = atomic_context(&[asm::lr_d(T0, A0)], 0);
    tc.set_reg(A0 as usize, RAM_BASE + 1);
    tc.step().unwrap();

    assert_eq!(tc.csr(csr::MCAUSE), 4);
}

#[test]
fn amo_on_unmapped_memory_is_a_store_access_fault() {
    let mut tc = atomic_context(&[asm::amoadd_w(T0, A0, A1)], 0);
    tc.set_reg(A0 as usize, 0x4000_0000);
    tc.step().unwrap();

    assert_eq!(tc.csr(csr::MCAUSE), 7);
}
