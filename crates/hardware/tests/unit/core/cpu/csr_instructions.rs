//! Zicsr instruction tests.

use pretty_assertions::assert_eq;

use rvemu_core::core::arch::csr;
use rvemu_core::core::arch::mode::PrivilegeMode;

use crate::common::builder::instruction::{self as asm, A0, A1, T0, ZERO};
use crate::common::harness::{ROM_BASE, TestContext};

const HANDLER: u64 = ROM_BASE + 0x100;

#[test]
fn csrrw_swaps_register_and_csr() {
    let mut tc = TestContext::new().load_program(&[
        asm::csrrw(A0, csr::MSCRATCH, T0),
        asm::csrrs(A1, csr::MSCRATCH, ZERO),
    ]);
    tc.cpu.csr.set(csr::MSCRATCH, 0x55);
    tc.set_reg(T0 as usize, 0x1234);
    tc.run(2).unwrap();

    assert_eq!(tc.reg(A0 as usize), 0x55);
    assert_eq!(tc.reg(A1 as usize), 0x1234);
}

#[test]
fn csrrs_and_csrrc_set_and_clear_bits() {
    let mut tc = TestContext::new().load_program(&[
        asm::csrrs(ZERO, csr::MIE, T0),
        asm::csrrc(A0, csr::MIE, A1),
    ]);
    tc.set_reg(T0 as usize, csr::MIP_MTIP | csr::MIP_MSIP);
    tc.set_reg(A1 as usize, csr::MIP_MTIP);
    tc.run(2).unwrap();

    assert_eq!(tc.reg(A0 as usize), csr::MIP_MTIP | csr::MIP_MSIP);
    assert_eq!(tc.csr(csr::MIE), csr::MIP_MSIP);
}

#[test]
fn immediate_forms_use_the_rs1_field_as_value() {
    let mut tc = TestContext::new().load_program(&[
        asm::csrrwi(ZERO, csr::MSCRATCH, 31),
        asm::csrrsi(A0, csr::MSTATUS, 8),
    ]);
    tc.run(2).unwrap();

    assert_eq!(tc.csr(csr::MSCRATCH), 31);
    assert_ne!(tc.cpu.csr.mstatus() & csr::MSTATUS_MIE, 0);
}

#[test]
fn csrrs_with_x0_reads_without_writing() {
    // A write to satp would flush the decode cache; a pure read must not.
    let mut tc = TestContext::new().load_program(&[
        asm::nop(),
        asm::csrrs(A0, csr::SATP, ZERO),
        asm::jal(ZERO, -8),
    ]);
    tc.run(4).unwrap();

    assert_eq!(tc.reg(A0 as usize), 0);
    assert_eq!(tc.cpu.decode_cache.misses, 3);
    assert_eq!(tc.cpu.decode_cache.hits, 1);
}

#[test]
fn satp_write_flushes_decoded_instructions() {
    let mut tc = TestContext::new().load_program(&[
        asm::nop(),
        asm::csrrw(ZERO, csr::SATP, ZERO),
        asm::jal(ZERO, -8),
    ]);
    tc.run(4).unwrap();

    assert_eq!(tc.cpu.decode_cache.misses, 4);
    assert_eq!(tc.cpu.decode_cache.hits, 0);
}

#[test]
fn csr_writes_apply_masks() {
    let mut tc = TestContext::new().load_program(&[
        asm::csrrw(ZERO, csr::MTVEC, T0),
        asm::csrrw(ZERO, csr::MEPC, A0),
        asm::csrrw(ZERO, csr::MISA, ZERO),
    ]);
    let misa = tc.cpu.csr_read(csr::MISA).unwrap();
    tc.set_reg(T0 as usize, HANDLER | 3);
    tc.set_reg(A0 as usize, 0x1003);
    tc.run(3).unwrap();

    assert_eq!(tc.csr(csr::MTVEC), HANDLER | 1);
    assert_eq!(tc.csr(csr::MEPC), 0x1000);
    assert_eq!(tc.cpu.csr_read(csr::MISA).unwrap(), misa);
}

#[test]
fn undeclared_csr_is_illegal() {
    let mut tc = TestContext::new().load_program(&[asm::csrrs(A0, 0x7C0, ZERO)]);
    tc.set_trap_handler(HANDLER);
    tc.step().unwrap();

    assert_eq!(tc.csr(csr::MCAUSE), 2);
    assert_eq!(tc.csr(csr::MEPC), ROM_BASE);
    assert_eq!(tc.cpu.pc, HANDLER);
}

#[test]
fn user_mode_cannot_read_mstatus() {
    let mut tc = TestContext::new().load_program(&[asm::csrrs(A0, csr::MSTATUS, ZERO)]);
    tc.set_trap_handler(HANDLER);
    tc.cpu.privilege = PrivilegeMode::User;
    tc.step().unwrap();

    assert_eq!(tc.csr(csr::MCAUSE), 2);
    assert_eq!(tc.csr(csr::MTVAL), 0);
    assert_eq!(tc.csr(csr::MEPC), ROM_BASE);
    assert_eq!(tc.cpu.pc, HANDLER);
    assert_eq!(tc.cpu.privilege, PrivilegeMode::Machine);
    assert_eq!(tc.cpu.csr.mstatus() & csr::MSTATUS_MPP, 0);
    assert_eq!(tc.reg(A0 as usize), 0);
}

#[test]
fn user_mode_reads_retired_instruction_count() {
    let mut tc = TestContext::new().load_program(&[
        asm::nop(),
        asm::nop(),
        asm::csrrs(A0, csr::INSTRET, ZERO),
    ]);
    tc.cpu.privilege = PrivilegeMode::User;
    tc.run(3).unwrap();

    assert_eq!(tc.reg(A0 as usize), 2);
    assert_eq!(tc.cpu.privilege, PrivilegeMode::User);
}
