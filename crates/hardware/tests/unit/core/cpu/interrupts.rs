//! Interrupt delivery tests.
//!
//! Pending bits are either set directly in `mip` or produced by the CLINT of a virt
//! machine whose devices update on every step.

use pretty_assertions::assert_eq;

use rvemu_core::common::constants::CAUSE_INTERRUPT_BIT;
use rvemu_core::core::arch::csr;
use rvemu_core::core::arch::mode::PrivilegeMode;

use crate::common::builder::instruction::{self as asm, T0, T1, ZERO};
use crate::common::harness::{ROM_BASE, TestContext};

const HANDLER: u64 = ROM_BASE + 0x100;
const CLINT_MTIMECMP: u64 = 0x2000_4000;
const CLINT_MSIP: u64 = 0x2000_0000;

fn armed(program: &[u32], enabled: u64) -> TestContext {
    let mut tc = TestContext::new().load_program(program);
    tc.set_trap_handler(HANDLER);
    tc.cpu.csr.set(csr::MIE, enabled);
    tc.cpu.csr.set_mstatus(csr::MSTATUS_MIE);
    tc
}

#[test]
fn pending_interrupt_is_taken_before_the_instruction() {
    let mut tc = armed(&[asm::addi(T0, ZERO, 1)], csr::MIP_MSIP);
    *tc.cpu.csr.mip_mut() |= csr::MIP_MSIP;
    tc.step().unwrap();

    assert_eq!(tc.csr(csr::MCAUSE), CAUSE_INTERRUPT_BIT | 3);
    assert_eq!(tc.csr(csr::MEPC), ROM_BASE);
    assert_eq!(tc.cpu.pc, HANDLER);
    assert_eq!(tc.reg(T0 as usize), 0);
    assert_eq!(tc.csr(csr::MINSTRET), 0);
    assert_eq!(tc.cpu.stats.interrupts, 1);
    assert_eq!(tc.cpu.csr.mstatus() & csr::MSTATUS_MIE, 0);
}

#[test]
fn machine_mode_respects_global_enable() {
    let mut tc = armed(&[asm::addi(T0, ZERO, 1)], csr::MIP_MSIP);
    tc.cpu.csr.set_mstatus(0);
    *tc.cpu.csr.mip_mut() |= csr::MIP_MSIP;
    tc.step().unwrap();

    assert_eq!(tc.reg(T0 as usize), 1);
    assert_eq!(tc.cpu.stats.interrupts, 0);
}

#[test]
fn user_mode_takes_interrupts_regardless_of_mie() {
    let mut tc = armed(&[asm::nop()], csr::MIP_MSIP);
    tc.cpu.csr.set_mstatus(0);
    tc.cpu.privilege = PrivilegeMode::User;
    *tc.cpu.csr.mip_mut() |= csr::MIP_MSIP;
    tc.step().unwrap();

    assert_eq!(tc.cpu.pc, HANDLER);
    assert_eq!(tc.cpu.privilege, PrivilegeMode::Machine);
}

#[test]
fn disabled_interrupts_stay_pending() {
    let mut tc = armed(&[asm::nop()], csr::MIP_MTIP);
    *tc.cpu.csr.mip_mut() |= csr::MIP_MSIP;
    tc.step().unwrap();

    assert_eq!(tc.cpu.pc, TestContext::pc_of(1));
    assert_eq!(tc.cpu.csr.mip() & csr::MIP_MSIP, csr::MIP_MSIP);
}

#[test]
fn lowest_pending_bit_wins() {
    let enabled = csr::MIP_MSIP | csr::MIP_MTIP | csr::MIP_MEIP;
    let mut tc = armed(&[asm::nop()], enabled);
    *tc.cpu.csr.mip_mut() |= csr::MIP_MEIP | csr::MIP_MTIP;
    tc.step().unwrap();

    assert_eq!(tc.csr(csr::MCAUSE), CAUSE_INTERRUPT_BIT | 7);
}

#[test]
fn clint_timer_interrupt_in_vectored_mode() {
    let mut tc = TestContext::virt().load_program(&[asm::sd(T0, ZERO, 0), asm::nop()]);
    tc.cpu.csr.set(csr::MTVEC, HANDLER | 1);
    tc.cpu.csr.set(csr::MIE, csr::MIP_MTIP);
    tc.cpu.csr.set_mstatus(csr::MSTATUS_MIE);
    tc.set_reg(T0 as usize, CLINT_MTIMECMP);

    tc.step().unwrap();
    assert_ne!(tc.cpu.csr.mip() & csr::MIP_MTIP, 0);
    assert_eq!(tc.cpu.pc, TestContext::pc_of(1));

    tc.step().unwrap();
    assert_eq!(tc.csr(csr::MCAUSE), CAUSE_INTERRUPT_BIT | 7);
    assert_eq!(tc.csr(csr::MEPC), TestContext::pc_of(1));
    assert_eq!(tc.cpu.pc, HANDLER + 4 * 7);
}

#[test]
fn vectored_mode_sends_exceptions_to_the_base() {
    let mut tc = TestContext::new().load_program(&[asm::ecall()]);
    tc.cpu.csr.set(csr::MTVEC, HANDLER | 1);
    tc.step().unwrap();

    assert_eq!(tc.cpu.pc, HANDLER);
}

#[test]
fn clint_software_interrupt() {
    let mut tc = TestContext::virt().load_program(&[asm::sw(T0, T1, 0), asm::nop()]);
    tc.cpu.csr.set(csr::MTVEC, HANDLER);
    tc.cpu.csr.set(csr::MIE, csr::MIP_MSIP);
    tc.cpu.csr.set_mstatus(csr::MSTATUS_MIE);
    tc.set_reg(T0 as usize, CLINT_MSIP);
    tc.set_reg(T1 as usize, 1);

    tc.run(2).unwrap();
    assert_eq!(tc.csr(csr::MCAUSE), CAUSE_INTERRUPT_BIT | 3);
    assert_eq!(tc.csr(csr::MEPC), TestContext::pc_of(1));
    assert_eq!(tc.cpu.pc, HANDLER);
}
