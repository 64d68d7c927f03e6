//! Instruction execution tests.
//!
//! Each test loads a short program at the code base of a Machine-mode hart with no
//! translation, steps it, and checks registers, memory and the PC.

use pretty_assertions::assert_eq;
use rstest::rstest;

use rvemu_core::core::arch::csr;
use rvemu_core::core::units::lsu::MemWidth;

use crate::common::builder::instruction::{self as asm, A0, A1, RA, T0, T1, T2, ZERO};
use crate::common::harness::{RAM_BASE, ROM_BASE, TestContext};

// ══════════════════════════════════════════════════════════
// 1. Integer basics
// ══════════════════════════════════════════════════════════

#[test]
fn addi_on_a_fresh_machine() {
    let mut tc = TestContext::new().load_program(&[asm::addi(RA, ZERO, 5)]);
    tc.step().unwrap();

    assert_eq!(tc.reg(RA as usize), 5);
    assert_eq!(tc.cpu.pc, TestContext::pc_of(1));
    assert_eq!(tc.csr(csr::MINSTRET), 1);
    assert_eq!(tc.csr(csr::MCYCLE), 1);
}

#[test]
fn writes_to_x0_are_discarded() {
    let mut tc = TestContext::new()
        .load_program(&[asm::addi(ZERO, ZERO, 7), asm::add(RA, ZERO, ZERO)]);
    tc.run(2).unwrap();

    assert_eq!(tc.reg(0), 0);
    assert_eq!(tc.reg(RA as usize), 0);
}

#[test]
fn upper_immediates() {
    let mut tc = TestContext::new().load_program(&[
        asm::lui(T0, 0x12345),
        asm::auipc(T1, 1),
        asm::lui(T2, 0x80000),
    ]);
    tc.run(3).unwrap();

    assert_eq!(tc.reg(T0 as usize), 0x1234_5000);
    assert_eq!(tc.reg(T1 as usize), TestContext::pc_of(1) + 0x1000);
    assert_eq!(tc.reg(T2 as usize), 0xFFFF_FFFF_8000_0000);
}

#[test]
fn word_operations_sign_extend() {
    let mut tc = TestContext::new().load_program(&[
        asm::addiw(T0, A0, 1),
        asm::addw(T1, A0, A0),
    ]);
    tc.set_reg(A0 as usize, 0x7FFF_FFFF);
    tc.run(2).unwrap();

    assert_eq!(tc.reg(T0 as usize), 0xFFFF_FFFF_8000_0000);
    assert_eq!(tc.reg(T1 as usize), 0xFFFF_FFFF_FFFF_FFFE);
}

#[test]
fn shifts_by_immediate() {
    let mut tc = TestContext::new().load_program(&[
        asm::srai(T0, A0, 4),
        asm::srli(T1, A0, 4),
        asm::slli(T2, A0, 1),
    ]);
    tc.set_reg(A0 as usize, 0x8000_0000_0000_0010);
    tc.run(3).unwrap();

    assert_eq!(tc.reg(T0 as usize), 0xF800_0000_0000_0001);
    assert_eq!(tc.reg(T1 as usize), 0x0800_0000_0000_0001);
    assert_eq!(tc.reg(T2 as usize), 0x20);
}

#[test]
fn sltu_compares_unsigned() {
    let mut tc = TestContext::new().load_program(&[asm::sltu(T0, A0, A1), asm::sltu(T1, A1, A0)]);
    tc.set_reg(A0 as usize, 1);
    tc.set_reg(A1 as usize, u64::MAX);
    tc.run(2).unwrap();

    assert_eq!(tc.reg(T0 as usize), 1);
    assert_eq!(tc.reg(T1 as usize), 0);
}

// ══════════════════════════════════════════════════════════
// 2. Control flow
// ══════════════════════════════════════════════════════════

#[test]
fn jal_and_jalr_link_and_clear_bit_zero() {
    let mut tc = TestContext::new().load_program(&[
        asm::jal(RA, 8),
        asm::nop(),
        asm::jalr(T0, RA, 1),
    ]);
    tc.step().unwrap();
    assert_eq!(tc.cpu.pc, TestContext::pc_of(2));
    assert_eq!(tc.reg(RA as usize), TestContext::pc_of(1));

    tc.step().unwrap();
    assert_eq!(tc.cpu.pc, TestContext::pc_of(1));
    assert_eq!(tc.reg(T0 as usize), TestContext::pc_of(3));
}

#[rstest]
#[case::beq_equal(asm::beq(A0, A1, 8), 3, 3, true)]
#[case::bne_equal(asm::bne(A0, A1, 8), 3, 3, false)]
#[case::blt_signed(asm::blt(A0, A1, 8), u64::MAX, 1, true)]
#[case::bltu_unsigned(asm::bltu(A0, A1, 8), u64::MAX, 1, false)]
fn conditional_branches(#[case] branch: u32, #[case] a: u64, #[case] b: u64, #[case] taken: bool) {
    let mut tc = TestContext::new().load_program(&[branch]);
    tc.set_reg(A0 as usize, a);
    tc.set_reg(A1 as usize, b);
    tc.step().unwrap();

    let expected = if taken { TestContext::pc_of(2) } else { TestContext::pc_of(1) };
    assert_eq!(tc.cpu.pc, expected);
}

#[test]
fn backward_branch_loops() {
    // t0 counts down from 3 to 0.
    let mut tc = TestContext::new().load_program(&[
        asm::addi(T0, ZERO, 3),
        asm::addi(T0, T0, -1),
        asm::bne(T0, ZERO, -4),
        asm::addi(T1, ZERO, 1),
    ]);
    tc.run(1 + 3 * 2 + 1).unwrap();

    assert_eq!(tc.reg(T0 as usize), 0);
    assert_eq!(tc.reg(T1 as usize), 1);
    assert_eq!(tc.cpu.pc, TestContext::pc_of(4));
}

// ══════════════════════════════════════════════════════════
// 3. Loads and stores
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::lb(asm::lb(T0, A0, 0), 0xFFFF_FFFF_FFFF_FF80)]
#[case::lbu(asm::lbu(T0, A0, 0), 0x80)]
#[case::lw(asm::lw(T0, A0, 0), 0xFFFF_FFFF_8000_0080)]
#[case::lwu(asm::lwu(T0, A0, 0), 0x8000_0080)]
#[case::ld(asm::ld(T0, A0, 0), 0x1234_5678_8000_0080)]
fn loads_extend_by_width(#[case] load: u32, #[case] expected: u64) {
    let mut tc = TestContext::new().load_program(&[load]);
    tc.write_phys(RAM_BASE, MemWidth::Double, 0x1234_5678_8000_0080);
    tc.set_reg(A0 as usize, RAM_BASE);
    tc.step().unwrap();

    assert_eq!(tc.reg(T0 as usize), expected);
}

#[test]
fn stores_write_their_width_only() {
    let mut tc = TestContext::new().load_program(&[
        asm::sd(A0, A1, 0),
        asm::sw(A0, ZERO, 0),
        asm::sb(A0, A1, 8),
    ]);
    tc.set_reg(A0 as usize, RAM_BASE);
    tc.set_reg(A1 as usize, 0x1122_3344_5566_7788);
    tc.run(3).unwrap();

    assert_eq!(tc.read_phys(RAM_BASE, MemWidth::Double), 0x1122_3344_0000_0000);
    assert_eq!(tc.read_phys(RAM_BASE + 8, MemWidth::Double), 0x88);
}

#[test]
fn store_over_cached_instruction_is_seen_by_the_next_fetch() {
    // pc_of(2) runs once, is overwritten with `addi t0, zero, 2`, and runs again.
    let mut tc = TestContext::new().load_program(&[
        asm::jal(ZERO, 8),
        asm::nop(),
        asm::addi(T0, ZERO, 1),
        asm::sw(A0, T1, 0),
        asm::jal(ZERO, -8),
    ]);
    tc.set_reg(A0 as usize, TestContext::pc_of(2));
    tc.set_reg(T1 as usize, u64::from(asm::addi(T0, ZERO, 2)));

    tc.run(3).unwrap();
    assert_eq!(tc.reg(T0 as usize), 1);

    tc.run(2).unwrap();
    assert_eq!(tc.reg(T0 as usize), 2);
    assert_eq!(tc.cpu.pc, TestContext::pc_of(3));
}

#[test]
fn repeated_fetches_hit_the_decode_cache() {
    let mut tc = TestContext::new().load_program(&[
        asm::addi(T0, T0, 1),
        asm::jal(ZERO, -4),
    ]);
    tc.run(10).unwrap();

    assert_eq!(tc.reg(T0 as usize), 5);
    assert_eq!(tc.cpu.decode_cache.misses, 2);
    assert_eq!(tc.cpu.decode_cache.hits, 8);
}

#[test]
fn remapped_code_page_is_fetched_fresh() {
    let mut tc = TestContext::new().load_program(&[asm::addi(RA, ZERO, 5)]);
    tc.step().unwrap();
    assert_eq!(tc.reg(RA as usize), 5);

    tc.cpu.bus.bus.unmap(ROM_BASE).unwrap();
    tc.cpu.bus.bus.map_memory(ROM_BASE, 0x1000).unwrap();
    tc.write_words(ROM_BASE, &[asm::addi(RA, ZERO, 7)]);
    tc.cpu.pc = ROM_BASE;
    tc.step().unwrap();

    assert_eq!(tc.reg(RA as usize), 7);
}

#[test]
fn host_reload_of_code_is_fetched_fresh() {
    let mut tc = TestContext::new().load_program(&[asm::addi(RA, ZERO, 5)]);
    tc.step().unwrap();

    tc.write_words(ROM_BASE, &[asm::addi(RA, ZERO, 9)]);
    tc.cpu.pc = ROM_BASE;
    tc.step().unwrap();

    assert_eq!(tc.reg(RA as usize), 9);
    assert_eq!(tc.cpu.decode_cache.hits, 0);
}

// ══════════════════════════════════════════════════════════
// 4. RV64M
// ══════════════════════════════════════════════════════════

const MUL: u32 = 0;
const MULHU: u32 = 3;
const DIV: u32 = 4;
const DIVU: u32 = 5;
const REM: u32 = 6;
const REMU: u32 = 7;

#[rstest]
#[case::mul(MUL, 3, (-2i64) as u64, (-6i64) as u64)]
#[case::mulhu(MULHU, u64::MAX, u64::MAX, u64::MAX - 1)]
#[case::div_by_zero(DIV, 7, 0, u64::MAX)]
#[case::divu_by_zero(DIVU, 7, 0, u64::MAX)]
#[case::rem_by_zero(REM, 7, 0, 7)]
#[case::remu_by_zero(REMU, 7, 0, 7)]
#[case::div_overflow(DIV, i64::MIN as u64, u64::MAX, i64::MIN as u64)]
#[case::rem_overflow(REM, i64::MIN as u64, u64::MAX, 0)]
#[case::div_signed(DIV, (-7i64) as u64, 2, (-3i64) as u64)]
#[case::rem_signed(REM, (-7i64) as u64, 2, (-1i64) as u64)]
fn multiply_divide(#[case] funct3: u32, #[case] a: u64, #[case] b: u64, #[case] expected: u64) {
    let mut tc = TestContext::new().load_program(&[asm::m_op(funct3, T0, A0, A1)]);
    tc.set_reg(A0 as usize, a);
    tc.set_reg(A1 as usize, b);
    tc.step().unwrap();

    assert_eq!(tc.reg(T0 as usize), expected);
}

#[rstest]
#[case::mulw(MUL, 0x7FFF_FFFF, 2, 0xFFFF_FFFF_FFFF_FFFE)]
#[case::divw_overflow(DIV, 0x8000_0000, u64::MAX, 0xFFFF_FFFF_8000_0000)]
#[case::divw_by_zero(DIV, 5, 0, u64::MAX)]
#[case::remuw_by_zero(REMU, 0xFFFF_FFFF_0000_0005, 0, 5)]
fn multiply_divide_word(
    #[case] funct3: u32,
    #[case] a: u64,
    #[case] b: u64,
    #[case] expected: u64,
) {
    let mut tc = TestContext::new().load_program(&[asm::m_op_w(funct3, T0, A0, A1)]);
    tc.set_reg(A0 as usize, a);
    tc.set_reg(A1 as usize, b);
    tc.step().unwrap();

    assert_eq!(tc.reg(T0 as usize), expected);
}

#[test]
fn programs_start_at_the_code_base() {
    let tc = TestContext::new();
    assert_eq!(tc.cpu.pc, ROM_BASE);
}
