//! Disassembler output format.

use pretty_assertions::assert_eq;
use rstest::rstest;

use rvemu_core::isa::disasm::{disassemble, xreg};

use crate::common::builder::instruction as asm;

#[rstest]
#[case(asm::addi(10, 0, 10), "addi a0, zero, 10")]
#[case(asm::add(5, 6, 7), "add t0, t1, t2")]
#[case(asm::ld(1, 2, -8), "ld ra, -8(sp)")]
#[case(asm::sd(2, 1, 16), "sd ra, 16(sp)")]
#[case(asm::beq(10, 11, -4), "beq a0, a1, -4")]
#[case(asm::jal(1, 2048), "jal ra, 2048")]
#[case(asm::lui(5, 0x12345), "lui t0, 0x12345")]
#[case(asm::slli(10, 10, 32), "slli a0, a0, 32")]
#[case(asm::lr_d(10, 11), "lr.d a0, (a1)")]
#[case(asm::amoswap_d(10, 11, 12), "amoswap.d a0, a2, (a1)")]
#[case(asm::csrrw(0, 0x305, 5), "csrrw zero, 0x305, t0")]
#[case(asm::csrrsi(10, 0x300, 8), "csrrsi a0, 0x300, 8")]
#[case(asm::ecall(), "ecall")]
#[case(asm::mret(), "mret")]
#[case(asm::sfence_vma(10, 11), "sfence.vma a0, a1")]
fn formats_operands(#[case] word: u32, #[case] expected: &str) {
    assert_eq!(disassemble(word), expected);
}

#[test]
fn undecodable_words_print_unknown() {
    assert_eq!(disassemble(0xFFFF_FFFF), "unknown");
    assert_eq!(disassemble(0), "unknown");
}

#[test]
fn register_names_follow_the_abi() {
    assert_eq!(xreg(0), "zero");
    assert_eq!(xreg(2), "sp");
    assert_eq!(xreg(31), "t6");
    assert_eq!(xreg(32), "x??");
}
