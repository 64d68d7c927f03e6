//! Arithmetic Logic Unit (ALU).
//!
//! Pure integer arithmetic for RV64I and RV64M. Register-register and
//! register-immediate forms share one operation set; the `W` forms operate on
//! the low 32 bits and sign-extend the result.
//!
//! Operations are organized into submodules by category:
//! - [`arithmetic`]: add, sub and the M-extension multiply/divide family
//! - [`logic`]:      or, and, xor, slt, sltu
//! - [`shifts`]:     sll, srl, sra

/// Integer arithmetic operations (add, subtract, multiply, divide).
pub mod arithmetic;

/// Bitwise logical and comparison operations.
pub mod logic;

/// Shift operations.
pub mod shifts;

use crate::isa::table::Op;

/// Integer ALU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
}

impl AluOp {
    /// Maps an instruction to its ALU operation and word-size flag.
    ///
    /// # Returns
    ///
    /// `Some((op, is32))` for register-register and register-immediate arithmetic,
    /// `None` for every other instruction.
    pub const fn from_op(op: Op) -> Option<(AluOp, bool)> {
        Some(match op {
            Op::Add | Op::Addi => (AluOp::Add, false),
            Op::Sub => (AluOp::Sub, false),
            Op::Sll | Op::Slli => (AluOp::Sll, false),
            Op::Slt | Op::Slti => (AluOp::Slt, false),
            Op::Sltu | Op::Sltiu => (AluOp::Sltu, false),
            Op::Xor | Op::Xori => (AluOp::Xor, false),
            Op::Srl | Op::Srli => (AluOp::Srl, false),
            Op::Sra | Op::Srai => (AluOp::Sra, false),
            Op::Or | Op::Ori => (AluOp::Or, false),
            Op::And | Op::Andi => (AluOp::And, false),
            Op::Addw | Op::Addiw => (AluOp::Add, true),
            Op::Subw => (AluOp::Sub, true),
            Op::Sllw | Op::Slliw => (AluOp::Sll, true),
            Op::Srlw | Op::Srliw => (AluOp::Srl, true),
            Op::Sraw | Op::Sraiw => (AluOp::Sra, true),
            Op::Mul => (AluOp::Mul, false),
            Op::Mulh => (AluOp::Mulh, false),
            Op::Mulhsu => (AluOp::Mulhsu, false),
            Op::Mulhu => (AluOp::Mulhu, false),
            Op::Div => (AluOp::Div, false),
            Op::Divu => (AluOp::Divu, false),
            Op::Rem => (AluOp::Rem, false),
            Op::Remu => (AluOp::Remu, false),
            Op::Mulw => (AluOp::Mul, true),
            Op::Divw => (AluOp::Div, true),
            Op::Divuw => (AluOp::Divu, true),
            Op::Remw => (AluOp::Rem, true),
            Op::Remuw => (AluOp::Remu, true),
            _ => return None,
        })
    }
}

/// Arithmetic Logic Unit.
pub struct Alu;

impl Alu {
    /// Executes an integer ALU operation.
    ///
    /// # Arguments
    ///
    /// * `op`   - The operation.
    /// * `a`    - First operand.
    /// * `b`    - Second operand (also the shift amount).
    /// * `is32` - Perform the 32-bit `W` variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use rvemu_core::core::units::alu::{Alu, AluOp};
    ///
    /// assert_eq!(Alu::execute(AluOp::Add, 42, 8, false), 50);
    /// assert_eq!(Alu::execute(AluOp::Add, 0xFFFF_FFFF, 1, true), 0);
    /// assert_eq!(Alu::execute(AluOp::Divu, 100, 0, false), u64::MAX);
    /// ```
    pub fn execute(op: AluOp, a: u64, b: u64, is32: bool) -> u64 {
        match op {
            AluOp::Add
            | AluOp::Sub
            | AluOp::Mul
            | AluOp::Mulh
            | AluOp::Mulhsu
            | AluOp::Mulhu
            | AluOp::Div
            | AluOp::Divu
            | AluOp::Rem
            | AluOp::Remu => arithmetic::execute(op, a, b, is32),
            AluOp::Or | AluOp::And | AluOp::Xor | AluOp::Slt | AluOp::Sltu => {
                logic::execute(op, a, b)
            }
            AluOp::Sll | AluOp::Srl | AluOp::Sra => shifts::execute(op, a, b, is32),
        }
    }
}
