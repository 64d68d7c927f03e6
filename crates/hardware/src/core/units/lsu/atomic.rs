//! Atomic memory operation ALU.
//!
//! Given the current memory value and the register source, computes the value an AMO
//! writes back. Word-sized results are sign-extended from bit 31.

use super::MemWidth;
use crate::isa::table::Op;

/// Read-modify-write operation of an AMO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AmoOp {
    Swap,
    Add,
    Xor,
    And,
    Or,
    Min,
    Max,
    Minu,
    Maxu,
}

impl AmoOp {
    /// Maps an AMO instruction to its operation and width. LR and SC are not AMOs here.
    pub const fn from_op(op: Op) -> Option<(AmoOp, MemWidth)> {
        use MemWidth::{Double, Word};
        Some(match op {
            Op::AmoswapW => (AmoOp::Swap, Word),
            Op::AmoaddW => (AmoOp::Add, Word),
            Op::AmoxorW => (AmoOp::Xor, Word),
            Op::AmoandW => (AmoOp::And, Word),
            Op::AmoorW => (AmoOp::Or, Word),
            Op::AmominW => (AmoOp::Min, Word),
            Op::AmomaxW => (AmoOp::Max, Word),
            Op::AmominuW => (AmoOp::Minu, Word),
            Op::AmomaxuW => (AmoOp::Maxu, Word),
            Op::AmoswapD => (AmoOp::Swap, Double),
            Op::AmoaddD => (AmoOp::Add, Double),
            Op::AmoxorD => (AmoOp::Xor, Double),
            Op::AmoandD => (AmoOp::And, Double),
            Op::AmoorD => (AmoOp::Or, Double),
            Op::AmominD => (AmoOp::Min, Double),
            Op::AmomaxD => (AmoOp::Max, Double),
            Op::AmominuD => (AmoOp::Minu, Double),
            Op::AmomaxuD => (AmoOp::Maxu, Double),
            _ => return None,
        })
    }
}

/// Computes the value written back by an AMO.
///
/// # Arguments
///
/// * `op`      - The atomic operation.
/// * `mem_val` - Value currently in memory (already sign-extended for words).
/// * `reg_val` - Value of `rs2`.
/// * `width`   - Word or Double.
pub fn atomic_alu(op: AmoOp, mem_val: u64, reg_val: u64, width: MemWidth) -> u64 {
    if width == MemWidth::Word {
        let (a, b) = (mem_val as i32, reg_val as i32);
        let r = match op {
            AmoOp::Swap => b,
            AmoOp::Add => a.wrapping_add(b),
            AmoOp::Xor => a ^ b,
            AmoOp::And => a & b,
            AmoOp::Or => a | b,
            AmoOp::Min => a.min(b),
            AmoOp::Max => a.max(b),
            AmoOp::Minu => (a as u32).min(b as u32) as i32,
            AmoOp::Maxu => (a as u32).max(b as u32) as i32,
        };
        return r as i64 as u64;
    }
    let (a, b) = (mem_val as i64, reg_val as i64);
    match op {
        AmoOp::Swap => reg_val,
        AmoOp::Add => mem_val.wrapping_add(reg_val),
        AmoOp::Xor => mem_val ^ reg_val,
        AmoOp::And => mem_val & reg_val,
        AmoOp::Or => mem_val | reg_val,
        AmoOp::Min => a.min(b) as u64,
        AmoOp::Max => a.max(b) as u64,
        AmoOp::Minu => mem_val.min(reg_val),
        AmoOp::Maxu => mem_val.max(reg_val),
    }
}
