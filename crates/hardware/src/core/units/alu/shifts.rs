//! ALU shift operations.
//!
//! Shift amounts are masked to 6 bits for RV64 and 5 bits for the `W` forms;
//! `W` results are sign-extended from bit 31.

use super::AluOp;
use crate::isa::rv64i::{SHAMT_MASK_32, SHAMT_MASK_64};

/// Executes a shift operation.
pub fn execute(op: AluOp, a: u64, b: u64, is32: bool) -> u64 {
    if is32 {
        let sh = (b & SHAMT_MASK_32) as u32;
        let r = match op {
            AluOp::Sll => (a as u32) << sh,
            AluOp::Srl => (a as u32) >> sh,
            AluOp::Sra => ((a as i32) >> sh) as u32,
            _ => 0,
        };
        return r as i32 as i64 as u64;
    }
    let sh = (b & SHAMT_MASK_64) as u32;
    match op {
        AluOp::Sll => a << sh,
        AluOp::Srl => a >> sh,
        AluOp::Sra => ((a as i64) >> sh) as u64,
        _ => 0,
    }
}
