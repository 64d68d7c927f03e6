//! ALU logical and comparison operations.

use super::AluOp;

/// Executes a logical or set-less-than operation.
pub fn execute(op: AluOp, a: u64, b: u64) -> u64 {
    match op {
        AluOp::Or => a | b,
        AluOp::And => a & b,
        AluOp::Xor => a ^ b,
        AluOp::Slt => ((a as i64) < (b as i64)) as u64,
        AluOp::Sltu => (a < b) as u64,
        _ => 0,
    }
}
