//! ALU arithmetic operations.
//!
//! Division never traps: dividing by zero yields all ones (quotient) or the
//! dividend (remainder), and `MIN / -1` yields `MIN` with remainder 0.

use super::AluOp;

/// Sign-extends the low 32 bits of a value.
#[inline(always)]
pub const fn sext32(v: u64) -> u64 {
    v as i32 as i64 as u64
}

/// Executes an arithmetic operation; `is32` selects the `W` form.
pub fn execute(op: AluOp, a: u64, b: u64, is32: bool) -> u64 {
    if is32 {
        return word(op, a as u32, b as u32);
    }
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Mul => a.wrapping_mul(b),
        AluOp::Mulh => ((a as i64 as i128 * b as i64 as i128) >> 64) as u64,
        AluOp::Mulhsu => ((a as i64 as i128 * b as u128 as i128) >> 64) as u64,
        AluOp::Mulhu => ((a as u128 * b as u128) >> 64) as u64,
        AluOp::Div => match b {
            0 => u64::MAX,
            _ => (a as i64).wrapping_div(b as i64) as u64,
        },
        AluOp::Divu => a.checked_div(b).unwrap_or(u64::MAX),
        AluOp::Rem => match b {
            0 => a,
            _ => (a as i64).wrapping_rem(b as i64) as u64,
        },
        AluOp::Remu => a.checked_rem(b).unwrap_or(a),
        _ => 0,
    }
}

fn word(op: AluOp, a: u32, b: u32) -> u64 {
    let (sa, sb) = (a as i32, b as i32);
    let r = match op {
        AluOp::Add => sa.wrapping_add(sb),
        AluOp::Sub => sa.wrapping_sub(sb),
        AluOp::Mul => sa.wrapping_mul(sb),
        AluOp::Div => match sb {
            0 => -1,
            _ => sa.wrapping_div(sb),
        },
        AluOp::Divu => a.checked_div(b).unwrap_or(u32::MAX) as i32,
        AluOp::Rem => match sb {
            0 => sa,
            _ => sa.wrapping_rem(sb),
        },
        AluOp::Remu => a.checked_rem(b).unwrap_or(a) as i32,
        // The high-half multiplies have no W form.
        _ => 0,
    };
    r as i64 as u64
}
