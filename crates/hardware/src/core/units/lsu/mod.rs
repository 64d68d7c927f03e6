//! Load/Store Unit (LSU) helpers.
//!
//! - [`atomic`]: read-modify-write arithmetic for the A extension.
//! - [`unaligned`]: alignment checks and byte-wise splitting of misaligned accesses.

/// Atomic memory operation ALU (RISC-V A extension).
pub mod atomic;

/// Unaligned memory access handling.
pub mod unaligned;

use crate::isa::table::Op;

/// Width of a memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemWidth {
    /// 1 byte.
    Byte,
    /// 2 bytes.
    Half,
    /// 4 bytes.
    Word,
    /// 8 bytes.
    Double,
}

impl MemWidth {
    /// Access size in bytes.
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
            Self::Double => 8,
        }
    }

    /// Narrows a loaded value, sign- or zero-extending it to 64 bits.
    pub const fn extend(self, raw: u64, signed: bool) -> u64 {
        match (self, signed) {
            (Self::Byte, true) => raw as i8 as i64 as u64,
            (Self::Byte, false) => raw as u8 as u64,
            (Self::Half, true) => raw as i16 as i64 as u64,
            (Self::Half, false) => raw as u16 as u64,
            (Self::Word, true) => raw as i32 as i64 as u64,
            (Self::Word, false) => raw as u32 as u64,
            (Self::Double, _) => raw,
        }
    }
}

/// Width and signedness of a load instruction.
pub const fn load_kind(op: Op) -> Option<(MemWidth, bool)> {
    Some(match op {
        Op::Lb => (MemWidth::Byte, true),
        Op::Lh => (MemWidth::Half, true),
        Op::Lw => (MemWidth::Word, true),
        Op::Ld => (MemWidth::Double, true),
        Op::Lbu => (MemWidth::Byte, false),
        Op::Lhu => (MemWidth::Half, false),
        Op::Lwu => (MemWidth::Word, false),
        _ => return None,
    })
}

/// Width of a store instruction.
pub const fn store_width(op: Op) -> Option<MemWidth> {
    Some(match op {
        Op::Sb => MemWidth::Byte,
        Op::Sh => MemWidth::Half,
        Op::Sw => MemWidth::Word,
        Op::Sd => MemWidth::Double,
        _ => return None,
    })
}
