//! Instruction encoding and decoding utilities.
//!
//! Provides bit extraction functions for the 32-bit encodings, the six instruction shapes,
//! and the decoded record the executor consumes.

use crate::common::constants::{
    FUNCT3_SHIFT, FUNCT7_SHIFT, OPCODE_MASK, RD_SHIFT, REG_MASK, RS1_SHIFT, RS2_SHIFT,
};
use crate::isa::table::Op;

/// Bit mask for extracting the funct3 field (bits 12-14).
pub const FUNCT3_MASK: u32 = 0x7;
/// Bit mask for extracting the funct7 field (bits 25-31).
pub const FUNCT7_MASK: u32 = 0x7F;
/// Bit shift of the funct12 / CSR address field (bits 20-31).
pub const FUNCT12_SHIFT: u32 = 20;

/// Trait for extracting instruction fields from encoded instructions.
pub trait InstructionBits {
    /// Extracts the opcode field (bits 0-6).
    fn opcode(&self) -> u32;

    /// Extracts the destination register field (bits 7-11).
    ///
    /// Register 0 (x0) is hardwired to zero and writes to it are discarded.
    fn rd(&self) -> usize;

    /// Extracts the first source register field (bits 15-19).
    fn rs1(&self) -> usize;

    /// Extracts the second source register field (bits 20-24).
    fn rs2(&self) -> usize;

    /// Extracts the funct3 field (bits 12-14).
    fn funct3(&self) -> u32;

    /// Extracts the funct7 field (bits 25-31).
    fn funct7(&self) -> u32;

    /// Extracts the unsigned 12-bit field at bits 20-31.
    ///
    /// This is the CSR number for Zicsr instructions and the function selector for
    /// ECALL, EBREAK, MRET, SRET and WFI.
    fn funct12(&self) -> u32;
}

impl InstructionBits for u32 {
    #[inline(always)]
    fn opcode(&self) -> u32 {
        self & OPCODE_MASK
    }

    #[inline(always)]
    fn rd(&self) -> usize {
        ((self >> RD_SHIFT) & REG_MASK) as usize
    }

    #[inline(always)]
    fn rs1(&self) -> usize {
        ((self >> RS1_SHIFT) & REG_MASK) as usize
    }

    #[inline(always)]
    fn rs2(&self) -> usize {
        ((self >> RS2_SHIFT) & REG_MASK) as usize
    }

    #[inline(always)]
    fn funct3(&self) -> u32 {
        (self >> FUNCT3_SHIFT) & FUNCT3_MASK
    }

    #[inline(always)]
    fn funct7(&self) -> u32 {
        (self >> FUNCT7_SHIFT) & FUNCT7_MASK
    }

    #[inline(always)]
    fn funct12(&self) -> u32 {
        self >> FUNCT12_SHIFT
    }
}

/// The six base encoding shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InsType {
    /// Register-register: rd, rs1, rs2, funct3, funct7.
    R,
    /// Immediate: rd, rs1, funct3, 12-bit signed immediate.
    I,
    /// Store: rs1, rs2, funct3, 12-bit signed immediate.
    S,
    /// Branch: rs1, rs2, funct3, 13-bit even signed immediate.
    B,
    /// Upper immediate: rd and a 20-bit immediate in bits 31..12.
    U,
    /// Jump: rd and a 21-bit even signed immediate.
    J,
}

/// Operand fields of a decoded instruction, one variant per shape.
///
/// Immediates are already sign-extended to 64 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Fields {
    R { rd: usize, rs1: usize, rs2: usize, funct3: u32, funct7: u32 },
    I { rd: usize, rs1: usize, funct3: u32, imm: i64 },
    S { rs1: usize, rs2: usize, funct3: u32, imm: i64 },
    B { rs1: usize, rs2: usize, funct3: u32, imm: i64 },
    U { rd: usize, imm: i64 },
    J { rd: usize, imm: i64 },
}

impl Fields {
    /// Shape of these fields.
    pub const fn ins_type(&self) -> InsType {
        match self {
            Self::R { .. } => InsType::R,
            Self::I { .. } => InsType::I,
            Self::S { .. } => InsType::S,
            Self::B { .. } => InsType::B,
            Self::U { .. } => InsType::U,
            Self::J { .. } => InsType::J,
        }
    }

    /// funct3 for the shapes that define it, 0 otherwise.
    pub const fn funct3(&self) -> u32 {
        match *self {
            Self::R { funct3, .. }
            | Self::I { funct3, .. }
            | Self::S { funct3, .. }
            | Self::B { funct3, .. } => funct3,
            Self::U { .. } | Self::J { .. } => 0,
        }
    }

    /// funct7 for R-type, 0 otherwise.
    pub const fn funct7(&self) -> u32 {
        match *self {
            Self::R { funct7, .. } => funct7,
            _ => 0,
        }
    }
}

/// A fully decoded instruction: raw word, resolved operation and operand fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// Raw 32-bit instruction encoding.
    pub raw: u32,
    /// Extracted opcode field.
    pub opcode: u32,
    /// Operation resolved through the instruction table.
    pub op: Op,
    /// Operand fields for the instruction's shape.
    pub fields: Fields,
}
