//! RISC-V Multiply/Divide Extension (RV64M).
//!
//! The M instructions share `OP_REG`/`OP_REG_32` with the base set and are told apart by
//! `funct7 == M_EXTENSION`; funct3 picks the operation.

/// funct7 selecting the M extension.
pub const M_EXTENSION: u32 = 0b000_0001;

/// funct3 values.
pub mod funct3 {
    /// Multiply, low 64 bits.
    pub const MUL: u32 = 0b000;
    /// Multiply high, signed x signed.
    pub const MULH: u32 = 0b001;
    /// Multiply high, signed x unsigned.
    pub const MULHSU: u32 = 0b010;
    /// Multiply high, unsigned x unsigned.
    pub const MULHU: u32 = 0b011;
    /// Signed divide.
    pub const DIV: u32 = 0b100;
    /// Unsigned divide.
    pub const DIVU: u32 = 0b101;
    /// Signed remainder.
    pub const REM: u32 = 0b110;
    /// Unsigned remainder.
    pub const REMU: u32 = 0b111;
}
