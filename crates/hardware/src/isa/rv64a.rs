//! RISC-V Atomic Extension (RV64A).
//!
//! AMOs are R-type. funct7 holds `funct5 << 2 | aq << 1 | rl`; the ordering bits are
//! irrelevant on a single hart and are masked out of the dispatch key.

/// Atomic Memory Operation opcode.
pub const OP_AMO: u32 = 0b010_1111;

/// Mask keeping funct5 and dropping aq/rl from funct7.
pub const FUNCT7_OP_MASK: u32 = 0b111_1100;

/// Operation width: word.
pub const WIDTH_32: u32 = 0b010;
/// Operation width: doubleword.
pub const WIDTH_64: u32 = 0b011;

/// funct5 values already shifted into funct7 position.
pub mod funct7 {
    /// Load-Reserved.
    pub const LR: u32 = 0b00010 << 2;
    /// Store-Conditional.
    pub const SC: u32 = 0b00011 << 2;
    /// Swap.
    pub const AMOSWAP: u32 = 0b00001 << 2;
    /// Add.
    pub const AMOADD: u32 = 0b00000 << 2;
    /// Exclusive OR.
    pub const AMOXOR: u32 = 0b00100 << 2;
    /// AND.
    pub const AMOAND: u32 = 0b01100 << 2;
    /// OR.
    pub const AMOOR: u32 = 0b01000 << 2;
    /// Signed minimum.
    pub const AMOMIN: u32 = 0b10000 << 2;
    /// Signed maximum.
    pub const AMOMAX: u32 = 0b10100 << 2;
    /// Unsigned minimum.
    pub const AMOMINU: u32 = 0b11000 << 2;
    /// Unsigned maximum.
    pub const AMOMAXU: u32 = 0b11100 << 2;
}
