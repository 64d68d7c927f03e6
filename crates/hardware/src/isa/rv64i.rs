//! RISC-V Base Integer Instruction Set (RV64I).
//!
//! Major opcodes (bits 6-0) and the function codes that select an operation within them.

/// Major opcodes.
pub mod opcodes {
    /// Load instructions (LB, LH, LW, LD, LBU, LHU, LWU).
    pub const OP_LOAD: u32 = 0b000_0011;
    /// Memory ordering (FENCE, FENCE.I).
    pub const OP_MISC_MEM: u32 = 0b000_1111;
    /// Immediate arithmetic (ADDI, ANDI, SLLI, ...).
    pub const OP_IMM: u32 = 0b001_0011;
    /// Add Upper Immediate to PC.
    pub const OP_AUIPC: u32 = 0b001_0111;
    /// 32-bit immediate arithmetic (ADDIW, SLLIW, ...).
    pub const OP_IMM_32: u32 = 0b001_1011;
    /// Store instructions (SB, SH, SW, SD).
    pub const OP_STORE: u32 = 0b010_0011;
    /// Register-register arithmetic; also hosts RV64M.
    pub const OP_REG: u32 = 0b011_0011;
    /// Load Upper Immediate.
    pub const OP_LUI: u32 = 0b011_0111;
    /// 32-bit register-register arithmetic; also hosts the RV64M W forms.
    pub const OP_REG_32: u32 = 0b011_1011;
    /// Conditional branches.
    pub const OP_BRANCH: u32 = 0b110_0011;
    /// Jump and Link Register.
    pub const OP_JALR: u32 = 0b110_0111;
    /// Jump and Link.
    pub const OP_JAL: u32 = 0b110_1111;
}

/// funct3 values (bits 14-12).
pub mod funct3 {
    /// Load Byte.
    pub const LB: u32 = 0b000;
    /// Load Halfword.
    pub const LH: u32 = 0b001;
    /// Load Word.
    pub const LW: u32 = 0b010;
    /// Load Doubleword.
    pub const LD: u32 = 0b011;
    /// Load Byte Unsigned.
    pub const LBU: u32 = 0b100;
    /// Load Halfword Unsigned.
    pub const LHU: u32 = 0b101;
    /// Load Word Unsigned.
    pub const LWU: u32 = 0b110;

    /// Store Byte.
    pub const SB: u32 = 0b000;
    /// Store Halfword.
    pub const SH: u32 = 0b001;
    /// Store Word.
    pub const SW: u32 = 0b010;
    /// Store Doubleword.
    pub const SD: u32 = 0b011;

    /// Branch Equal.
    pub const BEQ: u32 = 0b000;
    /// Branch Not Equal.
    pub const BNE: u32 = 0b001;
    /// Branch Less Than.
    pub const BLT: u32 = 0b100;
    /// Branch Greater or Equal.
    pub const BGE: u32 = 0b101;
    /// Branch Less Than Unsigned.
    pub const BLTU: u32 = 0b110;
    /// Branch Greater or Equal Unsigned.
    pub const BGEU: u32 = 0b111;

    /// Add / Subtract.
    pub const ADD_SUB: u32 = 0b000;
    /// Shift Left Logical.
    pub const SLL: u32 = 0b001;
    /// Set Less Than.
    pub const SLT: u32 = 0b010;
    /// Set Less Than Unsigned.
    pub const SLTU: u32 = 0b011;
    /// Exclusive OR.
    pub const XOR: u32 = 0b100;
    /// Shift Right Logical / Arithmetic.
    pub const SRL_SRA: u32 = 0b101;
    /// OR.
    pub const OR: u32 = 0b110;
    /// AND.
    pub const AND: u32 = 0b111;

    /// JALR.
    pub const JALR: u32 = 0b000;

    /// FENCE.
    pub const FENCE: u32 = 0b000;
    /// FENCE.I (Zifencei).
    pub const FENCE_I: u32 = 0b001;
}

/// funct7 values (bits 31-25).
pub mod funct7 {
    /// ADD, SLL, SRL and the other default encodings.
    pub const DEFAULT: u32 = 0b000_0000;
    /// SUB and SRA.
    pub const ALT: u32 = 0b010_0000;
}

/// Bit of the I-type immediate selecting an arithmetic right shift (SRAI, SRAIW).
pub const SHIFT_ARITHMETIC: u64 = 0x400;

/// Shift-amount mask for 64-bit shifts.
pub const SHAMT_MASK_64: u64 = 0x3F;

/// Shift-amount mask for 32-bit (W) shifts.
pub const SHAMT_MASK_32: u64 = 0x1F;
