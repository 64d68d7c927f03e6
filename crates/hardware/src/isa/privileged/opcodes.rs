//! RISC-V Privileged Architecture Opcodes.
//!
//! Function codes for SYSTEM-opcode instructions: CSR access, environment calls,
//! trap returns and fences.

/// System instruction opcode (0b1110011).
/// Used for CSR instructions, ECALL, EBREAK, xRET, WFI, etc.
pub const OP_SYSTEM: u32 = 0b111_0011;

/// funct3 shared by ECALL, EBREAK, xRET, WFI and SFENCE.VMA.
pub const PRIV: u32 = 0b000;

/// funct12 of ECALL.
pub const F12_ECALL: u32 = 0x000;
/// funct12 of EBREAK.
pub const F12_EBREAK: u32 = 0x001;
/// funct12 of SRET.
pub const F12_SRET: u32 = 0x102;
/// funct12 of WFI.
pub const F12_WFI: u32 = 0x105;
/// funct12 of MRET.
pub const F12_MRET: u32 = 0x302;
/// funct7 of SFENCE.VMA (rs2 carries the ASID register).
pub const F7_SFENCE_VMA: u32 = 0b000_1001;

/// Atomic Read/Write CSR (CSRRW).
pub const CSRRW: u32 = 0b001;
/// Atomic Read and Set Bits in CSR (CSRRS).
pub const CSRRS: u32 = 0b010;
/// Atomic Read and Clear Bits in CSR (CSRRC).
pub const CSRRC: u32 = 0b011;
/// Atomic Read/Write CSR Immediate (CSRRWI).
pub const CSRRWI: u32 = 0b101;
/// Atomic Read and Set Bits in CSR Immediate (CSRRSI).
pub const CSRRSI: u32 = 0b110;
/// Atomic Read and Clear Bits in CSR Immediate (CSRRCI).
pub const CSRRCI: u32 = 0b111;
