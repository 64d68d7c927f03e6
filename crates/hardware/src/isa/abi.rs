//! RISC-V ABI register indices used by the emulator itself.

/// Register x0 (zero register, always zero).
pub const REG_ZERO: usize = 0;
/// Register x1 (return address, ra).
pub const REG_RA: usize = 1;
/// Register x2 (stack pointer, sp). The simple-mode loader seeds it.
pub const REG_SP: usize = 2;
/// Register x10 (a0). Emulator-call selector and result.
pub const REG_A0: usize = 10;
/// Register x11 (a1). Emulator-call argument.
pub const REG_A1: usize = 11;
