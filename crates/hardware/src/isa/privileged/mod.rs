//! Privileged ISA constants: trap cause codes and the SYSTEM-opcode function codes
//! (Zicsr, ECALL/EBREAK, MRET/SRET, WFI, SFENCE.VMA).

/// `mcause` codes for exceptions and interrupts.
pub mod cause;

/// SYSTEM opcode and its funct3/funct12 values.
pub mod opcodes;
