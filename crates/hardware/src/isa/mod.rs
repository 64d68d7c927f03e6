//! Instruction Set Architecture (ISA) Definitions.
//!
//! Contains opcode and function-code constants organized by extension, the canonical
//! instruction table, and the decoder and disassembler built on it.
//!
//! # Extensions
//!
//! * `rv64i`: Base Integer Instruction Set (64-bit).
//! * `rv64m`: Integer Multiplication and Division.
//! * `rv64a`: Atomic Instructions.
//! * `privileged`: Zicsr, trap return, WFI and SFENCE.VMA.

/// ABI register indices.
pub mod abi;

/// Two-step decoder: field extraction, then table resolution.
pub mod decode;

/// Instruction disassembler for debug tracing and diagnostics.
pub mod disasm;

/// Field extraction and the decoded record.
pub mod instruction;

/// Privileged architecture definitions (CSR instructions, trap causes).
pub mod privileged;

/// Atomic memory operations extension (AMO instructions).
pub mod rv64a;

/// Base integer instruction set (64-bit RISC-V core instructions).
pub mod rv64i;

/// Integer multiply/divide extension (MUL, DIV, REM instructions).
pub mod rv64m;

/// The canonical instruction table.
pub mod table;
