//! Core processor implementation.
//!
//! This module contains the hart: architectural state (registers, CSRs, privilege), the
//! execution units it uses, and the `Cpu` that fetches, decodes and executes one
//! instruction per step.

/// Architecture-specific components (CSRs, register file, privilege modes).
pub mod arch;

/// CPU core implementation and execution orchestration.
pub mod cpu;

/// Execution units (ALU, LSU, MMU, decoded-instruction cache).
pub mod units;

pub use self::cpu::Cpu;
