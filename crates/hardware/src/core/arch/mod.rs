//! RISC-V architectural state.
//!
//! 1. **CSRs:** Declaration table and the CSR bank.
//! 2. **GPRs:** The integer register file.
//! 3. **Modes:** Privilege levels.

/// Control and Status Register definitions and storage.
pub mod csr;

/// General-Purpose Register file implementation.
pub mod gpr;

/// Privilege mode definitions.
pub mod mode;
