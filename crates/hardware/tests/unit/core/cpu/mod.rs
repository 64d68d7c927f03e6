//! Tests that drive a hart through short programs.

pub mod atomics;
pub mod csr_instructions;
pub mod execution;
pub mod interrupts;
