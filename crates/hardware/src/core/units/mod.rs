//! Execution units and functional components.
//!
//! This module contains the integer ALU, the load/store helpers (atomics and misaligned
//! splitting), the decoded-instruction cache and the two-stage memory management unit.

/// Arithmetic Logic Unit for integer operations.
pub mod alu;

/// Decoded-instruction cache.
pub mod cache;

/// Load/Store Unit helpers for memory access operations.
pub mod lsu;

/// Memory Management Unit: Sv39 translation and the guest-physical shadow map.
pub mod mmu;
