//! RV64 machine emulator core.
//!
//! This crate emulates a single RV64IMA hart with Machine/Supervisor/User privilege and
//! Sv39 paging. It provides the following:
//! 1. **Core:** Decoder, execution dispatcher, CSR controller and trap controller.
//! 2. **Memory:** Sv39 translation with a TLB, and a shadow map from guest-physical pages
//!    to host pages or MMIO devices with its own TLB.
//! 3. **ISA:** Instruction table, field extraction and disassembly.
//! 4. **SoC:** Bus, the MMIO device contract, and the CLINT, PLIC, UART 8250 and SysCon.
//! 5. **Simulation:** Configuration, boot image loaders, the run loop and statistics.

/// Common types and constants (addresses, traps, errors, access types).
pub mod common;
/// Emulator configuration (defaults and JSON-backed structures).
pub mod config;
/// CPU core (architectural state, execution units, the step loop).
pub mod core;
/// Instruction set (decode, instruction table, ABI, privileged encodings).
pub mod isa;
/// Boot image loading and the run loop.
pub mod sim;
/// System-on-chip (builder, bus, devices, memory, traits).
pub mod soc;
/// Emulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()`, `Config::simple()` or `Config::from_json`.
pub use crate::config::Config;
/// The hart; owns the machine it executes against.
pub use crate::core::Cpu;
/// Loads an image and runs a machine to completion.
pub use crate::sim::Simulator;
/// Top-level machine (bus, devices, run state); construct with `System::from_config`.
pub use crate::soc::{RunState, System};
