//! System-on-Chip (SoC) Components.
//!
//! This module organizes the guest-physical side of the machine: the bus that routes
//! accesses through the shadow map, the page pool backing RAM, the MMIO devices and the
//! builder assembling them.

/// Machine builder and run state.
pub mod builder;

/// Memory-mapped I/O device implementations.
pub mod devices;

/// Guest-physical bus and access routing.
pub mod interconnect;

/// Page pool backing guest RAM.
pub mod memory;

/// Device trait definitions for MMIO access.
pub mod traits;

pub use builder::{RunState, System};
pub use interconnect::Bus;
