//! Common utilities and types used throughout the emulator.
//!
//! This module provides fundamental building blocks shared by every component. It includes:
//! 1. **Address Types:** Strong types for guest virtual and guest physical addresses.
//! 2. **Constants:** Page geometry, instruction field layout and cache limits.
//! 3. **Memory Access:** Classification of memory operations (Fetch/Read/Write).
//! 4. **Error Handling:** Trap representations and host-side error enums.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Common constants used throughout the emulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error types and trap definitions.
pub mod error;

pub use addr::{PhysAddr, VirtAddr};
pub use data::AccessType;
pub use error::{ConfigError, EmuError, FatalReason, LoadError, MapError, Trap};
