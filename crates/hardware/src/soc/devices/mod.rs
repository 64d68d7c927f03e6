//! Memory-Mapped IO Devices.
//!
//! Reference devices for the "virt" machine: a timer (CLINT), an interrupt aggregator
//! (PLIC), a serial port (UART) and a power controller (SysCon).

/// Core Local Interruptor (timer and software interrupt controller).
pub mod clint;

/// Platform-Level Interrupt Controller (PLIC).
pub mod plic;

/// System Controller (power and reset control).
pub mod syscon;

/// UART 8250-compatible serial port.
pub mod uart;

pub use clint::Clint;
pub use plic::Plic;
pub use syscon::SysCon;
pub use uart::Uart;

pub use crate::soc::traits::Device;
