//! Program loading and the run loop.
//!
//! Loads hex, flat and ELF boot images into a machine and drives the hart until the
//! machine stops, rebuilding it on reboot.

/// Boot image formats and loading.
pub mod loader;
/// The `Simulator` run loop.
pub mod simulator;

pub use loader::{Image, ImageFormat, LoadedImage};
pub use simulator::{RunOutcome, Simulator};
