//! Machine construction and top-level `System` type.
//!
//! This module builds the guest-physical side of a machine from configuration. It performs:
//! 1. **Memory setup:** Maps the code and data regions onto pool pages.
//! 2. **Device registration:** Optionally attaches the "virt" devices (UART, CLINT, PLIC, SysCon).
//! 3. **Power state:** Tracks whether the machine runs, was powered off, rebooted, exited or halted.

use crate::common::{EmuError, MapError};
use crate::config::{Config, DeviceConfig};
use crate::soc::devices::{Clint, Plic, SysCon, Uart};
use crate::soc::interconnect::Bus;
use crate::soc::traits::PowerEvent;

/// Why the machine is (or is not) running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Executing instructions.
    Running,
    /// Stopped by a SysCon power-off request.
    PowerOff,
    /// Stopped by a SysCon reboot request; the machine is rebuilt and restarted.
    Reboot,
    /// Stopped by the UserOnly EXIT call with this code.
    Exited(u64),
    /// Stopped on a fatal internal error.
    Halted,
}

/// Top-level system instance containing the bus and run state.
#[derive(Debug)]
pub struct System {
    /// Guest-physical interconnect; routes accesses to RAM and MMIO devices.
    pub bus: Bus,
    /// Current run state.
    pub state: RunState,
}

impl System {
    /// Creates a system with nothing mapped.
    pub fn new(cache_bits: u32) -> Self {
        Self { bus: Bus::new(cache_bits), state: RunState::Running }
    }

    /// Builds a system from configuration.
    ///
    /// Maps the code and data regions, then attaches the "virt" devices when
    /// `config.devices.virt` is set, with the UART on the host console.
    ///
    /// # Errors
    ///
    /// Configuration validation errors and mapping failures.
    pub fn from_config(config: &Config) -> Result<Self, EmuError> {
        config.validate()?;
        let mut system = Self::new(config.general.cache_bits);
        system.bus.map_memory(config.memory.rom_base, config.memory.rom_size)?;
        system.bus.map_memory(config.memory.ram_base, config.memory.ram_size)?;
        if config.devices.virt {
            system.attach_virt_devices(&config.devices, Uart::stdio(config.devices.uart_irq))?;
        }
        tracing::info!(
            "machine built: rom {:#x}+{:#x}, ram {:#x}+{:#x}, {} devices",
            config.memory.rom_base,
            config.memory.rom_size,
            config.memory.ram_base,
            config.memory.ram_size,
            system.bus.device_count()
        );
        Ok(system)
    }

    /// Attaches the UART, CLINT, PLIC and SysCon at their configured bases.
    pub fn attach_virt_devices(
        &mut self,
        devices: &DeviceConfig,
        uart: Uart,
    ) -> Result<(), MapError> {
        let _ = self.bus.add_mmio_device(devices.uart_base, Box::new(uart))?;
        let _ = self.bus.add_mmio_device(devices.clint_base, Box::new(Clint::new()))?;
        let _ = self.bus.add_mmio_device(devices.plic_base, Box::new(Plic::new()))?;
        let _ = self.bus.add_mmio_device(devices.syscon_base, Box::new(SysCon::new()))?;
        Ok(())
    }

    /// Returns `true` while the machine executes instructions.
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Applies a power request made by a device during the last step.
    pub fn sync_power(&mut self) {
        let Some(event) = self.bus.take_power_event() else {
            return;
        };
        if !self.is_running() {
            return;
        }
        self.state = match event {
            PowerEvent::PowerOff => RunState::PowerOff,
            PowerEvent::Reboot => RunState::Reboot,
        };
        tracing::info!("power event: {event:?}");
    }
}

impl Drop for System {
    fn drop(&mut self) {
        self.bus.free();
    }
}
