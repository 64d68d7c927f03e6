//! Configuration system for the emulator.
//!
//! This module defines the configuration structures used to build a machine. It provides:
//! 1. **Defaults:** The baseline memory map and cache sizing.
//! 2. **Structures:** Hierarchical config for general options, memory regions and devices.
//! 3. **Validation:** `Config::validate` rejects values the machine cannot be built from.
//!
//! Configuration is read from JSON; every field is optional and falls back to its default.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::ConfigError;
use crate::common::constants::{DEFAULT_CACHE_BITS, DEFAULT_DEVICE_UPDATE_PERIOD, MAX_CACHE_BITS};

/// Default configuration constants for the emulator.
mod defaults {
    /// Base address of the code (ROM) region.
    pub const ROM_BASE: u64 = 0x8000_0000;

    /// Size of the code region (8 KiB).
    pub const ROM_SIZE: u64 = 0x2000;

    /// Base address of the data (RAM) region.
    pub const RAM_BASE: u64 = 0xc000_0000;

    /// Size of the data region (8 KiB).
    pub const RAM_SIZE: u64 = 0x2000;

    /// Base address of the UART 8250 MMIO region.
    pub const UART_BASE: u64 = 0x1000_0000;

    /// Interrupt-aggregator source of the UART.
    pub const UART_IRQ: u32 = 1;

    /// Base address of the CLINT MMIO region.
    pub const CLINT_BASE: u64 = 0x2000_0000;

    /// Base address of the PLIC MMIO region.
    pub const PLIC_BASE: u64 = 0x3000_0000;

    /// Base address of the system controller (power/reset) MMIO region.
    pub const SYSCON_BASE: u64 = 0x6000_0000;

    /// Code region size used by simple mode (16 KiB).
    pub const SIMPLE_ROM_SIZE: u64 = 0x4000;
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use rvemu_core::config::Config;
///
/// let json = r#"{
///     "general": { "user_only": true, "cache_bits": 10 },
///     "memory": { "ram_size": 65536 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert!(config.general.user_only);
/// assert_eq!(config.general.cache_bits, 10);
/// assert_eq!(config.memory.ram_size, 0x10000);
/// assert_eq!(config.memory.rom_base, 0x8000_0000);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General emulation settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Guest physical memory regions
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Reference devices of the "virt" machine
    #[serde(default)]
    pub devices: DeviceConfig,
}

impl Config {
    /// Parses a JSON document and validates it.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed JSON, or any validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
    }

    /// Configuration of the simple mode: 16 KiB of code at 0, 8 KiB of data at
    /// `0xc000_0000`, UserOnly, stack pointer at the top of the code region.
    pub fn simple() -> Self {
        let mut config = Self::default();
        config.general.start_pc = 0;
        config.general.user_only = true;
        config.general.initial_sp = Some(defaults::SIMPLE_ROM_SIZE);
        config.memory.rom_base = 0;
        config.memory.rom_size = defaults::SIMPLE_ROM_SIZE;
        config
    }

    /// Checks that a machine can be built from this configuration.
    ///
    /// # Errors
    ///
    /// `CacheBits` over the maximum, `EmptyRegion` for a zero-sized region, `Overlap` when
    /// the code and data regions intersect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.cache_bits > MAX_CACHE_BITS {
            return Err(ConfigError::CacheBits(self.general.cache_bits));
        }
        let mem = &self.memory;
        if mem.rom_size == 0 {
            return Err(ConfigError::EmptyRegion("rom"));
        }
        if mem.ram_size == 0 {
            return Err(ConfigError::EmptyRegion("ram"));
        }
        let rom_end = mem.rom_base.saturating_add(mem.rom_size);
        let ram_end = mem.ram_base.saturating_add(mem.ram_size);
        if mem.rom_base < ram_end && mem.ram_base < rom_end {
            return Err(ConfigError::Overlap {
                rom_base: mem.rom_base,
                rom_size: mem.rom_size,
                ram_base: mem.ram_base,
                ram_size: mem.ram_size,
            });
        }
        Ok(())
    }
}

/// General emulation settings and options.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Initial PC value (defaults to the ROM base)
    #[serde(default = "GeneralConfig::default_start_pc")]
    pub start_pc: u64,

    /// Run the hart in UserOnly mode: no translation, emulator calls instead of traps.
    #[serde(default)]
    pub user_only: bool,

    /// Initial stack pointer, if any.
    #[serde(default)]
    pub initial_sp: Option<u64>,

    /// log2 of the entry count of each translation and decode cache
    #[serde(default = "GeneralConfig::default_cache_bits")]
    pub cache_bits: u32,

    /// Devices are updated every `2^device_update_period` steps
    #[serde(default = "GeneralConfig::default_device_update_period")]
    pub device_update_period: u32,

    /// Emit a `trace` event for every retired instruction
    #[serde(default)]
    pub trace_instructions: bool,
}

impl GeneralConfig {
    fn default_start_pc() -> u64 {
        defaults::ROM_BASE
    }

    fn default_cache_bits() -> u32 {
        DEFAULT_CACHE_BITS
    }

    fn default_device_update_period() -> u32 {
        DEFAULT_DEVICE_UPDATE_PERIOD
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            start_pc: defaults::ROM_BASE,
            user_only: false,
            initial_sp: None,
            cache_bits: DEFAULT_CACHE_BITS,
            device_update_period: DEFAULT_DEVICE_UPDATE_PERIOD,
            trace_instructions: false,
        }
    }
}

/// Guest physical memory regions.
///
/// The code region receives the boot image; both regions are plain RAM to the guest.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Code region base address
    #[serde(default = "MemoryConfig::default_rom_base")]
    pub rom_base: u64,

    /// Code region size in bytes
    #[serde(default = "MemoryConfig::default_rom_size")]
    pub rom_size: u64,

    /// Data region base address
    #[serde(default = "MemoryConfig::default_ram_base")]
    pub ram_base: u64,

    /// Data region size in bytes
    #[serde(default = "MemoryConfig::default_ram_size")]
    pub ram_size: u64,
}

impl MemoryConfig {
    fn default_rom_base() -> u64 {
        defaults::ROM_BASE
    }

    fn default_rom_size() -> u64 {
        defaults::ROM_SIZE
    }

    fn default_ram_base() -> u64 {
        defaults::RAM_BASE
    }

    fn default_ram_size() -> u64 {
        defaults::RAM_SIZE
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            rom_base: defaults::ROM_BASE,
            rom_size: defaults::ROM_SIZE,
            ram_base: defaults::RAM_BASE,
            ram_size: defaults::RAM_SIZE,
        }
    }
}

/// Reference device placement.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Attach the UART, CLINT, PLIC and SysCon
    #[serde(default)]
    pub virt: bool,

    /// UART MMIO base address
    #[serde(default = "DeviceConfig::default_uart_base")]
    pub uart_base: u64,

    /// UART interrupt-aggregator source
    #[serde(default = "DeviceConfig::default_uart_irq")]
    pub uart_irq: u32,

    /// CLINT MMIO base address
    #[serde(default = "DeviceConfig::default_clint_base")]
    pub clint_base: u64,

    /// PLIC MMIO base address
    #[serde(default = "DeviceConfig::default_plic_base")]
    pub plic_base: u64,

    /// SysCon MMIO base address
    #[serde(default = "DeviceConfig::default_syscon_base")]
    pub syscon_base: u64,
}

impl DeviceConfig {
    fn default_uart_base() -> u64 {
        defaults::UART_BASE
    }

    fn default_uart_irq() -> u32 {
        defaults::UART_IRQ
    }

    fn default_clint_base() -> u64 {
        defaults::CLINT_BASE
    }

    fn default_plic_base() -> u64 {
        defaults::PLIC_BASE
    }

    fn default_syscon_base() -> u64 {
        defaults::SYSCON_BASE
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            virt: false,
            uart_base: defaults::UART_BASE,
            uart_irq: defaults::UART_IRQ,
            clint_base: defaults::CLINT_BASE,
            plic_base: defaults::PLIC_BASE,
            syscon_base: defaults::SYSCON_BASE,
        }
    }
}
