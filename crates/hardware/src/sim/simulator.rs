//! Simulator: owns the hart, its configuration and the boot image.
//!
//! Keeping the image and configuration next to the CPU lets a SysCon reboot rebuild the
//! machine from scratch and start it again.

use std::ops::Range;

use crate::common::EmuError;
use crate::config::Config;
use crate::core::Cpu;
use crate::sim::loader::{Image, LoadedImage};
use crate::soc::{RunState, System};

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The machine stopped with this state (never `Running` or `Reboot`).
    Stopped(RunState),
    /// The PC left the watched range.
    LeftRange,
}

/// Top-level simulator: a hart, the machine it drives, and what it was built from.
#[derive(Debug)]
pub struct Simulator {
    /// The hart, which owns the machine.
    pub cpu: Cpu,
    /// Configuration the machine is rebuilt from on reboot.
    pub config: Config,
    /// Boot image reloaded on reboot.
    pub image: Image,
    /// Placement of the image in the current machine.
    pub loaded: LoadedImage,
    /// Number of reboots taken so far.
    pub reboots: u64,
}

impl Simulator {
    /// Builds a machine from `config`, loads `image` and places the hart at the start PC.
    ///
    /// An ELF entry point overrides `config.general.start_pc`.
    ///
    /// # Errors
    ///
    /// Configuration, mapping and load errors.
    pub fn new(config: Config, image: Image) -> Result<Self, EmuError> {
        let (cpu, loaded) = Self::boot(&config, &image)?;
        Ok(Self { cpu, config, image, loaded, reboots: 0 })
    }

    fn boot(config: &Config, image: &Image) -> Result<(Cpu, LoadedImage), EmuError> {
        let mut system = System::from_config(config)?;
        let loaded = image.load_into(&mut system, config)?;
        let mut cpu = Cpu::new(system, config);
        if let Some(entry) = loaded.entry {
            cpu.pc = entry;
        }
        Ok((cpu, loaded))
    }

    /// Steps until the machine stops. A reboot rebuilds the machine and keeps running.
    ///
    /// # Errors
    ///
    /// `EmuError::Fatal` from a step, or a build error while rebooting.
    pub fn run(&mut self) -> Result<RunState, EmuError> {
        loop {
            while self.cpu.is_running() {
                self.cpu.step()?;
            }
            if self.cpu.bus.state != RunState::Reboot {
                return Ok(self.cpu.bus.state);
            }
            self.reboot()?;
        }
    }

    /// Steps while the PC lies in `range` and the machine runs.
    ///
    /// This is the simple-mode loop: a program ends by falling off the end of its code.
    pub fn run_while_in(&mut self, range: Range<u64>) -> Result<RunOutcome, EmuError> {
        while range.contains(&self.cpu.pc) {
            if !self.cpu.is_running() {
                return Ok(RunOutcome::Stopped(self.cpu.bus.state));
            }
            self.cpu.step()?;
        }
        Ok(RunOutcome::LeftRange)
    }

    /// Range covered by the loaded code, from the code region base.
    pub fn code_range(&self) -> Range<u64> {
        self.config.memory.rom_base..self.loaded.end
    }

    /// Rebuilds the machine from the configuration and reloads the image.
    pub fn reboot(&mut self) -> Result<(), EmuError> {
        self.reboots += 1;
        tracing::info!("rebooting (reboot #{})", self.reboots);
        let (cpu, loaded) = Self::boot(&self.config, &self.image)?;
        self.cpu = cpu;
        self.loaded = loaded;
        Ok(())
    }
}
