//! CPU Core Definition and Initialization.
//!
//! This module defines the central `Cpu` structure, which serves as the container for the
//! entire hart state. It coordinates the following:
//! 1. **State Management:** Maintains registers, program counter, privilege and the
//!    per-step jump/exception flags.
//! 2. **Translation:** Owns the Sv39 MMU and the decoded-instruction cache.
//! 3. **System Integration:** Owns the `System` (bus, devices, run state) it executes against.
//!
//! The step loop lives in [`execution`], memory access in [`memory`], CSR instructions in
//! [`csr`], trap entry and return in [`trap`] and the UserOnly emulator calls in [`emucall`].

/// CSR instruction semantics and translation side effects.
pub mod csr;

/// UserOnly emulator calls serviced by `ecall`, and the `ebreak` register dump.
pub mod emucall;

/// The per-step execution loop and instruction dispatch.
pub mod execution;

/// Address translation and load/store/fetch routing.
pub mod memory;

/// Trap entry, interrupt polling and trap return.
pub mod trap;

use std::fmt;
use std::io::{self, Write};

use crate::config::Config;
use crate::core::arch::csr::CsrBank;
use crate::core::arch::gpr::Gpr;
use crate::core::arch::mode::PrivilegeMode;
use crate::core::units::cache::DecodeCache;
use crate::core::units::mmu::Mmu;
use crate::isa::abi;
use crate::soc::{RunState, System};
use crate::stats::SimStats;

pub use self::execution::ExecFault;

/// Main CPU structure containing all hart state and the machine it drives.
pub struct Cpu {
    /// General Purpose Registers.
    pub regs: Gpr,
    /// Program Counter.
    pub pc: u64,
    /// Control and Status Registers.
    pub csr: CsrBank,
    /// Current Privilege Mode (M, S, U).
    pub privilege: PrivilegeMode,
    /// UserOnly run mode: privilege stays User, `ecall` is serviced by the emulator and
    /// any trap is fatal.
    pub user_only: bool,
    /// Set by instructions that redirect the PC during the current step.
    pub jump_pending: bool,
    /// Set when the current step raised an exception.
    pub exception_pending: bool,
    /// Load Reservation address (for LR/SC).
    pub load_reservation: Option<u64>,

    /// System Bus, Devices and run state.
    pub bus: System,
    /// Sv39 Memory Management Unit.
    pub mmu: Mmu,
    /// Decoded-instruction cache keyed by physical fetch address.
    pub decode_cache: DecodeCache,

    /// Emit a trace event per executed instruction.
    pub trace: bool,
    /// Emulation statistics.
    pub stats: SimStats,

    device_update_mask: u64,
    device_ticks: u64,
    /// Bus generation the decoded-instruction cache was filled under.
    bus_generation: u64,
    console: Box<dyn Write>,
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("pc", &format_args!("{:#x}", self.pc))
            .field("privilege", &self.privilege)
            .field("user_only", &self.user_only)
            .field("state", &self.bus.state)
            .finish_non_exhaustive()
    }
}

impl Cpu {
    /// Creates a new CPU instance with the specified system and configuration.
    ///
    /// # Arguments
    ///
    /// * `system` - The machine (bus, devices) the hart executes against.
    /// * `config` - Start PC, run mode, initial stack pointer and cache sizing.
    ///
    /// # Returns
    ///
    /// A hart at `config.general.start_pc`, in User mode for UserOnly runs and in
    /// Machine mode otherwise.
    pub fn new(system: System, config: &Config) -> Self {
        let general = &config.general;
        let mut regs = Gpr::new();
        if let Some(sp) = general.initial_sp {
            regs.write(abi::REG_SP, sp);
        }
        let privilege =
            if general.user_only { PrivilegeMode::User } else { PrivilegeMode::Machine };
        let device_update_mask =
            1u64.checked_shl(general.device_update_period).map_or(u64::MAX, |v| v - 1);
        let bus_generation = system.bus.generation();

        Self {
            regs,
            pc: general.start_pc,
            csr: CsrBank::new(),
            privilege,
            user_only: general.user_only,
            jump_pending: false,
            exception_pending: false,
            load_reservation: None,
            bus: system,
            mmu: Mmu::new(general.cache_bits),
            decode_cache: DecodeCache::new(general.cache_bits),
            trace: general.trace_instructions,
            stats: SimStats::default(),
            device_update_mask,
            device_ticks: 0,
            bus_generation,
            console: Box::new(io::stdout()),
        }
    }

    /// Redirects the output of the PUTC emulator call.
    pub fn set_console(&mut self, console: Box<dyn Write>) {
        self.console = console;
    }

    /// Returns `true` while the machine is running.
    pub fn is_running(&self) -> bool {
        self.bus.is_running()
    }

    /// Exit code passed to the EXIT emulator call, once it has been made.
    pub fn exit_code(&self) -> Option<u64> {
        match self.bus.state {
            RunState::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// Copies the cache counters of the MMU, the shadow map and the decoded-instruction
    /// cache into `stats`.
    pub fn collect_stats(&mut self) -> &SimStats {
        let (shadow_hits, shadow_misses) = self.bus.bus.shadow_stats();
        self.stats.tlb_hits = self.mmu.tlb_hits;
        self.stats.tlb_misses = self.mmu.tlb_misses;
        self.stats.page_walks = self.mmu.walks;
        self.stats.shadow_hits = shadow_hits;
        self.stats.shadow_misses = shadow_misses;
        self.stats.decode_hits = self.decode_cache.hits;
        self.stats.decode_misses = self.decode_cache.misses;
        &self.stats
    }

    /// Writes every register as `x{i}: 0x{value:x}`, one per line.
    pub fn dump_registers(&self, out: &mut dyn Write) -> io::Result<()> {
        self.regs.dump_to(out)
    }

    /// Writes the PC, privilege and registers, for diagnostics.
    pub fn dump_state(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "PC = {:#018x} ({})", self.pc, self.privilege)?;
        self.regs.dump_pairs(out)
    }
}
