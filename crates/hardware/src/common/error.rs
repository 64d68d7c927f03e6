//! Trap and error definitions.
//!
//! This module defines how failures travel through the emulator. It provides:
//! 1. **Trap Representation:** Every synchronous exception and asynchronous interrupt the guest can observe.
//! 2. **Host-Side Errors:** `thiserror` enums for mapping, configuration and loading failures.
//! 3. **Fatal Conditions:** Internal contract violations that stop emulation instead of reaching the guest.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::isa::privileged::cause::{exception, interrupt};

/// RISC-V trap types representing exceptions and interrupts.
///
/// Each exception variant carries the value written to `mtval`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trap {
    /// The program counter is not 4-byte aligned. Carries the PC.
    InstructionAddressMisaligned(u64),

    /// Instruction fetch from a guest physical address with no backing. Carries the physical address.
    InstructionAccessFault(u64),

    /// Undecodable instruction, or privileged operation refused. Carries the trap value (instruction word or 0).
    IllegalInstruction(u64),

    /// `ebreak` outside UserOnly mode. Carries the trap value (0).
    Breakpoint(u64),

    /// Misaligned AMO or LR. Carries the virtual address.
    LoadAddressMisaligned(u64),

    /// Load from an unbacked physical address, or a device refusing the access.
    LoadAccessFault(u64),

    /// Misaligned AMO or SC. Carries the virtual address.
    StoreAddressMisaligned(u64),

    /// Store to an unbacked physical address, or a device refusing the access.
    StoreAccessFault(u64),

    /// `ecall` from User mode.
    EnvironmentCallFromUMode,

    /// `ecall` from Supervisor mode.
    EnvironmentCallFromSMode,

    /// `ecall` from Machine mode.
    EnvironmentCallFromMMode,

    /// Instruction fetch translation failed. Carries the virtual address.
    InstructionPageFault(u64),

    /// Load translation failed. Carries the virtual address.
    LoadPageFault(u64),

    /// Store translation failed. Carries the virtual address.
    StorePageFault(u64),

    /// Supervisor software interrupt (`mip` bit 1).
    SupervisorSoftwareInterrupt,

    /// Machine software interrupt (`mip` bit 3).
    MachineSoftwareInterrupt,

    /// Supervisor timer interrupt (`mip` bit 5).
    SupervisorTimerInterrupt,

    /// Machine timer interrupt (`mip` bit 7).
    MachineTimerInterrupt,

    /// Supervisor external interrupt (`mip` bit 9).
    SupervisorExternalInterrupt,

    /// Machine external interrupt (`mip` bit 11).
    MachineExternalInterrupt,
}

impl Trap {
    /// Returns `true` for asynchronous interrupts.
    pub const fn is_interrupt(self) -> bool {
        matches!(
            self,
            Self::SupervisorSoftwareInterrupt
                | Self::MachineSoftwareInterrupt
                | Self::SupervisorTimerInterrupt
                | Self::MachineTimerInterrupt
                | Self::SupervisorExternalInterrupt
                | Self::MachineExternalInterrupt
        )
    }

    /// Cause code without the interrupt bit.
    pub const fn code(self) -> u64 {
        match self {
            Self::InstructionAddressMisaligned(_) => exception::INSTRUCTION_ADDRESS_MISALIGNED,
            Self::InstructionAccessFault(_) => exception::INSTRUCTION_ACCESS_FAULT,
            Self::IllegalInstruction(_) => exception::ILLEGAL_INSTRUCTION,
            Self::Breakpoint(_) => exception::BREAKPOINT,
            Self::LoadAddressMisaligned(_) => exception::LOAD_ADDRESS_MISALIGNED,
            Self::LoadAccessFault(_) => exception::LOAD_ACCESS_FAULT,
            Self::StoreAddressMisaligned(_) => exception::STORE_ADDRESS_MISALIGNED,
            Self::StoreAccessFault(_) => exception::STORE_ACCESS_FAULT,
            Self::EnvironmentCallFromUMode => exception::ENVIRONMENT_CALL_FROM_U_MODE,
            Self::EnvironmentCallFromSMode => exception::ENVIRONMENT_CALL_FROM_S_MODE,
            Self::EnvironmentCallFromMMode => exception::ENVIRONMENT_CALL_FROM_M_MODE,
            Self::InstructionPageFault(_) => exception::INSTRUCTION_PAGE_FAULT,
            Self::LoadPageFault(_) => exception::LOAD_PAGE_FAULT,
            Self::StorePageFault(_) => exception::STORE_PAGE_FAULT,
            Self::SupervisorSoftwareInterrupt => interrupt::SUPERVISOR_SOFTWARE,
            Self::MachineSoftwareInterrupt => interrupt::MACHINE_SOFTWARE,
            Self::SupervisorTimerInterrupt => interrupt::SUPERVISOR_TIMER,
            Self::MachineTimerInterrupt => interrupt::MACHINE_TIMER,
            Self::SupervisorExternalInterrupt => interrupt::SUPERVISOR_EXTERNAL,
            Self::MachineExternalInterrupt => interrupt::MACHINE_EXTERNAL,
        }
    }

    /// Value recorded in `mtval` when this trap is taken.
    pub const fn tval(self) -> u64 {
        match self {
            Self::InstructionAddressMisaligned(v)
            | Self::InstructionAccessFault(v)
            | Self::IllegalInstruction(v)
            | Self::Breakpoint(v)
            | Self::LoadAddressMisaligned(v)
            | Self::LoadAccessFault(v)
            | Self::StoreAddressMisaligned(v)
            | Self::StoreAccessFault(v)
            | Self::InstructionPageFault(v)
            | Self::LoadPageFault(v)
            | Self::StorePageFault(v) => v,
            _ => 0,
        }
    }

    /// Maps an `mip` bit position to its interrupt, if one is defined for it.
    pub const fn from_interrupt_bit(bit: u64) -> Option<Self> {
        match bit {
            interrupt::SUPERVISOR_SOFTWARE => Some(Self::SupervisorSoftwareInterrupt),
            interrupt::MACHINE_SOFTWARE => Some(Self::MachineSoftwareInterrupt),
            interrupt::SUPERVISOR_TIMER => Some(Self::SupervisorTimerInterrupt),
            interrupt::MACHINE_TIMER => Some(Self::MachineTimerInterrupt),
            interrupt::SUPERVISOR_EXTERNAL => Some(Self::SupervisorExternalInterrupt),
            interrupt::MACHINE_EXTERNAL => Some(Self::MachineExternalInterrupt),
            _ => None,
        }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstructionAddressMisaligned(a) => {
                write!(f, "InstructionAddressMisaligned({a:#x})")
            }
            Self::InstructionAccessFault(a) => write!(f, "InstructionAccessFault({a:#x})"),
            Self::IllegalInstruction(v) => write!(f, "IllegalInstruction({v:#x})"),
            Self::Breakpoint(v) => write!(f, "Breakpoint({v:#x})"),
            Self::LoadAddressMisaligned(a) => write!(f, "LoadAddressMisaligned({a:#x})"),
            Self::LoadAccessFault(a) => write!(f, "LoadAccessFault({a:#x})"),
            Self::StoreAddressMisaligned(a) => write!(f, "StoreAddressMisaligned({a:#x})"),
            Self::StoreAccessFault(a) => write!(f, "StoreAccessFault({a:#x})"),
            Self::EnvironmentCallFromUMode => write!(f, "EnvironmentCallFromUMode"),
            Self::EnvironmentCallFromSMode => write!(f, "EnvironmentCallFromSMode"),
            Self::EnvironmentCallFromMMode => write!(f, "EnvironmentCallFromMMode"),
            Self::InstructionPageFault(a) => write!(f, "InstructionPageFault({a:#x})"),
            Self::LoadPageFault(a) => write!(f, "LoadPageFault({a:#x})"),
            Self::StorePageFault(a) => write!(f, "StorePageFault({a:#x})"),
            Self::SupervisorSoftwareInterrupt => write!(f, "SupervisorSoftwareInterrupt"),
            Self::MachineSoftwareInterrupt => write!(f, "MachineSoftwareInterrupt"),
            Self::SupervisorTimerInterrupt => write!(f, "SupervisorTimerInterrupt"),
            Self::MachineTimerInterrupt => write!(f, "MachineTimerInterrupt"),
            Self::SupervisorExternalInterrupt => write!(f, "SupervisorExternalInterrupt"),
            Self::MachineExternalInterrupt => write!(f, "MachineExternalInterrupt"),
        }
    }
}

impl std::error::Error for Trap {}

/// Failure of a shadow-map or device-registration call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MapError {
    /// The guest physical address is not on a page boundary.
    #[error("guest physical address {0:#x} is not page aligned")]
    Misaligned(u64),
    /// The region size is not a whole number of pages.
    #[error("region size {0:#x} is not a multiple of the page size")]
    MisalignedSize(u64),
    /// The guest physical address lies outside the 39-bit canonical window.
    #[error("guest physical address {0:#x} is not canonical")]
    NonCanonical(u64),
    /// The page already has a mapping.
    #[error("guest physical page {0:#x} is already mapped")]
    AlreadyMapped(u64),
    /// The page has no mapping to release.
    #[error("guest physical page {0:#x} is not mapped")]
    NotMapped(u64),
    /// A second interrupt aggregator was attached.
    #[error("only one interrupt aggregator can be attached to a machine")]
    DuplicateAggregator,
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// The configuration file could not be read.
    #[error("cannot read configuration {path}: {source}")]
    Io {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// `cache_bits` exceeds the supported maximum.
    #[error("cache_bits {0} is over the maximum of 24")]
    CacheBits(u32),
    /// A memory region has zero size.
    #[error("memory region `{0}` has zero size")]
    EmptyRegion(&'static str),
    /// The ROM and RAM regions overlap.
    #[error("rom [{rom_base:#x}, +{rom_size:#x}) overlaps ram [{ram_base:#x}, +{ram_size:#x})")]
    Overlap {
        /// ROM base.
        rom_base: u64,
        /// ROM size.
        rom_size: u64,
        /// RAM base.
        ram_base: u64,
        /// RAM size.
        ram_size: u64,
    },
}

/// Failure while reading a guest image.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A hex-text line is not a 32-bit hexadecimal word.
    #[error("line {line}: `{text}` is not a hexadecimal instruction word")]
    Hex {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        text: String,
    },
    /// The ELF file is malformed.
    #[error("malformed ELF image: {0}")]
    Elf(String),
    /// The image does not fit its destination region.
    #[error("image of {size:#x} bytes does not fit in {capacity:#x} bytes")]
    TooLarge {
        /// Image size in bytes.
        size: u64,
        /// Available bytes.
        capacity: u64,
    },
    /// A byte of the image targets an unmapped guest physical address.
    #[error("image byte at {0:#x} has no backing memory")]
    Unmapped(u64),
}

/// Why emulation stopped on an internal contract violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FatalReason {
    /// A trap was raised while another trap was already pending in the same step.
    NestedTrap(Trap),
    /// A trap was raised in UserOnly mode, where no guest handler exists.
    UncaughtTrap(Trap),
    /// A decoded instruction had no execute handler.
    DispatchMismatch(u32),
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NestedTrap(t) => write!(f, "nested trap {t}"),
            Self::UncaughtTrap(t) => write!(f, "uncaught trap {t} in user-only mode"),
            Self::DispatchMismatch(inst) => {
                write!(f, "no handler for decoded instruction {inst:#010x}")
            }
        }
    }
}

/// Top-level emulator error.
#[derive(Debug, Error)]
pub enum EmuError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Memory or device mapping failed.
    #[error(transparent)]
    Map(#[from] MapError),
    /// Loading the guest image failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// Emulation stopped on an internal error.
    #[error("fatal emulator error at pc {pc:#x}: {reason}")]
    Fatal {
        /// Program counter at the time of the failure.
        pc: u64,
        /// What went wrong.
        reason: FatalReason,
    },
}
