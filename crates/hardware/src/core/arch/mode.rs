//! RISC-V Privilege Modes.
//!
//! The hart runs at one of three architectural levels. The emulator-only UserOnly run mode
//! is not a level of its own: it is User plus a flag on the CPU, so every privilege
//! comparison treats it as User.

/// RISC-V privilege mode levels, ordered so that `User < Supervisor < Machine`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrivilegeMode {
    /// User mode (U-mode).
    User = 0,

    /// Supervisor mode (S-mode).
    Supervisor = 1,

    /// Machine mode (M-mode).
    Machine = 3,
}

impl PrivilegeMode {
    /// Decodes a two-bit privilege field such as `mstatus.MPP`.
    ///
    /// The reserved encoding 2 reads as Machine, matching the WARL behaviour of MPP.
    pub const fn from_bits(bits: u64) -> Self {
        match bits & 3 {
            0 => PrivilegeMode::User,
            1 => PrivilegeMode::Supervisor,
            _ => PrivilegeMode::Machine,
        }
    }

    /// Converts a privilege mode to its numeric encoding (0, 1 or 3).
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns the human-readable name of the privilege mode.
    pub const fn name(self) -> &'static str {
        match self {
            PrivilegeMode::User => "User",
            PrivilegeMode::Supervisor => "Supervisor",
            PrivilegeMode::Machine => "Machine",
        }
    }
}

impl std::fmt::Display for PrivilegeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
