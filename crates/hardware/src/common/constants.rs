//! Global Emulator Constants.
//!
//! This module defines constants shared by the translators, the decoder and the run loop. It includes:
//! 1. **Memory Constants:** Page geometry and the 39-bit canonical address window.
//! 2. **Instruction Constants:** Field masks and shifts for the 32-bit encodings.
//! 3. **Cache Constants:** Limits for the direct-mapped caches.
//! 4. **Emulator Calls:** The UserOnly `ecall` selectors.

/// Page size in bytes (4 KiB).
pub const PAGE_SIZE: u64 = 4096;

/// Number of bits to shift to convert between bytes and pages.
pub const PAGE_SHIFT: u64 = 12;

/// Mask for extracting the page offset from an address.
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

/// Bits per page-table level index.
pub const VPN_BITS: u64 = 9;

/// Mask of a single level index.
pub const VPN_INDEX_MASK: u64 = 0x1FF;

/// Entries per page-table node (both the guest tables and the shadow tables).
pub const ENTRIES_PER_TABLE: usize = 512;

/// Number of levels in an Sv39 walk (and in the shadow map).
pub const PAGE_LEVELS: usize = 3;

/// Bits above the 39-bit address window; they must all equal bit 38.
pub const CANONICAL_HIGH_MASK: u64 = !0x3F_FFFF_FFFF;

/// Bit mask for extracting the opcode field from an instruction.
pub const OPCODE_MASK: u32 = 0x7F;

/// Both low opcode bits must be set for a 32-bit encoding.
pub const OPCODE_LENGTH_BITS: u32 = 0x3;

/// Size of an instruction in bytes.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Bit position shift for the destination register (rd) field.
pub const RD_SHIFT: u32 = 7;

/// Bit position shift for the funct3 field.
pub const FUNCT3_SHIFT: u32 = 12;

/// Bit position shift for the first source register (rs1) field.
pub const RS1_SHIFT: u32 = 15;

/// Bit position shift for the second source register (rs2) field.
pub const RS2_SHIFT: u32 = 20;

/// Bit position shift for the funct7 field.
pub const FUNCT7_SHIFT: u32 = 25;

/// Mask for a 5-bit register field.
pub const REG_MASK: u32 = 0x1F;

/// Bit mask indicating that a trap cause represents an interrupt.
pub const CAUSE_INTERRUPT_BIT: u64 = 1 << 63;

/// Number of general-purpose registers.
pub const REG_COUNT: usize = 32;

/// Largest accepted `cache_bits` value.
pub const MAX_CACHE_BITS: u32 = 24;

/// Default `cache_bits` (entries per cache = `1 << cache_bits`).
pub const DEFAULT_CACHE_BITS: u32 = 16;

/// Default device-update period, as a power of two of steps.
pub const DEFAULT_DEVICE_UPDATE_PERIOD: u32 = 18;

/// Emulator call selectors recognised by `ecall` in UserOnly mode (ASCII tags in `a0`).
pub mod emucall {
    /// Write `a1 & 0xff` to the console.
    pub const PUTC: u64 = 0x5055_5443;
    /// Stop the machine with exit code `a1`.
    pub const EXIT: u64 = 0x4558_4954;
    /// Return host monotonic milliseconds in `a0`.
    pub const GTIK: u64 = 0x4754_494B;
    /// Sleep for `a1` milliseconds.
    pub const SLEP: u64 = 0x534C_4550;
    /// Liveness probe, answers `PONG` in `a0`.
    pub const PING: u64 = 0x5049_4E47;
    /// Answer to `PING`.
    pub const PONG: u64 = 0x504F_4E47;
}
