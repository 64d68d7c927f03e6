//! Unaligned memory access handling.
//!
//! Ordinary loads and stores may be misaligned; they are split into byte accesses that
//! each go through translation and routing on their own. AMOs, LR and SC must be
//! naturally aligned.

use crate::common::error::Trap;

/// Returns `true` if an access of `size` bytes at `addr` is naturally aligned.
#[inline(always)]
pub const fn is_aligned(addr: u64, size: u64) -> bool {
    size <= 1 || addr & (size - 1) == 0
}

/// Reads `size` bytes one at a time and assembles them little-endian.
///
/// Stops at the first byte that faults.
pub fn split_load<F>(addr: u64, size: u64, mut read_byte: F) -> Result<u64, Trap>
where
    F: FnMut(u64) -> Result<u8, Trap>,
{
    let mut result = 0u64;
    for i in 0..size {
        let byte = read_byte(addr.wrapping_add(i))?;
        result |= u64::from(byte) << (i * 8);
    }
    Ok(result)
}

/// Writes the low `size` bytes of `val` one at a time, little-endian.
///
/// Bytes before a faulting byte stay written.
pub fn split_store<F>(addr: u64, size: u64, val: u64, mut write_byte: F) -> Result<(), Trap>
where
    F: FnMut(u64, u8) -> Result<(), Trap>,
{
    for i in 0..size {
        write_byte(addr.wrapping_add(i), (val >> (i * 8)) as u8)?;
    }
    Ok(())
}
