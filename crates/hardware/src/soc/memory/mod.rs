//! Guest RAM backing.
//!
//! Guest memory regions are not contiguous host buffers: every 4 KiB guest page is backed by
//! its own page from the [`PagePool`] and reached through the shadow map.

/// Page arena for guest RAM.
pub mod pool;

pub use pool::{PagePool, PoolPage};
