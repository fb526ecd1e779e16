//! A conservative, non-moving mark-and-sweep garbage collector for embedding.
//!
//! The host asks the collector for blocks, keeps ordinary pointers into them,
//! and periodically runs a collection cycle that frees every block no longer
//! reachable from the stack. No type metadata, no smart pointers: every
//! aligned stack word is treated as a candidate block address.

#![no_std]

extern crate alloc as rust_alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "conservative")]
pub use crate::collectors::conservative::*;

#[cfg(feature = "gc_allocator")]
pub mod collector;
#[cfg(feature = "gc_allocator")]
pub use collector::{Collector, GcAllocator};

pub mod collectors;
