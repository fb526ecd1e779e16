//! Internal bookkeeping types for the conservative collector.

pub(crate) mod allocation;
pub(crate) mod registry;
