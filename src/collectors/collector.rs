// `trait Collector` over embeddable collectors
//
// key design decisions:
// - `collect()` takes `&mut self`; the host owns the collector exclusively
//   and a cycle mutates the registry, so interior mutability buys nothing here
// - `alloc_raw` returns a recoverable error instead of aborting on OOM

use core::ptr::NonNull;

use crate::collectors::conservative::{Destructor, GcAllocError};

pub trait Collector {
    // run a full collection cycle and return once the sweep has finished
    fn collect(&mut self);

    // number of currently registered blocks
    fn count(&self) -> usize;

    // allocate a `size` byte block tracked by this collector
    //
    // `dtor`, if present, runs exactly once with the block's base address
    // right before the memory is released
    fn alloc_raw(
        &mut self,
        size: usize,
        dtor: Option<Destructor>,
    ) -> Result<NonNull<u8>, GcAllocError>;
}
