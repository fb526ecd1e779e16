//! A conservative, non-moving mark-and-sweep collector.
//!
//! Reachability starts from the host stack: every aligned word between the
//! current execution frame and a caller-supplied `stack_bottom` is treated as
//! a candidate block address. A word that merely coincides with a live base
//! address over-retains that block; that is the price of needing no type
//! metadata, and it is accepted by design.
//!
//! Single-threaded and fully synchronous. `collect` blocks until the sweep
//! finishes, and a destructor that re-enters the collector is unsupported.

use core::ptr::NonNull;

use rust_alloc::vec::Vec;

pub(crate) mod internals;
mod roots;


pub use internals::allocation::Destructor;
pub use internals::registry::GcAllocError;

use internals::registry::AllocationRegistry;

const DEFAULT_HEAP_THRESHOLD: usize = 2_097_152;

#[derive(Debug)]
pub struct ConservativeGarbageCollector {
    pub(crate) registry: AllocationRegistry,
    // one boundary of the root-scan range, supplied once at construction;
    // the other boundary is the scan's own frame at collect time
    stack_bottom: usize,
    // scratch worklist reused across cycles to keep its capacity warm
    mark_queue: Vec<usize>,
    heap_threshold: usize,
}

impl ConservativeGarbageCollector {
    /// Creates a collector with an empty registry.
    ///
    /// `stack_bottom` is conventionally the address of a variable local to,
    /// or near, the thread's entry point; every `collect` scans the stack
    /// between its own frame and this address.
    pub fn new<T>(stack_bottom: *const T) -> Self {
        Self {
            registry: AllocationRegistry::default(),
            stack_bottom: stack_bottom as usize,
            mark_queue: Vec::new(),
            heap_threshold: DEFAULT_HEAP_THRESHOLD,
        }
    }

    pub fn with_heap_threshold(mut self, heap_threshold: usize) -> Self {
        self.heap_threshold = heap_threshold;
        self
    }

    /// Allocates a zeroed block of `size` bytes tracked by this collector.
    ///
    /// `dtor`, if present, runs exactly once with the block's base address
    /// right before the memory is released.
    pub fn allocate(
        &mut self,
        size: usize,
        dtor: Option<Destructor>,
    ) -> Result<NonNull<u8>, GcAllocError> {
        self.registry.register(size, dtor)
    }

    /// Runs a full collection cycle: conservative root discovery over the
    /// host stack, reachability marking, then a sweep of everything still
    /// unmarked. Returns only after the sweep completes.
    pub fn collect(&mut self) {
        let mut queue = core::mem::take(&mut self.mark_queue);
        queue.clear();

        // SAFETY: `stack_bottom` was supplied at construction as an address
        // near the owning thread's entry point, and the collector is not
        // Send, so this runs on the thread whose stack it scans
        unsafe {
            roots::scan_stack(self.stack_bottom, |word| queue.push(word));
        }

        self.mark_queue = queue;
        self.run_mark_phase();
        self.run_sweep_phase();
    }

    /// Collection entry point for hosts that manage a precise root set.
    ///
    /// Skips the stack scan; only the given addresses seed the mark phase.
    /// Each root must be the exact base address of a block to retain it.
    pub fn collect_from_roots(&mut self, roots: &[usize]) {
        self.mark_queue.clear();
        self.mark_queue.extend_from_slice(roots);
        self.run_mark_phase();
        self.run_sweep_phase();
    }

    /// Number of currently registered blocks.
    pub fn count(&self) -> usize {
        self.registry.len()
    }

    /// Unlinks and frees the block with exactly this base address, running
    /// its destructor. Returns false when no such block is registered.
    ///
    /// An escape hatch for hosts (and the `gc_allocator` adapter) that know
    /// a block is dead and do not want to wait for the next cycle.
    pub fn release(&mut self, ptr: NonNull<u8>) -> bool {
        self.registry.unlink(ptr.as_ptr() as usize).is_some()
    }

    /// Live bytes currently held by registered buffers.
    pub fn heap_size(&self) -> usize {
        self.registry.heap_size()
    }

    pub fn is_below_threshold(&self) -> bool {
        // keep 25% headroom so the host sees the signal before the heap
        // actually reaches the configured ceiling
        let margin = self.heap_threshold / 4;
        self.heap_size() <= self.heap_threshold.saturating_sub(margin)
    }

    pub fn increase_threshold(&mut self) {
        self.heap_threshold = self.heap_threshold.saturating_mul(2);
    }
}

// ==== Collection phases ====

impl ConservativeGarbageCollector {
    // drain the worklist: each candidate that exactly matches an unmarked
    // block's base gets marked, and the block's words feed the worklist
    //
    // termination: a marked block is skipped on re-entry and the registry is
    // finite, so cyclic reference graphs cannot loop. an explicit worklist
    // instead of recursion keeps deep chains off the native call stack
    pub(crate) fn run_mark_phase(&mut self) {
        let mut queue = core::mem::take(&mut self.mark_queue);

        while let Some(candidate) = queue.pop() {
            let Some(record) = self.registry.exact_lookup(candidate) else {
                continue;
            };
            if record.is_marked() {
                continue;
            }
            record.set_marked();
            record.for_each_word(|word| queue.push(word));
        }

        self.mark_queue = queue;
    }

    // one linear pass: unmarked records are unlinked and dropped, which runs
    // their destructor and then releases the buffer (Allocation::drop);
    // survivors come out of the pass with their mark flag already cleared
    pub(crate) fn run_sweep_phase(&mut self) {
        let dead = self.registry.extract_unmarked();
        drop(dead);

        debug_assert!(
            self.registry.iter().all(|record| !record.is_marked()),
            "mark flags must be false outside an active collection cycle"
        );
    }
}

impl crate::collectors::collector::Collector for ConservativeGarbageCollector {
    fn collect(&mut self) {
        ConservativeGarbageCollector::collect(self);
    }

    fn count(&self) -> usize {
        ConservativeGarbageCollector::count(self)
    }

    fn alloc_raw(
        &mut self,
        size: usize,
        dtor: Option<Destructor>,
    ) -> Result<NonNull<u8>, GcAllocError> {
        self.allocate(size, dtor)
    }
}
