//! Address-keyed bookkeeping for live blocks. Pure mechanism, no policy.

use core::ptr::NonNull;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use rust_alloc::alloc::{Layout, LayoutError, alloc_zeroed};
use rust_alloc::vec::Vec;

use super::allocation::{Allocation, Destructor};

/// Failure to obtain a buffer or its metadata from the underlying allocator.
#[derive(Debug, Clone)]
pub enum GcAllocError {
    LayoutError(LayoutError),
    OutOfMemory,
}

impl From<LayoutError> for GcAllocError {
    fn from(value: LayoutError) -> Self {
        Self::LayoutError(value)
    }
}

// Record table keyed by buffer base address.
//
// identity is exact base equality, so lookups for interior addresses miss by
// construction. the table only grows through `register` and only shrinks
// through `unlink` / `extract_unmarked`
#[derive(Debug, Default)]
pub struct AllocationRegistry {
    records: HashMap<usize, Allocation, FxBuildHasher>,
    // live bytes held by registered buffers, kept for threshold polling
    heap_bytes: usize,
}

impl AllocationRegistry {
    /// Allocates a zeroed, word-aligned buffer of `size` bytes and records it
    /// under its base address.
    pub fn register(
        &mut self,
        size: usize,
        dtor: Option<Destructor>,
    ) -> Result<NonNull<u8>, GcAllocError> {
        // zero-size requests still get a unique, registered address
        let layout = Layout::from_size_align(size.max(1), align_of::<usize>())?;
        self.register_raw(size, layout, dtor)
    }

    /// Allocates a zeroed buffer for `layout`, bumping its alignment to at
    /// least word size so the mark phase can stride it.
    #[cfg(feature = "gc_allocator")]
    pub fn register_layout(&mut self, layout: Layout) -> Result<NonNull<u8>, GcAllocError> {
        let size = layout.size();
        let layout = Layout::from_size_align(
            size.max(1),
            layout.align().max(align_of::<usize>()),
        )?;
        self.register_raw(size, layout, None)
    }

    fn register_raw(
        &mut self,
        size: usize,
        layout: Layout,
        dtor: Option<Destructor>,
    ) -> Result<NonNull<u8>, GcAllocError> {
        // zeroed so scanning a never-written buffer yields no stale candidates
        // SAFETY: `layout` has non-zero size
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(data) = NonNull::new(raw) else {
            return Err(GcAllocError::OutOfMemory);
        };

        let record = Allocation::new(data, size, layout, dtor);
        self.heap_bytes += record.heap_footprint();
        let base = record.base();
        let previous = self.records.insert(base, record);
        debug_assert!(
            previous.is_none(),
            "global allocator returned a base address that is already registered"
        );

        Ok(data)
    }

    /// Looks up the record whose buffer base equals `address`.
    ///
    /// Interior addresses are reported as not found; exact-base matching is a
    /// documented conservatism limitation, not something to fix here.
    pub fn exact_lookup(&self, address: usize) -> Option<&Allocation> {
        self.records.get(&address)
    }

    /// Removes a record from the table without touching its buffer; freeing
    /// happens when the returned record is dropped.
    pub fn unlink(&mut self, address: usize) -> Option<Allocation> {
        let record = self.records.remove(&address)?;
        self.heap_bytes -= record.heap_footprint();
        Some(record)
    }

    // single pass over the table: unmarked records are unlinked and returned,
    // survivors get their mark flag cleared for the next cycle
    pub(crate) fn extract_unmarked(&mut self) -> Vec<Allocation> {
        let dead: Vec<Allocation> = self
            .records
            .extract_if(|_, record| {
                if record.is_marked() {
                    record.clear_mark();
                    false
                } else {
                    true
                }
            })
            .map(|(_, record)| record)
            .collect();

        for record in &dead {
            self.heap_bytes -= record.heap_footprint();
        }
        dead
    }

    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn heap_size(&self) -> usize {
        self.heap_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::AllocationRegistry;

    #[test]
    fn register_and_exact_lookup() {
        let mut registry = AllocationRegistry::default();
        let block = registry.register(64, None).unwrap();
        let base = block.as_ptr() as usize;

        assert_eq!(registry.len(), 1);
        let record = registry.exact_lookup(base).expect("base must be found");
        assert_eq!(record.size(), 64);
        assert_eq!(record.base(), base);
    }

    #[test]
    fn interior_address_is_not_found() {
        let mut registry = AllocationRegistry::default();
        let block = registry.register(64, None).unwrap();
        let base = block.as_ptr() as usize;

        assert!(registry.exact_lookup(base + size_of::<usize>()).is_none());
        assert!(registry.exact_lookup(base + 1).is_none());
    }

    #[test]
    fn unlink_removes_without_sweeping_others() {
        let mut registry = AllocationRegistry::default();
        let a = registry.register(16, None).unwrap().as_ptr() as usize;
        let b = registry.register(16, None).unwrap().as_ptr() as usize;

        let record = registry.unlink(a).expect("a was registered");
        assert_eq!(record.base(), a);
        assert_eq!(registry.len(), 1);
        assert!(registry.exact_lookup(b).is_some());
        assert!(registry.unlink(a).is_none());
    }

    #[test]
    fn heap_size_tracks_buffers() {
        let mut registry = AllocationRegistry::default();
        assert_eq!(registry.heap_size(), 0);

        let a = registry.register(128, None).unwrap().as_ptr() as usize;
        registry.register(64, None).unwrap();
        assert_eq!(registry.heap_size(), 192);

        registry.unlink(a);
        assert_eq!(registry.heap_size(), 64);
    }

    #[test]
    fn fresh_buffers_are_zeroed() {
        let mut registry = AllocationRegistry::default();
        let block = registry.register(64, None).unwrap();
        let base = block.as_ptr() as usize;

        let mut saw_nonzero = false;
        registry
            .exact_lookup(base)
            .unwrap()
            .for_each_word(|word| saw_nonzero |= word != 0);
        assert!(!saw_nonzero, "a never-written buffer must scan as all zeros");
    }

    #[test]
    fn zero_size_blocks_get_unique_addresses() {
        let mut registry = AllocationRegistry::default();
        let a = registry.register(0, None).unwrap().as_ptr() as usize;
        let b = registry.register(0, None).unwrap().as_ptr() as usize;

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }
}
