//! `Collector` trait and `GcAllocator` handle.

use core::cell::RefCell;
use core::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use rust_alloc::alloc::Layout;

use crate::collectors::conservative::ConservativeGarbageCollector;

/// Super trait of [`Allocator`] for garbage-collected allocators.
///
/// # Safety
///
/// Allocated memory must remain valid until deallocated or collected.
pub unsafe trait Collector: Allocator {}

/// Wraps a `&RefCell<ConservativeGarbageCollector>` to expose `&self`
/// allocation.
///
/// Blocks handed out here are registered with the collector and scanned like
/// any other, so an allocator-api2 collection whose handle lives in a scanned
/// stack frame keeps its backing memory alive across cycles. A handle stored
/// only on the heap outside any registered block is invisible to the root
/// scan and may be swept.
pub struct GcAllocator<'gc> {
    collector: &'gc RefCell<ConservativeGarbageCollector>,
}

impl<'gc> GcAllocator<'gc> {
    pub fn new(collector: &'gc RefCell<ConservativeGarbageCollector>) -> Self {
        Self { collector }
    }
}

unsafe impl Allocator for GcAllocator<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            // SAFETY: any valid layout has align >= 1
            let dangling = unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }

        let mut collector = self.collector.borrow_mut();

        if !collector.is_below_threshold() {
            collector.collect();
            if !collector.is_below_threshold() {
                collector.increase_threshold();
            }
        }

        let ptr = collector
            .registry
            .register_layout(layout)
            .map_err(|_| AllocError)?;

        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            self.collector.borrow_mut().release(ptr);
        }
    }
}

unsafe impl Collector for GcAllocator<'_> {}
