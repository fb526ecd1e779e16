//! A single registered block: buffer ownership, mark bit, destructor hook.

use core::cell::Cell;
use core::fmt;
use core::ptr::NonNull;

use rust_alloc::alloc::{Layout, dealloc};
use rust_alloc::boxed::Box;

/// Per-block finalizer.
///
/// Invoked with the block's base address exactly once, immediately before the
/// buffer is released. The address is a transient borrow for the duration of
/// the call and must not be retained.
pub type Destructor = Box<dyn FnOnce(NonNull<u8>)>;

// One live (or pending-sweep) block.
//
// owns its buffer exclusively until dropped; liveness for the current cycle
// is tracked by `marked`, which must be false outside an active collection
pub struct Allocation {
    data: NonNull<u8>,
    // requested byte length; the scan never reads past it
    size: usize,
    // actual layout of the owned buffer (may be padded, never smaller)
    layout: Layout,
    marked: Cell<bool>,
    dtor: Option<Destructor>,
}

impl Allocation {
    pub(crate) fn new(
        data: NonNull<u8>,
        size: usize,
        layout: Layout,
        dtor: Option<Destructor>,
    ) -> Self {
        Self {
            data,
            size,
            layout,
            marked: Cell::new(false),
            dtor,
        }
    }

    /// Base address of the owned buffer. Record identity is exactly this.
    pub fn base(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// Requested byte length, fixed at creation.
    pub fn size(&self) -> usize {
        self.size
    }

    // bytes this record holds against the heap threshold
    pub(crate) fn heap_footprint(&self) -> usize {
        self.layout.size()
    }

    pub(crate) fn is_marked(&self) -> bool {
        self.marked.get()
    }

    pub(crate) fn set_marked(&self) {
        self.marked.set(true);
    }

    pub(crate) fn clear_mark(&self) {
        self.marked.set(false);
    }

    // reinterpret the buffer as address-sized, aligned strides and hand each
    // word to `visit` as a candidate block address
    //
    // the buffer base is word aligned (the registry allocates it that way),
    // so every stride read here is an aligned usize read
    pub(crate) fn for_each_word<F: FnMut(usize)>(&self, mut visit: F) {
        const WORD: usize = size_of::<usize>();
        let base = self.data.as_ptr().cast_const();
        let mut offset = 0;
        while offset + WORD <= self.size() {
            // SAFETY: `offset + WORD <= self.size <= layout.size()`, so the
            // read stays inside the owned, initialized (zeroed) buffer
            let word = unsafe { base.add(offset).cast::<usize>().read() };
            visit(word);
            offset += WORD;
        }
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if let Some(dtor) = self.dtor.take() {
            dtor(self.data);
        }
        // SAFETY: `data` was allocated with exactly `layout` and is freed
        // only here; the record owns it exclusively
        unsafe { dealloc(self.data.as_ptr(), self.layout) }
    }
}

impl fmt::Debug for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("base", &self.data)
            .field("size", &self.size)
            .field("marked", &self.marked.get())
            .field("has_dtor", &self.dtor.is_some())
            .finish()
    }
}
