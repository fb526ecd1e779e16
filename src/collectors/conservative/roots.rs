//! Conservative root discovery over the host stack.
//!
//! The only module that reads raw stack memory. Everything above it works on
//! plain `usize` candidates.

const WORD: usize = size_of::<usize>();

/// Visits every address-sized, aligned word between the current execution
/// frame and `stack_bottom`, handing each raw word to `visit` as a candidate
/// block address regardless of whether it is actually a pointer.
///
/// Assumes a single contiguous, downward-growing stack: the current frame
/// sits at a lower address than `stack_bottom`, and the scan walks upward
/// toward it. On an upward-growing stack the bound comparison would have to
/// flip; no such target is supported.
///
/// # Safety
///
/// `stack_bottom` must lie within the stack of the calling thread, at or
/// above the frame that owns the collector's roots. The caller must run this
/// on the thread whose stack is being scanned.
#[inline(never)]
pub(crate) unsafe fn scan_stack<F: FnMut(usize)>(stack_bottom: usize, mut visit: F) {
    // the address of this local approximates the live top of the stack;
    // inline(never) keeps it below every caller frame
    let frame_marker = 0usize;
    let top = core::hint::black_box(&raw const frame_marker as usize);

    let mut cursor = align_up(top);
    let bottom = align_down(stack_bottom);

    while cursor + WORD <= bottom {
        // SAFETY: `cursor` stays word aligned and inside
        // `[current frame, stack_bottom)`, which is mapped, readable memory
        // on the calling thread's own stack. volatile keeps the compiler
        // from reasoning about what these untyped reads observe
        let word = unsafe { core::ptr::read_volatile(cursor as *const usize) };
        visit(word);
        cursor += WORD;
    }
}

const fn align_up(addr: usize) -> usize {
    (addr + WORD - 1) & !(WORD - 1)
}

const fn align_down(addr: usize) -> usize {
    addr & !(WORD - 1)
}
