//! Allocation entry points.
//!
//! Allocation drives collection: a `malloc` that misses the free list runs
//! a full collection (when enabled) before asking the OS for a fresh block.
//! Cells move free -> live only here, by being selected for an allocation.

use super::Collector;
use crate::cell::Cell;
use std::ptr::{self, NonNull};

impl Collector {
    /// Allocate `size` payload bytes with the given attribute bitmap.
    ///
    /// The free list is searched first; on a miss a collection runs (when
    /// enabled) and the search is retried; only then is a fresh block
    /// obtained from the OS. Returns null for `size == 0` and on exhaustion
    /// after `Host::out_of_memory` declined to abort.
    pub fn malloc(&mut self, size: usize, attr: u32) -> *mut u8 {
        if size == 0 {
            return ptr::null_mut();
        }

        if let Some(cell) = self.free.pop_with_capacity(size) {
            return self.reuse(cell, size, attr);
        }
        if self.is_enabled() {
            self.collect();
            if let Some(cell) = self.free.pop_with_capacity(size) {
                return self.reuse(cell, size, attr);
            }
        }

        match Cell::alloc(size) {
            Some(mut cell) => {
                // Capacity was fixed by Cell::alloc; this is the only path
                // where a cell's capacity is ever written.
                unsafe {
                    let c = cell.as_mut();
                    c.size = size;
                    c.attr = attr;
                    c.marked = false;
                }
                self.live.link(cell);
                self.stats.record_allocation(size, false);
                unsafe { cell.as_ref().payload() }
            }
            None => {
                self.host().out_of_memory();
                ptr::null_mut()
            }
        }
    }

    /// Recycle a free-list cell: capacity survives from its first
    /// allocation, everything else is reset for the new owner.
    fn reuse(&mut self, mut cell: NonNull<Cell>, size: usize, attr: u32) -> *mut u8 {
        unsafe {
            let c = cell.as_mut();
            debug_assert!(c.capacity >= size);
            c.size = size;
            c.attr = attr;
            c.marked = false;
        }
        self.live.link(cell);
        self.stats.record_allocation(size, true);
        unsafe { cell.as_ref().payload() }
    }

    /// [`Collector::malloc`] with a zeroed payload.
    pub fn calloc(&mut self, size: usize, attr: u32) -> *mut u8 {
        let payload = self.malloc(size, attr);
        if !payload.is_null() {
            unsafe { ptr::write_bytes(payload, 0, size) };
        }
        payload
    }

    /// Resize a live block.
    ///
    /// Null grows from nothing (`malloc`); zero size frees. Shrinks and
    /// growth within capacity happen in place; anything larger moves to a
    /// new cell, copying `min(old, new)` payload bytes and freeing the old
    /// cell without finalization. `ptr` must be a live payload base.
    pub fn realloc(&mut self, ptr_: *mut u8, size: usize, attr: u32) -> *mut u8 {
        if ptr_.is_null() {
            return self.malloc(size, attr);
        }
        if size == 0 {
            self.free(ptr_);
            return ptr::null_mut();
        }

        let Some(mut cell) = self.live.pop_by_payload(ptr_) else {
            debug_assert!(false, "realloc of a pointer the collector does not own");
            return ptr::null_mut();
        };
        let (old_size, capacity) = unsafe { (cell.as_ref().size, cell.as_ref().capacity) };
        if capacity >= size {
            unsafe { cell.as_mut().size = size };
            self.live.link(cell);
            return ptr_;
        }

        // The old cell stays unlinked across the allocation: a collection
        // triggered by it must not sweep the old payload before the copy.
        let new_ptr = self.malloc(size, attr);
        if new_ptr.is_null() {
            self.live.link(cell);
            return ptr::null_mut();
        }
        unsafe { ptr::copy_nonoverlapping(ptr_, new_ptr, old_size.min(size)) };
        self.free.link(cell);
        new_ptr
    }

    /// In-place growth is unsupported by this engine; always 0. The
    /// `min <= max` contract is still enforced.
    pub fn extend(&mut self, ptr_: *mut u8, min: usize, max: usize) -> usize {
        debug_assert!(min <= max, "extend with min > max");
        let _ = (ptr_, min, max);
        0
    }

    /// Pre-obtain one raw block with `size` usable bytes onto the free
    /// list. Returns the bytes reserved, or 0 on OS failure (after
    /// `Host::out_of_memory`). `size` must be positive.
    pub fn reserve(&mut self, size: usize) -> usize {
        debug_assert!(size > 0, "reserve of zero bytes");
        match Cell::alloc(size) {
            Some(mut cell) => {
                let capacity = unsafe {
                    let c = cell.as_mut();
                    // Free cells keep 0 < size <= capacity too.
                    c.size = c.capacity;
                    c.capacity
                };
                self.free.link(cell);
                capacity
            }
            None => {
                self.host().out_of_memory();
                0
            }
        }
    }

    /// Move a live cell to the free list. Finalizers do not run here:
    /// explicit deletion is the host runtime's responsibility. Null is a
    /// no-op; `ptr` must otherwise be a live payload base.
    pub fn free(&mut self, ptr_: *mut u8) {
        if ptr_.is_null() {
            return;
        }
        match self.live.pop_by_payload(ptr_) {
            Some(cell) => self.free.link(cell),
            None => debug_assert!(false, "free of a pointer the collector does not own"),
        }
    }

    /// Return every free-list cell's raw block to the OS. Best-effort: the
    /// raw-free status is ignored.
    pub fn minimize(&mut self) {
        while let Some(cell) = self.free.pop(|_| true) {
            unsafe { Cell::destroy(cell) };
        }
    }
}
