//! Collector core: cell bookkeeping, roots, allocation, and collection.
//!
//! A [`Collector`] owns two intrusive lists that together partition every
//! cell it has ever obtained from the OS: the live list (allocated, not yet
//! freed) and the free list (available for reuse). It also owns the
//! user-registered root set and the enable/disable counter. The allocation entry points live
//! in `alloc`, the stop-the-world mark phase in `mark`, and the sweep and
//! terminal finalization in `sweep`.
//!
//! The collector is not itself thread-parallel: the façade serializes every
//! entry point on one global lock, and an owned instance requires `&mut`
//! access throughout.

mod alloc;
mod mark;
mod sweep;

use crate::cell::Cell;
use crate::host::{Host, NoopHost};
use crate::list::CellList;
use crate::raw_vec::RawVec;
use crate::stats::GcStats;
use std::ptr::{self, NonNull};

pub(crate) static NOOP_HOST: NoopHost = NoopHost;

/// Result of a pointer query: payload base, usable capacity, and attribute
/// bitmap. Zeroed when the pointer is not a live payload base.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlkInfo {
    /// Payload base address.
    pub base: *mut u8,
    /// Usable capacity in bytes.
    pub size: usize,
    /// Attribute bitmap.
    pub attr: u32,
}

impl BlkInfo {
    /// The zeroed record returned for unknown pointers.
    pub const fn zeroed() -> Self {
        Self {
            base: ptr::null_mut(),
            size: 0,
            attr: 0,
        }
    }
}

impl Default for BlkInfo {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// A registered address range `[from, to)` scanned as a root source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RootRange {
    pub from: *mut u8,
    pub to: *mut u8,
}

/// Conservative stop-the-world mark-and-sweep collector.
pub struct Collector {
    /// Every allocated, not-yet-freed cell.
    live: CellList,
    /// Cells available for reuse.
    free: CellList,
    /// Registered single-word roots, in registration order.
    roots: RawVec<*mut u8>,
    /// Registered address ranges, in registration order.
    ranges: RawVec<RootRange>,
    /// Collections on allocation pressure run only while this is zero.
    disabled: usize,
    /// Host runtime callbacks, installed by `init`.
    host: Option<Box<dyn Host>>,
    /// Reusable worklist for the mark phase.
    mark_stack: Vec<NonNull<Cell>>,
    /// Activity counters.
    stats: GcStats,
}

// Safety: cells and root storage are touched only by the thread that holds
// the collector lock (or exclusively owns the instance).
unsafe impl Send for Collector {}

impl Collector {
    /// Create an empty, uninstalled collector. Performs no allocation.
    pub const fn new() -> Self {
        Self {
            live: CellList::new(),
            free: CellList::new(),
            roots: RawVec::new(),
            ranges: RawVec::new(),
            disabled: 0,
            host: None,
            mark_stack: Vec::new(),
            stats: GcStats::new(),
        }
    }

    /// Create an owned collector with its host already installed.
    pub fn with_host(host: Box<dyn Host>) -> Self {
        let mut collector = Self::new();
        collector.init(host);
        collector
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Install the host runtime and reset all collector state. Must be
    /// called before any other operation; performs no allocation.
    pub fn init(&mut self, host: Box<dyn Host>) {
        self.live = CellList::new();
        self.free = CellList::new();
        self.roots.clear();
        self.ranges.clear();
        self.disabled = 0;
        self.stats = GcStats::new();
        self.host = Some(host);
        self.host().thread_init();
    }

    /// Allow collections on allocation pressure again. Calls must pair with
    /// [`Collector::disable`]; decrementing past zero is a precondition
    /// violation.
    pub fn enable(&mut self) {
        debug_assert!(self.disabled > 0, "enable without matching disable");
        self.disabled = self.disabled.saturating_sub(1);
    }

    /// Suppress collections on allocation pressure. Nests. Explicit
    /// [`Collector::collect`] calls are unaffected.
    pub fn disable(&mut self) {
        self.disabled += 1;
    }

    /// Whether allocation pressure may currently trigger a collection.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.disabled == 0
    }

    // =========================================================================
    // Pointer queries
    // =========================================================================

    /// Payload base of the live cell whose valid payload range contains
    /// `ptr`, or null. The only operation that resolves interior pointers.
    pub fn addr_of(&self, ptr: *const u8) -> *mut u8 {
        match self.live.find_containing(ptr) {
            Some(cell) => unsafe { cell.as_ref().payload() },
            None => ptr::null_mut(),
        }
    }

    /// Usable capacity of the live cell whose payload base is `ptr`, or 0.
    pub fn size_of(&self, ptr: *const u8) -> usize {
        self.live
            .find_by_payload(ptr)
            .map_or(0, |cell| unsafe { cell.as_ref().capacity })
    }

    /// Full block description for a live payload base, or the zeroed record.
    pub fn query(&self, ptr: *const u8) -> BlkInfo {
        match self.live.find_by_payload(ptr) {
            Some(cell) => {
                let c = unsafe { cell.as_ref() };
                BlkInfo {
                    base: c.payload(),
                    size: c.capacity,
                    attr: c.attr,
                }
            }
            None => BlkInfo::zeroed(),
        }
    }

    /// Current attribute bitmap of a live payload base, or 0.
    pub fn get_attr(&self, ptr: *const u8) -> u32 {
        self.live
            .find_by_payload(ptr)
            .map_or(0, |cell| unsafe { cell.as_ref().attr })
    }

    /// OR `mask` into the attribute bitmap. Returns the post-modification
    /// value, or 0 if `ptr` is not a live payload base. Returning the *new*
    /// value matches the long-standing implemented behavior of this
    /// interface, although callers historically documented it as the old
    /// value.
    pub fn set_attr(&mut self, ptr: *const u8, mask: u32) -> u32 {
        match self.live.find_by_payload(ptr) {
            Some(mut cell) => unsafe {
                let c = cell.as_mut();
                c.attr |= mask;
                c.attr
            },
            None => 0,
        }
    }

    /// Clear `mask` from the attribute bitmap. Returns the post-modification
    /// value, or 0 if `ptr` is not a live payload base.
    pub fn clear_attr(&mut self, ptr: *const u8, mask: u32) -> u32 {
        match self.live.find_by_payload(ptr) {
            Some(mut cell) => unsafe {
                let c = cell.as_mut();
                c.attr &= !mask;
                c.attr
            },
            None => 0,
        }
    }

    // =========================================================================
    // Root registration
    // =========================================================================

    /// Register a single-word root. Duplicates accumulate; each is scanned.
    pub fn add_root(&mut self, ptr: *mut u8) {
        if self.roots.append(ptr).is_err() {
            self.host().out_of_memory();
        }
    }

    /// Remove one occurrence of `ptr` from the root set.
    pub fn remove_root(&mut self, ptr: *mut u8) {
        self.roots.remove_first_equal(ptr);
    }

    /// Register the address range `[ptr, ptr + size)` as a root source.
    /// Zero-sized and overlapping ranges are accepted as given.
    pub fn add_range(&mut self, ptr: *mut u8, size: usize) {
        let range = RootRange {
            from: ptr,
            to: ptr.wrapping_add(size),
        };
        if self.ranges.append(range).is_err() {
            self.host().out_of_memory();
        }
    }

    /// Remove the first registered range whose start equals `ptr`.
    pub fn remove_range(&mut self, ptr: *mut u8) {
        self.ranges.remove_first(|r| r.from == ptr);
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    /// Number of cells currently in the live list.
    pub fn live_cells(&self) -> usize {
        self.live.len()
    }

    /// Number of cells currently in the free list.
    pub fn free_cells(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn host(&self) -> &dyn Host {
        match &self.host {
            Some(host) => host.as_ref(),
            None => &NOOP_HOST,
        }
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Collector {
    /// Owned collectors return every raw block to the OS. The global
    /// façade's instance is static and never dropped, matching the contract
    /// that `term` reclaims nothing.
    fn drop(&mut self) {
        while let Some(cell) = self.live.pop(|_| true) {
            unsafe { Cell::destroy(cell) };
        }
        while let Some(cell) = self.free.pop(|_| true) {
            unsafe { Cell::destroy(cell) };
        }
    }
}
