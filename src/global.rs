//! Global collector façade.
//!
//! The host runtime links against these stable entry points. Every one of
//! them serializes on a single process-wide lock owned by the collector:
//! an independent, lightweight in-process mutex, not the OS mutex the host
//! uses for its own thread management. While one thread is inside an entry
//! point, other mutator threads calling in block.
//!
//! Host callbacks (finalizers, out-of-memory, the scan callbacks) run with
//! that lock held: they must not re-enter the façade.
//!
//! `init` must be called first and `term` last.

use crate::collector::{BlkInfo, Collector};
use crate::host::Host;
use crate::stats::GcStats;
use parking_lot::Mutex;

static GC: Mutex<Collector> = Mutex::new(Collector::new());

/// Install the host runtime and reset collector state. Must be the first
/// entry point called.
pub fn init(host: Box<dyn Host>) {
    GC.lock().init(host);
}

/// Finalize remaining live cells without reclaiming memory. Must be the
/// last entry point called.
pub fn term() {
    GC.lock().term();
}

/// Allow collections on allocation pressure again; pairs with [`disable`].
pub fn enable() {
    GC.lock().enable();
}

/// Suppress collections on allocation pressure. Nests.
pub fn disable() {
    GC.lock().disable();
}

/// Run a full collection, regardless of the enable counter.
pub fn collect() {
    GC.lock().collect();
}

/// Return free-list memory to the OS.
pub fn minimize() {
    GC.lock().minimize();
}

/// Allocate `size` payload bytes with the given attributes.
pub fn malloc(size: usize, attr: u32) -> *mut u8 {
    GC.lock().malloc(size, attr)
}

/// Allocate `size` zeroed payload bytes with the given attributes.
pub fn calloc(size: usize, attr: u32) -> *mut u8 {
    GC.lock().calloc(size, attr)
}

/// Resize a live block; see [`Collector::realloc`].
pub fn realloc(ptr: *mut u8, size: usize, attr: u32) -> *mut u8 {
    GC.lock().realloc(ptr, size, attr)
}

/// In-place growth request; this engine always returns 0.
pub fn extend(ptr: *mut u8, min: usize, max: usize) -> usize {
    GC.lock().extend(ptr, min, max)
}

/// Stock the free list with one raw block of `size` usable bytes.
pub fn reserve(size: usize) -> usize {
    GC.lock().reserve(size)
}

/// Move a live cell to the free list without finalization.
pub fn free(ptr: *mut u8) {
    GC.lock().free(ptr);
}

/// Payload base of the live cell containing `ptr`, or null.
pub fn addr_of(ptr: *const u8) -> *mut u8 {
    GC.lock().addr_of(ptr)
}

/// Usable capacity of the live cell whose payload base is `ptr`, or 0.
pub fn size_of(ptr: *const u8) -> usize {
    GC.lock().size_of(ptr)
}

/// Full block description for a live payload base, or the zeroed record.
pub fn query(ptr: *const u8) -> BlkInfo {
    GC.lock().query(ptr)
}

/// Current attribute bitmap of a live payload base, or 0.
pub fn get_attr(ptr: *const u8) -> u32 {
    GC.lock().get_attr(ptr)
}

/// OR `mask` into a live cell's attributes; returns the new bitmap.
pub fn set_attr(ptr: *const u8, mask: u32) -> u32 {
    GC.lock().set_attr(ptr, mask)
}

/// Clear `mask` from a live cell's attributes; returns the new bitmap.
pub fn clear_attr(ptr: *const u8, mask: u32) -> u32 {
    GC.lock().clear_attr(ptr, mask)
}

/// Register a single-word root.
pub fn add_root(ptr: *mut u8) {
    GC.lock().add_root(ptr);
}

/// Remove one occurrence of `ptr` from the root set.
pub fn remove_root(ptr: *mut u8) {
    GC.lock().remove_root(ptr);
}

/// Register the address range `[ptr, ptr + size)` as a root source.
pub fn add_range(ptr: *mut u8, size: usize) {
    GC.lock().add_range(ptr, size);
}

/// Remove the first registered range starting at `ptr`.
pub fn remove_range(ptr: *mut u8) {
    GC.lock().remove_range(ptr);
}

/// Snapshot of the collector's activity counters.
pub fn stats() -> GcStats {
    GC.lock().stats()
}
