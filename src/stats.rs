//! Collection and allocation statistics.
//!
//! Counters for monitoring and tuning. They sit under the collector lock,
//! so plain fields suffice; the façade hands out copies.

use std::time::Duration;

/// Counters describing collector activity since `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    /// Cells handed out by the allocator, fresh and reused.
    pub cells_allocated: u64,
    /// Payload bytes requested from the allocator.
    pub bytes_allocated: u64,
    /// Allocations satisfied from the free list.
    pub cells_reused: u64,
    /// Collections run, implicit and explicit.
    pub collections: u64,
    /// Cells moved from the live list to the free list by sweep.
    pub cells_swept: u64,
    /// Payload capacity of swept cells.
    pub bytes_swept: u64,
    /// Finalizers invoked by sweep.
    pub cells_finalized: u64,
    /// Duration of the most recent collection.
    pub last_pause: Duration,
}

impl GcStats {
    /// Create zeroed statistics.
    pub const fn new() -> Self {
        Self {
            cells_allocated: 0,
            bytes_allocated: 0,
            cells_reused: 0,
            collections: 0,
            cells_swept: 0,
            bytes_swept: 0,
            cells_finalized: 0,
            last_pause: Duration::ZERO,
        }
    }

    /// Record one allocation of `size` payload bytes.
    #[inline]
    pub fn record_allocation(&mut self, size: usize, reused: bool) {
        self.cells_allocated += 1;
        self.bytes_allocated += size as u64;
        if reused {
            self.cells_reused += 1;
        }
    }

    /// Record one finished collection.
    pub fn record_collection(&mut self, swept: u64, swept_bytes: u64, finalized: u64, pause: Duration) {
        self.collections += 1;
        self.cells_swept += swept;
        self.bytes_swept += swept_bytes;
        self.cells_finalized += finalized;
        self.last_pause = pause;
    }
}

impl Default for GcStats {
    fn default() -> Self {
        Self::new()
    }
}
