//! Sweep phase and terminal finalization.
//!
//! Sweep runs after the mark phase with mutator threads already resumed;
//! the collector lock still serializes entry points, so no other mutator
//! can reach the allocator while cells change lists.

use super::Collector;
use crate::host::Host;

impl Collector {
    /// Move every unmarked live cell to the free list, invoking the host
    /// finalizer for cells carrying `FINALIZE`. Returns
    /// `(cells, bytes, finalized)`.
    pub(super) fn sweep(&mut self) -> (usize, usize, usize) {
        let Self {
            live, free, host, ..
        } = self;
        let host: &dyn Host = match host.as_deref() {
            Some(host) => host,
            None => &super::NOOP_HOST,
        };

        let mut cells = 0usize;
        let mut bytes = 0usize;
        let mut finalized = 0usize;

        for cell in live.iter() {
            let (marked, has_finalizer, payload, capacity) = {
                let c = unsafe { cell.as_ref() };
                (c.marked, c.has_finalizer(), c.payload(), c.capacity)
            };
            if marked {
                continue;
            }
            live.unlink(cell.as_ptr());
            if has_finalizer {
                host.finalize(payload, false);
                finalized += 1;
            }
            free.link(cell);
            cells += 1;
            bytes += capacity;
        }
        (cells, bytes, finalized)
    }

    /// Invoke the finalizer of every live finalizable cell without
    /// reclaiming anything; process exit returns the memory. Must be the
    /// last entry point used, short of a fresh `init`.
    pub fn term(&mut self) {
        let Self { live, host, .. } = self;
        let host: &dyn Host = match host.as_deref() {
            Some(host) => host,
            None => &super::NOOP_HOST,
        };
        for cell in live.iter() {
            let (has_finalizer, payload) = {
                let c = unsafe { cell.as_ref() };
                (c.has_finalizer(), c.payload())
            };
            if has_finalizer {
                host.finalize(payload, false);
            }
        }
    }
}
