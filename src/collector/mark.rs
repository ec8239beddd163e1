//! Stop-the-world mark phase.
//!
//! A collection unmarks every live cell, then marks everything reachable
//! from the five root sources: host static data, every thread stack, the
//! current thread's spilled registers (covered by its stack scan), the
//! registered single-word roots, and the registered address ranges. Marking
//! drains an explicit worklist instead of recursing, so depth is bounded by
//! the worklist and not the native stack; reachability is identical.
//!
//! During the phase no list structure mutates and no mark bit changes
//! except to true. Mutator threads stay suspended for the duration; a
//! scoped guard resumes them on every exit path.

use super::Collector;
use crate::arch;
use crate::cell::{Cell, WORD, align_up};
use crate::host::Host;
use crate::list::CellList;
use std::ptr::NonNull;

impl Collector {
    /// Run a full collection: unmark, mark from every root source, sweep.
    /// Ignores the enable counter; the allocation path checks it before
    /// calling here.
    pub fn collect(&mut self) {
        #[cfg(feature = "trace")]
        let live_before = self.live.len();
        let start = std::time::Instant::now();

        self.unmark_all();
        self.mark_all();
        let (swept, swept_bytes, finalized) = self.sweep();

        self.stats
            .record_collection(swept as u64, swept_bytes as u64, finalized as u64, start.elapsed());
        #[cfg(feature = "trace")]
        eprintln!(
            "gc: collect live {} -> {} swept={} finalized={} pause={:?}",
            live_before,
            self.live.len(),
            swept,
            finalized,
            start.elapsed(),
        );
    }

    /// Clear the mark bit of every live cell.
    fn unmark_all(&mut self) {
        for mut cell in self.live.iter() {
            unsafe { cell.as_mut().marked = false };
        }
    }

    /// Mark every cell reachable from the root set.
    fn mark_all(&mut self) {
        let Self {
            live,
            roots,
            ranges,
            host,
            mark_stack,
            ..
        } = self;
        let host: &dyn Host = match host.as_deref() {
            Some(host) => host,
            None => &super::NOOP_HOST,
        };
        mark_stack.clear();

        arch::with_spilled_registers(|stack_top| {
            host.thread_suspend_all();
            let _resume = ResumeGuard { host };

            let mut mark_cb =
                |from: *mut u8, to: *mut u8| mark_range(live, mark_stack, from, to);
            host.scan_static_data(&mut mark_cb);
            host.thread_scan_all(&mut mark_cb, stack_top);

            for &root in roots.iter() {
                mark(live, mark_stack, root as usize);
            }
            for range in ranges.iter() {
                mark_range(live, mark_stack, range.from, range.to);
            }
        });
    }
}

/// Resumes suspended mutator threads when dropped, so resume happens on
/// every exit path out of the mark phase.
struct ResumeGuard<'a> {
    host: &'a dyn Host,
}

impl Drop for ResumeGuard<'_> {
    fn drop(&mut self) {
        self.host.thread_resume_all();
    }
}

/// Resolve one candidate word against the live heap and trace everything
/// reachable from it.
fn mark(live: &CellList, stack: &mut Vec<NonNull<Cell>>, word: usize) {
    push_reachable(live, stack, word);
    while let Some(cell) = stack.pop() {
        let words = unsafe { cell.as_ref().payload_words() };
        for candidate in words {
            push_reachable(live, stack, candidate);
        }
    }
}

/// Conservatively scan `[from, to)`: every aligned complete word is a
/// pointer candidate; any sub-word tail is ignored.
fn mark_range(live: &CellList, stack: &mut Vec<NonNull<Cell>>, from: *mut u8, to: *mut u8) {
    let mut cur = align_up(from as usize, WORD);
    let end = to as usize;
    while cur < end && end - cur >= WORD {
        let word = unsafe { *(cur as *const usize) };
        mark(live, stack, word);
        cur += WORD;
    }
}

/// Set the mark bit of the live cell containing `word`, if any, and queue
/// its payload for tracing unless `NO_SCAN` forbids it. Already-marked
/// cells are never queued twice.
fn push_reachable(live: &CellList, stack: &mut Vec<NonNull<Cell>>, word: usize) {
    let Some(mut cell) = live.find_containing(word as *const u8) else {
        return;
    };
    let c = unsafe { cell.as_mut() };
    if c.marked {
        return;
    }
    c.marked = true;
    if c.has_pointers() {
        stack.push(cell);
    }
}
