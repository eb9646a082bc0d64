/*
 * Created on Mon Jul 27 2026
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2026, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Sweep: walk the table once, evict anything unmarked and non-root, then
//! clear marks and let the table shrink.
//!
//! The walk and the actual `free()` calls are deliberately two passes. A
//! finalizer can legally query the collector it's running under, and it
//! should never observe a half-compacted table.

use crate::descriptor::Flags;
use crate::table::PointerTable;
use std::ptr::NonNull;

/// Runs one sweep over `table`, returning `(base, size)` for every block
/// that should now be released to the host allocator (finalizers, if any,
/// have already run by the time this returns). `size` is handed back because
/// the descriptor that knew it is gone by the time the caller can free the
/// block. The host deallocator needs a layout, not just an address.
pub(crate) fn sweep(table: &mut PointerTable) -> Vec<(NonNull<u8>, usize)> {
    log::trace!("sweep phase starting: {} live before sweep", table.len());

    let mut pending_free = Vec::new();
    let mut i = 0;
    while i < table.capacity() {
        let verdict = match table.slot(i) {
            None => Verdict::Empty,
            Some(d) if d.flags.contains(Flags::MARKED) => Verdict::Keep,
            Some(d) if d.flags.contains(Flags::ROOT) => Verdict::KeepUnmarkedRoot,
            Some(d) => Verdict::Collect(d.base, d.size, d.finalizer),
        };
        match verdict {
            Verdict::Collect(base, size, finalizer) => {
                if let Some(finalize) = finalizer {
                    finalize(base);
                }
                table.remove_at(i);
                pending_free.push((base, size));
                // Do not advance `i`: backward-shift compaction may have
                // pulled a new entry into this slot.
            }
            Verdict::Empty | Verdict::Keep | Verdict::KeepUnmarkedRoot => {
                i += 1;
            }
        }
    }

    for i in table.indices() {
        if let Some(d) = table.slot_mut(i) {
            d.flags.remove(Flags::MARKED);
        }
    }

    // Shrinking is best-effort: if the host allocator can't satisfy the
    // smaller table, the old (larger) table is kept and the sweep still
    // completes correctly, just without reclaiming table memory this round.
    let _ = table.fit();

    log::trace!(
        "sweep phase complete: {} live, {} freed",
        table.len(),
        pending_free.len()
    );
    pending_free
}

enum Verdict {
    Empty,
    Keep,
    KeepUnmarkedRoot,
    Collect(NonNull<u8>, usize, Option<crate::descriptor::Finalizer>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Flags;
    use std::alloc::{alloc, dealloc, Layout};

    #[test]
    fn unmarked_nonroot_entries_are_collected() {
        let layout = Layout::new::<usize>();
        unsafe {
            let a = alloc(layout);
            let mut table = PointerTable::new(0.9);
            table
                .insert(NonNull::new(a).unwrap(), 8, Flags::empty(), None)
                .unwrap();
            let freed = sweep(&mut table);
            assert_eq!(freed, vec![(NonNull::new(a).unwrap(), 8)]);
            assert_eq!(table.len(), 0);
            dealloc(a, layout);
        }
    }

    #[test]
    fn marked_entries_survive_and_lose_their_mark() {
        let layout = Layout::new::<usize>();
        unsafe {
            let a = alloc(layout);
            let mut table = PointerTable::new(0.9);
            table
                .insert(NonNull::new(a).unwrap(), 8, Flags::MARKED, None)
                .unwrap();
            let freed = sweep(&mut table);
            assert!(freed.is_empty());
            assert_eq!(table.len(), 1);
            assert!(!table
                .find(NonNull::new(a).unwrap())
                .unwrap()
                .flags
                .contains(Flags::MARKED));
            dealloc(a, layout);
        }
    }

    #[test]
    fn unmarked_roots_are_never_collected() {
        let layout = Layout::new::<usize>();
        unsafe {
            let a = alloc(layout);
            let mut table = PointerTable::new(0.9);
            table
                .insert(NonNull::new(a).unwrap(), 8, Flags::ROOT, None)
                .unwrap();
            let freed = sweep(&mut table);
            assert!(freed.is_empty());
            assert_eq!(table.len(), 1);
            dealloc(a, layout);
        }
    }

    #[test]
    fn finalizer_runs_exactly_once_before_the_pointer_is_enqueued() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn fin(_p: NonNull<u8>) {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }
        let layout = Layout::new::<usize>();
        unsafe {
            let a = alloc(layout);
            let mut table = PointerTable::new(0.9);
            table
                .insert(NonNull::new(a).unwrap(), 8, Flags::empty(), Some(fin))
                .unwrap();
            let freed = sweep(&mut table);
            assert_eq!(CALLS.load(Ordering::SeqCst), 1);
            assert_eq!(freed, vec![(NonNull::new(a).unwrap(), 8)]);
            // a second sweep over an already-empty table must not re-invoke it
            sweep(&mut table);
            assert_eq!(CALLS.load(Ordering::SeqCst), 1);
            dealloc(a, layout);
        }
    }
}
