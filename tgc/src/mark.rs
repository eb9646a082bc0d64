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

//! Conservative mark phase: roots first, then the machine stack.
//!
//! Nothing here trusts type information. A "pointer" is just a machine word
//! that happens to land inside `[minptr, maxptr]` and then inside some
//! tracked block's byte range. That's cheap and occasionally wrong in the
//! conservative direction we want: it can only ever cause us to retain
//! garbage (a stray integer that looks like a pointer), never to free a live
//! block, because the test only ever adds to the marked set.

use crate::descriptor::Flags;
use crate::table::PointerTable;
use std::mem::size_of;

const WORD: usize = size_of::<usize>();

/// Runs both halves of the mark phase against the current table and pointer
/// bounds. `stack_low..stack_high` is the already-ordered (low <= high) byte
/// range of the mutator's stack to scan.
pub(crate) fn mark_all(
    table: &mut PointerTable,
    min_ptr: usize,
    max_ptr: usize,
    stack_low: usize,
    stack_high: usize,
) {
    if table.is_empty() {
        return;
    }
    mark_roots(table, min_ptr, max_ptr);
    scan_stack(table, min_ptr, max_ptr, stack_low, stack_high);
}

/// Marks and traces every root block, continuing through the whole table
/// so that every root gets traced, not just the first one found.
fn mark_roots(table: &mut PointerTable, min_ptr: usize, max_ptr: usize) {
    for i in table.indices() {
        let is_unmarked_root = match table.slot(i) {
            Some(d) => d.flags.contains(Flags::ROOT) && !d.flags.contains(Flags::MARKED),
            None => false,
        };
        if is_unmarked_root {
            mark_and_trace(table, i, min_ptr, max_ptr);
        }
    }
}

/// Scans `[low, high)` at pointer stride, treating every aligned word as a
/// candidate pointer.
///
/// # Safety
/// The caller must guarantee that `[low, high)` lies within memory that is
/// valid to read as `usize`-sized words for the lifetime of this call. In
/// practice this is the calling thread's own machine stack, between the
/// anchor captured at [`crate::Collector::start`] and a local variable in
/// the current call frame (see `Collector::mark`, which also forces
/// register spills onto the stack before computing `high`).
fn scan_stack(table: &mut PointerTable, min_ptr: usize, max_ptr: usize, low: usize, high: usize) {
    if high <= low {
        return;
    }
    let mut addr = low;
    while addr + WORD <= high {
        // SAFETY: see function doc; `addr` is `WORD`-aligned by construction
        // since `low`/`high` are themselves word-stride-derived addresses.
        let candidate = unsafe { std::ptr::read_unaligned(addr as *const usize) };
        conservative_mark(table, candidate, min_ptr, max_ptr);
        addr += WORD;
    }
}

/// The conservative pointer test: reject anything outside `[minptr, maxptr]`
/// outright, then probe the table the way a lookup would, but match
/// inclusively against each candidate block's byte range instead of
/// requiring an exact base-address hit.
fn conservative_mark(table: &mut PointerTable, candidate: usize, min_ptr: usize, max_ptr: usize) {
    if candidate < min_ptr || candidate > max_ptr {
        return;
    }
    if let Some(index) = table.find_containing_unmarked(candidate) {
        mark_and_trace(table, index, min_ptr, max_ptr);
    }
}

/// Marks slot `index` and, unless it's hinted as a leaf, traces its payload
/// at pointer stride. Recursion only happens on the unmarked-to-marked
/// transition, so arbitrary cycles terminate: a block is traced at most once
/// per collection cycle.
fn mark_and_trace(table: &mut PointerTable, index: usize, min_ptr: usize, max_ptr: usize) {
    let (base, size, is_leaf) = {
        let d = table
            .slot_mut(index)
            .expect("mark_and_trace called on an empty slot");
        d.flags.insert(Flags::MARKED);
        (d.base, d.size, d.flags.contains(Flags::LEAF))
    };
    if is_leaf {
        return;
    }
    let mut k = 0usize;
    while k + WORD <= size {
        // SAFETY: `base` is a live, tracked allocation of at least `size`
        // bytes; `k` stays within that range by the loop condition above.
        let word = unsafe { std::ptr::read_unaligned(base.as_ptr().add(k) as *const usize) };
        conservative_mark(table, word, min_ptr, max_ptr);
        k += WORD;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Flags;
    use std::alloc::{alloc, dealloc, Layout};
    use std::ptr::NonNull;

    #[test]
    fn marking_a_root_traces_its_outgoing_pointer() {
        let layout_a = Layout::new::<usize>();
        let layout_b = Layout::new::<usize>();
        unsafe {
            let a = alloc(layout_a) as *mut usize;
            let b = alloc(layout_b) as *mut usize;
            *a = b as usize; // a -> b
            *b = 0;

            let mut table = PointerTable::new(0.9);
            table
                .insert(NonNull::new(a as *mut u8).unwrap(), WORD, Flags::ROOT, None)
                .unwrap();
            table
                .insert(NonNull::new(b as *mut u8).unwrap(), WORD, Flags::empty(), None)
                .unwrap();

            let min = (a as usize).min(b as usize);
            let max = (a as usize).max(b as usize) + WORD;
            mark_all(&mut table, min, max, 0, 0);

            assert!(table
                .find(NonNull::new(a as *mut u8).unwrap())
                .unwrap()
                .flags
                .contains(Flags::MARKED));
            assert!(table
                .find(NonNull::new(b as *mut u8).unwrap())
                .unwrap()
                .flags
                .contains(Flags::MARKED));

            dealloc(a as *mut u8, layout_a);
            dealloc(b as *mut u8, layout_b);
        }
    }

    #[test]
    fn cyclic_graph_terminates_and_marks_both() {
        let layout = Layout::new::<usize>();
        unsafe {
            let a = alloc(layout) as *mut usize;
            let b = alloc(layout) as *mut usize;
            *a = b as usize;
            *b = a as usize;

            let mut table = PointerTable::new(0.9);
            table
                .insert(NonNull::new(a as *mut u8).unwrap(), WORD, Flags::ROOT, None)
                .unwrap();
            table
                .insert(NonNull::new(b as *mut u8).unwrap(), WORD, Flags::empty(), None)
                .unwrap();

            let min = (a as usize).min(b as usize);
            let max = (a as usize).max(b as usize) + WORD;
            mark_all(&mut table, min, max, 0, 0);

            assert!(table
                .find(NonNull::new(b as *mut u8).unwrap())
                .unwrap()
                .flags
                .contains(Flags::MARKED));

            dealloc(a as *mut u8, layout);
            dealloc(b as *mut u8, layout);
        }
    }

    #[test]
    fn leaf_hinted_blocks_are_not_traced() {
        let layout = Layout::new::<usize>();
        unsafe {
            let a = alloc(layout) as *mut usize;
            let b = alloc(layout) as *mut usize;
            *a = b as usize;

            let mut table = PointerTable::new(0.9);
            table
                .insert(
                    NonNull::new(a as *mut u8).unwrap(),
                    WORD,
                    Flags::ROOT | Flags::LEAF,
                    None,
                )
                .unwrap();
            table
                .insert(NonNull::new(b as *mut u8).unwrap(), WORD, Flags::empty(), None)
                .unwrap();

            let min = (a as usize).min(b as usize);
            let max = (a as usize).max(b as usize) + WORD;
            mark_all(&mut table, min, max, 0, 0);

            assert!(!table
                .find(NonNull::new(b as *mut u8).unwrap())
                .unwrap()
                .flags
                .contains(Flags::MARKED));

            dealloc(a as *mut u8, layout);
            dealloc(b as *mut u8, layout);
        }
    }
}
