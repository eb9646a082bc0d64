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

//! The pointer table: an open-addressed, Robin-Hood-displaced hash table
//! keyed by block base address.
//!
//! Unlike the SIMD group-probed table in this codebase's sibling data
//! structures, this one doesn't need vectorized group scans. The table is
//! small relative to a mutator's working set and the dominant cost is the
//! conservative scan, not the table lookup. What it does borrow from that
//! style is the discipline: every slot transition is a named, independently
//! testable operation rather than one large function.

use crate::descriptor::{Descriptor, Finalizer, Flags};
use crate::error::{TgcError, TgcResult};
use crate::primes::ideal_capacity;
use std::ptr::NonNull;

/// `hash(ptr) = (ptr as integer) >> 3`. Pointers returned by any allocator
/// worth using are at least 8-byte aligned, so the low 3 bits carry no
/// information; dropping them spreads the hash over more of the table.
fn hash_addr(addr: usize) -> usize {
    addr >> 3
}

fn ideal_index(addr: usize, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    hash_addr(addr) % capacity
}

/// Displacement of a slot at index `i` whose occupant's ideal index is
/// `ideal`: `(i - ideal) mod capacity`.
fn displacement(i: usize, ideal: usize, capacity: usize) -> usize {
    if i >= ideal {
        i - ideal
    } else {
        capacity - (ideal - i)
    }
}

pub struct PointerTable {
    slots: Vec<Option<Descriptor>>,
    nitems: usize,
    load_factor: f64,
}

impl PointerTable {
    pub fn new(load_factor: f64) -> Self {
        Self {
            slots: Vec::new(),
            nitems: 0,
            load_factor,
        }
    }

    pub fn len(&self) -> usize {
        self.nitems
    }

    pub fn is_empty(&self) -> bool {
        self.nitems == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn set_load_factor(&mut self, lf: f64) {
        self.load_factor = lf;
    }

    /// Grows the table, if needed, to the ideal capacity for `nitems + 1`,
    /// then Robin-Hood-inserts a fresh descriptor for `base`. Re-inserting an
    /// already-tracked `base` is a silent no-op (returns `Ok(false)`).
    pub fn insert(
        &mut self,
        base: NonNull<u8>,
        size: usize,
        flags: Flags,
        finalizer: Option<Finalizer>,
    ) -> TgcResult<bool> {
        self.grow_for_insert()?;
        Ok(self.raw_insert(Descriptor {
            base,
            size,
            flags,
            finalizer,
        }))
    }

    pub fn find(&self, base: NonNull<u8>) -> Option<&Descriptor> {
        self.find_index(base.as_ptr() as usize)
            .map(|i| self.slots[i].as_ref().unwrap())
    }

    pub fn find_mut(&mut self, base: NonNull<u8>) -> Option<&mut Descriptor> {
        self.find_index(base.as_ptr() as usize)
            .map(move |i| self.slots[i].as_mut().unwrap())
    }

    /// Removes the descriptor for `base`, if tracked, compacting the table
    /// with backward-shift deletion. Does **not** shrink the table itself.
    /// Callers that want the table to shrink after a removal call
    /// [`PointerTable::fit`] afterwards; sweep must not shrink mid-walk, so
    /// it calls `fit` itself only once the whole table has been processed.
    pub fn remove(&mut self, base: NonNull<u8>) -> Option<Descriptor> {
        let i = self.find_index(base.as_ptr() as usize)?;
        Some(self.remove_at(i))
    }

    /// Finds, starting from the ideal index for `addr`, the first occupied
    /// slot whose tracked range contains `addr` and is not yet marked. `addr`
    /// is an arbitrary candidate machine word, not necessarily equal to any
    /// tracked base, but the Robin-Hood probe bound still lets us stop early
    /// because `hash_addr` is monotone in the pointer's upper bits, so a
    /// pointer into the middle of a block hashes close to that block's own
    /// base.
    pub fn find_containing_unmarked(&self, addr: usize) -> Option<usize> {
        let cap = self.capacity();
        if cap == 0 {
            return None;
        }
        let mut i = ideal_index(addr, cap);
        let mut probes = 0usize;
        loop {
            match self.slots[i] {
                None => return None,
                Some(d) => {
                    let d_ideal = ideal_index(d.base.as_ptr() as usize, cap);
                    let d_disp = displacement(i, d_ideal, cap);
                    if d_disp < probes {
                        return None;
                    }
                    if d.contains(addr) && !d.flags.contains(Flags::MARKED) {
                        return Some(i);
                    }
                }
            }
            i = (i + 1) % cap;
            probes += 1;
        }
    }

    pub fn slot(&self, index: usize) -> Option<&Descriptor> {
        self.slots[index].as_ref()
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut Descriptor> {
        self.slots[index].as_mut()
    }

    /// Clears an already-unreachable slot during sweep, compacting with
    /// backward-shift. Returns the evicted descriptor so the caller can run
    /// its finalizer and enqueue its pointer for the host deallocator.
    /// Deliberately does not advance any cursor or shrink the table; sweep
    /// owns that sequencing.
    pub fn remove_at(&mut self, index: usize) -> Descriptor {
        let removed = self.slots[index].take().expect("remove_at on empty slot");
        self.nitems -= 1;
        let cap = self.capacity();
        let mut j = index;
        loop {
            let nj = (j + 1) % cap;
            let pull = match self.slots[nj] {
                None => false,
                Some(next) => {
                    let next_ideal = ideal_index(next.base.as_ptr() as usize, cap);
                    displacement(nj, next_ideal, cap) > 0
                }
            };
            if pull {
                self.slots[j] = self.slots[nj].take();
                j = nj;
            } else {
                break;
            }
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        0..self.capacity()
    }

    /// Recomputes the ideal capacity for the current item count and rehashes
    /// if it differs from the current capacity, in either direction. Used
    /// after a sweep and, explicitly, by the facade after a `free` removal.
    pub fn fit(&mut self) -> TgcResult<()> {
        let ideal = ideal_capacity(self.nitems, self.load_factor);
        if ideal != self.capacity() {
            self.rehash(ideal)?;
        }
        Ok(())
    }

    fn grow_for_insert(&mut self) -> TgcResult<()> {
        let ideal = ideal_capacity(self.nitems + 1, self.load_factor);
        if ideal > self.capacity() {
            self.rehash(ideal)?;
        }
        Ok(())
    }

    fn rehash(&mut self, new_capacity: usize) -> TgcResult<()> {
        let mut new_slots = Vec::new();
        if new_slots.try_reserve_exact(new_capacity).is_err() {
            log::warn!(
                "pointer table resize to {} slots failed; keeping {} slots",
                new_capacity,
                self.capacity()
            );
            return Err(TgcError::TableAllocFailed);
        }
        log::trace!(
            "rehashing pointer table: {} -> {} slots ({} items)",
            self.capacity(),
            new_capacity,
            self.nitems
        );
        new_slots.resize_with(new_capacity, || None);

        let old_slots = std::mem::replace(&mut self.slots, new_slots);
        self.nitems = 0; // raw_insert below recounts as it replays the old slots
        for slot in old_slots.into_iter().flatten() {
            let reinserted = self.raw_insert(slot);
            debug_assert!(reinserted, "duplicate base address survived a rehash");
        }
        Ok(())
    }

    /// The actual Robin-Hood probe-and-displace loop. Assumes capacity
    /// already accommodates one more item; does not grow.
    fn raw_insert(&mut self, mut desc: Descriptor) -> bool {
        let cap = self.capacity();
        assert!(cap > 0, "raw_insert into a zero-capacity table");
        let mut i = ideal_index(desc.base.as_ptr() as usize, cap);
        let mut dist = 0usize;
        loop {
            match self.slots[i] {
                None => {
                    self.slots[i] = Some(desc);
                    self.nitems += 1;
                    return true;
                }
                Some(existing) if existing.base == desc.base => {
                    return false;
                }
                Some(existing) => {
                    let existing_ideal = ideal_index(existing.base.as_ptr() as usize, cap);
                    let existing_dist = displacement(i, existing_ideal, cap);
                    if dist >= existing_dist {
                        self.slots[i] = Some(desc);
                        desc = existing;
                        dist = existing_dist;
                    }
                }
            }
            i = (i + 1) % cap;
            dist += 1;
        }
    }

    fn find_index(&self, addr: usize) -> Option<usize> {
        let cap = self.capacity();
        if cap == 0 {
            return None;
        }
        let mut i = ideal_index(addr, cap);
        let mut dist = 0usize;
        loop {
            match self.slots[i] {
                None => return None,
                Some(d) => {
                    if d.base.as_ptr() as usize == addr {
                        return Some(i);
                    }
                    let d_ideal = ideal_index(d.base.as_ptr() as usize, cap);
                    let d_disp = displacement(i, d_ideal, cap);
                    if d_disp < dist {
                        return None;
                    }
                }
            }
            i = (i + 1) % cap;
            dist += 1;
        }
    }
}
