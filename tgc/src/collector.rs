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

//! Collector lifecycle and trigger policy.
//!
//! `Collector` itself is just state: the pointer table and its bounds, plus
//! the stack anchor and tuning knobs. Everything that mutates it beyond
//! `start`/`stop`/`run` lives in `facade.rs`, driven through `mark`/`sweep`.

use crate::mark;
use crate::sweep;
use crate::table::PointerTable;

pub(crate) const DEFAULT_LOAD_FACTOR: f64 = 0.9;
pub(crate) const DEFAULT_SWEEP_FACTOR: f64 = 0.5;

/// A conservative, tracing mark-and-sweep collector over host heap
/// allocations. Not `Send`/`Sync`: exactly one mutator thread may drive a
/// given `Collector`.
pub struct Collector {
    pub(crate) table: PointerTable,
    pub(crate) stack_anchor: usize,
    pub(crate) min_ptr: usize,
    pub(crate) max_ptr: usize,
    pub(crate) threshold: usize,
    pub(crate) sweep_factor: f64,
}

impl Collector {
    /// Begins collecting. `anchor` should be a reference to a local variable
    /// declared as early as practical in the mutator's call stack (commonly
    /// in `main`), or any other address at the "far" end of the stack range
    /// this collector should scan.
    pub fn start<T>(anchor: &T) -> Self {
        Self::start_at(anchor as *const T as usize)
    }

    /// Same as [`Collector::start`], for callers that already have a raw
    /// address (e.g. re-deriving the anchor across an FFI boundary) rather
    /// than a reference in hand.
    pub fn start_at(anchor_addr: usize) -> Self {
        log::debug!("starting collector with stack anchor {:#x}", anchor_addr);
        Self {
            table: PointerTable::new(DEFAULT_LOAD_FACTOR),
            stack_anchor: anchor_addr,
            min_ptr: usize::MAX,
            max_ptr: 0,
            threshold: 0,
            sweep_factor: DEFAULT_SWEEP_FACTOR,
        }
    }

    /// Overrides the load factor used to size the pointer table. Has no
    /// effect on blocks already tracked; takes effect on the next resize.
    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        assert!(
            load_factor > 0.0 && load_factor <= 1.0,
            "load factor must be in (0, 1]"
        );
        self.table.set_load_factor(load_factor);
        self
    }

    /// Overrides the sweep factor used to recompute the collection
    /// threshold after each `run()`.
    pub fn with_sweep_factor(mut self, sweep_factor: f64) -> Self {
        assert!(sweep_factor >= 0.0, "sweep factor must be non-negative");
        self.sweep_factor = sweep_factor;
        self
    }

    /// Releases the collector's own bookkeeping memory. Outstanding tracked
    /// blocks are **not** swept or finalized. Consuming `self` here is
    /// enough; `Drop` on `PointerTable` (a plain `Vec`) does the actual
    /// deallocation.
    pub fn stop(self) {
        log::debug!(
            "stopping collector with {} blocks still tracked (not finalized)",
            self.table.len()
        );
    }

    /// Forces one mark-and-sweep cycle regardless of the current item count
    /// versus the collection threshold.
    pub fn run(&mut self) {
        log::debug!(
            "collection cycle starting: {} items tracked",
            self.table.len()
        );
        self.mark_phase();
        let freed = sweep::sweep(&mut self.table);
        self.finish_sweep(freed);
        log::debug!(
            "collection cycle complete: {} items live, next threshold {}",
            self.table.len(),
            self.threshold
        );
    }

    /// Marks roots and the machine stack. Splitting this out of `run` keeps
    /// the register-spill scratch buffer scoped to exactly the frame that
    /// needs it.
    fn mark_phase(&mut self) {
        // Force callee-saved registers that might hold the only live
        // reference to a tracked block onto the stack before we compute the
        // near end of the scan range. `black_box` stops the optimizer from
        // proving the buffer dead and eliding the spill.
        let mut spill = [0usize; 32];
        for (i, word) in spill.iter_mut().enumerate() {
            *word = i;
        }
        let spill = std::hint::black_box(spill);
        let here = spill.as_ptr() as usize;

        let (low, high) = if self.stack_anchor <= here {
            (self.stack_anchor, here)
        } else {
            (here, self.stack_anchor)
        };
        mark::mark_all(&mut self.table, self.min_ptr, self.max_ptr, low, high);
    }

    fn finish_sweep(&mut self, freed: Vec<(std::ptr::NonNull<u8>, usize)>) {
        self.threshold =
            self.table.len() + (self.table.len() as f64 * self.sweep_factor) as usize + 1;
        for (base, size) in freed {
            // SAFETY: `base`/`size` came straight out of a descriptor this
            // sweep determined unreachable and non-root; nothing else holds
            // a reference to it (that's what "unreachable" means here), and
            // it was allocated through this crate's own facade with the
            // same layout we reconstruct in `free_layout`.
            unsafe { crate::facade::dealloc_block(base, size) };
        }
    }

    pub(crate) fn maybe_collect(&mut self) {
        if self.table.len() > self.threshold {
            self.run();
        }
    }

    pub(crate) fn note_bounds(&mut self, base: usize, size: usize) {
        self.min_ptr = self.min_ptr.min(base);
        self.max_ptr = self.max_ptr.max(base + size);
    }
}
