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

use std::ptr::NonNull;

bitflags::bitflags! {
    /// Bits tracked per block. `ROOT` and `MARKED` are load-bearing for the
    /// collector itself; `LEAF` and `USER2` are caller hints that the
    /// collector preserves across `realloc` but is free to ignore when
    /// deciding what to scan.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// Persistent root: always scanned, never swept, regardless of mark state.
        const ROOT = 0b0001;
        /// Internal only. The mutator must never set this directly; `run()`
        /// sets it during mark and clears it during sweep.
        const MARKED = 0b0010;
        /// Caller hint: this block holds no outgoing pointers and need not
        /// be traced. The collector may honor this to skip a scan.
        const LEAF = 0b0100;
        /// A second reserved caller hint bit, otherwise unused by the core.
        const USER2 = 0b1000;
    }
}

/// A finalizer invoked with the block's base address immediately before the
/// block is returned to the host allocator. Never invoked more than once per
/// block, and never invoked on a block that is still reachable.
pub type Finalizer = fn(NonNull<u8>);

#[derive(Clone, Copy)]
/// One entry in the pointer table: everything the collector knows about a
/// single tracked allocation.
///
/// A table slot is `Option<Descriptor>`, using Rust's own niche for the
/// empty-slot sentinel rather than a zeroed hash field. `ideal_index` (the
/// slot this descriptor would occupy with no collisions) is recomputed from
/// `base` and the table's current capacity rather than cached, since it
/// changes on every rehash.
pub struct Descriptor {
    pub base: NonNull<u8>,
    pub size: usize,
    pub flags: Flags,
    pub finalizer: Option<Finalizer>,
}

impl Descriptor {
    /// Half-open byte range `[base, base + size)` this descriptor covers.
    pub fn contains(&self, addr: usize) -> bool {
        let base = self.base.as_ptr() as usize;
        addr >= base && addr < base + self.size
    }
}
