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

//! The allocator-facade family: `alloc`/`calloc`/`realloc`/`free` and their
//! `_opt`/root-flavored siblings.
//!
//! Every tracked block is allocated with the same fixed alignment. Rust's
//! allocator API is stricter than a bare `malloc`: `dealloc` and the
//! move-arm of `realloc` both need the *exact* `Layout` a block was created
//! with, so that layout has to be reconstructible from `size` alone. Pinning
//! every block to pointer alignment (already required for the conservative
//! scan to be sound) makes that reconstruction exact.

use crate::collector::Collector;
use crate::descriptor::{Finalizer, Flags};
use std::alloc::{self, Layout};
use std::mem;
use std::ptr::NonNull;

const ALLOC_ALIGN: usize = mem::align_of::<usize>();

fn layout_for(size: usize) -> Layout {
    Layout::from_size_align(size, ALLOC_ALIGN)
        .expect("tracked block size overflows isize::MAX")
}

/// # Safety
/// `base` must have been returned by `alloc`/`alloc_zeroed`/`realloc` in
/// this module with a layout of exactly `layout_for(size)`, and must not
/// already have been freed.
pub(crate) unsafe fn dealloc_block(base: NonNull<u8>, size: usize) {
    if size == 0 {
        return;
    }
    alloc::dealloc(base.as_ptr(), layout_for(size));
}

impl Collector {
    /// Allocates `size` bytes, tracked with no flags and no finalizer.
    /// Returns `None` on host allocator failure, exactly as `malloc` would
    /// return `NULL`.
    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.alloc_opt(size, Flags::empty(), None)
    }

    /// Convenience for `alloc_opt(size, Flags::ROOT, None)`.
    pub fn alloc_root(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.alloc_opt(size, Flags::ROOT, None)
    }

    pub fn alloc_opt(
        &mut self,
        size: usize,
        flags: Flags,
        finalizer: Option<Finalizer>,
    ) -> Option<NonNull<u8>> {
        if size == 0 {
            // Rust's `GlobalAlloc` forbids zero-sized layouts; there is
            // nothing meaningful to track here either way.
            return None;
        }
        let raw = unsafe { alloc::alloc(layout_for(size)) };
        let base = NonNull::new(raw)?;
        self.track(base, size, flags, finalizer)
    }

    pub fn calloc(&mut self, num: usize, size: usize) -> Option<NonNull<u8>> {
        self.calloc_opt(num, size, Flags::empty(), None)
    }

    pub fn calloc_root(&mut self, num: usize, size: usize) -> Option<NonNull<u8>> {
        self.calloc_opt(num, size, Flags::ROOT, None)
    }

    pub fn calloc_opt(
        &mut self,
        num: usize,
        size: usize,
        flags: Flags,
        finalizer: Option<Finalizer>,
    ) -> Option<NonNull<u8>> {
        let total = num.checked_mul(size)?;
        if total == 0 {
            return None;
        }
        let raw = unsafe { alloc::alloc_zeroed(layout_for(total)) };
        let base = NonNull::new(raw)?;
        self.track(base, total, flags, finalizer)
    }

    fn track(
        &mut self,
        base: NonNull<u8>,
        size: usize,
        flags: Flags,
        finalizer: Option<Finalizer>,
    ) -> Option<NonNull<u8>> {
        match self.table.insert(base, size, flags, finalizer) {
            Ok(_) => {
                self.note_bounds(base.as_ptr() as usize, size);
                self.maybe_collect();
                Some(base)
            }
            Err(_) => {
                // The table couldn't grow to accommodate this block. The old
                // table is left untouched and the whole operation reports
                // failure upward, which means giving the memory we just took
                // from the host allocator back to it.
                unsafe { dealloc_block(base, size) };
                None
            }
        }
    }

    /// Mirrors `realloc`: `ptr == None` behaves like `alloc`. A host failure
    /// removes the old descriptor, even though the block is technically
    /// still live. Otherwise the descriptor is resized in place or, on a
    /// move, re-inserted at the new address with its flags *and* finalizer
    /// carried forward.
    pub fn realloc(&mut self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        let Some(old) = ptr else {
            return self.alloc(size);
        };
        let Some(old_size) = self.table.find(old).map(|d| d.size) else {
            // Untracked pointer. Unlike the host's own `realloc`, we have no
            // recorded `Layout` to hand to Rust's allocator, and guessing
            // one would be undefined behavior. Treated as a no-op, the same
            // way `get_flags`/`get_dtor` treat a lookup miss.
            return None;
        };
        if size == 0 {
            self.free(Some(old));
            return None;
        }
        let old_layout = layout_for(old_size);
        let new_raw = unsafe { alloc::realloc(old.as_ptr(), old_layout, size) };
        match NonNull::new(new_raw) {
            None => {
                self.table.remove(old);
                None
            }
            Some(newptr) if newptr.as_ptr() as usize == old.as_ptr() as usize => {
                if let Some(d) = self.table.find_mut(old) {
                    d.size = size;
                }
                self.note_bounds(old.as_ptr() as usize, size);
                Some(newptr)
            }
            Some(newptr) => {
                let (flags, finalizer) = self
                    .table
                    .find(old)
                    .map(|d| (d.flags, d.finalizer))
                    .unwrap_or((Flags::empty(), None));
                self.table.remove(old);
                match self.table.insert(newptr, size, flags, finalizer) {
                    Ok(_) => {
                        self.note_bounds(newptr.as_ptr() as usize, size);
                        Some(newptr)
                    }
                    Err(_) => None,
                }
            }
        }
    }

    /// `ptr == None` is a no-op. Otherwise removes the descriptor (if any)
    /// and frees the block. The table is always given a chance to shrink
    /// and the threshold is always recomputed afterwards, even when `ptr`
    /// wasn't a block this collector tracked.
    pub fn free(&mut self, ptr: Option<NonNull<u8>>) {
        let Some(p) = ptr else { return };
        if let Some(desc) = self.table.remove(p) {
            unsafe { dealloc_block(desc.base, desc.size) };
        }
        let _ = self.table.fit();
        self.threshold = self.table.len() + self.table.len() / 2 + 1;
    }

    pub fn set_flags(&mut self, ptr: NonNull<u8>, flags: Flags) {
        if let Some(d) = self.table.find_mut(ptr) {
            d.flags = flags;
        }
    }

    pub fn get_flags(&self, ptr: NonNull<u8>) -> Flags {
        self.table.find(ptr).map(|d| d.flags).unwrap_or(Flags::empty())
    }

    pub fn set_dtor(&mut self, ptr: NonNull<u8>, finalizer: Option<Finalizer>) {
        if let Some(d) = self.table.find_mut(ptr) {
            d.finalizer = finalizer;
        }
    }

    pub fn get_dtor(&self, ptr: NonNull<u8>) -> Option<Finalizer> {
        self.table.find(ptr).and_then(|d| d.finalizer)
    }

    /// Number of blocks currently tracked. Useful for tests and callers
    /// instrumenting their own heap pressure.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
