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

//! A conservative, tracing mark-and-sweep garbage collector for
//! manually-managed host heap allocations.
//!
//! This crate does not replace Rust's ownership model for `Box`/`Rc`/`Arc`
//! values. It exists for the narrower case of code that already allocates
//! through raw pointers (FFI boundaries, arena-style native data structures,
//! interpreters embedding a foreign object graph) and wants periodic,
//! best-effort reclamation of whatever in that graph has become unreachable,
//! without tracking every reference by hand.
//!
//! ```
//! use tgc::Collector;
//!
//! let anchor = 0usize;
//! let mut gc = Collector::start(&anchor);
//! let root = gc.alloc_root(std::mem::size_of::<usize>()).unwrap();
//! unsafe { *(root.as_ptr() as *mut usize) = 0 };
//! gc.run();
//! assert_eq!(gc.len(), 1); // root survives an explicit collection
//! gc.free(Some(root));
//! gc.stop();
//! ```
//!
//! See [`Collector`] for the full operation set, and the crate's `tests/`
//! directory for end-to-end lifecycle scenarios.

mod collector;
mod descriptor;
mod error;
mod facade;
mod mark;
mod primes;
mod sweep;
mod table;

pub use collector::Collector;
pub use descriptor::{Finalizer, Flags};
pub use error::{TgcError, TgcResult};
