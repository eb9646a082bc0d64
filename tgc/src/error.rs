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

use std::fmt;

#[derive(Debug, PartialEq, Eq)]
/// Type of collector-internal error:
/// - The host allocator could not satisfy a request to grow or shrink the
///   pointer table (`TableAllocFailed`). The caller-visible effect is that
///   the old table is left untouched and the triggering operation (insert,
///   remove, sweep) still completes against the old capacity.
pub enum TgcError {
    TableAllocFailed,
}

impl fmt::Display for TgcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TgcError::TableAllocFailed => {
                write!(f, "failed to allocate a resized pointer table")
            }
        }
    }
}

impl std::error::Error for TgcError {}

pub type TgcResult<T> = Result<T, TgcError>;
