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

//! The capacity ladder the pointer table is sized against.
//!
//! Capacities are never arbitrary integers: they're drawn from this fixed
//! prime ladder so that `hash(ptr) % capacity` spreads base addresses (which
//! tend to share low bits thanks to allocator alignment) across the table
//! instead of colliding on a power-of-two modulus.

/// The ladder itself, smallest-to-largest. A fixed set of rungs keeps the
/// capacity sequence predictable and avoids recomputing primality on every
/// resize.
const LADDER: [usize; 24] = [
    0, 1, 5, 11, 23, 53, 101, 197, 389, 683, 1259, 2417, 4733, 9371, 18617, 37097, 74093, 148073,
    296099, 592019, 1100009, 2200013, 4400021, 8800019,
];

/// The smallest prime on the ladder that is `>= ceil((n + 1) / load_factor)`,
/// or, once `n` outgrows the ladder, the smallest integer multiple of the
/// largest rung that still clears the target.
///
/// `load_factor` is assumed to lie in `(0, 1]`; callers are expected to have
/// validated that at construction time.
pub fn ideal_capacity(n: usize, load_factor: f64) -> usize {
    // Deliberately truncating, not rounding up: a slightly smaller target
    // capacity just means the next insert grows the table one rung sooner.
    let target = ((n + 1) as f64 / load_factor) as usize;
    if let Some(&rung) = LADDER.iter().find(|&&p| p >= target) {
        return rung;
    }
    let last = *LADDER.last().unwrap();
    let mut i = 1usize;
    loop {
        let candidate = last * i;
        if candidate >= target {
            return candidate;
        }
        i += 1;
    }
}
