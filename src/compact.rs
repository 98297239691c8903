// gcsr converts binary edge lists into compressed sparse row graphs
// Copyright (C) 2022 Jacob Konrad
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Parallel stream compaction over sorted slices.
//!
//! A compaction keeps the positions selected by a [`Boundary`] and packs
//! them, in order, into a fresh buffer:
//!
//! 1. a bit vector and a prefix sum array are initialised in parallel,
//! 2. a parallel range scan sets the flag of every position to keep,
//! 3. a blocked exclusive prefix sum turns the flags into output offsets,
//! 4. a parallel scatter writes every kept position to its offset.
//!
//! ```
//! use gcsr_core::{compact, Edge};
//!
//! let edges = vec![Edge(1, 2), Edge(1, 2), Edge(1, 3), Edge(2, 1)];
//!
//! assert_eq!(vec![Edge(1, 2), Edge(1, 3), Edge(2, 1)], compact::dedup(&edges));
//! ```

use std::ops::Range;

use rayon::prelude::*;

use crate::{bitvec::BitVector, par, Edge};

/// Decides which positions of a sorted slice survive a compaction.
///
/// `keep` may only look at `items[i]` and one neighbour of it, so every
/// position in `scan` can be decided independently. `anchor` is kept
/// unconditionally on nonempty input.
pub trait Boundary<T>: Sync
{
    fn anchor(&self, len: usize) -> usize;

    fn scan(&self, len: usize) -> Range<usize>;

    fn keep(&self, items: &[T], i: usize) -> bool;
}

/// Keeps the last element of every run of equal neighbours.
pub struct LastOfRun;

impl<T: PartialEq + Sync> Boundary<T> for LastOfRun
{
    fn anchor(&self, len: usize) -> usize
    {
        len - 1
    }

    fn scan(&self, len: usize) -> Range<usize>
    {
        0..len.saturating_sub(1)
    }

    #[inline]
    fn keep(&self, items: &[T], i: usize) -> bool
    {
        items[i] != items[i + 1]
    }
}

/// Keeps the first edge of every source vertex.
pub struct RowStart;

impl Boundary<Edge> for RowStart
{
    fn anchor(&self, _len: usize) -> usize
    {
        0
    }

    fn scan(&self, len: usize) -> Range<usize>
    {
        1..len
    }

    #[inline]
    fn keep(&self, items: &[Edge], i: usize) -> bool
    {
        items[i].0 != items[i - 1].0
    }
}

/// The kept flags of a slice together with their exclusive prefix sum.
pub struct Marks
{
    bits: BitVector,
    prefix: Vec<u64>,
}

impl Marks
{
    pub fn new<T, B>(items: &[T], boundary: &B) -> Self
    where
        T: Sync,
        B: Boundary<T>,
    {
        let len = items.len();
        let bits = BitVector::new(len);

        if len > 0 {
            boundary.scan(len).into_par_iter().for_each(|i| {
                if boundary.keep(items, i) {
                    bits.set(i);
                }
            });
            bits.set(boundary.anchor(len));
        }

        let prefix = par::exclusive_prefix_sum(&bits);

        Self { bits, prefix }
    }

    /// Length of the marked input.
    pub fn len(&self) -> usize
    {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.bits.is_empty()
    }

    /// Number of kept positions.
    pub fn kept(&self) -> usize
    {
        self.prefix[self.len()] as usize
    }

    pub fn is_kept(&self, i: usize) -> bool
    {
        self.bits.get(i)
    }

    pub fn prefix(&self) -> &[u64]
    {
        &self.prefix[..]
    }

    /// Write `f(i)` for every kept position `i` to `out[prefix[i]]`.
    ///
    /// `out` must be exactly [`Marks::kept`] long. Every input block owns the
    /// window `out[prefix[start]..prefix[end]]`, so the tasks write disjoint
    /// slices and an offset outside its window is an invariant failure.
    pub fn scatter_into<U, F>(&self, out: &mut [U], f: F)
    where
        U: Send,
        F: Fn(usize) -> U + Sync,
    {
        assert_eq!(
            self.kept(),
            out.len(),
            "scatter target does not match kept count"
        );

        let len = self.len();
        let ranges = par::blocks(len, par::block_len(len));

        let mut windows = Vec::with_capacity(ranges.len());
        let mut rest = out;
        for range in ranges {
            let width = (self.prefix[range.end] - self.prefix[range.start]) as usize;
            let (window, tail) = std::mem::take(&mut rest).split_at_mut(width);
            windows.push((range, window));
            rest = tail;
        }
        debug_assert!(rest.is_empty());

        windows.into_par_iter().for_each(|(range, window)| {
            let base = self.prefix[range.start];
            for i in range {
                if self.bits.get(i) {
                    let k = (self.prefix[i] - base) as usize;
                    debug_assert!(
                        k < window.len(),
                        "scatter offset {} outside window of {}",
                        k,
                        window.len()
                    );
                    window[k] = f(i);
                }
            }
        });
    }

    /// Collect `f(i)` for every kept position, in input order.
    pub fn scatter<U, F>(&self, f: F) -> Vec<U>
    where
        U: Clone + Default + Send,
        F: Fn(usize) -> U + Sync,
    {
        let mut out = Vec::with_capacity(self.kept());
        out.par_extend(rayon::iter::repeat_n(U::default(), self.kept()));
        self.scatter_into(&mut out[..], f);
        out
    }
}

/// Compact a sorted slice, keeping the positions selected by `boundary`.
pub fn compact<T, B>(items: &[T], boundary: &B) -> Vec<T>
where
    T: Clone + Default + Send + Sync,
    B: Boundary<T>,
{
    if items.is_empty() {
        return Vec::new();
    }

    Marks::new(items, boundary).scatter(|i| items[i].clone())
}

/// Remove duplicate edges from a sorted edge list.
pub fn dedup(edges: &[Edge]) -> Vec<Edge>
{
    compact(edges, &LastOfRun)
}
