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

//! Packed flags shared between the tasks of a parallel scan.

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

const WORD_BITS: usize = u32::BITS as usize;

/// `len` flags packed into `ceil(len / 32)` atomic words.
///
/// Flags are set and read with `Ordering::Relaxed`. Marking and reading
/// happen in separate fork-join phases, and the join between them already
/// orders every write before every read, so no flag needs stronger ordering.
/// The atomic itself is still needed: two neighbouring flags share a word and
/// may be set by different tasks.
pub struct BitVector
{
    words: Vec<AtomicU32>,
    len: usize,
}

impl BitVector
{
    /// All flags cleared. The words are initialised in parallel.
    pub fn new(len: usize) -> Self
    {
        let num_words = (len + WORD_BITS - 1) / WORD_BITS;
        let mut words = Vec::with_capacity(num_words);
        words.par_extend((0..num_words).into_par_iter().map(|_| AtomicU32::new(0)));
        Self { words, len }
    }

    pub fn len(&self) -> usize
    {
        self.len
    }

    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    #[inline]
    pub fn set(&self, i: usize)
    {
        debug_assert!(i < self.len, "bit {} out of range {}", i, self.len);
        self.words[i / WORD_BITS].fetch_or(1 << (i % WORD_BITS), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool
    {
        debug_assert!(i < self.len, "bit {} out of range {}", i, self.len);
        self.words[i / WORD_BITS].load(Ordering::Relaxed) & (1 << (i % WORD_BITS)) != 0
    }

    /// Number of set flags.
    pub fn count_ones(&self) -> u64
    {
        self.words
            .par_iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones() as u64)
            .sum()
    }
}
