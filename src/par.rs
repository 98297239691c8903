use std::{cmp, ops::Add, ops::Range};

use rayon::prelude::*;

use crate::bitvec::BitVector;

/// Smallest block handed to a single task by the blocked scans.
pub const MIN_BLOCK: usize = 4 * 1024;

const BLOCKS_PER_THREAD: usize = 4;

/// `[init, init + x0, init + x0 + x1, ...]`, one element longer than `vect`.
pub fn exclusive_sum<T>(init: T, vect: Vec<T>) -> Vec<T>
where
    T: Add<Output = T> + Copy + Sized + Send,
{
    rayon::iter::once(init)
        .chain(vect.into_par_iter())
        .fold(Vec::new, |mut acc, x| {
            match acc.last() {
                Some(&sum) => acc.push(sum + x),
                None => acc.push(x),
            };
            acc
        })
        .reduce(Vec::new, |mut left, right| match left.last() {
            Some(&sum) => {
                left.extend(right.into_iter().map(|x| x + sum));
                left
            }
            None => right,
        })
}

/// Block length used to partition `len` positions over the current pool.
///
/// Always a multiple of 32 so a block boundary never splits a bit vector word.
pub fn block_len(len: usize) -> usize
{
    let blocks = rayon::current_num_threads() * BLOCKS_PER_THREAD;
    let per_block = (len + blocks - 1) / blocks;
    cmp::max(MIN_BLOCK, (per_block + 31) / 32 * 32)
}

/// `[0, len)` split into consecutive ranges of `block` positions.
pub fn blocks(len: usize, block: usize) -> Vec<Range<usize>>
{
    (0..len)
        .step_by(cmp::max(block, 1))
        .map(|start| start..cmp::min(start + block, len))
        .collect()
}

/// Exclusive prefix sum over the flags of `bits`.
///
/// The result has `bits.len() + 1` entries, `prefix[i]` being the number of
/// set flags in `[0, i)`. Two passes over fixed blocks: the first counts the
/// flags of every block, the block totals are scanned into carries, and the
/// second pass writes the running count of each block starting from its
/// carry.
pub fn exclusive_prefix_sum(bits: &BitVector) -> Vec<u64>
{
    let len = bits.len();
    let mut prefix = Vec::with_capacity(len + 1);
    prefix.par_extend(rayon::iter::repeat_n(0u64, len + 1));

    if len == 0 {
        return prefix;
    }

    let block = block_len(len);
    let ranges = blocks(len, block);

    let totals: Vec<u64> = ranges
        .par_iter()
        .map(|range| range.clone().filter(|&i| bits.get(i)).count() as u64)
        .collect();

    let carries = exclusive_sum(0u64, totals);

    prefix[1..]
        .par_chunks_mut(block)
        .zip(carries.par_iter())
        .enumerate()
        .for_each(|(b, (out, &carry))| {
            let start = b * block;
            let mut acc = carry;
            for (j, slot) in out.iter_mut().enumerate() {
                if bits.get(start + j) {
                    acc += 1;
                }
                *slot = acc;
            }
        });

    debug_assert_eq!(carries.last().copied(), prefix.last().copied());

    prefix
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn bits_from(flags: &[bool]) -> BitVector
    {
        let bits = BitVector::new(flags.len());
        for (i, &flag) in flags.iter().enumerate() {
            if flag {
                bits.set(i);
            }
        }
        bits
    }

    #[test]
    fn exclusive_sum_carries_the_total()
    {
        assert_eq!(vec![0, 3, 3, 7], exclusive_sum(0u64, vec![3, 0, 4]));
        assert_eq!(vec![5], exclusive_sum(5u64, vec![]));
    }

    #[test]
    fn blocks_cover_range()
    {
        assert_eq!(vec![0..4, 4..8, 8..10], blocks(10, 4));
        assert!(blocks(0, 4).is_empty());
        assert_eq!(0, block_len(1_000_000) % 32);
    }

    #[test]
    fn prefix_sum_small()
    {
        let bits = bits_from(&[true, false, true, true, false]);
        assert_eq!(vec![0, 1, 1, 2, 3, 3], exclusive_prefix_sum(&bits));
    }

    #[test]
    fn prefix_sum_empty()
    {
        assert_eq!(vec![0], exclusive_prefix_sum(&BitVector::new(0)));
    }

    #[test]
    fn prefix_sum_spans_many_blocks()
    {
        let n = 5 * MIN_BLOCK + 17;
        let flags: Vec<bool> = (0..n).map(|i| i % 7 == 0 || i % 11 == 3).collect();
        let bits = bits_from(&flags);

        let mut expected = Vec::with_capacity(n + 1);
        let mut acc = 0u64;
        expected.push(acc);
        for &flag in &flags {
            acc += flag as u64;
            expected.push(acc);
        }

        let pool = rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        assert_eq!(expected, pool.install(|| exclusive_prefix_sum(&bits)));
    }
}
