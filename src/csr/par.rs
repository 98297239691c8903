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

use rayon::prelude::*;

use crate::{
    compact::{Marks, RowStart},
    Edge,
};

/// `row` and `ptr` from the first position of every source vertex.
fn row_and_ptr(edgelist: &[Edge]) -> (Vec<u32>, Vec<u32>)
{
    let len = edgelist.len();

    if len == 0 {
        return (vec![], vec![0]);
    }

    let marks = Marks::new(edgelist, &RowStart);
    let num_rows = marks.kept();

    rayon::join(
        || marks.scatter(|i| edgelist[i].0),
        || {
            let mut ptr = Vec::with_capacity(num_rows + 1);
            ptr.par_extend(rayon::iter::repeat_n(0u32, num_rows + 1));
            marks.scatter_into(&mut ptr[..num_rows], |i| i as u32);
            ptr[num_rows] = len as u32;
            ptr
        },
    )
}

fn col(edgelist: &[Edge]) -> Vec<u32>
{
    edgelist.par_iter().map(|&Edge(_, v)| v).collect()
}

/// Split a deduplicated, sorted edge list into `(row, ptr, col)`.
///
/// The caller guarantees that `edgelist.len()` fits a `u32`.
pub fn edgelist_to_csr(edgelist: &[Edge]) -> (Vec<u32>, Vec<u32>, Vec<u32>)
{
    debug_assert!(edgelist.len() <= u32::MAX as usize);
    debug_assert!(edgelist.windows(2).all(|w| w[0] < w[1]));

    let ((row, ptr), col) = rayon::join(|| row_and_ptr(edgelist), || col(edgelist));

    (row, ptr, col)
}
