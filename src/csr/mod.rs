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

//! Compressed Sparse Row representation of directed graphs as three flat
//! arrays: the distinct source vertices (`row`), the offset of every source's
//! destinations (`ptr`) and the destinations themselves (`col`).
//!
//! Unlike a dense CSR only vertices with at least one outgoing edge get a row,
//! so `ptr` has `row.len() + 1` entries rather than one per vertex id.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use rayon::prelude::*;

use crate::{
    compact,
    error::Result,
    io::{self, ChunkedIo},
    Edge, Error,
};

mod par;

pub const ROW_EXTENSION: &str = "row";

pub const PTR_EXTENSION: &str = "ptr";

pub const COL_EXTENSION: &str = "col";

const PART_SUFFIX: &str = ".part";

/// `<base>.<extension>`, keeping any dot already in the base name.
pub fn array_path(base: &Path, extension: &str) -> PathBuf
{
    let mut path = OsString::from(base.as_os_str());
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

fn part_path(base: &Path, extension: &str) -> PathBuf
{
    let mut path = array_path(base, extension).into_os_string();
    path.push(PART_SUFFIX);
    PathBuf::from(path)
}

/// Builds CSRs on a dedicated thread pool.
pub struct CSRBuilder
{
    num_threads: usize,
}

impl Default for CSRBuilder
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl CSRBuilder
{
    pub fn new() -> Self
    {
        Self {
            num_threads: num_cpus::get(),
        }
    }

    pub fn num_threads(self, num_threads: usize) -> Self
    {
        Self { num_threads }
    }

    /// Sort, deduplicate and encode `edges`.
    pub fn build(self, edges: Vec<Edge>) -> Result<CSR>
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()?;
        pool.install(|| CSR::from_edges(edges))
    }
}

/// The Compressed Sparse Row struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CSR
{
    row: Vec<u32>,
    ptr: Vec<u32>,
    col: Vec<u32>,
}

impl Default for CSR
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl CSR
{
    /// An empty graph.
    pub fn new() -> Self
    {
        Self {
            row: vec![],
            ptr: vec![0],
            col: vec![],
        }
    }

    /// Encode a deduplicated edge list sorted by `(src, dst)`.
    ///
    /// The `row`/`ptr` and `col` arrays are built concurrently.
    ///
    /// # Examples
    ///
    /// ```
    /// use gcsr_core::{csr::CSR, Edge};
    ///
    /// let csr = CSR::encode(&[Edge(0, 1), Edge(0, 2), Edge(3, 0)]).unwrap();
    ///
    /// assert_eq!(&[0, 3], csr.row());
    /// assert_eq!(&[0, 2, 3], csr.ptr());
    /// assert_eq!(&[1, 2, 0], csr.col());
    /// ```
    pub fn encode(edges: &[Edge]) -> Result<Self>
    {
        if edges.len() > u32::MAX as usize {
            return Err(Error::TooManyEdges(edges.len()));
        }

        let (row, ptr, col) = par::edgelist_to_csr(edges);

        Ok(Self { row, ptr, col })
    }

    /// Sort, deduplicate and encode an arbitrary edge list.
    ///
    /// # Examples
    ///
    /// ```
    /// use gcsr_core::{csr::CSR, Edge};
    ///
    /// let csr = CSR::from_edges(vec![Edge(2, 1), Edge(0, 1), Edge(2, 1)]).unwrap();
    ///
    /// assert_eq!(vec![Edge(0, 1), Edge(2, 1)], csr.edges().collect::<Vec<_>>());
    /// ```
    pub fn from_edges(mut edges: Vec<Edge>) -> Result<Self>
    {
        edges.par_sort_unstable();
        Self::encode(&compact::dedup(&edges))
    }

    /// Distinct source vertices, strictly ascending.
    pub fn row(&self) -> &[u32]
    {
        &self.row[..]
    }

    pub fn ptr(&self) -> &[u32]
    {
        &self.ptr[..]
    }

    pub fn col(&self) -> &[u32]
    {
        &self.col[..]
    }

    /// The number of rows, i.e. vertices with outgoing edges.
    pub fn order(&self) -> usize
    {
        self.row.len()
    }

    /// The number of edges.
    pub fn size(&self) -> usize
    {
        self.col.len()
    }

    /// The destinations of `source`, sorted.
    ///
    /// # Examples
    ///
    /// ```
    /// use gcsr_core::{csr::CSR, Edge};
    ///
    /// let csr = CSR::from_edges(vec![Edge(5, 2), Edge(5, 1), Edge(9, 5)]).unwrap();
    ///
    /// assert_eq!(&[1, 2], csr.neighbors(5));
    /// assert!(csr.neighbors(1).is_empty());
    /// ```
    pub fn neighbors(&self, source: u32) -> &[u32]
    {
        match self.row.binary_search(&source) {
            Ok(k) => &self.col[self.ptr[k] as usize..self.ptr[k + 1] as usize],
            Err(_) => &[],
        }
    }

    pub fn degree(&self, source: u32) -> usize
    {
        self.neighbors(source).len()
    }

    /// Every edge, in `(src, dst)` order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_
    {
        self.row
            .iter()
            .zip(self.ptr.windows(2))
            .flat_map(move |(&u, bounds)| {
                self.col[bounds[0] as usize..bounds[1] as usize]
                    .iter()
                    .map(move |&v| Edge(u, v))
            })
    }

    /// Bytes held by the struct and its three arrays.
    pub fn nbytes(&self) -> usize
    {
        let mut bytes = std::mem::size_of_val(self);
        bytes += std::mem::size_of_val(&self.row[..]);
        bytes += std::mem::size_of_val(&self.ptr[..]);
        bytes += std::mem::size_of_val(&self.col[..]);
        bytes
    }

    fn arrays(&self) -> [(&'static str, &[u32]); 3]
    {
        [
            (ROW_EXTENSION, &self.row[..]),
            (PTR_EXTENSION, &self.ptr[..]),
            (COL_EXTENSION, &self.col[..]),
        ]
    }

    /// Persist the arrays to `<base>.row`, `<base>.ptr` and `<base>.col`.
    ///
    /// The three files are written concurrently under temporary names and
    /// only renamed into place once all of them are complete and synced, so
    /// a failed write never leaves a partial CSR under the final names. The
    /// renames themselves are synced before returning.
    pub fn write<P: AsRef<Path>>(&self, base: P, io: &ChunkedIo) -> Result<()>
    {
        let base = base.as_ref();
        let arrays = self.arrays();

        let written = arrays[..]
            .par_iter()
            .try_for_each(|&(ext, data)| io.save(part_path(base, ext), data));

        if let Err(e) = written {
            for (ext, _) in arrays {
                // Parts that were never created are fine to miss.
                let _ = std::fs::remove_file(part_path(base, ext));
            }
            return Err(e);
        }

        for (ext, _) in arrays {
            io::rename(part_path(base, ext), array_path(base, ext))?;
        }
        match base.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => io::sync_dir(dir)?,
            _ => io::sync_dir(".")?,
        }

        tracing::debug!(
            base = %base.display(),
            rows = self.order(),
            edges = self.size(),
            "wrote csr"
        );

        Ok(())
    }

    /// Load a CSR written by [`CSR::write`], checking its invariants.
    pub fn read<P: AsRef<Path>>(base: P, io: &ChunkedIo) -> Result<Self>
    {
        let base = base.as_ref();
        let row = io.load_u32s(array_path(base, ROW_EXTENSION))?;
        let ptr = io.load_u32s(array_path(base, PTR_EXTENSION))?;
        let col = io.load_u32s(array_path(base, COL_EXTENSION))?;

        let csr = Self { row, ptr, col };
        csr.validate().map_err(|reason| Error::Corrupt {
            path: base.to_path_buf(),
            reason,
        })?;
        Ok(csr)
    }

    fn validate(&self) -> std::result::Result<(), String>
    {
        if self.ptr.len() != self.row.len() + 1 {
            return Err(format!(
                "{} row entries but {} ptr entries",
                self.row.len(),
                self.ptr.len()
            ));
        }
        if self.ptr[0] != 0 {
            return Err(format!("ptr starts at {}", self.ptr[0]));
        }
        if self.ptr[self.row.len()] as usize != self.col.len() {
            return Err(format!(
                "ptr ends at {} but there are {} col entries",
                self.ptr[self.row.len()],
                self.col.len()
            ));
        }
        if let Some(k) = self.ptr.par_windows(2).position_any(|w| w[0] > w[1]) {
            return Err(format!("ptr decreases at {}", k));
        }
        if let Some(k) = self.row.par_windows(2).position_any(|w| w[0] >= w[1]) {
            return Err(format!("row not strictly ascending at {}", k));
        }
        Ok(())
    }
}
