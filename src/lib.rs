//! Convert binary edge-list files into deduplicated Compressed Sparse Row graphs.
//!
//! Every stage of the conversion is built from data-parallel primitives: a
//! parallel sort, a parallel scan that marks the positions to keep in an
//! atomic bit vector, a parallel exclusive prefix sum over those marks and a
//! parallel scatter into the compacted output.
//!
//! ```
//! use gcsr_core::{csr::CSR, Edge};
//!
//! let csr = CSR::from_edges(vec![Edge(1, 2), Edge(1, 2), Edge(1, 3), Edge(2, 1)]).unwrap();
//!
//! assert_eq!(&[1, 2], csr.row());
//! assert_eq!(&[0, 2, 3], csr.ptr());
//! assert_eq!(&[2, 3, 1], csr.col());
//! ```

pub mod bitvec;
pub mod chan;
pub mod compact;
pub mod config;
pub mod csr;
pub mod error;
pub mod io;
pub mod par;
pub mod pipeline;
pub mod stopwatch;

mod edge;

pub use config::{Config, FailurePolicy};
pub use edge::Edge;
pub use error::Error;
pub use pipeline::{Pipeline, Summary};

pub const EDGE_BYTES: usize = std::mem::size_of::<Edge>();

pub const KIBIBYTE: usize = 1024;

pub const MEBIBYTE: usize = 1024 * KIBIBYTE;

/// Largest single read or write issued against a file.
pub const DEFAULT_CHUNK_BYTES: usize = 128 * MEBIBYTE;
