use std::{io, path::PathBuf};

use thiserror::Error;

use crate::EDGE_BYTES;

#[derive(Debug, Error)]
pub enum Error
{
    #[error("{}: {source}", .path.display())]
    Io
    {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "{}: {len} bytes is not a whole number of {} byte edge records",
        .path.display(),
        EDGE_BYTES
    )]
    Malformed
    {
        path: PathBuf,
        len: u64,
    },

    #[error("too many edges, {0} edges do not fit 32 bit offsets")]
    TooManyEdges(usize),

    #[error("{}: corrupt CSR, {reason}", .path.display())]
    Corrupt
    {
        path: PathBuf,
        reason: String,
    },

    #[error("input extension {0:?} collides with a CSR array extension")]
    ReservedExtension(String),

    #[error("{}: source would be overwritten by its own CSR output", .0.display())]
    SourceIsTarget(PathBuf),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("worker panicked: {0}")]
    Worker(String),
}

impl Error
{
    pub(crate) fn io<P: Into<PathBuf>>(path: P) -> impl FnOnce(io::Error) -> Self
    {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
