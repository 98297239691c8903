use std::path::{Path, PathBuf};

use crate::{
    csr::{COL_EXTENSION, PTR_EXTENSION, ROW_EXTENSION},
    error::Result,
    io::ChunkedIo,
    Error,
    DEFAULT_CHUNK_BYTES,
};

pub const DEFAULT_WORKERS: usize = 8;

pub const DEFAULT_CAPACITY: usize = 16;

pub const DEFAULT_EXTENSION: &str = "el32";

/// What a run does when converting one file fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy
{
    /// Stop taking new files and return the first error.
    #[default]
    Abort,
    /// Log the failure, keep the source file and carry on.
    Skip,
}

/// Everything a [`Pipeline`](crate::Pipeline) needs to know about a run.
///
/// ```
/// use gcsr_core::{Config, FailurePolicy};
///
/// let config = Config::new()
///     .with_workers(2)
///     .with_num_threads(4)
///     .with_policy(FailurePolicy::Skip);
///
/// assert_eq!(2, config.workers());
/// assert_eq!(4, config.num_threads());
/// ```
#[derive(Clone, Debug)]
pub struct Config
{
    workers: usize,
    num_threads: usize,
    capacity: usize,
    chunk_bytes: usize,
    extension: String,
    output_dir: Option<PathBuf>,
    policy: FailurePolicy,
    keep_source: bool,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl Config
{
    pub fn new() -> Self
    {
        Self {
            workers: DEFAULT_WORKERS,
            num_threads: num_cpus::get(),
            capacity: DEFAULT_CAPACITY,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            extension: DEFAULT_EXTENSION.to_owned(),
            output_dir: None,
            policy: FailurePolicy::default(),
            keep_source: false,
        }
    }

    /// Number of files converted at the same time.
    pub fn with_workers(self, workers: usize) -> Self
    {
        Self {
            workers: workers.max(1),
            ..self
        }
    }

    /// Size of the thread pool shared by the data-parallel stages.
    pub fn with_num_threads(self, num_threads: usize) -> Self
    {
        Self {
            num_threads: num_threads.max(1),
            ..self
        }
    }

    /// Number of pending file paths buffered between the directory walk
    /// and the workers.
    pub fn with_capacity(self, capacity: usize) -> Self
    {
        Self {
            capacity: capacity.max(1),
            ..self
        }
    }

    pub fn with_chunk_bytes(self, chunk_bytes: usize) -> Self
    {
        Self {
            chunk_bytes: chunk_bytes.max(1),
            ..self
        }
    }

    pub fn with_extension<S: Into<String>>(self, extension: S) -> Self
    {
        Self {
            extension: extension.into(),
            ..self
        }
    }

    /// Directory receiving the CSR files. Without one they are written next
    /// to their source.
    pub fn with_output_dir<P: Into<PathBuf>>(self, output_dir: P) -> Self
    {
        Self {
            output_dir: Some(output_dir.into()),
            ..self
        }
    }

    pub fn with_policy(self, policy: FailurePolicy) -> Self
    {
        Self { policy, ..self }
    }

    /// Keep source files after they have been converted.
    pub fn with_keep_source(self, keep_source: bool) -> Self
    {
        Self {
            keep_source,
            ..self
        }
    }

    pub fn workers(&self) -> usize
    {
        self.workers
    }

    pub fn num_threads(&self) -> usize
    {
        self.num_threads
    }

    pub fn capacity(&self) -> usize
    {
        self.capacity
    }

    pub fn extension(&self) -> &str
    {
        &self.extension
    }

    pub fn policy(&self) -> FailurePolicy
    {
        self.policy
    }

    pub fn keep_source(&self) -> bool
    {
        self.keep_source
    }

    /// Reject settings under which a source could share a path with one of
    /// its own output arrays.
    pub fn validate(&self) -> Result<()>
    {
        let extension = self.extension.trim_start_matches('.');
        if [ROW_EXTENSION, PTR_EXTENSION, COL_EXTENSION].contains(&extension) {
            return Err(Error::ReservedExtension(self.extension.clone()));
        }
        Ok(())
    }

    pub fn io(&self) -> ChunkedIo
    {
        ChunkedIo::new(self.chunk_bytes)
    }

    pub fn thread_pool(&self) -> Result<rayon::ThreadPool>
    {
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|i| format!("gcsr-par-{}", i))
            .build()?)
    }

    /// Base path of the CSR files produced for `source`, i.e. the output
    /// directory (or the source's own) joined with the source's stem.
    pub fn target_base(&self, source: &Path) -> PathBuf
    {
        let dir = match &self.output_dir {
            Some(dir) => dir.as_path(),
            None => source.parent().unwrap_or_else(|| Path::new("")),
        };
        match source.file_stem() {
            Some(stem) => dir.join(stem),
            None => dir.join(source),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults()
    {
        let config = Config::new();
        assert_eq!(DEFAULT_WORKERS, config.workers());
        assert_eq!(DEFAULT_CAPACITY, config.capacity());
        assert_eq!("el32", config.extension());
        assert_eq!(FailurePolicy::Abort, config.policy());
        assert_eq!(DEFAULT_CHUNK_BYTES, config.io().chunk_bytes());
        assert!(!config.keep_source());
    }

    #[test]
    fn counts_are_at_least_one()
    {
        let config = Config::new()
            .with_workers(0)
            .with_num_threads(0)
            .with_capacity(0)
            .with_chunk_bytes(0);
        assert_eq!(1, config.workers());
        assert_eq!(1, config.num_threads());
        assert_eq!(1, config.capacity());
        assert_eq!(1, config.io().chunk_bytes());
    }

    #[test]
    fn target_base_uses_stem()
    {
        let source = Path::new("/data/in/part-0001.el32");
        assert_eq!(
            PathBuf::from("/data/in/part-0001"),
            Config::new().target_base(source)
        );
        assert_eq!(
            PathBuf::from("/data/out/part-0001"),
            Config::new().with_output_dir("/data/out").target_base(source)
        );
    }

    #[test]
    fn array_extensions_are_rejected()
    {
        for ext in ["row", ".ptr", "col"] {
            assert!(matches!(
                Config::new().with_extension(ext).validate(),
                Err(Error::ReservedExtension(_))
            ));
        }
        assert!(Config::new().with_extension("rows").validate().is_ok());
        assert!(Config::new().validate().is_ok());
    }

    #[test]
    fn pool_has_requested_size()
    {
        let pool = Config::new().with_num_threads(3).thread_pool().unwrap();
        assert_eq!(3, pool.current_num_threads());
    }
}
