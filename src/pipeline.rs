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

//! Directory-wide conversion.
//!
//! A producer thread lists the input directory into a [`BoundedChannel`] and
//! a fixed group of workers pops paths from it, each running the whole
//! conversion of one file: load, sort, deduplicate, encode, write, and
//! finally remove the source. The data-parallel stages of every worker run
//! on one shared rayon pool.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::{
    chan::BoundedChannel,
    compact,
    config::{Config, FailurePolicy},
    csr::{self, CSR},
    error::Result,
    io,
    stopwatch::timed,
    Error,
};

/// What converting a single file produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReport
{
    pub source: PathBuf,
    pub target: PathBuf,
    pub raw_edges: usize,
    pub edges: usize,
    pub rows: usize,
    /// In-memory footprint of the encoded graph.
    pub nbytes: usize,
}

/// Totals of a [`Pipeline::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary
{
    /// Files handed to the workers.
    pub queued: usize,
    pub converted: usize,
    pub failed: usize,
    pub raw_edges: u64,
    pub edges: u64,
}

impl Summary
{
    fn record(&mut self, report: &FileReport)
    {
        self.converted += 1;
        self.raw_edges += report.raw_edges as u64;
        self.edges += report.edges as u64;
    }
}

struct Shared
{
    abort: AtomicBool,
    error: Mutex<Option<Error>>,
    summary: Mutex<Summary>,
}

impl Shared
{
    fn fail(&self, err: Error)
    {
        self.abort.store(true, Ordering::Relaxed);
        let mut first = self.error.lock();
        if first.is_none() {
            *first = Some(err);
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String
{
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_owned(),
            Err(_) => "unknown panic".to_owned(),
        },
    }
}

pub struct Pipeline
{
    config: Config,
    pool: rayon::ThreadPool,
}

impl Pipeline
{
    pub fn new(config: Config) -> Result<Self>
    {
        config.validate()?;
        let pool = config.thread_pool()?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &Config
    {
        &self.config
    }

    /// Convert one edge-list file into `<stem>.row`, `<stem>.ptr` and
    /// `<stem>.col`, removing the source once all three are in place.
    ///
    /// A panic inside the conversion is returned as [`Error::Worker`].
    pub fn convert_file<P: AsRef<Path>>(&self, source: P) -> Result<FileReport>
    {
        let source = source.as_ref();
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| convert(source, &self.config))
        }))
        .unwrap_or_else(|payload| Err(Error::Worker(panic_message(payload))))
    }

    /// Convert every matching file of `input_dir`.
    ///
    /// With [`FailurePolicy::Abort`] the first failure stops the run and is
    /// returned; files converted before it keep their output. With
    /// [`FailurePolicy::Skip`] failures are logged and counted and their
    /// sources are left in place.
    pub fn run<P: AsRef<Path>>(&self, input_dir: P) -> Result<Summary>
    {
        let input_dir = input_dir.as_ref();
        let chan = BoundedChannel::new(self.config.capacity());
        let shared = Shared {
            abort: AtomicBool::new(false),
            error: Mutex::new(None),
            summary: Mutex::new(Summary::default()),
        };

        tracing::info!(
            input = %input_dir.display(),
            workers = self.config.workers(),
            threads = self.pool.current_num_threads(),
            "starting conversion"
        );

        let queued = thread::scope(|s| {
            let producer = thread::Builder::new()
                .name("gcsr-walk".to_owned())
                .spawn_scoped(s, || self.produce(input_dir, &chan));

            let producer = match producer {
                Ok(handle) => handle,
                Err(e) => return Err(Error::io(input_dir)(e)),
            };

            let mut workers = Vec::with_capacity(self.config.workers());
            for i in 0..self.config.workers() {
                let spawned = thread::Builder::new()
                    .name(format!("gcsr-worker-{}", i))
                    .spawn_scoped(s, || self.work(&chan, &shared));
                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(e) => {
                        shared.fail(Error::io(input_dir)(e));
                        chan.close();
                        break;
                    }
                }
            }

            let queued = producer
                .join()
                .unwrap_or_else(|payload| Err(Error::Worker(panic_message(payload))));

            for worker in workers {
                if let Err(payload) = worker.join() {
                    shared.fail(Error::Worker(panic_message(payload)));
                }
            }

            queued
        });

        if let Some(err) = shared.error.into_inner() {
            return Err(err);
        }

        let mut summary = shared.summary.into_inner();
        summary.queued = queued?;

        tracing::info!(
            converted = summary.converted,
            failed = summary.failed,
            raw_edges = summary.raw_edges,
            edges = summary.edges,
            "conversion finished"
        );

        Ok(summary)
    }

    fn produce(&self, input_dir: &Path, chan: &BoundedChannel<PathBuf>) -> Result<usize>
    {
        let listed = io::list_files(input_dir, self.config.extension());
        let mut queued = 0;
        if let Ok(files) = &listed {
            for file in files {
                if chan.push(file.clone()).is_err() {
                    break;
                }
                queued += 1;
            }
        }
        chan.close();
        listed.map(|_| queued)
    }

    fn work(&self, chan: &BoundedChannel<PathBuf>, shared: &Shared)
    {
        for source in chan {
            if shared.abort.load(Ordering::Relaxed) {
                break;
            }

            match self.convert_file(&source) {
                Ok(report) => shared.summary.lock().record(&report),
                Err(err) => match self.config.policy() {
                    FailurePolicy::Skip => {
                        tracing::warn!(file = %source.display(), error = %err, "skipping file");
                        shared.summary.lock().failed += 1;
                    }
                    FailurePolicy::Abort => {
                        tracing::error!(file = %source.display(), error = %err, "aborting");
                        shared.summary.lock().failed += 1;
                        shared.fail(err);
                        chan.close();
                        break;
                    }
                },
            }
        }
    }
}

fn convert(source: &Path, config: &Config) -> Result<FileReport>
{
    let io = config.io();
    let target = config.target_base(source);

    let outputs = [csr::ROW_EXTENSION, csr::PTR_EXTENSION, csr::COL_EXTENSION];
    if outputs.iter().any(|ext| csr::array_path(&target, ext) == source) {
        return Err(Error::SourceIsTarget(source.to_path_buf()));
    }

    let (report, elapsed) = timed(|| -> Result<FileReport> {
        let mut edges = io.load_edges(source)?;
        let raw_edges = edges.len();

        edges.par_sort_unstable();
        tracing::debug!(file = %source.display(), raw_edges, "sorted");

        let deduped = compact::dedup(&edges);
        drop(edges);
        tracing::debug!(file = %source.display(), raw_edges, edges = deduped.len(), "deduplicated");

        let csr = CSR::encode(&deduped)?;
        drop(deduped);
        tracing::debug!(
            file = %source.display(),
            rows = csr.order(),
            edges = csr.size(),
            nbytes = csr.nbytes(),
            "encoded"
        );

        csr.write(&target, &io)?;

        if !config.keep_source() {
            io::remove(source)?;
        }

        Ok(FileReport {
            source: source.to_path_buf(),
            target: target.clone(),
            raw_edges,
            edges: csr.size(),
            rows: csr.order(),
            nbytes: csr.nbytes(),
        })
    });
    let report = report?;

    tracing::info!(
        file = %source.display(),
        raw_edges = report.raw_edges,
        edges = report.edges,
        rows = report.rows,
        nbytes = report.nbytes,
        elapsed_ms = elapsed.as_millis() as u64,
        "converted"
    );

    Ok(report)
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use super::*;
    use crate::{io::ChunkedIo, Edge};

    fn write_edges(path: &Path, edges: &[Edge])
    {
        ChunkedIo::default().save(path, edges).unwrap();
    }

    #[test]
    fn converts_one_file()
    {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("g.el32");
        write_edges(&source, &[Edge(2, 1), Edge(1, 2), Edge(1, 3), Edge(1, 2)]);

        let pipeline = Pipeline::new(Config::new().with_num_threads(2)).unwrap();
        let report = pipeline.convert_file(&source).unwrap();

        assert_eq!(4, report.raw_edges);
        assert_eq!(3, report.edges);
        assert_eq!(2, report.rows);
        assert!(report.nbytes >= (2 + 3 + 3) * std::mem::size_of::<u32>());
        assert_eq!(dir.path().join("g"), report.target);
        assert!(!source.exists());

        let csr = CSR::read(&report.target, &ChunkedIo::default()).unwrap();
        assert_eq!(&[1, 2], csr.row());
        assert_eq!(&[0, 2, 3], csr.ptr());
        assert_eq!(&[2, 3, 1], csr.col());
    }

    #[test]
    fn keeps_source_when_asked()
    {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("g.el32");
        write_edges(&source, &[Edge(0, 1)]);

        let config = Config::new().with_num_threads(1).with_keep_source(true);
        let pipeline = Pipeline::new(config).unwrap();
        pipeline.convert_file(&source).unwrap();
        assert!(source.exists());
    }

    #[test]
    fn malformed_file_keeps_source_and_writes_nothing()
    {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bad.el32");
        fs::write(&source, [0u8; 9]).unwrap();

        let pipeline = Pipeline::new(Config::new().with_num_threads(1)).unwrap();
        assert!(matches!(
            pipeline.convert_file(&source),
            Err(Error::Malformed { len: 9, .. })
        ));
        assert!(source.exists());
        assert!(!dir.path().join("bad.row").exists());
    }

    #[test]
    fn refuses_to_overwrite_its_own_source()
    {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("g.row");
        write_edges(&source, &[Edge(0, 1), Edge(1, 0)]);

        // Built without validation, so only the per-file guard stands between
        // the source and its own output.
        let config = Config::new().with_num_threads(1).with_extension("row");
        let pipeline = Pipeline {
            pool: config.thread_pool().unwrap(),
            config,
        };
        assert!(matches!(
            pipeline.convert_file(&source),
            Err(Error::SourceIsTarget(_))
        ));
        assert_eq!(
            vec![Edge(0, 1), Edge(1, 0)],
            ChunkedIo::default().load_edges(&source).unwrap()
        );
        assert!(!dir.path().join("g.ptr").exists());
        assert!(!dir.path().join("g.col").exists());
    }

    #[test]
    fn array_extension_is_rejected_up_front()
    {
        assert!(matches!(
            Pipeline::new(Config::new().with_num_threads(1).with_extension("col")),
            Err(Error::ReservedExtension(_))
        ));
    }

    #[test]
    fn panic_message_is_kept()
    {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!("boom 1", panic_message(payload));
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!("static", panic_message(payload));
    }
}
