//! Job execution: open sources, configure the engine, merge, write target.
//!
//! The merged stream is staged in a temporary file next to the target and
//! renamed over it once fully written, so a failed job never leaves a
//! partial target behind and never touches an existing one. An existing
//! target must be writable, and a symlinked target is written through to the
//! file it points at.

use crate::engine::{MergeEngine, SourceStream, default_engine};
use crate::error::{Error, Result};
use crate::properties::Properties;
use crate::types::{BatchSummary, JobFailure, MergeReport, MergeSpec, RunOptions};
use rayon::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Size of the buffer used to copy the merged stream into the target.
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// Progress callback for batch execution.
pub trait BatchObserver {
    /// Called before a job starts.
    fn on_job_start(&mut self, index: usize, spec: &MergeSpec);

    /// Called after a job wrote its target.
    fn on_job_complete(&mut self, index: usize, report: &MergeReport);

    /// Called when a job fails.
    fn on_job_failed(&mut self, index: usize, spec: &MergeSpec, error: &Error);
}

/// Observer that ignores every event.
pub struct NoProgress;

impl BatchObserver for NoProgress {
    fn on_job_start(&mut self, _index: usize, _spec: &MergeSpec) {}
    fn on_job_complete(&mut self, _index: usize, _report: &MergeReport) {}
    fn on_job_failed(&mut self, _index: usize, _spec: &MergeSpec, _error: &Error) {}
}

/// Runs merge jobs against an engine.
pub struct MergeRunner {
    engine: Box<dyn MergeEngine>,
}

impl Default for MergeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeRunner {
    /// Create a runner with the built-in overlay engine.
    pub fn new() -> Self {
        Self {
            engine: Box::new(default_engine()),
        }
    }

    /// Create a runner with a custom engine (useful for testing).
    pub fn with_engine(engine: Box<dyn MergeEngine>) -> Self {
        Self { engine }
    }

    /// Name of the engine in use.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Run a single job and return what it wrote.
    pub fn run(&self, spec: &MergeSpec) -> Result<MergeReport> {
        let sources = spec.sources();
        if sources.is_empty() {
            return Err(Error::NoSources {
                target: spec.target().to_path_buf(),
            });
        }
        log::debug!("{spec} using engine {}", self.engine.name());

        let mut streams = open_sources(&sources)?;
        let (dest, mut staged) = stage_target(spec.target())?;
        let properties = load_properties(spec.properties())?;

        let merger = self.engine.configure(&properties)?;
        let mut merged = merger.merge(&mut streams)?;
        drop(streams);

        let bytes_written = copy_stream(&mut merged, staged.as_file_mut(), spec.target())?;
        drop(merged);

        commit(staged, &dest, spec.target())?;

        log::info!(
            "Finished appending {} files to the target file {}",
            sources.len(),
            spec.target().display()
        );

        Ok(MergeReport {
            target: spec.target().to_path_buf(),
            files_merged: sources.len(),
            bytes_written,
        })
    }

    /// Check a job without merging or writing anything.
    ///
    /// Sources must open, the properties must parse and the engine must
    /// accept them.
    pub fn validate(&self, spec: &MergeSpec) -> Result<()> {
        let sources = spec.sources();
        if sources.is_empty() {
            return Err(Error::NoSources {
                target: spec.target().to_path_buf(),
            });
        }
        open_sources(&sources)?;
        let properties = load_properties(spec.properties())?;
        self.engine.configure(&properties)?;
        Ok(())
    }

    /// Run jobs in order.
    ///
    /// Without `keep_going` the first failure aborts the batch and is
    /// returned; later jobs are not started. With `keep_going` failures are
    /// collected in the summary, and `jobs > 1` spreads work over a thread
    /// pool.
    pub fn run_batch(
        &self,
        specs: &[MergeSpec],
        options: &RunOptions,
        observer: &mut dyn BatchObserver,
    ) -> Result<BatchSummary> {
        if options.is_parallel() && specs.len() > 1 {
            return Ok(self.run_parallel(specs, options.jobs, observer));
        }

        let mut summary = BatchSummary::default();
        for (index, spec) in specs.iter().enumerate() {
            observer.on_job_start(index, spec);
            match self.run(spec) {
                Ok(report) => {
                    observer.on_job_complete(index, &report);
                    summary.reports.push(report);
                }
                Err(error) => {
                    observer.on_job_failed(index, spec, &error);
                    if !options.keep_going {
                        return Err(error);
                    }
                    summary.failures.push(JobFailure {
                        index,
                        target: spec.target().to_path_buf(),
                        error,
                    });
                }
            }
        }
        Ok(summary)
    }

    /// Run jobs on a rayon pool; events are reported afterwards in order.
    fn run_parallel(
        &self,
        specs: &[MergeSpec],
        jobs: usize,
        observer: &mut dyn BatchObserver,
    ) -> BatchSummary {
        for (index, spec) in specs.iter().enumerate() {
            observer.on_job_start(index, spec);
        }

        let results: Vec<Result<MergeReport>> =
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| specs.par_iter().map(|spec| self.run(spec)).collect()),
                Err(e) => {
                    log::warn!("cannot start {jobs} workers ({e}), running jobs sequentially");
                    self.run_each(specs)
                }
            };
        summarize(specs, results, observer)
    }

    fn run_each(&self, specs: &[MergeSpec]) -> Vec<Result<MergeReport>> {
        specs.iter().map(|spec| self.run(spec)).collect()
    }
}

/// Report finished jobs in batch order and collect them into a summary.
fn summarize(
    specs: &[MergeSpec],
    results: Vec<Result<MergeReport>>,
    observer: &mut dyn BatchObserver,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for (index, (spec, result)) in specs.iter().zip(results).enumerate() {
        match result {
            Ok(report) => {
                observer.on_job_complete(index, &report);
                summary.reports.push(report);
            }
            Err(error) => {
                observer.on_job_failed(index, spec, &error);
                summary.failures.push(JobFailure {
                    index,
                    target: spec.target().to_path_buf(),
                    error,
                });
            }
        }
    }
    summary
}

fn open_sources(sources: &[PathBuf]) -> Result<Vec<SourceStream>> {
    sources
        .iter()
        .map(|path| {
            let file = File::open(path).map_err(|source| Error::SourceOpen {
                path: path.clone(),
                source,
            })?;
            Ok(SourceStream::new(path.clone(), file))
        })
        .collect()
}

fn load_properties(path: Option<&Path>) -> Result<Properties> {
    match path {
        Some(path) => {
            let properties = Properties::load(path)?;
            log::debug!(
                "loaded {} control properties from {}",
                properties.len(),
                path.display()
            );
            Ok(properties)
        }
        None => Ok(Properties::new()),
    }
}

/// Follow a symlinked target to the file it points at.
fn resolve_target(target: &Path) -> Result<PathBuf> {
    let is_link = std::fs::symlink_metadata(target).is_ok_and(|m| m.file_type().is_symlink());
    if !is_link {
        return Ok(target.to_path_buf());
    }
    if let Ok(resolved) = std::fs::canonicalize(target) {
        return Ok(resolved);
    }

    // Dangling link: create the file it names.
    let link = std::fs::read_link(target).map_err(|source| target_write(target, source))?;
    Ok(match target.parent() {
        Some(parent) => parent.join(link),
        None => link,
    })
}

/// Permissions of an existing target, after checking it can be written.
fn writable_permissions(dest: &Path, target: &Path) -> Result<Option<std::fs::Permissions>> {
    match std::fs::metadata(dest) {
        Ok(meta) => {
            OpenOptions::new()
                .write(true)
                .open(dest)
                .map_err(|source| target_write(target, source))?;
            Ok(Some(meta.permissions()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(target_write(target, source)),
    }
}

/// Create the staging file next to the file that will be replaced.
fn stage_target(target: &Path) -> Result<(PathBuf, NamedTempFile)> {
    let dest = resolve_target(target)?;
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".xmlmerge-").suffix(".tmp");
    match writable_permissions(&dest, target)? {
        Some(permissions) => {
            builder.permissions(permissions);
        }
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                builder.permissions(std::fs::Permissions::from_mode(0o644));
            }
        }
    }

    let staged = builder
        .tempfile_in(dir)
        .map_err(|source| target_write(target, source))?;
    Ok((dest, staged))
}

fn copy_stream(reader: &mut dyn Read, writer: &mut File, target: &Path) -> Result<u64> {
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let len = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(len) => len,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(Error::ResultRead {
                    path: target.to_path_buf(),
                    source,
                });
            }
        };
        writer
            .write_all(&buffer[..len])
            .map_err(|source| target_write(target, source))?;
        total += len as u64;
    }

    Ok(total)
}

/// Flush the staging file and move it over `dest`.
fn commit(staged: NamedTempFile, dest: &Path, target: &Path) -> Result<()> {
    staged
        .as_file()
        .sync_all()
        .map_err(|source| target_write(target, source))?;
    staged
        .persist(dest)
        .map_err(|e| target_write(target, e.error))?;
    Ok(())
}

fn target_write(target: &Path, source: std::io::Error) -> Error {
    Error::TargetWrite {
        path: target.to_path_buf(),
        source,
    }
}
