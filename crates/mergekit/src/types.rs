//! Core types for merge jobs and their results.

use crate::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// One merge job: where to write, what to read, and how to merge.
///
/// The order of `sources` is the overlay order handed to the engine: later
/// files are layered on top of earlier ones. Nothing is validated here; the
/// runner checks paths when the job executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    target: PathBuf,
    sources: Vec<PathBuf>,
    properties: Option<PathBuf>,
}

impl MergeSpec {
    /// Create a job writing `sources` merged in order into `target`.
    pub fn new<I, P>(target: impl Into<PathBuf>, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            target: target.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            properties: None,
        }
    }

    /// Attach a control properties file.
    pub fn with_properties(mut self, path: impl Into<PathBuf>) -> Self {
        self.properties = Some(path.into());
        self
    }

    /// Where the merged document is written.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The source files, in merge order.
    ///
    /// Returns an owned copy so callers cannot alter the job.
    pub fn sources(&self) -> Vec<PathBuf> {
        self.sources.clone()
    }

    /// Number of source files.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// The optional control properties file.
    pub fn properties(&self) -> Option<&Path> {
        self.properties.as_deref()
    }
}

impl fmt::Display for MergeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files: Vec<String> = self
            .sources
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        write!(
            f,
            "Merge [files=[{}], target={}]",
            files.join(", "),
            self.target.display()
        )
    }
}

/// Result of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// The file that was written
    pub target: PathBuf,
    /// How many source files went into it
    pub files_merged: usize,
    /// Size of the written target
    pub bytes_written: u64,
}

/// How a batch is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Keep processing later jobs after one fails
    pub keep_going: bool,
    /// Worker threads for independent jobs (only used with `keep_going`)
    pub jobs: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            keep_going: false,
            jobs: 1,
        }
    }
}

impl RunOptions {
    /// Fail-fast, one job at a time.
    pub fn fail_fast() -> Self {
        Self::default()
    }

    /// Continue past failures using `jobs` workers.
    pub fn keep_going(jobs: usize) -> Self {
        Self {
            keep_going: true,
            jobs: jobs.max(1),
        }
    }

    /// Whether jobs may run concurrently.
    pub fn is_parallel(&self) -> bool {
        self.keep_going && self.jobs > 1
    }
}

/// A job that failed inside a keep-going batch.
#[derive(Debug)]
pub struct JobFailure {
    /// Position of the job in the batch (0-indexed)
    pub index: usize,
    /// Target of the failed job
    pub target: PathBuf,
    /// What went wrong
    pub error: Error,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Completed jobs, in batch order
    pub reports: Vec<MergeReport>,
    /// Failed jobs, in batch order
    pub failures: Vec<JobFailure>,
}

impl BatchSummary {
    /// Whether every job completed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total source files merged across completed jobs.
    pub fn files_merged(&self) -> usize {
        self.reports.iter().map(|r| r.files_merged).sum()
    }
}
