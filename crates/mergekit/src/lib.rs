//! # mergekit
//!
//! Batch XML merging with a pluggable merge engine.
//!
//! This crate provides functionality for:
//! - Describing merge jobs ([`MergeSpec`]): a target, ordered sources and an
//!   optional `.properties` file of merge directives
//! - Running jobs one at a time or as a batch ([`MergeRunner`])
//! - Plugging in any engine behind the [`MergeEngine`] trait
//! - A built-in path-directed overlay engine ([`engine::overlay`])
//!
//! ## Example
//!
//! ```no_run
//! use mergekit::{MergeRunner, MergeSpec};
//!
//! let spec = MergeSpec::new("target/web.xml", ["src/web-base.xml", "src/web-prod.xml"])
//!     .with_properties("src/web-merge.properties");
//!
//! let runner = MergeRunner::new();
//! let report = runner.run(&spec).expect("merge failed");
//! println!("Merged {} files into {}", report.files_merged, report.target.display());
//! ```
//!
//! ## Batches
//!
//! Batches are fail-fast by default: the first failing job aborts the rest.
//! [`RunOptions::keep_going`] records failures and continues, optionally on
//! several threads.
//!
//! ```no_run
//! use mergekit::{MergeRunner, MergeSpec, NoProgress, RunOptions};
//!
//! let jobs = vec![
//!     MergeSpec::new("out/a.xml", ["a1.xml", "a2.xml"]),
//!     MergeSpec::new("out/b.xml", ["b1.xml", "b2.xml"]),
//! ];
//! let summary = MergeRunner::new()
//!     .run_batch(&jobs, &RunOptions::keep_going(4), &mut NoProgress)
//!     .unwrap();
//! assert!(summary.is_success());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod properties;
pub mod runner;
pub mod types;

pub use engine::{MergeEngine, Merger, SourceStream};
pub use error::{Error, ErrorKind, Result};
pub use properties::Properties;
pub use runner::{BatchObserver, MergeRunner, NoProgress};
pub use types::{BatchSummary, JobFailure, MergeReport, MergeSpec, RunOptions};
