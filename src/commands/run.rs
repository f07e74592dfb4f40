//! `xmlmerger run` - execute the batch file.

use crate::Context;
use crate::cli::RunArgs;
use crate::config::{self, BatchConfig, BatchOptions};
use crate::progress::TerminalProgress;
use crate::ui;
use anyhow::{Context as _, Result};
use mergekit::{MergeRunner, MergeSpec, RunOptions};
use std::path::{Path, PathBuf};

pub fn run(ctx: &Context, args: RunArgs) -> Result<()> {
    let config_path = &args.config.config;
    let config = BatchConfig::load(config_path)?;
    let base = config::base_dir(config_path);

    let specs = select_jobs(config.specs(&base), &args.only, &base)?;
    if specs.is_empty() {
        ui::warn(&format!("No merge jobs in {}", config_path.display()));
        return Ok(());
    }

    let options = run_options(&config.options, args.keep_going, args.jobs);
    log::debug!(
        "Running {} job(s), keep_going={}, jobs={}",
        specs.len(),
        options.keep_going,
        options.jobs
    );

    let runner = MergeRunner::new();
    let mut progress = TerminalProgress::new(specs.len(), ctx.verbose > 0, ctx.quiet);
    let summary = runner
        .run_batch(&specs, &options, &mut progress)
        .context("Merge batch aborted")?;

    if !summary.is_success() {
        anyhow::bail!(
            "{} of {} merge jobs failed",
            summary.failures.len(),
            specs.len()
        );
    }

    if !ctx.quiet {
        ui::info(&format!(
            "{} job(s) done, {} files merged",
            summary.reports.len(),
            summary.files_merged()
        ));
    }
    Ok(())
}

/// Combine batch file options with command-line flags (flags win).
fn run_options(file: &BatchOptions, keep_going: bool, jobs: Option<usize>) -> RunOptions {
    let keep_going = keep_going || file.keep_going;
    let jobs = jobs.or(file.jobs).unwrap_or(1).max(1);
    if keep_going {
        RunOptions::keep_going(jobs)
    } else {
        RunOptions::fail_fast()
    }
}

/// Keep only the jobs whose target matches one of `only`.
///
/// A filter matches a target resolved against the batch file's directory,
/// or a trailing part of the target path.
fn select_jobs(specs: Vec<MergeSpec>, only: &[PathBuf], base: &Path) -> Result<Vec<MergeSpec>> {
    if only.is_empty() {
        return Ok(specs);
    }

    for filter in only {
        let known = specs
            .iter()
            .any(|s| s.target() == base.join(filter) || s.target().ends_with(filter));
        if !known {
            anyhow::bail!("No merge job writes {}", filter.display());
        }
    }

    Ok(specs
        .into_iter()
        .filter(|s| {
            only.iter()
                .any(|f| s.target() == base.join(f) || s.target().ends_with(f))
        })
        .collect())
}
