//! Terminal reporting for merge batches.

use crate::ui;
use mergekit::{BatchObserver, Error, MergeReport, MergeSpec};

/// Prints one line per finished job, plus a step line per started job when
/// verbose.
pub struct TerminalProgress {
    total: usize,
    verbose: bool,
    quiet: bool,
}

impl TerminalProgress {
    pub fn new(total: usize, verbose: bool, quiet: bool) -> Self {
        Self {
            total,
            verbose,
            quiet,
        }
    }
}

impl BatchObserver for TerminalProgress {
    fn on_job_start(&mut self, index: usize, spec: &MergeSpec) {
        if self.verbose && !self.quiet {
            ui::step(index + 1, self.total, &spec.target().display().to_string());
        }
    }

    fn on_job_complete(&mut self, _index: usize, report: &MergeReport) {
        if !self.quiet {
            ui::success(&merged_line(report));
        }
    }

    fn on_job_failed(&mut self, index: usize, spec: &MergeSpec, error: &Error) {
        ui::error(&format!(
            "Job {} ({}) failed: {error}",
            index + 1,
            spec.target().display()
        ));
        if !self.quiet {
            ui::dim(error.kind().advice());
        }
    }
}

/// "Merged N files into TARGET"
pub fn merged_line(report: &MergeReport) -> String {
    format!(
        "Merged {} file{} into {}",
        report.files_merged,
        if report.files_merged == 1 { "" } else { "s" },
        report.target.display()
    )
}
