mod progress;
mod styling;

use crate::report::MergeRequestReport;

pub use progress::PhaseProgress;
pub use styling::{bright_green, dim, magenta_bold};

/// Prints the `fulgens` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔀 fulgens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitLab merge request report")
    );
}

/// One-line totals on stderr, so stdout carries only the report.
pub fn print_summary(report: &MergeRequestReport) {
    eprintln!(
        "{}",
        dim(format!(
            "{} merge requests across {} projects on {}",
            report.total_merge_requests(),
            report.projects.len(),
            report.instance
        ))
    );
}
