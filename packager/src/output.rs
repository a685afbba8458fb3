//! User-facing progress and summary text.
//!
//! Everything here renders to strings or writes to a caller-supplied stream
//! so that the binary stays small and the wording is testable.

use crate::report::BuildReport;
use camino::Utf8Path;
use std::error::Error;
use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; nothing useful can be done on failure.
    }
}

/// `err` followed by each source not already spelled out in the text.
///
/// # Examples
///
/// ```
/// use trellis_packager::output::error_chain;
///
/// let err = std::io::Error::other("disk full");
/// assert_eq!(error_chain(&err), "disk full");
/// ```
#[must_use]
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !text.contains(&message) {
            text.push_str(": ");
            text.push_str(&message);
        }
        source = cause.source();
    }
    text
}

/// The closing summary of a build.
#[must_use]
pub fn build_summary(report: &BuildReport, report_path: &Utf8Path) -> Vec<String> {
    let mut lines = Vec::new();
    let plural = if report.bundles.len() == 1 { "bundle" } else { "bundles" };
    lines.push(format!(
        "Built {} {plural} for {} {}",
        report.bundles.len(),
        report.mod_id,
        report.version
    ));
    for bundle in &report.bundles {
        lines.push(format!("  {} -> {}", bundle.kind, bundle.jar));
    }
    for failure in &report.failures {
        lines.push(format!("  {} failed ({}): {}", failure.subject, failure.stage, failure.message));
    }
    if let Some(channel) = report.channel {
        let verb = if report.dry_run { "Would publish" } else { "Published" };
        lines.push(format!(
            "{verb} {} of {} to the {channel} repository",
            report.published.len(),
            report.published.len() + report.publish_failures.len()
        ));
        for failure in &report.publish_failures {
            lines.push(format!("  {}: {}", failure.subject, failure.message));
        }
    }
    lines.push(format!("Report written to {report_path}"));
    lines
}
