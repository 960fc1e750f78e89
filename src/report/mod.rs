use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::core::AllocationPlan;

const RESULT_SUFFIX: &str = "[result]";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize plan: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn render(plan: &AllocationPlan, format: ReportFormat) -> Result<String, ReportError> {
    match format {
        ReportFormat::Text => Ok(render_text(plan)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(plan)?),
    }
}

/// Step-by-step advice, one line per recipient, then the total.
pub fn render_text(plan: &AllocationPlan) -> String {
    let mut out = String::from("\n");
    for entry in plan.entries() {
        out.push_str(&format!(
            "Invest {} to the {} unit |=> {:+}\n",
            entry.amount, entry.recipient, entry.profit
        ));
    }
    out.push_str(&format!("Total profit is {}", plan.total_profit()));
    out
}

/// Sibling of `input` named `<file name>[result]`.
pub fn result_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{name}{RESULT_SUFFIX}"))
}

/// Appends `report` to `path`, creating the file first if needed.
pub fn write_report(path: &Path, report: &str) -> Result<(), ReportError> {
    let io_err = |source: std::io::Error| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    trace!(path = %path.display(), "report file opened for append");
    file.write_all(report.as_bytes()).map_err(io_err)?;
    debug!(path = %path.display(), bytes = report.len(), "report written");
    Ok(())
}
