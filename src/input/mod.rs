//! Profit matrix files.
//!
//! One recipient per line, space-separated non-negative decimals, and a final
//! `discretness <unit size>` line:
//!
//! ```text
//! 0 3 4
//! 0 2 6
//! discretness 0.5
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::core::{ProfitMatrix, RaggedRows};

const NUMBER: &str = r"([0-9]*[.])?[0-9]+";
const UNIT_SIZE_KEY: &str = "discretness";

static CONTENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^({NUMBER}((\r?\n)| ))+{UNIT_SIZE_KEY} ({NUMBER})$"
    ))
    .expect("Invalid regex pattern")
});
static UNIT_SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^{UNIT_SIZE_KEY} ({NUMBER})$")).expect("Invalid regex pattern")
});

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("missing `discretness <value>` declaration")]
    MissingUnitSize,

    #[error("line {line}: `{token}` is not a finite number")]
    InvalidNumber { line: usize, token: String },

    #[error("input has no profit rows")]
    Empty,

    #[error("profit rows differ in length: {0}")]
    Ragged(#[from] RaggedRows),

    #[error("unit size must be > 0, got {0}")]
    InvalidUnitSize(f64),
}

/// A validated profit matrix together with its unit size.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub table: ProfitMatrix,
    pub unit_size: f64,
}

impl Problem {
    /// The whole portion axis: `row length - 1`.
    pub fn full_budget(&self) -> usize {
        self.table.max_budget().unwrap_or(0)
    }
}

/// Checks the overall shape of a matrix file. Trailing line breaks are ignored.
pub fn validate_content(content: &str) -> bool {
    CONTENT_PATTERN.is_match(trim_trailing_breaks(content))
}

pub fn read_problem(path: &Path) -> Result<Problem, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "read profit matrix file");
    parse_problem(&content)
}

pub fn parse_problem(content: &str) -> Result<Problem, InputError> {
    let content = trim_trailing_breaks(content);
    if !content.contains(UNIT_SIZE_KEY) {
        return Err(InputError::MissingUnitSize);
    }
    if !validate_content(content) {
        return Err(InputError::Malformed(
            "expected rows of non-negative numbers followed by a `discretness` line".to_string(),
        ));
    }

    let lines: Vec<&str> = content.lines().collect();
    let (unit_line, row_lines) = lines.split_last().ok_or(InputError::Empty)?;
    let unit_size = parse_unit_size(unit_line)?;
    let rows = row_lines
        .iter()
        .enumerate()
        .map(|(idx, line)| parse_row(idx + 1, line))
        .collect::<Result<Vec<_>, _>>()?;

    trace!(?rows, unit_size, "parsed profit matrix");
    if rows.is_empty() || rows[0].is_empty() {
        return Err(InputError::Empty);
    }
    let table = ProfitMatrix::new(rows)?;
    Ok(Problem { table, unit_size })
}

fn parse_unit_size(line: &str) -> Result<f64, InputError> {
    let Some(captures) = UNIT_SIZE_PATTERN.captures(line) else {
        if line.contains(UNIT_SIZE_KEY) {
            return Err(InputError::Malformed(format!(
                "`{UNIT_SIZE_KEY}` must be declared on its own line"
            )));
        }
        return Err(InputError::MissingUnitSize);
    };
    let token = &captures[1];
    let unit_size: f64 = token.parse().map_err(|_| InputError::MissingUnitSize)?;
    if !unit_size.is_finite() || unit_size <= 0.0 {
        return Err(InputError::InvalidUnitSize(unit_size));
    }
    Ok(unit_size)
}

fn parse_row(line: usize, text: &str) -> Result<Vec<f64>, InputError> {
    text.split(' ')
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| InputError::InvalidNumber {
                    line,
                    token: token.to_string(),
                })
        })
        .collect()
}

fn trim_trailing_breaks(content: &str) -> &str {
    content.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProfitTable;
    use std::io::Write;

    #[test]
    fn parses_rows_and_unit_size() {
        let problem = parse_problem("0 3 4\n0 2 6\ndiscretness 0.5\n").expect("valid file");
        assert_eq!(problem.table.rows(), &[vec![0.0, 3.0, 4.0], vec![0.0, 2.0, 6.0]]);
        assert_eq!(problem.unit_size, 0.5);
        assert_eq!(problem.full_budget(), 2);
        assert_eq!(problem.table.recipients(), 2);
    }

    #[test]
    fn accepts_windows_line_breaks_and_leading_dot_numbers() {
        let problem = parse_problem("0 .5 1.25\r\ndiscretness .1\r\n").expect("valid file");
        assert_eq!(problem.table.rows(), &[vec![0.0, 0.5, 1.25]]);
        assert_eq!(problem.unit_size, 0.1);
    }

    #[test]
    fn validate_content_matches_shape_only() {
        assert!(validate_content("1 2\n3 4\ndiscretness 2"));
        assert!(validate_content("1 2\n3\ndiscretness 2"));
        assert!(!validate_content("1 2\n3 4\n"));
        assert!(!validate_content("1 -2\ndiscretness 2"));
        assert!(!validate_content("1  2\ndiscretness 2"));
        assert!(!validate_content("1 2\n\ndiscretness 2"));
        assert!(!validate_content("1 2\ndiscretness"));
    }

    #[test]
    fn rejects_missing_unit_size() {
        let err = parse_problem("0 1 2\n0 1 2\n").expect_err("no discretness");
        assert!(matches!(err, InputError::MissingUnitSize));
        let err = parse_problem("0 1 2\ndiscretness x").expect_err("bad value");
        assert!(matches!(err, InputError::Malformed(_)));
    }

    #[test]
    fn rejects_unit_size_sharing_a_row() {
        let err = parse_problem("0 1\n0 1 discretness 1").expect_err("shared line");
        match err {
            InputError::Malformed(msg) => assert!(msg.contains("own line")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_zero_unit_size() {
        let err = parse_problem("0 1\ndiscretness 0").expect_err("zero unit");
        assert!(matches!(err, InputError::InvalidUnitSize(v) if v == 0.0));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_problem("0 1 2\n0 1\ndiscretness 1").expect_err("ragged");
        match err {
            InputError::Ragged(ragged) => {
                assert_eq!((ragged.row, ragged.expected, ragged.found), (1, 3, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_overflowing_numbers() {
        let huge = "9".repeat(400);
        let err = parse_problem(&format!("0 {huge}\ndiscretness 1")).expect_err("overflow");
        assert!(matches!(err, InputError::InvalidNumber { line: 1, .. }));
    }

    #[test]
    fn reads_problem_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "0 5 8\ndiscretness 100").expect("write temp file");
        let problem = read_problem(file.path()).expect("valid file");
        assert_eq!(problem.full_budget(), 2);
        assert_eq!(problem.unit_size, 100.0);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_problem(Path::new("/definitely/not/here.txt")).expect_err("missing");
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}
