use std::error::Error;

pub type TableError = Box<dyn Error + Send + Sync + 'static>;

/// Read-only source of profit values for `(recipient, portions)` pairs.
///
/// The planner only queries recipients in `[0, recipients())` and portion
/// counts in `[0, budget]`, where `budget < portions()`.
pub trait ProfitTable {
    fn recipients(&self) -> usize;

    /// Length of the portion axis, i.e. `M + 1` for counts `0..=M`.
    fn portions(&self) -> usize;

    fn profit(&self, recipient: usize, portions: usize) -> Result<f64, TableError>;
}

/// In-memory table with uniform row length.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitMatrix {
    rows: Vec<Vec<f64>>,
    width: usize,
}

impl ProfitMatrix {
    /// Builds a matrix, rejecting ragged rows. An empty row list is allowed
    /// here; the planner reports it as an empty table.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, RaggedRows> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .map(|(idx, r)| (idx, r.len()))
            .find(|&(_, len)| len != width)
        {
            return Err(RaggedRows {
                row,
                expected: width,
                found,
            });
        }
        Ok(Self { rows, width })
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Largest budget the matrix can express (`M`), `None` when the axis is empty.
    pub fn max_budget(&self) -> Option<usize> {
        self.width.checked_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("row {row} has {found} values, expected {expected}")]
pub struct RaggedRows {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("no profit value for recipient {recipient} at {portions} portions")]
pub struct OutOfRange {
    pub recipient: usize,
    pub portions: usize,
}

impl ProfitTable for ProfitMatrix {
    fn recipients(&self) -> usize {
        self.rows.len()
    }

    fn portions(&self) -> usize {
        self.width
    }

    fn profit(&self, recipient: usize, portions: usize) -> Result<f64, TableError> {
        self.rows
            .get(recipient)
            .and_then(|row| row.get(portions))
            .copied()
            .ok_or_else(|| {
                Box::new(OutOfRange {
                    recipient,
                    portions,
                }) as TableError
            })
    }
}
