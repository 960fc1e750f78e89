use thiserror::Error;

use super::table::TableError;

pub type PlanResult<T> = Result<T, PlanError>;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("budget {budget} cannot be distributed: the table covers at most {max_portions} portions")]
    InvalidBudget { budget: i64, max_portions: usize },

    #[error("unit size must be finite and > 0, got {0}")]
    InvalidUnitSize(f64),

    #[error("profit table has no recipients or an empty portion axis")]
    EmptyTable,

    #[error("profit table failed for recipient {recipient} at {portions} portions: {source}")]
    TableAccess {
        recipient: usize,
        portions: usize,
        #[source]
        source: TableError,
    },

    #[error("no finite allocation of {budget} portions exists for this table")]
    Infeasible { budget: usize },

    #[error("planning cancelled before recipient {recipient}")]
    Cancelled { recipient: usize },
}
