mod error;
mod planner;
mod table;
mod types;

pub use error::{PlanError, PlanResult};
pub use planner::{compute_plan, compute_plan_with_cancel};
pub use table::{OutOfRange, ProfitMatrix, ProfitTable, RaggedRows, TableError};
pub use types::{AllocationEntry, AllocationPlan};
