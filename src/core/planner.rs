use tracing::{debug, trace};

use super::error::{PlanError, PlanResult};
use super::table::ProfitTable;
use super::types::{AllocationEntry, AllocationPlan};

/// Per-invocation DP state. Layer `i` describes recipients `i..R`.
struct StateTable {
    /// `best[i][r]`: best profit of recipients `i..R` spending exactly `r` portions.
    best: Vec<Vec<f64>>,
    /// `choice[i][r]`: portions given to recipient `i` in that optimum.
    choice: Vec<Vec<usize>>,
    /// Profit row of each recipient over `0..=budget`, queried once per layer.
    profits: Vec<Vec<f64>>,
}

impl StateTable {
    fn new(recipients: usize, budget: usize) -> Self {
        let mut best = vec![vec![f64::NEG_INFINITY; budget + 1]; recipients + 1];
        best[recipients][0] = 0.0;
        Self {
            best,
            choice: vec![vec![0; budget + 1]; recipients],
            profits: Vec::with_capacity(recipients),
        }
    }
}

/// Computes the profit-maximizing distribution of exactly `total_budget`
/// portions over every recipient of `table`.
pub fn compute_plan<T: ProfitTable + ?Sized>(
    table: &T,
    total_budget: usize,
    unit_size: f64,
) -> PlanResult<AllocationPlan> {
    compute_plan_with_cancel(table, total_budget, unit_size, || false)
}

/// Same as [`compute_plan`], polling `should_cancel` before every recipient
/// layer and before every budget state inside a layer. A cancelled run
/// discards its partial state.
pub fn compute_plan_with_cancel<T, F>(
    table: &T,
    total_budget: usize,
    unit_size: f64,
    mut should_cancel: F,
) -> PlanResult<AllocationPlan>
where
    T: ProfitTable + ?Sized,
    F: FnMut() -> bool,
{
    let recipients = table.recipients();
    let axis = table.portions();
    validate_request(recipients, axis, total_budget, unit_size)?;

    debug!(recipients, total_budget, unit_size, "planning allocation");

    let mut state = StateTable::new(recipients, total_budget);
    for recipient in (0..recipients).rev() {
        if should_cancel() {
            debug!(recipient, "planning cancelled");
            return Err(PlanError::Cancelled { recipient });
        }
        let row = query_row(table, recipient, total_budget)?;
        fill_layer(&mut state, recipient, &row, &mut should_cancel)?;
        state.profits.push(row);
    }
    state.profits.reverse();

    let optimum = state.best[0][total_budget];
    if optimum == f64::NEG_INFINITY || optimum.is_nan() {
        return Err(PlanError::Infeasible {
            budget: total_budget,
        });
    }

    let plan = reconstruct(&state, total_budget, unit_size);
    debug!(total_profit = plan.total_profit(), "allocation planned");
    Ok(plan)
}

fn validate_request(
    recipients: usize,
    axis: usize,
    total_budget: usize,
    unit_size: f64,
) -> PlanResult<()> {
    if recipients == 0 || axis == 0 {
        return Err(PlanError::EmptyTable);
    }
    if !unit_size.is_finite() || unit_size <= 0.0 {
        return Err(PlanError::InvalidUnitSize(unit_size));
    }
    if total_budget >= axis {
        return Err(PlanError::InvalidBudget {
            budget: i64::try_from(total_budget).unwrap_or(i64::MAX),
            max_portions: axis - 1,
        });
    }
    Ok(())
}

fn query_row<T: ProfitTable + ?Sized>(
    table: &T,
    recipient: usize,
    total_budget: usize,
) -> PlanResult<Vec<f64>> {
    (0..=total_budget)
        .map(|portions| {
            table
                .profit(recipient, portions)
                .map_err(|source| PlanError::TableAccess {
                    recipient,
                    portions,
                    source,
                })
        })
        .collect()
}

/// `best(i, r) = max_{k in 0..=r} profit(i, k) + best(i+1, r-k)`, smallest `k` on ties.
fn fill_layer<F: FnMut() -> bool>(
    state: &mut StateTable,
    recipient: usize,
    row: &[f64],
    should_cancel: &mut F,
) -> PlanResult<()> {
    let (head, tail) = state.best.split_at_mut(recipient + 1);
    let current = &mut head[recipient];
    let next = &tail[0];

    for remaining in 0..current.len() {
        // A single layer costs O(budget²), so wide rows must stay interruptible.
        if should_cancel() {
            debug!(recipient, remaining, "planning cancelled mid-layer");
            return Err(PlanError::Cancelled { recipient });
        }
        let mut best = f64::NEG_INFINITY;
        let mut choice = 0;
        for (portions, profit) in row.iter().enumerate().take(remaining + 1) {
            let rest = next[remaining - portions];
            if rest == f64::NEG_INFINITY {
                continue;
            }
            let candidate = profit + rest;
            if candidate > best {
                best = candidate;
                choice = portions;
            }
        }
        current[remaining] = best;
        state.choice[recipient][remaining] = choice;
    }
    trace!(recipient, layer = ?current, "layer filled");
    Ok(())
}

fn reconstruct(state: &StateTable, total_budget: usize, unit_size: f64) -> AllocationPlan {
    let mut remaining = total_budget;
    let mut entries = Vec::with_capacity(state.choice.len());
    for (recipient, choices) in state.choice.iter().enumerate() {
        let portions = choices[remaining];
        entries.push(AllocationEntry {
            recipient,
            portions,
            amount: portions as f64 * unit_size,
            profit: state.profits[recipient][portions],
        });
        remaining -= portions;
    }
    AllocationPlan::new(entries, unit_size)
}
