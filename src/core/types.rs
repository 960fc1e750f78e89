use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationEntry {
    pub recipient: usize,
    pub portions: usize,
    pub amount: f64,
    pub profit: f64,
}

/// Optimal distribution of the budget, one entry per recipient in table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan {
    entries: Vec<AllocationEntry>,
    total_profit: f64,
    total_portions: usize,
    unit_size: f64,
}

impl AllocationPlan {
    pub(crate) fn new(entries: Vec<AllocationEntry>, unit_size: f64) -> Self {
        let total_profit = entries.iter().map(|e| e.profit).sum();
        let total_portions = entries.iter().map(|e| e.portions).sum();
        Self {
            entries,
            total_profit,
            total_portions,
            unit_size,
        }
    }

    pub fn entries(&self) -> &[AllocationEntry] {
        &self.entries
    }

    pub fn total_profit(&self) -> f64 {
        self.total_profit
    }

    pub fn total_portions(&self) -> usize {
        self.total_portions
    }

    pub fn total_amount(&self) -> f64 {
        self.total_portions as f64 * self.unit_size
    }

    /// `(portions, profit)` pairs in recipient order.
    #[cfg(test)]
    pub(crate) fn choices(&self) -> Vec<(usize, f64)> {
        self.entries.iter().map(|e| (e.portions, e.profit)).collect()
    }
}
