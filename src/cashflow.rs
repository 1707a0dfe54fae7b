use crate::schema::Transaction;
use crate::utils::{mean, median, population_std_dev, sample_std_dev};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stability reported when every inflow lands in a single month.
pub const SINGLE_MONTH_STABILITY: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashflowMetrics {
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub net_cashflow: f64,
    pub average_inflow: f64,
    pub average_outflow: f64,
    pub inflow_count: usize,
    pub outflow_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceMetrics {
    pub average_balance: f64,
    pub min_balance: f64,
    pub max_balance: f64,
    pub median_balance: f64,
    /// Sample standard deviation of running balances.
    pub balance_volatility: f64,
}

/// Inflow/outflow totals. Zero amounts count toward neither side.
pub fn compute_cashflow_metrics(transactions: &[Transaction]) -> CashflowMetrics {
    let inflows: Vec<f64> = transactions
        .iter()
        .filter(|tx| tx.is_inflow())
        .map(|tx| tx.amount)
        .collect();
    let outflows: Vec<f64> = transactions
        .iter()
        .filter(|tx| tx.is_outflow())
        .map(|tx| tx.abs_amount())
        .collect();

    let total_inflow: f64 = inflows.iter().sum();
    let total_outflow: f64 = outflows.iter().sum();

    CashflowMetrics {
        total_inflow,
        total_outflow,
        net_cashflow: total_inflow - total_outflow,
        average_inflow: mean(&inflows),
        average_outflow: mean(&outflows),
        inflow_count: inflows.len(),
        outflow_count: outflows.len(),
    }
}

pub fn compute_balance_metrics(transactions: &[Transaction]) -> BalanceMetrics {
    let balances: Vec<f64> = transactions
        .iter()
        .filter_map(|tx| tx.balance_after)
        .collect();

    if balances.is_empty() {
        return BalanceMetrics::default();
    }

    BalanceMetrics {
        average_balance: mean(&balances),
        min_balance: balances.iter().copied().fold(f64::INFINITY, f64::min),
        max_balance: balances.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        median_balance: median(&balances),
        balance_volatility: sample_std_dev(&balances),
    }
}

/// Inverse coefficient of variation of monthly inflow totals, in `[0, 1]`.
pub fn compute_stability_score(transactions: &[Transaction]) -> f64 {
    compute_stability_score_over(transactions, None)
}

/// Same as [`compute_stability_score`] with an explicit observation period.
/// When `period_days` is `None` it is the inclusive span between the first
/// and last transaction.
pub fn compute_stability_score_over(transactions: &[Transaction], period_days: Option<i64>) -> f64 {
    if transactions.len() < 2 {
        return 0.0;
    }

    let period_days = period_days.unwrap_or_else(|| {
        let first = transactions.iter().map(|tx| tx.date).min();
        let last = transactions.iter().map(|tx| tx.date).max();
        match (first, last) {
            (Some(first), Some(last)) => (last - first).num_days() + 1,
            _ => 0,
        }
    });
    if period_days <= 0 {
        return 0.0;
    }

    let mut monthly_inflows: BTreeMap<String, f64> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_inflow()) {
        *monthly_inflows.entry(tx.month_key()).or_insert(0.0) += tx.amount;
    }

    if monthly_inflows.is_empty() {
        return 0.0;
    }
    if monthly_inflows.len() < 2 {
        return SINGLE_MONTH_STABILITY;
    }

    let values: Vec<f64> = monthly_inflows.into_values().collect();
    let mean_inflow = mean(&values);
    if mean_inflow == 0.0 {
        return 0.0;
    }

    let cv = population_std_dev(&values) / mean_inflow;
    (1.0 / (1.0 + cv)).clamp(0.0, 1.0)
}
