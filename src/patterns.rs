use crate::cashflow::{compute_balance_metrics, compute_cashflow_metrics};
use crate::schema::Transaction;
use crate::utils::{mean, population_std_dev};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Share of months that must carry activity for a flow to count as regular.
const REGULARITY_SHARE: f64 = 0.7;
const SEASONALITY_MIN_MONTHS: usize = 3;
const SEASONALITY_MAX_VOLATILITY: f64 = 0.5;

const VERY_LOW_BALANCE: f64 = 1000.0;
const HIGH_BALANCE_VOLATILITY_RATIO: f64 = 0.5;
const FREQUENT_NEGATIVE_SHARE: f64 = 0.1;
const OUTFLOW_TO_INFLOW_LIMIT: f64 = 0.9;

pub const NO_DATA_INDICATOR: &str = "No transaction data available";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyActivity {
    pub credits: f64,
    pub debits: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashflowPatterns {
    pub has_seasonality: bool,
    /// Coefficient of variation of monthly credit totals, capped at 1.0.
    pub volatility: f64,
    pub regular_credits: bool,
    pub regular_debits: bool,
    pub monthly_breakdown: BTreeMap<String, MonthlyActivity>,
}

pub fn detect_cashflow_patterns(transactions: &[Transaction]) -> CashflowPatterns {
    if transactions.is_empty() {
        return CashflowPatterns::default();
    }

    let mut breakdown: BTreeMap<String, MonthlyActivity> = BTreeMap::new();
    for tx in transactions {
        let month = breakdown.entry(tx.month_key()).or_default();
        if tx.is_inflow() {
            month.credits += tx.amount;
        } else {
            month.debits += tx.abs_amount();
        }
        month.count += 1;
    }

    let credits: Vec<f64> = breakdown.values().map(|m| m.credits).collect();
    let mean_credits = mean(&credits);
    let volatility = if mean_credits > 0.0 {
        population_std_dev(&credits) / mean_credits
    } else {
        0.0
    };

    let month_count = breakdown.len();
    let required = month_count as f64 * REGULARITY_SHARE;
    let credit_months = breakdown.values().filter(|m| m.credits > 0.0).count();
    let debit_months = breakdown.values().filter(|m| m.debits > 0.0).count();

    CashflowPatterns {
        has_seasonality: month_count >= SEASONALITY_MIN_MONTHS
            && volatility < SEASONALITY_MAX_VOLATILITY,
        volatility: volatility.min(1.0),
        regular_credits: credit_months as f64 >= required,
        regular_debits: debit_months as f64 >= required,
        monthly_breakdown: breakdown,
    }
}

/// Human-readable distress flags. Every check runs independently, except
/// that a negative minimum balance suppresses the "very low" flag.
pub fn detect_stress_indicators(transactions: &[Transaction]) -> Vec<String> {
    if transactions.is_empty() {
        return vec![NO_DATA_INDICATOR.to_string()];
    }

    let balance = compute_balance_metrics(transactions);
    let cashflow = compute_cashflow_metrics(transactions);
    let mut indicators = Vec::new();

    if balance.min_balance < 0.0 {
        indicators.push("Negative balance detected".to_string());
    } else if balance.min_balance < VERY_LOW_BALANCE {
        indicators.push("Very low minimum balance".to_string());
    }

    if cashflow.net_cashflow < 0.0 {
        indicators.push("Negative net cashflow".to_string());
    }

    if balance.balance_volatility > balance.average_balance * HIGH_BALANCE_VOLATILITY_RATIO {
        indicators.push("High balance volatility".to_string());
    }

    let negative_balances = transactions
        .iter()
        .filter(|tx| tx.has_negative_balance())
        .count();
    if negative_balances as f64 > transactions.len() as f64 * FREQUENT_NEGATIVE_SHARE {
        indicators.push("Frequent negative balances".to_string());
    }

    if cashflow.total_inflow > 0.0
        && cashflow.total_outflow / cashflow.total_inflow > OUTFLOW_TO_INFLOW_LIMIT
    {
        indicators.push("Outflows exceed 90% of inflows".to_string());
    }

    indicators
}
