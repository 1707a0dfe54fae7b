use crate::schema::Transaction;
use crate::utils::{mean, sample_std_dev};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Volatility reported when fewer than two months are observed.
pub const NEUTRAL_VOLATILITY: f64 = 0.5;
/// Volatility reported when monthly net cashflow averages exactly zero.
pub const MAX_VOLATILITY: f64 = 1.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyCashflow {
    pub inflow: BTreeMap<String, f64>,
    pub outflow: BTreeMap<String, f64>,
}

impl MonthlyCashflow {
    /// Every month present on either side.
    pub fn months(&self) -> BTreeSet<&str> {
        self.inflow
            .keys()
            .chain(self.outflow.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn total_inflow(&self) -> f64 {
        self.inflow.values().sum()
    }

    pub fn total_outflow(&self) -> f64 {
        self.outflow.values().sum()
    }
}

/// Buckets positive amounts into `inflow` and everything else (as an absolute
/// value) into `outflow`. A zero amount registers its month on the outflow side.
pub fn compute_monthly_cashflow(transactions: &[Transaction]) -> MonthlyCashflow {
    let mut monthly = MonthlyCashflow::default();

    for tx in transactions {
        let key = tx.month_key();
        if tx.is_inflow() {
            *monthly.inflow.entry(key).or_insert(0.0) += tx.amount;
        } else {
            *monthly.outflow.entry(key).or_insert(0.0) += tx.abs_amount();
        }
    }

    monthly
}

/// Coefficient of variation of monthly net cashflow, halved and capped at 1.
pub fn compute_cashflow_volatility(
    monthly_inflow: &BTreeMap<String, f64>,
    monthly_outflow: &BTreeMap<String, f64>,
) -> f64 {
    let months: BTreeSet<&String> = monthly_inflow.keys().chain(monthly_outflow.keys()).collect();

    if months.len() < 2 {
        return NEUTRAL_VOLATILITY;
    }

    let net: Vec<f64> = months
        .iter()
        .map(|m| {
            monthly_inflow.get(*m).copied().unwrap_or(0.0)
                - monthly_outflow.get(*m).copied().unwrap_or(0.0)
        })
        .collect();

    let mean_net = mean(&net);
    if mean_net == 0.0 {
        return MAX_VOLATILITY;
    }

    let cv = (sample_std_dev(&net) / mean_net).abs();
    (cv / 2.0).min(MAX_VOLATILITY)
}

/// Average of each month's mean running balance.
pub fn compute_avg_monthly_balance(transactions: &[Transaction]) -> f64 {
    let mut monthly_balances: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for tx in transactions {
        if let Some(balance) = tx.balance_after {
            monthly_balances
                .entry(tx.month_key())
                .or_default()
                .push(balance);
        }
    }

    let monthly_means: Vec<f64> = monthly_balances.values().map(|b| mean(b)).collect();
    mean(&monthly_means)
}
