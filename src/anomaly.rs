use crate::schema::{FinancialHealthSummary, Transaction};
use crate::utils::{format_amount, mean, population_std_dev};
use chrono::NaiveDateTime;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const MIN_TRANSACTIONS: usize = 3;
const OUTLIER_SIGMAS: f64 = 3.0;
const RAPID_CHANGE_RATIO: f64 = 0.5;

const NEGATIVE_CASHFLOW_LIMIT: f64 = 0.0;
const EXTREME_VOLATILITY: f64 = 0.7;
const STRESS_INDICATOR_LIMIT: usize = 3;
const LOW_STABILITY: f64 = 0.3;
const EMI_SHARE_LIMIT: f64 = 0.3;
const NEGATIVE_BALANCE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    OutlierTransaction,
    RapidBalanceChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub description: String,
    pub severity: Severity,

    #[serde(with = "crate::utils::datetime_format")]
    #[schemars(with = "String")]
    pub date: NaiveDateTime,

    /// The offending transaction, for outliers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_balance: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<f64>,
}

/// Flags amount outliers and rapid running-balance swings.
///
/// Outliers exceed `mean + 3 * stdev` of absolute amounts (or `2 * mean`
/// when every amount is equal) and are `High` severity past twice that
/// threshold. Balance swings compare each balance with the previous one in
/// date order and fire above a 50% relative change; a zero previous balance
/// never fires. Both kinds may flag the same transaction.
pub fn detect_anomalies(transactions: &[Transaction]) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    if transactions.len() < MIN_TRANSACTIONS {
        return anomalies;
    }

    let amounts: Vec<f64> = transactions.iter().map(Transaction::abs_amount).collect();
    let mean_amount = mean(&amounts);
    let std_dev = population_std_dev(&amounts);
    let threshold = if std_dev > 0.0 {
        mean_amount + OUTLIER_SIGMAS * std_dev
    } else {
        mean_amount * 2.0
    };
    debug!(
        "Outlier threshold {:.2} (mean {:.2}, stdev {:.2})",
        threshold, mean_amount, std_dev
    );

    for tx in transactions {
        let amount = tx.abs_amount();
        if threshold > 0.0 && amount > threshold {
            anomalies.push(Anomaly {
                kind: AnomalyKind::OutlierTransaction,
                description: format!("Unusually large transaction: {}", format_amount(amount)),
                severity: if amount > threshold * 2.0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                date: tx.date,
                transaction: Some(tx.clone()),
                previous_balance: None,
                current_balance: None,
            });
        }
    }

    let mut balances: Vec<(NaiveDateTime, f64)> = transactions
        .iter()
        .filter_map(|tx| tx.balance_after.map(|b| (tx.date, b)))
        .collect();
    balances.sort_by_key(|(date, _)| *date);

    for pair in balances.windows(2) {
        let (_, previous) = pair[0];
        let (date, current) = pair[1];
        let change = if previous != 0.0 {
            ((current - previous) / previous).abs()
        } else {
            0.0
        };

        if change > RAPID_CHANGE_RATIO {
            anomalies.push(Anomaly {
                kind: AnomalyKind::RapidBalanceChange,
                description: format!("Rapid balance change: {:.1}%", change * 100.0),
                severity: Severity::Medium,
                date,
                transaction: None,
                previous_balance: Some(previous),
                current_balance: Some(current),
            });
        }
    }

    anomalies
}

/// Lending red flags derived from a health summary and the raw transactions.
pub fn detect_red_flags(
    transactions: &[Transaction],
    financial_health: &FinancialHealthSummary,
) -> Vec<String> {
    let mut red_flags = Vec::new();

    if financial_health.net_cashflow < NEGATIVE_CASHFLOW_LIMIT {
        red_flags.push("Sustained negative cashflow".to_string());
    }

    if financial_health.volatility_score > EXTREME_VOLATILITY {
        red_flags.push("Extremely high cashflow volatility".to_string());
    }

    let stress_count = financial_health.stress_indicators.len();
    if stress_count >= STRESS_INDICATOR_LIMIT {
        red_flags.push(format!(
            "Multiple financial stress indicators ({})",
            stress_count
        ));
    }

    if financial_health.cashflow_stability_score < LOW_STABILITY {
        red_flags.push("Very low cashflow stability".to_string());
    }

    let emi_count = transactions
        .iter()
        .filter(|tx| tx.description_lower().contains("emi"))
        .count();
    if emi_count as f64 > transactions.len() as f64 * EMI_SHARE_LIMIT {
        red_flags.push("High proportion of EMI payments (potential over-leverage)".to_string());
    }

    let negative_balances = transactions
        .iter()
        .filter(|tx| tx.has_negative_balance())
        .count();
    if negative_balances > NEGATIVE_BALANCE_LIMIT {
        red_flags.push("Multiple instances of negative balances".to_string());
    }

    red_flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::CashflowPatterns;
    use crate::schema::FinancialHealthMetadata;
    use chrono::{Duration, NaiveDate};
    use std::collections::BTreeMap;

    fn day(n: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(n)
    }

    fn amounts(values: &[f64]) -> Vec<Transaction> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Transaction::new(day(i as i64), *v, "test"))
            .collect()
    }

    fn healthy_summary() -> FinancialHealthSummary {
        FinancialHealthSummary {
            total_inflow: 100_000.0,
            total_outflow: 60_000.0,
            net_cashflow: 40_000.0,
            average_balance: 80_000.0,
            min_balance: 50_000.0,
            max_balance: 120_000.0,
            volatility_score: 0.2,
            seasonality_detected: true,
            stress_indicators: vec![],
            cashflow_stability_score: 0.9,
            transaction_count: 10,
            period_start: day(0),
            period_end: day(30),
            categorized_transactions: BTreeMap::new(),
            metadata: FinancialHealthMetadata {
                pattern_analysis: CashflowPatterns::default(),
                balance_volatility: 0.0,
                inflow_count: 5,
                outflow_count: 5,
            },
        }
    }

    #[test]
    fn test_too_few_transactions() {
        assert!(detect_anomalies(&amounts(&[1.0, 1_000_000.0])).is_empty());
    }

    #[test]
    fn test_outlier_among_ten_small_is_medium() {
        // mean 9181.8, population stdev 28719.3 -> threshold 95339.7
        let mut values = vec![100.0; 10];
        values.push(100_000.0);
        let anomalies = detect_anomalies(&amounts(&values));
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::OutlierTransaction);
        assert_eq!(anomalies[0].severity, Severity::Medium);
        assert_eq!(anomalies[0].description, "Unusually large transaction: 100,000.00");
        assert_eq!(anomalies[0].transaction.as_ref().unwrap().amount, 100_000.0);
    }

    #[test]
    fn test_outlier_among_many_small_is_high() {
        // mean ~1089, stdev ~9900 -> threshold ~30800, doubled ~61600
        let mut values = vec![100.0; 100];
        values.push(100_000.0);
        let anomalies = detect_anomalies(&amounts(&values));
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, Severity::High);
    }

    #[test]
    fn test_equal_amounts_never_flag() {
        assert!(detect_anomalies(&amounts(&[500.0, -500.0, 500.0, 500.0])).is_empty());
        assert!(detect_anomalies(&amounts(&[0.0, 0.0, 0.0])).is_empty());
    }

    #[test]
    fn test_rapid_balance_change_in_date_order() {
        let txs = vec![
            Transaction::new(day(2), 10.0, "c").with_balance(3_000.0),
            Transaction::new(day(0), 10.0, "a").with_balance(10_000.0),
            Transaction::new(day(1), 10.0, "b").with_balance(9_000.0),
        ];
        let anomalies = detect_anomalies(&txs);
        assert_eq!(anomalies.len(), 1);
        let swing = &anomalies[0];
        assert_eq!(swing.kind, AnomalyKind::RapidBalanceChange);
        assert_eq!(swing.severity, Severity::Medium);
        assert_eq!(swing.date, day(2));
        assert_eq!(swing.previous_balance, Some(9_000.0));
        assert_eq!(swing.current_balance, Some(3_000.0));
        assert_eq!(swing.description, "Rapid balance change: 66.7%");
    }

    #[test]
    fn test_zero_previous_balance_is_guarded() {
        let txs = vec![
            Transaction::new(day(0), 10.0, "a").with_balance(0.0),
            Transaction::new(day(1), 10.0, "b").with_balance(5_000.0),
            Transaction::new(day(2), 10.0, "c").with_balance(5_100.0),
        ];
        assert!(detect_anomalies(&txs).is_empty());
    }

    #[test]
    fn test_both_kinds_can_fire() {
        let mut txs: Vec<Transaction> = (0..100)
            .map(|i| Transaction::new(day(i), 100.0, "sale").with_balance(1_000.0))
            .collect();
        txs.push(Transaction::new(day(200), 100_000.0, "big").with_balance(101_000.0));
        let anomalies = detect_anomalies(&txs);
        let kinds: Vec<AnomalyKind> = anomalies.iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&AnomalyKind::OutlierTransaction));
        assert!(kinds.contains(&AnomalyKind::RapidBalanceChange));
        assert!(anomalies.iter().all(|a| a.date == day(200)));
    }

    #[test]
    fn test_no_red_flags_for_healthy_profile() {
        let txs = amounts(&[100.0, -50.0]);
        assert!(detect_red_flags(&txs, &healthy_summary()).is_empty());
    }

    #[test]
    fn test_red_flags_fire_independently() {
        let mut summary = healthy_summary();
        summary.net_cashflow = -1.0;
        summary.volatility_score = 0.75;
        summary.cashflow_stability_score = 0.1;
        summary.stress_indicators = vec!["a".into(), "b".into(), "c".into()];

        let mut txs: Vec<Transaction> = (0..6)
            .map(|i| Transaction::new(day(i), -100.0, "EMI auto-debit").with_balance(-10.0))
            .collect();
        txs.extend((6..10).map(|i| Transaction::new(day(i), 100.0, "sale")));

        let flags = detect_red_flags(&txs, &summary);
        assert_eq!(
            flags,
            vec![
                "Sustained negative cashflow".to_string(),
                "Extremely high cashflow volatility".to_string(),
                "Multiple financial stress indicators (3)".to_string(),
                "Very low cashflow stability".to_string(),
                "High proportion of EMI payments (potential over-leverage)".to_string(),
                "Multiple instances of negative balances".to_string(),
            ]
        );
    }

    #[test]
    fn test_emi_share_at_limit_does_not_flag() {
        let mut txs: Vec<Transaction> = (0..3)
            .map(|i| Transaction::new(day(i), -100.0, "emi"))
            .collect();
        txs.extend((3..10).map(|i| Transaction::new(day(i), 100.0, "sale")));
        assert!(detect_red_flags(&txs, &healthy_summary()).is_empty());
    }
}
