use crate::anomaly::{detect_anomalies, detect_red_flags};
use crate::behavior::{
    count_cheque_bounces, count_emi_mentions, count_emi_transactions, count_low_balance_days,
    count_overdraft_days,
};
use crate::cashflow::{compute_balance_metrics, compute_cashflow_metrics, compute_stability_score};
use crate::categorizer::categorize_all;
use crate::clock::{Clock, SystemClock};
use crate::config::AnalysisConfig;
use crate::error::{MetricsError, Result};
use crate::gst::{analyze_gst_data, GstAnalysis};
use crate::ingestion::extract_transactions_with_report;
use crate::monthly::{compute_avg_monthly_balance, compute_cashflow_volatility, compute_monthly_cashflow};
use crate::patterns::{detect_cashflow_patterns, detect_stress_indicators};
use crate::schema::{
    BehavioralMetrics, CashflowCategory, CreditAnalysis, FinancialHealthMetadata,
    FinancialHealthSummary, HealthAnalysisMetadata, HealthAnalysisSummary, Transaction,
};
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;

/// Runs the metrics pipeline over in-memory input. Holds no state between
/// calls beyond its configuration and clock.
pub struct MetricsEngine<C: Clock = SystemClock> {
    config: AnalysisConfig,
    clock: C,
}

impl Default for MetricsEngine<SystemClock> {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl MetricsEngine<SystemClock> {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> MetricsEngine<C> {
    pub fn with_clock(config: AnalysisConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Extracts normalized transactions, honoring `strict_dates`.
    pub fn normalize(&self, data: &Value) -> Result<Vec<Transaction>> {
        self.config.validate()?;

        let extraction = extract_transactions_with_report(data, &self.clock)?;
        if !extraction.date_fallbacks.is_empty() {
            if self.config.strict_dates {
                return Err(MetricsError::DateError(format!(
                    "{} transaction(s) have a missing or unparseable date (first at index {})",
                    extraction.date_fallbacks.len(),
                    extraction.date_fallbacks[0]
                )));
            }
            warn!(
                "{} transaction date(s) replaced with the current time",
                extraction.date_fallbacks.len()
            );
        }

        Ok(extraction.transactions)
    }

    pub fn financial_health(&self, data: &Value) -> Result<FinancialHealthSummary> {
        info!("Starting financial health analysis");
        let transactions = self.normalize(data)?;
        let summary = self.financial_health_from(&transactions)?;
        info!("Financial health analysis completed successfully");
        Ok(summary)
    }

    pub fn financial_health_from(
        &self,
        transactions: &[Transaction],
    ) -> Result<FinancialHealthSummary> {
        if transactions.is_empty() {
            return Err(MetricsError::NoTransactions);
        }
        debug!("Categorizing {} transactions", transactions.len());
        let categorized = categorize_all(transactions);

        let mut category_counts: BTreeMap<CashflowCategory, usize> = BTreeMap::new();
        for tx in &categorized {
            let category = tx.category.unwrap_or(CashflowCategory::Other);
            *category_counts.entry(category).or_insert(0) += 1;
        }
        debug!("Transactions categorized: {:?}", category_counts);

        debug!("Detecting cashflow patterns");
        let patterns = detect_cashflow_patterns(&categorized);

        debug!("Computing financial metrics");
        let cashflow = compute_cashflow_metrics(&categorized);
        let balance = compute_balance_metrics(&categorized);
        let stability = compute_stability_score(&categorized);
        let stress_indicators = detect_stress_indicators(&categorized);
        let (period_start, period_end) = self.period(&categorized);

        Ok(FinancialHealthSummary {
            total_inflow: cashflow.total_inflow,
            total_outflow: cashflow.total_outflow,
            net_cashflow: cashflow.net_cashflow,
            average_balance: balance.average_balance,
            min_balance: balance.min_balance,
            max_balance: balance.max_balance,
            volatility_score: patterns.volatility,
            seasonality_detected: patterns.has_seasonality,
            stress_indicators,
            cashflow_stability_score: stability,
            transaction_count: categorized.len(),
            period_start,
            period_end,
            categorized_transactions: category_counts,
            metadata: FinancialHealthMetadata {
                pattern_analysis: patterns,
                balance_volatility: balance.balance_volatility,
                inflow_count: cashflow.inflow_count,
                outflow_count: cashflow.outflow_count,
            },
        })
    }

    pub fn health_analysis(&self, data: &Value) -> Result<HealthAnalysisSummary> {
        info!("Starting health analysis");
        let transactions = self.normalize(data)?;
        let summary = self.health_analysis_from(&transactions, analyze_gst_data(data))?;
        info!("Health analysis completed successfully");
        Ok(summary)
    }

    /// Month-grained analysis over normalized (uncategorized) transactions.
    pub fn health_analysis_from(
        &self,
        transactions: &[Transaction],
        gst_analysis: GstAnalysis,
    ) -> Result<HealthAnalysisSummary> {
        if transactions.is_empty() {
            return Err(MetricsError::NoTransactions);
        }

        debug!("Computing monthly cashflow");
        let monthly = compute_monthly_cashflow(transactions);
        let total_inflow = monthly.total_inflow();
        let total_outflow = monthly.total_outflow();
        let months_analyzed = monthly.months().len();
        let cashflow_volatility = compute_cashflow_volatility(&monthly.inflow, &monthly.outflow);

        debug!("Computing balance and behavior counters");
        let avg_balance = compute_avg_monthly_balance(transactions);
        let low_balance_days =
            count_low_balance_days(transactions, self.config.low_balance_threshold);
        let emi_transactions = count_emi_transactions(transactions);
        let cheque_bounces = count_cheque_bounces(transactions);
        let overdraft_days = count_overdraft_days(transactions);
        let (period_start, period_end) = self.period(transactions);

        Ok(HealthAnalysisSummary {
            monthly_inflow: monthly.inflow,
            monthly_outflow: monthly.outflow,
            net_cashflow: total_inflow - total_outflow,
            cashflow_volatility,
            avg_balance,
            low_balance_days,
            emi_transactions,
            cheque_bounces,
            overdraft_days,
            gst_analysis,
            period_start,
            period_end,
            metadata: HealthAnalysisMetadata {
                total_inflow,
                total_outflow,
                months_analyzed,
            },
        })
    }

    /// Deterministic snapshot for the credit-scoring collaborator. When no
    /// health summary is supplied one is computed from `transactions`.
    pub fn behavioral_metrics(
        &self,
        transactions: &[Transaction],
        financial_health: Option<&FinancialHealthSummary>,
    ) -> Result<BehavioralMetrics> {
        let computed;
        let financial_health = match financial_health {
            Some(summary) => summary,
            None if transactions.is_empty() => {
                return Err(MetricsError::DataError(
                    "No transaction or financial health data provided".to_string(),
                ));
            }
            None => {
                computed = self.financial_health_from(transactions)?;
                &computed
            }
        };

        let mut anomalies = detect_anomalies(transactions);
        anomalies.truncate(self.config.max_reported_anomalies);

        Ok(BehavioralMetrics {
            transaction_count: transactions.len(),
            cashflow_metrics: compute_cashflow_metrics(transactions),
            stability_score: compute_stability_score(transactions),
            anomalies_detected: anomalies,
            red_flags_detected: detect_red_flags(transactions, financial_health),
            emi_payments_detected: count_emi_mentions(transactions),
        })
    }

    /// Full run. The financial-health summary is required and its failure is
    /// returned as-is; the other parts degrade to `None` with a warning.
    ///
    /// Once the financial-health summary exists the optional parts have no
    /// failing inputs left, so `warnings` stays empty for today's stages.
    pub fn analyze(&self, data: &Value) -> Result<CreditAnalysis> {
        info!("Starting credit metrics analysis");
        let transactions = self.normalize(data)?;
        let financial_health = self.financial_health_from(&transactions)?;

        let mut warnings = Vec::new();
        let health_analysis = optional_part(
            "Health analysis",
            self.health_analysis_from(&transactions, analyze_gst_data(data)),
            &mut warnings,
        );
        let behavioral_metrics = optional_part(
            "Behavioral metrics",
            self.behavioral_metrics(&transactions, Some(&financial_health)),
            &mut warnings,
        );

        info!(
            "Credit metrics analysis completed for {} transactions",
            transactions.len()
        );

        Ok(CreditAnalysis {
            financial_health,
            health_analysis,
            behavioral_metrics,
            warnings,
        })
    }

    fn period(&self, transactions: &[Transaction]) -> (NaiveDateTime, NaiveDateTime) {
        let start = transactions.iter().map(|tx| tx.date).min();
        let end = transactions.iter().map(|tx| tx.date).max();
        (
            start.unwrap_or_else(|| self.clock.now()),
            end.unwrap_or_else(|| self.clock.now()),
        )
    }
}

/// Keeps an optional stage's output, or records why it failed.
fn optional_part<T>(name: &str, result: Result<T>, warnings: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} failed: {}", name, e);
            warnings.push(format!("{} failed: {}", name, e));
            None
        }
    }
}
