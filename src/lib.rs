//! # MSME Credit Metrics
//!
//! A deterministic metrics engine that turns loosely-structured bank
//! transaction data (and optional GST filings) into the cashflow, stability
//! and risk signals used for MSME credit analysis.
//!
//! ## Core Concepts
//!
//! - **Normalization**: Transactions arrive in several container shapes with
//!   aliased field names; they are normalized into a single [`Transaction`] form
//! - **Categorization**: A keyword rule cascade assigns a transaction type
//!   (EMI, GST payment/receipt, credit, debit) and a cashflow category
//! - **Financial Health**: Totals, balance statistics, volatility, seasonality
//!   and stress indicators over the whole history
//! - **Health Analysis**: Month-grained cashflow, balance counters and GST
//!   compliance statistics
//! - **Behavioral Metrics**: Anomalies and lending red flags for downstream scoring
//!
//! All computations are pure functions of their input; nothing is retained
//! between calls.
//!
//! ## Example
//!
//! ```rust,ignore
//! use msme_credit_metrics::*;
//! use serde_json::json;
//!
//! let data = json!({
//!     "bank_accounts": [{
//!         "account_id": "ACC001",
//!         "bank": "HDFC",
//!         "transactions": [
//!             {"date": "2024-01-05", "desc": "Invoice 101", "amount": 80000, "balance": 180000},
//!             {"date": "2024-01-10", "desc": "EMI business loan", "amount": -15000, "balance": 165000}
//!         ]
//!     }],
//!     "gst_filings": [
//!         {"period": "2024-01", "total_sales": 80000, "net_tax_paid": 9000, "status": "filed"}
//!     ]
//! });
//!
//! let analysis = analyze_credit_metrics(&data).unwrap();
//! println!("{}", analysis.financial_health.net_cashflow);
//! ```

pub mod anomaly;
pub mod behavior;
pub mod cashflow;
pub mod categorizer;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod gst;
pub mod ingestion;
pub mod monthly;
pub mod patterns;
pub mod schema;
pub mod utils;

pub use anomaly::{detect_anomalies, detect_red_flags, Anomaly, AnomalyKind, Severity};
pub use behavior::{
    count_cheque_bounces, count_emi_mentions, count_emi_transactions, count_low_balance_days,
    count_overdraft_days,
};
pub use cashflow::{
    compute_balance_metrics, compute_cashflow_metrics, compute_stability_score,
    compute_stability_score_over, BalanceMetrics, CashflowMetrics,
};
pub use categorizer::{categorize, categorize_all, categorize_transaction, Categorized};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AnalysisConfig;
pub use engine::MetricsEngine;
pub use error::{MetricsError, Result};
pub use gst::{
    analyze_gst_data, analyze_gst_filings, extract_gst_data, GstAnalysis, GstData, GstFiling,
};
pub use ingestion::{extract_transactions, extract_transactions_with_report, Extraction};
pub use monthly::{
    compute_avg_monthly_balance, compute_cashflow_volatility, compute_monthly_cashflow,
    MonthlyCashflow,
};
pub use patterns::{detect_cashflow_patterns, detect_stress_indicators, CashflowPatterns};
pub use schema::*;

use serde_json::Value;

/// Financial-health summary with the default configuration and system clock.
pub fn analyze_financial_health(data: &Value) -> Result<FinancialHealthSummary> {
    MetricsEngine::default().financial_health(data)
}

/// Month-grained health analysis with the default configuration and system clock.
pub fn analyze_health(data: &Value) -> Result<HealthAnalysisSummary> {
    MetricsEngine::default().health_analysis(data)
}

pub fn analyze_credit_metrics(data: &Value) -> Result<CreditAnalysis> {
    MetricsEngine::default().analyze(data)
}
