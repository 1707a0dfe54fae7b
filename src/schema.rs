use crate::anomaly::Anomaly;
use crate::cashflow::CashflowMetrics;
use crate::gst::GstAnalysis;
use crate::patterns::CashflowPatterns;
use crate::utils::month_key;
use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
    Emi,
    GstPayment,
    GstReceipt,
    Unknown,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Emi => "emi",
            Self::GstPayment => "gst_payment",
            Self::GstReceipt => "gst_receipt",
            Self::Unknown => "unknown",
        }
    }

    /// Case-insensitive lookup by label, e.g. `"Credit"` or `"gst_payment"`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "credit" => Some(Self::Credit),
            "debit" => Some(Self::Debit),
            "emi" => Some(Self::Emi),
            "gst_payment" => Some(Self::GstPayment),
            "gst_receipt" => Some(Self::GstReceipt),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CashflowCategory {
    Operational,
    Investment,
    Financing,
    Tax,
    Other,
}

impl CashflowCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Investment => "investment",
            Self::Financing => "financing",
            Self::Tax => "tax",
            Self::Other => "other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "operational" => Some(Self::Operational),
            "investment" => Some(Self::Investment),
            "financing" => Some(Self::Financing),
            "tax" => Some(Self::Tax),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A normalized bank transaction.
///
/// The sign of `amount` alone decides flow direction: positive is an inflow,
/// negative an outflow. `transaction_type` and `category` are derived labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    #[serde(with = "crate::utils::datetime_format")]
    #[schemars(with = "String", description = "Transaction timestamp, YYYY-MM-DD HH:MM:SS")]
    pub date: NaiveDateTime,

    #[schemars(description = "Signed amount: positive = inflow, negative = outflow")]
    pub amount: f64,

    pub description: String,

    #[schemars(description = "Running balance after the transaction, when the source has one")]
    pub balance_after: Option<f64>,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    /// `None` until the categorizer has run.
    pub category: Option<CashflowCategory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
}

impl Transaction {
    pub fn new(date: NaiveDateTime, amount: f64, description: impl Into<String>) -> Self {
        Self {
            date,
            amount,
            description: description.into(),
            balance_after: None,
            transaction_type: TransactionType::Unknown,
            category: None,
            account_id: None,
            bank: None,
        }
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance_after = Some(balance);
        self
    }

    pub fn is_inflow(&self) -> bool {
        self.amount > 0.0
    }

    pub fn is_outflow(&self) -> bool {
        self.amount < 0.0
    }

    pub fn abs_amount(&self) -> f64 {
        self.amount.abs()
    }

    pub fn month_key(&self) -> String {
        month_key(&self.date)
    }

    pub fn description_lower(&self) -> String {
        self.description.to_lowercase()
    }

    pub fn has_negative_balance(&self) -> bool {
        self.balance_after.is_some_and(|b| b < 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialHealthMetadata {
    pub pattern_analysis: CashflowPatterns,
    pub balance_volatility: f64,
    pub inflow_count: usize,
    pub outflow_count: usize,
}

/// Whole-period view of an enterprise's cashflow and balances.
///
/// `net_cashflow` is always `total_inflow - total_outflow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialHealthSummary {
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub net_cashflow: f64,
    pub average_balance: f64,
    pub min_balance: f64,
    pub max_balance: f64,

    #[schemars(range(min = 0, max = 1))]
    pub volatility_score: f64,

    pub seasonality_detected: bool,
    pub stress_indicators: Vec<String>,

    #[schemars(range(min = 0, max = 1))]
    pub cashflow_stability_score: f64,

    pub transaction_count: usize,

    #[serde(with = "crate::utils::datetime_format")]
    #[schemars(with = "String")]
    pub period_start: NaiveDateTime,

    #[serde(with = "crate::utils::datetime_format")]
    #[schemars(with = "String")]
    pub period_end: NaiveDateTime,

    pub categorized_transactions: BTreeMap<CashflowCategory, usize>,
    pub metadata: FinancialHealthMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthAnalysisMetadata {
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub months_analyzed: usize,
}

/// Month-grained view used for lending-product matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthAnalysisSummary {
    pub monthly_inflow: BTreeMap<String, f64>,
    pub monthly_outflow: BTreeMap<String, f64>,
    pub net_cashflow: f64,

    #[schemars(range(min = 0, max = 1))]
    pub cashflow_volatility: f64,

    /// Mean of per-month average balances.
    pub avg_balance: f64,
    pub low_balance_days: usize,
    pub emi_transactions: usize,
    pub cheque_bounces: usize,
    pub overdraft_days: usize,
    pub gst_analysis: GstAnalysis,

    #[serde(with = "crate::utils::datetime_format")]
    #[schemars(with = "String")]
    pub period_start: NaiveDateTime,

    #[serde(with = "crate::utils::datetime_format")]
    #[schemars(with = "String")]
    pub period_end: NaiveDateTime,

    pub metadata: HealthAnalysisMetadata,
}

/// Deterministic inputs handed to the credit-scoring collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BehavioralMetrics {
    pub transaction_count: usize,
    pub cashflow_metrics: CashflowMetrics,
    pub stability_score: f64,
    pub anomalies_detected: Vec<Anomaly>,
    pub red_flags_detected: Vec<String>,
    pub emi_payments_detected: usize,
}

/// Result of a full analysis run. Optional parts that failed are `None`, with
/// the reason recorded in `warnings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CreditAnalysis {
    pub financial_health: FinancialHealthSummary,
    pub health_analysis: Option<HealthAnalysisSummary>,
    pub behavioral_metrics: Option<BehavioralMetrics>,
    pub warnings: Vec<String>,
}

impl FinancialHealthSummary {
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(FinancialHealthSummary);
        serde_json::to_string_pretty(&schema)
    }
}

impl HealthAnalysisSummary {
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(HealthAnalysisSummary);
        serde_json::to_string_pretty(&schema)
    }
}
