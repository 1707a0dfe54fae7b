//! GST filing compliance and turnover statistics.

use crate::ingestion::{coerce_f64, first_present};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SALES_KEYS: [&str; 2] = ["total_sales", "sales"];
const PURCHASE_KEYS: [&str; 2] = ["total_purchases", "purchases"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GstFiling {
    #[serde(default)]
    pub period: Option<String>,

    #[serde(default, rename = "type")]
    pub return_type: Option<String>,

    #[serde(default)]
    pub total_sales: f64,
    #[serde(default)]
    pub total_purchases: f64,
    #[serde(default)]
    pub output_tax: f64,
    #[serde(default)]
    pub input_tax: f64,
    #[serde(default)]
    pub net_tax_paid: f64,
    #[serde(default)]
    pub b2b_sales: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub nil_return: bool,
}

impl GstFiling {
    /// Reads one raw filing record. Amounts accept numbers, numeric strings or
    /// null; `total_sales`/`total_purchases` win over their short aliases.
    /// Returns `None` when the record is not an object.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let fields = raw.as_object()?;
        let amount = |keys: &[&str]| {
            first_present(fields, keys)
                .and_then(coerce_f64)
                .unwrap_or(0.0)
        };
        let text = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Some(Self {
            period: text("period"),
            return_type: text("type"),
            total_sales: amount(&SALES_KEYS),
            total_purchases: amount(&PURCHASE_KEYS),
            output_tax: amount(&["output_tax"]),
            input_tax: amount(&["input_tax"]),
            net_tax_paid: amount(&["net_tax_paid"]),
            b2b_sales: amount(&["b2b_sales"]),
            status: text("status").unwrap_or_default(),
            nil_return: fields.get("nil_return").is_some_and(flag),
        })
    }

    /// Only an exact, case-insensitive `"filed"` counts; anything else is pending.
    pub fn is_filed(&self) -> bool {
        self.status.eq_ignore_ascii_case("filed")
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

/// GST filings plus legacy payment/receipt totals pulled from an input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GstData {
    pub gst_filings: Vec<GstFiling>,
    pub total_gst_paid: f64,
    pub total_gst_collected: f64,
    pub total_sales: f64,
    pub total_purchases: f64,
    pub total_output_tax: f64,
    pub total_input_tax: f64,
    pub total_net_tax_paid: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GstAnalysis {
    pub total_filings: usize,
    pub filed_count: usize,
    pub pending_count: usize,
    pub nil_returns: usize,
    pub avg_monthly_sales: f64,
    pub avg_monthly_purchases: f64,
    pub avg_monthly_tax_paid: f64,
    /// Percentage of filings with status "filed", in `[0, 100]`.
    #[schemars(range(min = 0, max = 100))]
    pub compliance_rate: f64,
    pub total_sales: f64,
    pub total_purchases: f64,
    pub total_output_tax: f64,
    pub total_input_tax: f64,
    pub total_net_tax_paid: f64,
    pub total_gst_paid: f64,
    pub total_gst_collected: f64,
    pub b2b_sales_ratio: f64,
}

/// Reads `gst_filings` and the older `gst_statements[*].payments/receipts`
/// shape from an input document. Malformed filings are skipped.
pub fn extract_gst_data(data: &Value) -> GstData {
    let mut gst = GstData::default();

    if let Some(filings) = data.get("gst_filings").and_then(Value::as_array) {
        for raw in filings {
            match GstFiling::from_value(raw) {
                Some(filing) => gst.gst_filings.push(filing),
                None => warn!("Skipping GST filing that is not an object: {}", raw),
            }
        }
    }

    for filing in &gst.gst_filings {
        gst.total_sales += filing.total_sales;
        gst.total_purchases += filing.total_purchases;
        gst.total_output_tax += filing.output_tax;
        gst.total_input_tax += filing.input_tax;
        gst.total_net_tax_paid += filing.net_tax_paid;
    }

    if let Some(statements) = data.get("gst_statements").and_then(Value::as_array) {
        for statement in statements {
            gst.total_gst_paid += sum_amounts(statement.get("payments"));
            gst.total_gst_collected += sum_amounts(statement.get("receipts"));
        }
    }

    gst
}

fn sum_amounts(entries: Option<&Value>) -> f64 {
    entries
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("amount").and_then(coerce_f64))
                .sum()
        })
        .unwrap_or(0.0)
}

pub fn analyze_gst_filings(filings: &[GstFiling]) -> GstAnalysis {
    let data = GstData {
        gst_filings: filings.to_vec(),
        total_sales: filings.iter().map(|f| f.total_sales).sum(),
        total_purchases: filings.iter().map(|f| f.total_purchases).sum(),
        total_output_tax: filings.iter().map(|f| f.output_tax).sum(),
        total_input_tax: filings.iter().map(|f| f.input_tax).sum(),
        total_net_tax_paid: filings.iter().map(|f| f.net_tax_paid).sum(),
        ..GstData::default()
    };
    analyze(&data)
}

pub fn analyze_gst_data(data: &Value) -> GstAnalysis {
    analyze(&extract_gst_data(data))
}

fn analyze(gst: &GstData) -> GstAnalysis {
    let filings = &gst.gst_filings;
    let mut analysis = GstAnalysis {
        total_gst_paid: gst.total_gst_paid,
        total_gst_collected: gst.total_gst_collected,
        ..GstAnalysis::default()
    };

    if filings.is_empty() {
        return analysis;
    }

    let count = filings.len() as f64;
    let filed_count = filings.iter().filter(|f| f.is_filed()).count();
    let b2b_total: f64 = filings.iter().map(|f| f.b2b_sales).sum();

    analysis.total_filings = filings.len();
    analysis.filed_count = filed_count;
    analysis.pending_count = filings.len() - filed_count;
    analysis.nil_returns = filings.iter().filter(|f| f.nil_return).count();
    analysis.avg_monthly_sales = gst.total_sales / count;
    analysis.avg_monthly_purchases = gst.total_purchases / count;
    analysis.avg_monthly_tax_paid = gst.total_net_tax_paid / count;
    analysis.compliance_rate = filed_count as f64 / count * 100.0;
    analysis.total_sales = gst.total_sales;
    analysis.total_purchases = gst.total_purchases;
    analysis.total_output_tax = gst.total_output_tax;
    analysis.total_input_tax = gst.total_input_tax;
    analysis.total_net_tax_paid = gst.total_net_tax_paid;
    analysis.b2b_sales_ratio = if gst.total_sales > 0.0 {
        b2b_total / gst.total_sales
    } else {
        0.0
    };

    analysis
}
