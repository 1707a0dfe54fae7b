//! Turns loosely-shaped JSON transaction containers into [`Transaction`]s.
//!
//! Accepted containers, checked in order:
//! - `{"bank_accounts" | "accounts": [{"account_id", "bank", "transactions": [...]}]}`
//! - `{"transactions": [...]}`
//! - `{"bank_statements" | "statements": [{"transactions": [...]}]}`
//! - a bare list of records
//! - any object with a field whose list starts with a record holding
//!   `date`, `amount` or `description`

use crate::clock::Clock;
use crate::error::{MetricsError, Result};
use crate::schema::{CashflowCategory, Transaction, TransactionType};
use crate::utils::parse_date;
use chrono::NaiveDateTime;
use log::{debug, warn};
use serde_json::{Map, Value};

const DATE_KEYS: [&str; 2] = ["date", "transaction_date"];
const AMOUNT_KEYS: [&str; 2] = ["amount", "transaction_amount"];
const DESCRIPTION_KEYS: [&str; 4] = ["description", "desc", "narration", "remarks"];
const BALANCE_KEYS: [&str; 2] = ["balance_after", "balance"];
const TRANSACTION_HINT_KEYS: [&str; 3] = ["date", "amount", "description"];

/// How a transaction's date was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateResolution {
    Parsed(NaiveDateTime),
    /// Missing or unparseable; the value is the clock's "now".
    Fallback(NaiveDateTime),
}

impl DateResolution {
    pub fn value(&self) -> NaiveDateTime {
        match self {
            Self::Parsed(d) | Self::Fallback(d) => *d,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Normalized transactions plus the positions whose dates fell back to the clock.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub transactions: Vec<Transaction>,
    pub date_fallbacks: Vec<usize>,
}

/// Resolves a raw JSON date value against the accepted formats.
pub fn resolve_date(value: Option<&Value>, clock: &dyn Clock) -> DateResolution {
    let raw = match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    match parse_date(&raw) {
        Some(date) => DateResolution::Parsed(date),
        None => {
            if !raw.is_empty() {
                warn!("Could not parse date: {}, using current date", raw);
            }
            DateResolution::Fallback(clock.now())
        }
    }
}

pub fn extract_transactions(data: &Value, clock: &dyn Clock) -> Result<Vec<Transaction>> {
    Ok(extract_transactions_with_report(data, clock)?.transactions)
}

pub fn extract_transactions_with_report(data: &Value, clock: &dyn Clock) -> Result<Extraction> {
    let records = locate_records(data)?;
    debug!("Located {} raw transaction records", records.len());

    let mut transactions = Vec::with_capacity(records.len());
    let mut date_fallbacks = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let (tx, date) = normalize_record(record, clock);
        if date.is_fallback() {
            date_fallbacks.push(idx);
        }
        transactions.push(tx);
    }

    Ok(Extraction {
        transactions,
        date_fallbacks,
    })
}

/// A raw record tagged with the account it came from, if any.
struct RawRecord<'a> {
    fields: &'a Map<String, Value>,
    account_id: Option<String>,
    bank: Option<String>,
}

fn locate_records(data: &Value) -> Result<Vec<RawRecord<'_>>> {
    match data {
        Value::Array(items) => Ok(plain_records(items)),
        Value::Object(root) => {
            if let Some(accounts) = first_list(root, &["bank_accounts", "accounts"]) {
                let mut records = Vec::new();
                for account in accounts.iter().filter_map(Value::as_object) {
                    let account_id = non_empty_str(account.get("account_id"));
                    let bank = non_empty_str(account.get("bank"));
                    if let Some(Value::Array(items)) = account.get("transactions") {
                        records.extend(items.iter().filter_map(Value::as_object).map(|fields| {
                            RawRecord {
                                fields,
                                account_id: account_id.clone(),
                                bank: bank.clone(),
                            }
                        }));
                    }
                }
                return Ok(records);
            }

            if let Some(items) = first_list(root, &["transactions"]) {
                return Ok(plain_records(items));
            }

            if let Some(statements) = first_list(root, &["bank_statements", "statements"]) {
                let records: Vec<RawRecord<'_>> = statements
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|statement| match statement.get("transactions") {
                        Some(Value::Array(items)) => Some(plain_records(items)),
                        _ => None,
                    })
                    .flatten()
                    .collect();
                return Ok(records);
            }

            root.values()
                .find_map(|value| match value {
                    Value::Array(items) if looks_like_transactions(items) => {
                        Some(plain_records(items))
                    }
                    _ => None,
                })
                .ok_or_else(|| {
                    MetricsError::DataError(
                        "No list of transactions found in input data".to_string(),
                    )
                })
        }
        _ => Err(MetricsError::DataError(
            "Transaction input must be a JSON object or list".to_string(),
        )),
    }
}

fn first_list<'a>(root: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|k| root.get(*k).and_then(Value::as_array))
}

fn plain_records(items: &[Value]) -> Vec<RawRecord<'_>> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|fields| RawRecord {
            fields,
            account_id: None,
            bank: None,
        })
        .collect()
}

fn looks_like_transactions(items: &[Value]) -> bool {
    items
        .first()
        .and_then(Value::as_object)
        .is_some_and(|first| TRANSACTION_HINT_KEYS.iter().any(|k| first.contains_key(*k)))
}

fn normalize_record(record: &RawRecord<'_>, clock: &dyn Clock) -> (Transaction, DateResolution) {
    let fields = record.fields;

    let date = resolve_date(first_present(fields, &DATE_KEYS), clock);
    let amount = first_present(fields, &AMOUNT_KEYS)
        .and_then(coerce_f64)
        .unwrap_or(0.0);
    let description = match first_present(fields, &DESCRIPTION_KEYS) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let transaction_type = fields
        .get("type")
        .and_then(Value::as_str)
        .and_then(TransactionType::from_label)
        .unwrap_or(TransactionType::Unknown);
    let category = fields
        .get("category")
        .and_then(Value::as_str)
        .and_then(CashflowCategory::from_label);

    let tx = Transaction {
        date: date.value(),
        amount,
        description,
        balance_after: extract_balance(fields),
        transaction_type,
        category,
        account_id: non_empty_str(fields.get("account_id")).or_else(|| record.account_id.clone()),
        bank: non_empty_str(fields.get("bank")).or_else(|| record.bank.clone()),
    };

    (tx, date)
}

/// Returns the value under the first alias that is present and not null.
pub(crate) fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| fields.get(*k).filter(|v| !v.is_null()))
}

/// A balance is only recorded when one of the balance fields is truthy;
/// zero and empty balances count as absent. The value comes from the first
/// non-null alias and must be numeric.
fn extract_balance(fields: &Map<String, Value>) -> Option<f64> {
    let truthy = BALANCE_KEYS
        .iter()
        .any(|k| fields.get(*k).is_some_and(is_truthy));
    if !truthy {
        return None;
    }

    first_present(fields, &BALANCE_KEYS).and_then(coerce_f64)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Numbers pass through, numeric strings are parsed, anything else is `None`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;

    fn frozen() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2030, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_flat_list() {
        let data = json!([
            {"date": "2024-01-05", "amount": 1000, "description": "Invoice 12", "balance_after": 5000},
            {"date": "06/01/2024", "amount": "-250.50", "narration": "Electricity bill"}
        ]);
        let txs = extract_transactions(&data, &frozen()).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, 1000.0);
        assert_eq!(txs[0].balance_after, Some(5000.0));
        assert_eq!(txs[1].amount, -250.5);
        assert_eq!(txs[1].description, "Electricity bill");
        assert_eq!(txs[1].balance_after, None);
        assert_eq!(txs[1].date.date(), NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
    }

    #[test]
    fn test_bank_accounts_are_tagged() {
        let data = json!({
            "bank_accounts": [
                {"account_id": "ACC1", "bank": "HDFC", "transactions": [
                    {"date": "2024-01-01", "desc": "UPI credit", "amount": 500, "type": "Credit", "balance": 1500}
                ]},
                {"account_id": "ACC2", "bank": "SBI", "transactions": [
                    {"date": "2024-01-02", "desc": "ATM", "amount": -200, "type": "Debit", "balance": 300}
                ]}
            ]
        });
        let txs = extract_transactions(&data, &frozen()).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].account_id.as_deref(), Some("ACC1"));
        assert_eq!(txs[0].bank.as_deref(), Some("HDFC"));
        assert_eq!(txs[0].transaction_type, TransactionType::Credit);
        assert_eq!(txs[1].bank.as_deref(), Some("SBI"));
        assert_eq!(txs[1].balance_after, Some(300.0));
    }

    #[test]
    fn test_statements_are_flattened() {
        let data = json!({
            "statements": [
                {"transactions": [{"date": "2024-01-01", "amount": 1, "description": "a"}]},
                {"transactions": [{"date": "2024-02-01", "amount": 2, "description": "b"},
                                  {"date": "2024-03-01", "amount": 3, "description": "c"}]}
            ]
        });
        let txs = extract_transactions(&data, &frozen()).unwrap();
        let amounts: Vec<f64> = txs.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_arbitrary_field_holding_transactions() {
        let data = json!({
            "msme_profile": {"name": "Acme"},
            "tags": ["retail"],
            "ledger": [{"date": "2024-01-01", "amount": 10, "remarks": "cash sale"}]
        });
        let txs = extract_transactions(&data, &frozen()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "cash sale");
    }

    #[test]
    fn test_no_transaction_list_is_data_error() {
        let data = json!({"msme_profile": {"name": "Acme"}, "tags": ["retail"]});
        let result = extract_transactions(&data, &frozen());
        assert!(matches!(result, Err(MetricsError::DataError(_))));

        let result = extract_transactions(&json!("nonsense"), &frozen());
        assert!(matches!(result, Err(MetricsError::DataError(_))));
    }

    #[test]
    fn test_non_numeric_amount_is_zero() {
        let data = json!([
            {"date": "2024-01-01", "amount": "n/a", "description": "x"},
            {"date": "2024-01-01", "description": "missing"},
            {"date": "2024-01-01", "transaction_amount": 42, "description": "alias"}
        ]);
        let txs = extract_transactions(&data, &frozen()).unwrap();
        assert_eq!(txs[0].amount, 0.0);
        assert_eq!(txs[1].amount, 0.0);
        assert_eq!(txs[2].amount, 42.0);
    }

    #[test]
    fn test_zero_balance_is_absent() {
        let data = json!([
            {"date": "2024-01-01", "amount": 1, "description": "x", "balance_after": 0},
            {"date": "2024-01-01", "amount": 1, "description": "y", "balance_after": -75.5}
        ]);
        let txs = extract_transactions(&data, &frozen()).unwrap();
        assert_eq!(txs[0].balance_after, None);
        assert_eq!(txs[1].balance_after, Some(-75.5));
    }

    #[test]
    fn test_null_balance_after_defers_to_balance() {
        let data = json!([
            {"date": "2024-01-01", "amount": 1, "description": "x", "balance_after": null, "balance": 500},
            {"date": "2024-01-02", "amount": 1, "description": "y", "balance_after": "n/a", "balance": 700},
            {"date": "2024-01-03", "amount": 1, "description": "z", "balance_after": null}
        ]);
        let txs = extract_transactions(&data, &frozen()).unwrap();
        assert_eq!(txs[0].balance_after, Some(500.0));
        assert_eq!(txs[1].balance_after, None);
        assert_eq!(txs[2].balance_after, None);
    }

    #[test]
    fn test_first_qualifying_field_in_document_order_wins() {
        let data = json!({
            "zeta": [{"date": "2024-01-01", "amount": 1, "description": "first"}],
            "alpha": [{"date": "2024-01-01", "amount": 2, "description": "second"}]
        });
        let txs = extract_transactions(&data, &frozen()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "first");
    }

    // Unparseable dates silently become "now". This pins the legacy
    // behavior; callers that need to know use the extraction report.
    #[test]
    fn test_unparseable_date_falls_back_to_clock() {
        let clock = frozen();
        let data = json!([
            {"date": "not a date", "amount": 1, "description": "x"},
            {"amount": 2, "description": "no date"},
            {"transaction_date": "2024-01-01", "amount": 3, "description": "ok"}
        ]);
        let extraction = extract_transactions_with_report(&data, &clock).unwrap();
        assert_eq!(extraction.transactions[0].date, clock.0);
        assert_eq!(extraction.transactions[1].date, clock.0);
        assert_ne!(extraction.transactions[2].date, clock.0);
        assert_eq!(extraction.date_fallbacks, vec![0, 1]);
    }

    #[test]
    fn test_normalizing_normalized_output_is_idempotent() {
        let clock = frozen();
        let data = json!({"transactions": [
            {"date": "15-Jan-2024", "amount": 12000, "description": "Invoice payment", "balance": 42000},
            {"date": "2024-01-20 14:05:00", "amount": -3000, "description": "EMI loan", "type": "emi", "category": "financing"},
            {"date": "2024-02-01", "amount": 0, "description": "memo"}
        ]});
        let first = extract_transactions(&data, &clock).unwrap();
        let reencoded = serde_json::to_value(&first).unwrap();
        let second = extract_transactions(&reencoded, &clock).unwrap();
        assert_eq!(first, second);
    }
}
