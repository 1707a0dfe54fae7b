//! Keyword rule cascade assigning a [`TransactionType`] and [`CashflowCategory`].
//!
//! Priority is fixed: EMI keywords, then GST/tax keywords, then the sign of the
//! amount. Reordering the rules changes results ("EMI payment for loan tax"
//! must stay EMI).

use crate::schema::{CashflowCategory, Transaction, TransactionType};

const EMI_KEYWORDS: [&str; 4] = ["emi", "loan", "repayment", "installment"];
const GST_KEYWORDS: [&str; 6] = ["gst", "tax", "tds", "cgst", "sgst", "igst"];
const OPERATIONAL_KEYWORDS: [&str; 5] = ["salary", "wage", "payment", "invoice", "bill"];
const INVESTMENT_KEYWORDS: [&str; 4] = ["investment", "deposit", "fd", "mutual fund"];

/// Result of categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Categorized {
    pub transaction_type: TransactionType,
    pub category: CashflowCategory,
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// Classifies from a description and signed amount.
pub fn categorize(description: &str, amount: f64) -> Categorized {
    let desc = description.to_lowercase();

    let transaction_type = if contains_any(&desc, &EMI_KEYWORDS) {
        TransactionType::Emi
    } else if contains_any(&desc, &GST_KEYWORDS) {
        if amount < 0.0 {
            TransactionType::GstPayment
        } else {
            TransactionType::GstReceipt
        }
    } else if amount > 0.0 {
        TransactionType::Credit
    } else if amount < 0.0 {
        TransactionType::Debit
    } else {
        TransactionType::Unknown
    };

    let category = match transaction_type {
        TransactionType::Emi => CashflowCategory::Financing,
        TransactionType::GstPayment | TransactionType::GstReceipt => CashflowCategory::Tax,
        _ if contains_any(&desc, &OPERATIONAL_KEYWORDS) => CashflowCategory::Operational,
        _ if contains_any(&desc, &INVESTMENT_KEYWORDS) => CashflowCategory::Investment,
        TransactionType::Credit | TransactionType::Debit => CashflowCategory::Operational,
        _ => CashflowCategory::Other,
    };

    Categorized {
        transaction_type,
        category,
    }
}

pub fn categorize_transaction(tx: &Transaction) -> Categorized {
    categorize(&tx.description, tx.amount)
}

/// Returns categorized copies; the input slice is left untouched.
pub fn categorize_all(transactions: &[Transaction]) -> Vec<Transaction> {
    transactions
        .iter()
        .map(|tx| {
            let result = categorize_transaction(tx);
            Transaction {
                transaction_type: result.transaction_type,
                category: Some(result.category),
                ..tx.clone()
            }
        })
        .collect()
}
