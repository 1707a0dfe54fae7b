//! Day-level balance counters and description-keyword counts used by the
//! health analysis.

use crate::schema::{Transaction, TransactionType};
use crate::utils::day_key;
use std::collections::BTreeSet;

const EMI_COUNT_KEYWORDS: [&str; 2] = ["emi", "loan"];

// Matches substrings, so "insufficient documentation fee" also counts.
const BOUNCE_KEYWORDS: [&str; 4] = ["bounce", "returned", "dishonour", "insufficient"];

fn distinct_days_where(transactions: &[Transaction], predicate: impl Fn(f64) -> bool) -> usize {
    transactions
        .iter()
        .filter(|tx| tx.balance_after.is_some_and(&predicate))
        .map(|tx| day_key(&tx.date))
        .collect::<BTreeSet<_>>()
        .len()
}

/// Distinct calendar days with a running balance below `threshold`.
pub fn count_low_balance_days(transactions: &[Transaction], threshold: f64) -> usize {
    distinct_days_where(transactions, |balance| balance < threshold)
}

/// Distinct calendar days with a negative running balance.
pub fn count_overdraft_days(transactions: &[Transaction]) -> usize {
    distinct_days_where(transactions, |balance| balance < 0.0)
}

fn mentions_emi(tx: &Transaction) -> bool {
    let desc = tx.description_lower();
    EMI_COUNT_KEYWORDS.iter().any(|k| desc.contains(k))
}

/// Transactions whose description mentions an EMI or loan.
pub fn count_emi_mentions(transactions: &[Transaction]) -> usize {
    transactions.iter().filter(|tx| mentions_emi(tx)).count()
}

/// Like [`count_emi_mentions`], also counting transactions already typed as EMI.
pub fn count_emi_transactions(transactions: &[Transaction]) -> usize {
    transactions
        .iter()
        .filter(|tx| mentions_emi(tx) || tx.transaction_type == TransactionType::Emi)
        .count()
}

pub fn count_cheque_bounces(transactions: &[Transaction]) -> usize {
    transactions
        .iter()
        .filter(|tx| {
            let desc = tx.description_lower();
            BOUNCE_KEYWORDS.iter().any(|k| desc.contains(k))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(d: u32, h: u32, description: &str) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        Transaction::new(date, -10.0, description)
    }

    #[test]
    fn test_low_balance_days_are_distinct() {
        let txs = vec![
            tx(1, 9, "a").with_balance(10_000.0),
            tx(1, 17, "b").with_balance(20_000.0),
            tx(2, 9, "c").with_balance(60_000.0),
            tx(3, 9, "d").with_balance(49_999.0),
            tx(4, 9, "e"),
        ];
        assert_eq!(count_low_balance_days(&txs, 50_000.0), 2);
        assert_eq!(count_low_balance_days(&txs, 0.0), 0);
    }

    #[test]
    fn test_overdraft_days() {
        let txs = vec![
            tx(1, 9, "a").with_balance(-1.0),
            tx(1, 10, "b").with_balance(-2.0),
            tx(2, 9, "c").with_balance(5.0),
            tx(3, 9, "d").with_balance(-500.0),
        ];
        assert_eq!(count_overdraft_days(&txs), 2);
    }

    #[test]
    fn test_emi_count_uses_description_and_type() {
        let mut typed = tx(1, 9, "NACH debit");
        typed.transaction_type = TransactionType::Emi;
        let txs = vec![
            tx(1, 9, "EMI 4/24"),
            tx(1, 9, "Business LOAN"),
            typed,
            tx(1, 9, "Rent"),
        ];
        assert_eq!(count_emi_transactions(&txs), 3);
        assert_eq!(count_emi_mentions(&txs), 2);
    }

    #[test]
    fn test_cheque_bounces_over_match_documented() {
        let txs = vec![
            tx(1, 9, "Cheque BOUNCE charges"),
            tx(1, 9, "Cheque returned unpaid"),
            tx(1, 9, "Dishonour fee"),
            tx(1, 9, "insufficient documentation fee"),
            tx(1, 9, "Office supplies"),
        ];
        assert_eq!(count_cheque_bounces(&txs), 4);
    }
}
