//! Transaction extraction pass: chunked prompts, record coercion, dedup.

use super::json_block::{parse_records, Record};
use crate::output::{Transaction, TransactionType};
use serde_json::Value;
use std::collections::HashSet;

/// Render a JSON field as text: strings verbatim, numbers and booleans in
/// their JSON spelling, null or absent as empty.
pub(crate) fn field_str(record: &Record, key: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Coerce one model record into the five canonical fields.
pub(crate) fn transaction_from_record(record: &Record) -> Transaction {
    let kind = match record.get("type") {
        None | Some(Value::Null) => TransactionType::Debit,
        Some(_) => TransactionType::from_source(Some(&field_str(record, "type"))),
    };
    Transaction {
        date: field_str(record, "date"),
        description: field_str(record, "description"),
        amount: field_str(record, "amount"),
        kind,
        category: None,
    }
}

/// Parse one extraction reply into uncategorised transactions.
pub(crate) fn transactions_from_reply(reply: &str) -> Vec<Transaction> {
    parse_records(reply)
        .iter()
        .map(transaction_from_record)
        .collect()
}

/// Merge per-chunk results, keeping the first occurrence of each
/// (date, description, amount).
pub(crate) fn merge_chunks(chunks: Vec<Vec<Transaction>>) -> Vec<Transaction> {
    if chunks.len() <= 1 {
        return chunks.into_iter().flatten().collect();
    }

    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut merged = Vec::new();
    for t in chunks.into_iter().flatten() {
        let (date, description, amount) = t.identity();
        let key = (date.to_string(), description.to_string(), amount.to_string());
        if seen.insert(key) {
            merged.push(t);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(date: &str, desc: &str, amount: &str) -> Transaction {
        Transaction {
            date: date.into(),
            description: desc.into(),
            amount: amount.into(),
            kind: TransactionType::Debit,
            category: None,
        }
    }

    #[test]
    fn coerces_field_types() {
        let reply = r#"[{"date": 20240102, "description": "COFFEE SHOP", "amount": 4.5, "type": "CR", "extra": true}]"#;
        let txns = transactions_from_reply(reply);
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].date, "20240102");
        assert_eq!(txns[0].amount, "4.5");
        assert_eq!(txns[0].kind, TransactionType::Credit);
        assert_eq!(txns[0].category, None);
    }

    #[test]
    fn missing_fields_become_empty_and_debit() {
        let reply = r#"[{"amount": "10.00", "description": null}]"#;
        let txns = transactions_from_reply(reply);
        assert_eq!(txns[0].date, "");
        assert_eq!(txns[0].description, "");
        assert_eq!(txns[0].kind, TransactionType::Debit);
    }

    #[test]
    fn single_chunk_keeps_identical_rows() {
        let rows = vec![t("d", "COFFEE", "4.50"), t("d", "COFFEE", "4.50")];
        assert_eq!(merge_chunks(vec![rows]).len(), 2);
    }

    #[test]
    fn overlapping_chunks_dedup_first_wins() {
        let mut first = t("02/01", "RENT", "900.00");
        first.kind = TransactionType::Credit;
        let merged = merge_chunks(vec![
            vec![t("01/01", "SHOP", "1.00"), first.clone()],
            vec![t("02/01", "RENT", "900.00"), t("03/01", "GAS", "40.00")],
        ]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1], first);
        assert_eq!(merged[2].description, "GAS");
    }
}
