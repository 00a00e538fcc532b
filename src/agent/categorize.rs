//! Categorisation pass: context formatting and matching replies back to rows.

use super::extract::field_str;
use super::json_block::parse_category_records;
use crate::output::{Category, Transaction};

/// One numbered line per transaction, 1-indexed.
pub(crate) fn format_context(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                "[{}] date: {} | description: {} | amount: {} | type: {}",
                i + 1,
                t.date,
                t.description,
                t.amount,
                t.kind
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply a categorisation reply to `transactions`.
///
/// Every row starts as `Other`. Reply entry `i` sets row `i` while `i` is in
/// range; entries past the end are matched by trimmed (description, amount).
/// Entries without a `category` key are ignored. Returns how many rows a
/// reply entry was applied to.
pub(crate) fn apply_categories(transactions: &mut [Transaction], reply: &str) -> usize {
    for t in transactions.iter_mut() {
        t.category = Some(Category::Other);
    }

    let mut applied = 0;
    for (i, record) in parse_category_records(reply).iter().enumerate() {
        if !record.contains_key("category") {
            continue;
        }
        let category = Category::coerce(&field_str(record, "category"));

        if i < transactions.len() {
            transactions[i].category = Some(category);
            applied += 1;
            continue;
        }

        let description = field_str(record, "description");
        let amount = field_str(record, "amount");
        if let Some(t) = transactions.iter_mut().find(|t| {
            t.description.trim() == description.trim() && t.amount.trim() == amount.trim()
        }) {
            t.category = Some(category);
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::TransactionType;

    fn rows() -> Vec<Transaction> {
        ["COFFEE SHOP", "SAFEWAY", "SHELL"]
            .iter()
            .map(|d| Transaction {
                date: "01/02/2024".into(),
                description: d.to_string(),
                amount: "4.50".into(),
                kind: TransactionType::Debit,
                category: None,
            })
            .collect()
    }

    #[test]
    fn context_lines_are_numbered() {
        let ctx = format_context(&rows()[..2]);
        assert_eq!(
            ctx,
            "[1] date: 01/02/2024 | description: COFFEE SHOP | amount: 4.50 | type: debit\n\
[2] date: 01/02/2024 | description: SAFEWAY | amount: 4.50 | type: debit"
        );
    }

    #[test]
    fn positional_match_with_case_folding() {
        let mut txns = rows();
        let reply = r#"[{"category":"dining"},{"category":"GROCERIES"},{"category":"Fuel"}]"#;
        apply_categories(&mut txns, reply);
        let cats: Vec<_> = txns.iter().map(|t| t.category.unwrap()).collect();
        assert_eq!(cats, vec![Category::Dining, Category::Groceries, Category::Other]);
    }

    #[test]
    fn short_reply_leaves_the_rest_as_other() {
        let mut txns = rows();
        let reply = r#"[{"description":"COFFEE SHOP","amount":"4.50","category":"Dining"},
                        {"description":"SAFEWAY","amount":"4.50","category":"Groceries"}]"#;
        apply_categories(&mut txns, reply);
        assert_eq!(txns[2].category, Some(Category::Other));
        assert_eq!(txns[1].category, Some(Category::Groceries));
    }

    #[test]
    fn overflow_entries_match_by_description_and_amount() {
        let mut txns = rows();
        let reply = r#"[{"category":"Dining"},{"category":"Groceries"},{"category":"Other"},
                        {"description":" SHELL ","amount":"4.50","category":"Transport"}]"#;
        apply_categories(&mut txns, reply);
        assert_eq!(txns[2].category, Some(Category::Transport));
    }

    #[test]
    fn entries_without_category_are_skipped() {
        let mut txns = rows();
        apply_categories(&mut txns, r#"[{"description":"x"},{"category":"Shopping"}]"#);
        assert_eq!(txns[0].category, Some(Category::Other));
        assert_eq!(txns[1].category, Some(Category::Shopping));
    }

    #[test]
    fn truncated_reply_keeps_positions() {
        let mut txns: Vec<Transaction> = ["A", "B", "C"]
            .iter()
            .map(|d| Transaction {
                date: "01/02/2024".into(),
                description: d.to_string(),
                amount: "1".into(),
                kind: TransactionType::Debit,
                category: None,
            })
            .collect();
        let reply = r#"[{"category":"Dining"},{"description":"B","amount":"1","category":"Groceries"},{"description":"C","amo"#;
        assert_eq!(apply_categories(&mut txns, reply), 2);
        let cats: Vec<_> = txns.iter().map(|t| t.category.unwrap()).collect();
        assert_eq!(cats, vec![Category::Dining, Category::Groceries, Category::Other]);
    }

    #[test]
    fn garbage_reply_means_everything_other() {
        let mut txns = rows();
        assert_eq!(apply_categories(&mut txns, "Sorry, I can't help."), 0);
        assert!(txns.iter().all(|t| t.category == Some(Category::Other)));
    }
}
