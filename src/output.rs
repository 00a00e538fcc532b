//! Record types produced by the pipeline.
//!
//! [`Transaction`] is the central record. The fixed category taxonomy and
//! the lowercase `debit`/`credit` vocabulary are external contracts (CSV
//! consumers, chat answers) and must not drift.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Direction of a transaction. The amount itself carries no sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Debit,
    Credit,
}

impl TransactionType {
    /// Normalise whatever the model wrote into `debit`/`credit`.
    ///
    /// `"credit"` and `"cr"` (any casing, surrounding whitespace ignored)
    /// mean credit; everything else, including an absent value, is a debit.
    pub fn from_source(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "credit" || s == "cr" => TransactionType::Credit,
            _ => TransactionType::Debit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "debit",
            TransactionType::Credit => "credit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spending category. Closed set; anything the model invents maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    Groceries,
    Utilities,
    Shopping,
    Transfer,
    Dining,
    Transport,
    Healthcare,
    Entertainment,
    #[default]
    Other,
}

static CATEGORY_LOOKUP: Lazy<HashMap<String, Category>> = Lazy::new(|| {
    Category::ALL
        .iter()
        .map(|c| (c.as_str().to_ascii_lowercase(), *c))
        .collect()
});

impl Category {
    /// Every category in prompt/display order.
    pub const ALL: [Category; 9] = [
        Category::Groceries,
        Category::Utilities,
        Category::Shopping,
        Category::Transfer,
        Category::Dining,
        Category::Transport,
        Category::Healthcare,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Utilities => "Utilities",
            Category::Shopping => "Shopping",
            Category::Transfer => "Transfer",
            Category::Dining => "Dining",
            Category::Transport => "Transport",
            Category::Healthcare => "Healthcare",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive lookup against the taxonomy.
    pub fn lookup(raw: &str) -> Option<Category> {
        CATEGORY_LOOKUP.get(&raw.trim().to_ascii_lowercase()).copied()
    }

    /// Like [`Category::lookup`] but coerces unknown labels to `Other`.
    pub fn coerce(raw: &str) -> Category {
        Self::lookup(raw).unwrap_or(Category::Other)
    }

    /// Comma-separated list used in prompts.
    pub fn joined() -> String {
        Self::ALL
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bank transaction.
///
/// `category` is `None` between extraction and categorisation; every
/// transaction returned by [`crate::agent::StatementAgent::extract_and_categorize`]
/// has it set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub date: String,
    pub description: String,
    pub amount: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Option<Category>,
}

impl Transaction {
    /// Dedup key used when merging overlapping chunks.
    pub(crate) fn identity(&self) -> (&str, &str, &str) {
        (&self.date, &self.description, &self.amount)
    }

    /// Category as written to CSV: empty when not yet categorised.
    pub fn category_str(&self) -> &'static str {
        self.category.as_ref().map(Category::as_str).unwrap_or("")
    }
}

/// Net amount per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub total: f64,
}

/// Group transactions by category and sum amounts.
///
/// Debits count positive and credits negative. Amounts are parsed after
/// removing thousands separators; anything unparseable counts as zero.
/// Categories are ordered by descending absolute total, ties keeping their
/// first-seen order.
pub fn summarize_by_category(transactions: &[Transaction]) -> Vec<CategorySummary> {
    let mut totals: Vec<CategorySummary> = Vec::new();
    for t in transactions {
        let raw = t.amount.replace(',', "");
        let mut value = raw.trim().parse::<f64>().unwrap_or(0.0);
        if !value.is_finite() {
            value = 0.0;
        }
        if t.kind == TransactionType::Credit {
            value = -value;
        }
        let category = t.category.unwrap_or_default();
        match totals.iter_mut().find(|s| s.category == category) {
            Some(entry) => entry.total += value,
            None => totals.push(CategorySummary {
                category,
                total: value,
            }),
        }
    }
    totals.sort_by(|a, b| b.total.abs().total_cmp(&a.total.abs()));
    totals
}

/// Everything a caller gets back from processing one statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub job_id: String,
    pub transactions: Vec<Transaction>,
    pub summary_by_category: Vec<CategorySummary>,
    /// Transport-neutral locator for the stored CSV.
    pub csv_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(amount: &str, kind: TransactionType, category: Category) -> Transaction {
        Transaction {
            date: "01/02/2024".into(),
            description: "x".into(),
            amount: amount.into(),
            kind,
            category: Some(category),
        }
    }

    #[test]
    fn type_normalisation() {
        for raw in ["Credit", "CR", "credit", " cr "] {
            assert_eq!(
                TransactionType::from_source(Some(raw)),
                TransactionType::Credit,
                "{raw}"
            );
        }
        for raw in ["debit", "DR", "", "refund"] {
            assert_eq!(
                TransactionType::from_source(Some(raw)),
                TransactionType::Debit,
                "{raw}"
            );
        }
        assert_eq!(TransactionType::from_source(None), TransactionType::Debit);
    }

    #[test]
    fn category_lookup_is_case_insensitive() {
        assert_eq!(Category::lookup("groceries"), Some(Category::Groceries));
        assert_eq!(Category::lookup(" DINING "), Some(Category::Dining));
        assert_eq!(Category::lookup("Food"), None);
        assert_eq!(Category::coerce("Food"), Category::Other);
    }

    #[test]
    fn taxonomy_is_fixed() {
        assert_eq!(
            Category::joined(),
            "Groceries, Utilities, Shopping, Transfer, Dining, Transport, Healthcare, Entertainment, Other"
        );
    }

    #[test]
    fn serde_uses_type_field_name() {
        let t = txn("4.50", TransactionType::Debit, Category::Dining);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "debit");
        assert_eq!(json["category"], "Dining");
    }

    #[test]
    fn summary_nets_credits_and_orders_by_magnitude() {
        let txns = vec![
            txn("1,200.00", TransactionType::Debit, Category::Transfer),
            txn("50.00", TransactionType::Debit, Category::Groceries),
            txn("20.00", TransactionType::Credit, Category::Groceries),
            txn("n/a", TransactionType::Debit, Category::Dining),
        ];
        let summary = summarize_by_category(&txns);
        assert_eq!(summary[0].category, Category::Transfer);
        assert_eq!(summary[0].total, 1200.0);
        assert_eq!(summary[1].category, Category::Groceries);
        assert_eq!(summary[1].total, 30.0);
        assert_eq!(summary[2].total, 0.0);
    }

    #[test]
    fn summary_defaults_missing_category_to_other() {
        let mut t = txn("5", TransactionType::Debit, Category::Dining);
        t.category = None;
        let summary = summarize_by_category(&[t]);
        assert_eq!(summary[0].category, Category::Other);
    }
}
