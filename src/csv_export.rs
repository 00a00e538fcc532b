//! Transaction list ⇄ CSV.
//!
//! Column order `date,description,amount,type,category` is an external
//! contract. Values are written verbatim with minimal quoting and `\n`
//! record terminators.

use crate::output::{Category, Transaction, TransactionType};
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tracing::error;

/// Header row, in contract order.
pub const CSV_HEADER: [&str; 5] = ["date", "description", "amount", "type", "category"];

fn render(transactions: &[Transaction]) -> Result<String, csv::Error> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for t in transactions {
        writer.write_record([
            t.date.as_str(),
            t.description.as_str(),
            t.amount.as_str(),
            t.kind.as_str(),
            t.category_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    // Every field came from a `String`.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Serialise transactions to CSV. An empty list yields the header line only.
///
/// Writing into memory cannot fail; should the writer ever report an error
/// it is logged and the header alone is returned.
pub fn transactions_to_csv(transactions: &[Transaction]) -> String {
    render(transactions).unwrap_or_else(|e| {
        error!("CSV serialisation failed: {}", e);
        format!("{}\n", CSV_HEADER.join(","))
    })
}

fn transaction_from_row(row: &StringRecord) -> Transaction {
    let field = |i: usize| row.get(i).unwrap_or("").to_string();
    let category = row.get(4).map(str::trim).filter(|c| !c.is_empty());
    Transaction {
        date: field(0),
        description: field(1),
        amount: field(2),
        kind: TransactionType::from_source(row.get(3)),
        category: category.map(Category::coerce),
    }
}

/// Read CSV produced by [`transactions_to_csv`] back into transactions.
///
/// Short rows are tolerated (missing fields are empty); unknown categories
/// become `Other`.
pub fn parse_csv(content: &str) -> Result<Vec<Transaction>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    reader
        .records()
        .map(|row| row.map(|r| transaction_from_row(&r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(date: &str, desc: &str, amount: &str, kind: TransactionType, cat: Option<Category>) -> Transaction {
        Transaction {
            date: date.into(),
            description: desc.into(),
            amount: amount.into(),
            kind,
            category: cat,
        }
    }

    #[test]
    fn empty_list_is_header_only() {
        assert_eq!(transactions_to_csv(&[]), "date,description,amount,type,category\n");
        assert!(parse_csv(&transactions_to_csv(&[])).unwrap().is_empty());
    }

    #[test]
    fn rows_follow_input_order() {
        let csv = transactions_to_csv(&[
            txn("01/02/2024", "COFFEE SHOP", "4.50", TransactionType::Debit, Some(Category::Dining)),
            txn("03/02/2024", "SALARY", "2,000.00", TransactionType::Credit, Some(Category::Transfer)),
        ]);
        assert_eq!(
            csv,
            "date,description,amount,type,category\n\
01/02/2024,COFFEE SHOP,4.50,debit,Dining\n\
03/02/2024,SALARY,\"2,000.00\",credit,Transfer\n"
        );
    }

    #[test]
    fn uncategorised_rows_have_empty_category() {
        let csv = transactions_to_csv(&[txn("", "X", "1", TransactionType::Debit, None)]);
        assert!(csv.ends_with(",X,1,debit,\n"), "got {csv:?}");
    }

    #[test]
    fn awkward_descriptions_round_trip() {
        let txns = vec![
            txn("01/02", "ACME, INC. \"WEST\"", "10.00", TransactionType::Debit, Some(Category::Shopping)),
            txn("02/02", "MEMO LINE 1\nMEMO LINE 2", "5.00", TransactionType::Credit, Some(Category::Other)),
            txn("03/02", "  padded  ", "", TransactionType::Debit, None),
        ];
        assert_eq!(parse_csv(&transactions_to_csv(&txns)).unwrap(), txns);
    }

    #[test]
    fn short_rows_and_unknown_categories() {
        let parsed = parse_csv("date,description,amount,type,category\n01/02,SHOP,3.00\n02/02,GYM,9.00,CR,Fitness\n").unwrap();
        assert_eq!(parsed[0].category, None);
        assert_eq!(parsed[0].kind, TransactionType::Debit);
        assert_eq!(parsed[1].kind, TransactionType::Credit);
        assert_eq!(parsed[1].category, Some(Category::Other));
    }
}
