//! Prompts for the vision, extraction, categorisation and chat calls.
//!
//! Every model instruction lives here so a prompt change never touches the
//! parsing or matching code, and tests can inspect the prompts directly.

use crate::output::Category;

/// Instruction sent with each page image on the vision path.
pub const VISION_PAGE_PROMPT: &str = "Extract all text from this bank statement or financial document image. \
Include: dates, descriptions, debit/credit amounts, account numbers, headers, and any other visible text. \
Preserve the order and layout. \
IMPORTANT: In transaction tables, include ONLY rows that are actual transactions (each has a date, description, and an amount that is a debit or credit). \
Do NOT include running balance columns or rows that show only a balance figure (e.g. 'Balance 1,234.56' or a column that repeats the balance after each transaction). \
If there is a 'Balance' column, omit it from each transaction row; only keep date, description, and amount. \
Do not add commentary.";

/// System prompt for the primary transaction-extraction pass.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a precise assistant. Extract every bank transaction from the given statement text. \
Return ONLY a valid JSON array of objects. Each object must have: \
\"date\" (string), \"description\" (string), \"amount\" (string, e.g. 123.45), \"type\" (string: \"credit\" or \"debit\"). \
Preserve the FULL description exactly as shown: include merchant name, location, reference numbers, \
memo lines, and any other text that appears for that transaction. Do not shorten or summarize descriptions. \
Do NOT include rows that only show a balance (opening, closing or running balance) or summary totals. \
If no transactions are found, return [].";

/// Simpler, more permissive prompt used once when the primary pass found nothing.
pub const FALLBACK_EXTRACTION_SYSTEM_PROMPT: &str = "Read this bank statement text and list every line that looks like a payment, purchase, deposit, \
withdrawal or transfer. Reply with a JSON array only, one object per line: \
{\"date\": \"...\", \"description\": \"...\", \"amount\": \"...\", \"type\": \"debit\" or \"credit\"}. \
Use an empty string when a field is unclear. Skip balance and total lines.";

/// Per-category guidance embedded in the categorisation prompt.
pub const CATEGORY_GUIDANCE: &str = "
Use the FULL description and all transaction details to choose the category:
- Groceries: supermarkets, food stores, grocery delivery (e.g. Walmart grocery, Safeway, Whole Foods).
- Utilities: electric, gas, water, internet, phone, cable, streaming subscriptions for household services.
- Shopping: retail, online stores, marketplaces (e.g. Amazon, eBay), clothing, general merchandise.
- Transfer: bank transfers, wire, ACH, Venmo/PayPal transfers, internal moves between accounts.
- Dining: restaurants, cafes, fast food, bars, food delivery (e.g. Uber Eats, DoorDash), coffee shops.
- Transport: fuel/gas stations, tolls, parking, ride-share (Uber/Lyft), public transit, car maintenance.
- Healthcare: doctors, pharmacy, hospital, insurance, medical bills, prescriptions.
- Entertainment: streaming (Netflix, Spotify), movies, games, events, hobbies.
- Other: anything that does not clearly fit above; use only when uncertain.
Read the entire description and any reference/memo text to infer the merchant or purpose, then categorize.
";

/// System prompt for the categorisation pass.
pub fn categorization_system_prompt() -> String {
    format!(
        "You categorize bank transactions. For each transaction you must assign exactly one category from this list: {}. {} \
Return ONLY a valid JSON array of objects. Each object must have: date, description, amount, type, category. \
Keep date, description, amount, and type exactly as given; only set category based on the full context.",
        Category::joined(),
        CATEGORY_GUIDANCE
    )
}

/// User message for the categorisation pass.
pub fn categorization_user_prompt(transactions_context: &str) -> String {
    format!(
        "Categorize each of these transactions by reading the entire description and any other info:\n\n\
{transactions_context}\n\n\
Return the same list as a JSON array, with category set for each transaction."
    )
}

/// System prompt for chat about a stored job.
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant that explains and validates bank statement data. \
Answer ONLY based on the CSV/transaction data provided. \
Justify categories and data when asked (e.g. why a row was categorized as X). \
Be concise and accurate.";

/// User message for chat about a stored job.
pub fn chat_user_prompt(csv_content: &str, message: &str) -> String {
    format!("Statement data (CSV):\n{csv_content}\n\nUser question: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorization_prompt_lists_every_category() {
        let p = categorization_system_prompt();
        for c in Category::ALL {
            assert!(p.contains(c.as_str()), "missing {c}");
        }
    }

    #[test]
    fn extraction_prompt_excludes_balance_rows() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("JSON array"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("balance"));
    }

    #[test]
    fn chat_prompt_embeds_csv_and_question() {
        let p = chat_user_prompt("date,amount\n", "How much on coffee?");
        assert!(p.starts_with("Statement data (CSV):\ndate,amount\n"));
        assert!(p.ends_with("User question: How much on coffee?"));
    }
}
