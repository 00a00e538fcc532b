//! Recover JSON records from free-form model replies.
//!
//! Models wrap JSON in prose and code fences, and long replies get cut off
//! mid-array. Three passes, each more forgiving than the last:
//!
//! 1. the greedy first-`[` to last-`]` span (then `{`…`}`), parsed whole
//! 2. a bracket-stack scan for the first complete, balanced array
//! 3. every complete top-level-parsable object the caller wants to keep
//!
//! Scanners track string and escape state, so brackets inside descriptions
//! do not confuse them. Byte offsets are safe to slice at because every
//! delimiter is ASCII.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// A JSON object the model produced.
pub type Record = Map<String, Value>;

static GREEDY_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").unwrap());
static GREEDY_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

/// Extract every transaction record from `reply`. Never fails; garbage yields `[]`.
pub fn parse_records(reply: &str) -> Vec<Record> {
    parse_records_where(reply, looks_like_transaction)
}

/// Extract every categorisation entry from `reply`: any object carrying a
/// `category`, even one with no other fields. Positions stay aligned with
/// the rows the entries answer.
pub fn parse_category_records(reply: &str) -> Vec<Record> {
    parse_records_where(reply, |map| map.contains_key("category"))
}

/// Shared recovery passes; `keep` decides which loose objects count.
fn parse_records_where(reply: &str, keep: fn(&Record) -> bool) -> Vec<Record> {
    if let Some(records) = parse_greedy(reply, keep) {
        return records;
    }
    if let Some(records) = first_complete_array(reply) {
        return records;
    }
    complete_objects(reply, keep)
}

/// Objects in an array value, skipping non-object items.
fn objects_of(items: Vec<Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Interpret a parsed value as records: an array of objects, an object
/// wrapping a `transactions` array, or a single object `keep` accepts.
fn records_from_value(value: Value, keep: fn(&Record) -> bool) -> Option<Vec<Record>> {
    match value {
        Value::Array(items) => Some(objects_of(items)),
        Value::Object(mut map) => match map.remove("transactions") {
            Some(Value::Array(items)) => Some(objects_of(items)),
            Some(other) => {
                map.insert("transactions".to_string(), other);
                keep(&map).then(|| vec![map])
            }
            None => keep(&map).then(|| vec![map]),
        },
        _ => None,
    }
}

fn parse_greedy(reply: &str, keep: fn(&Record) -> bool) -> Option<Vec<Record>> {
    let span = GREEDY_ARRAY
        .find(reply)
        .or_else(|| GREEDY_OBJECT.find(reply))?;
    let value: Value = serde_json::from_str(span.as_str()).ok()?;
    records_from_value(value, keep)
}

/// A record is worth keeping when it has an amount, or a date and a description.
pub fn looks_like_transaction(map: &Record) -> bool {
    map.contains_key("amount") || (map.contains_key("date") && map.contains_key("description"))
}

/// Byte offset one past the bracket that closes the one at `start`.
///
/// `None` when the input ends first (truncated) or brackets mismatch.
pub fn balanced_end(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => stack.push(b),
            b']' | b'}' => {
                let open = stack.pop()?;
                if (open == b'[') != (b == b']') {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// First balanced `[...]` that parses as an array of objects (or is empty).
/// Arrays of bare values such as a `[1]` footnote marker are skipped.
fn first_complete_array(reply: &str) -> Option<Vec<Record>> {
    for (start, _) in reply.match_indices('[') {
        let Some(end) = balanced_end(reply, start) else {
            continue;
        };
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&reply[start..end]) {
            if items.is_empty() {
                return Some(Vec::new());
            }
            let records = objects_of(items);
            if !records.is_empty() {
                return Some(records);
            }
        }
    }
    None
}

/// Every complete object that parses and passes `keep`, in order.
fn complete_objects(reply: &str, keep: fn(&Record) -> bool) -> Vec<Record> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(offset) = reply[pos..].find('{') {
        let start = pos + offset;
        match balanced_end(reply, start) {
            Some(end) => match serde_json::from_str::<Value>(&reply[start..end]) {
                Ok(Value::Object(map)) if keep(&map) => {
                    out.push(map);
                    pos = end;
                }
                // A wrapper or junk object: look inside it.
                _ => pos = start + 1,
            },
            None => pos = start + 1,
        }
    }
    out
}
