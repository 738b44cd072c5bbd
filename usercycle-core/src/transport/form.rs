//! `application/x-www-form-urlencoded` bodies for API requests
//!
//! Nested values use bracket keys, the convention the API's form parser
//! expects:
//!
//! ```text
//! {"uid":"u1","properties":{"plan":"pro plus"}}
//!   -> uid=u1&properties%5Bplan%5D=pro+plus
//! ```
//!
//! Booleans are sent as `1`/`0`; nulls are left out.

use serde_json::{Map, Value};

/// Encode a field map as a form body
pub fn encode(data: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in data {
        push_pairs(&mut pairs, key, value);
    }
    pairs.join("&")
}

fn push_pairs(pairs: &mut Vec<String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push(pair(key, if *flag { "1" } else { "0" })),
        Value::Number(number) => pairs.push(pair(key, &number.to_string())),
        Value::String(text) => pairs.push(pair(key, text)),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                push_pairs(pairs, &format!("{}[{}]", key, index), item);
            }
        }
        Value::Object(map) => {
            for (name, item) in map {
                push_pairs(pairs, &format!("{}[{}]", key, name), item);
            }
        }
    }
}

fn pair(key: &str, value: &str) -> String {
    format!("{}={}", escape(key), escape(value))
}

/// Percent-encode with `+` for spaces. A literal `%` becomes `%25`, so every
/// `%20` in the output came from a space.
fn escape(text: &str) -> String {
    urlencoding::encode(text).replace("%20", "+")
}
