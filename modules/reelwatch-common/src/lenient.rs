// Lenient coercion for loosely typed JSON.
//
// The scraper API and older snapshots are loose with types: counters arrive as
// numbers, numeric strings, null or not at all, ids flip between strings and
// numbers. Everything is coerced the way `parseInt(x || 0)` would, so nothing
// downstream sees a null. The `deserialize_with` helpers below apply the same
// rules to serde fields.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a counter, clamped to zero.
pub fn coerce_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => u64::try_from(parse_leading_int(s)).unwrap_or(0),
        _ => 0,
    }
}

/// Coerce a signed integer (timestamps). Non-numeric input becomes 0.
pub fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => parse_leading_int(s),
        _ => 0,
    }
}

/// Coerce to a string. Numbers are stringified, everything else is empty.
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// JS-style truthiness for flags.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

/// Parse an optional sign followed by leading digits, ignoring the rest.
/// Saturates instead of overflowing.
fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut acc: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        acc = acc.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative {
        -acc
    } else {
        acc
    }
}

pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_count).unwrap_or(0))
}

pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_int).unwrap_or(0))
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_string).unwrap_or_default())
}

/// Like [`string`], but null and empty become `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .map(coerce_string)
        .filter(|s| !s.is_empty()))
}

pub fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().is_some_and(coerce_bool))
}

/// A nested object that may be null.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A list that may be null or missing.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_follow_parse_int_rules() {
        assert_eq!(coerce_count(&json!(42)), 42);
        assert_eq!(coerce_count(&json!("1200")), 1200);
        assert_eq!(coerce_count(&json!("87abc")), 87);
        assert_eq!(coerce_count(&json!(12.9)), 12);
        assert_eq!(coerce_count(&json!(-5)), 0);
        assert_eq!(coerce_count(&json!("-5")), 0);
        assert_eq!(coerce_count(&json!("views")), 0);
        assert_eq!(coerce_count(&json!(null)), 0);
        assert_eq!(coerce_count(&json!(true)), 0);
    }

    #[test]
    fn ints_keep_sign_and_strings_stringify_numbers() {
        assert_eq!(coerce_int(&json!("-12s")), -12);
        assert_eq!(coerce_int(&json!(1.7e9)), 1_700_000_000);
        assert_eq!(coerce_string(&json!(7300)), "7300");
        assert_eq!(coerce_string(&json!(null)), "");
        assert!(coerce_bool(&json!(1)));
        assert!(!coerce_bool(&json!(null)));
    }
}
