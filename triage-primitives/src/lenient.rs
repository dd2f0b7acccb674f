//! Tolerant serde helpers for form-submitted intake fields.
//!
//! Browser forms submit numbers as strings and leave untouched inputs as
//! empty strings. These helpers accept either representation and map
//! anything unusable to `None` instead of rejecting the whole record.
//! Numeric strings are read up to their first non-numeric character, so
//! `"103.5F"` is `103.5` and `"120 bpm"` is `120`.

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Largest integer magnitude an `f64` represents exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(text)) => leading_number(&text),
        _ => None,
    })
}

/// Parses the longest decimal prefix of `text`, ignoring leading whitespace.
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let whole = digits(end);
    end += whole;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits(end + 1);
        if fraction > 0 {
            end += 1 + fraction;
        }
    }
    if whole + fraction == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_digits = digits(exponent);
        if exponent_digits > 0 {
            end = exponent + exponent_digits;
        }
    }
    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

/// Writes whole numbers as JSON integers so `72` does not become `72.0`.
#[allow(clippy::ref_option, clippy::cast_possible_truncation)]
pub(crate) fn serialize_number<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_INTEGER => {
            serializer.serialize_i64(*v as i64)
        }
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_numeric_prefix() {
        assert_eq!(leading_number("120abc"), Some(120.0));
        assert_eq!(leading_number("103.5F"), Some(103.5));
        assert_eq!(leading_number("  72 bpm"), Some(72.0));
        assert_eq!(leading_number("-4.25"), Some(-4.25));
        assert_eq!(leading_number(".5"), Some(0.5));
        assert_eq!(leading_number("98."), Some(98.0));
        assert_eq!(leading_number("1e2x"), Some(100.0));
        assert_eq!(leading_number("7e"), Some(7.0));
    }

    #[test]
    fn rejects_text_without_a_prefix() {
        for text in ["", "   ", "abc", "-", ".", "+.e3", "NaN", "Infinity", "1e999"] {
            assert_eq!(leading_number(text), None, "{text:?}");
        }
    }
}
