use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single field of a node's current readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl Reading {
    /// Coerces a raw payload field. Numeric strings become numbers and
    /// `"true"`/`"false"` become booleans; nulls and nested values are dropped.
    pub fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::Number(n) => n.as_f64().map(Reading::Number),
            Value::Bool(b) => Some(Reading::Boolean(*b)),
            Value::String(s) => Some(Self::coerce_text(s)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn coerce_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return Reading::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Reading::Boolean(false);
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Reading::Number(value),
            _ => Reading::Text(text.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Reading::Number(value) => Some(*value),
            _ => None,
        }
    }
}

/// Parses a filter-variant value, which must be a number or a numeric string.
pub fn parse_sample_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
