//! Per-record field extraction and coercion
//!
//! A mapping function turns one [`RawRecord`] into a destination record or
//! a [`SkipReason`]. Skips are per-record and never abort the run.

use crate::parser::RawRecord;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Why a record was not imported
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Required field absent or empty
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// Required field present but not coercible
    #[error("invalid value {value:?} for field '{field}'")]
    InvalidValue { field: String, value: String },

    /// Record duplicates a key already imported or present
    #[error("duplicate {0}")]
    Duplicate(String),
}

/// Result of mapping one record
pub type Mapped<T> = std::result::Result<T, SkipReason>;

impl RawRecord {
    /// Trimmed text of a field, `None` when absent, null or empty
    ///
    /// Sequences (XML fields) are unwrapped to their first element.
    pub fn text(&self, field: &str) -> Option<String> {
        let value = match self.get(field)? {
            Value::Array(values) => values.first()?,
            value => value,
        };

        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return None,
        };

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Trimmed text of a required field
    pub fn required(&self, field: &str) -> Mapped<String> {
        self.text(field)
            .ok_or_else(|| SkipReason::MissingField(field.to_string()))
    }

    /// Required field that must parse as an integer
    pub fn required_int(&self, field: &str) -> Mapped<i64> {
        let text = self.required(field)?;
        parse_int_prefix(&text).ok_or(SkipReason::InvalidValue {
            field: field.to_string(),
            value: text,
        })
    }

    /// Permissive integer coercion, 0 when absent or unparsable
    pub fn int_or_zero(&self, field: &str) -> i64 {
        self.text(field)
            .and_then(|t| parse_int_prefix(&t))
            .unwrap_or(0)
    }

    /// Permissive float coercion, 0.0 when absent or unparsable
    pub fn float_or_zero(&self, field: &str) -> f64 {
        self.optional_float(field).unwrap_or(0.0)
    }

    /// Permissive float coercion, `None` when absent or unparsable
    pub fn optional_float(&self, field: &str) -> Option<f64> {
        self.text(field).and_then(|t| parse_float_prefix(&t))
    }
}

/// Parse the longest leading integer (`"12abc"` → 12, `"12.7"` → 12)
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim();
    let bytes = text.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }

    if end == digits_start {
        return None;
    }
    text[..end].parse().ok()
}

/// Parse the longest leading decimal number
///
/// A comma is read as the decimal separator when no dot is present
/// (`"150,50"` → 150.5). Thousands separators are not supported.
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let text = text.trim();
    let normalized;
    let text = if !text.contains('.') && text.matches(',').count() == 1 {
        normalized = text.replace(',', ".");
        normalized.as_str()
    } else {
        text
    };

    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
            digits += 1;
        }
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }

    // Exponent only if well-formed
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse().ok()
}
