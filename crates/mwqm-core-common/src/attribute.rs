//! Scalar attribute values carried by feature rows and result tables.

use std::fmt;

use serde_json::{Number, Value as JsonValue};
use thiserror::Error;

/// Errors raised when an attribute value cannot be represented remotely.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    /// JSON has no representation for NaN or infinite numbers.
    #[error("value {value} for '{column}' is not a finite number")]
    NonFiniteNumber {
        /// Column holding the value
        column: String,
        /// The offending value
        value: f64,
    },
}

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Missing value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl AttributeValue {
    /// Returns the name of the value kind, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Int(_) => "int",
            AttributeValue::Float(_) => "float",
            AttributeValue::Text(_) => "text",
        }
    }

    /// Returns `true` for [`AttributeValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Converts the value to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::NonFiniteNumber`] for NaN or infinite floats,
    /// which JSON cannot encode.
    pub fn to_json(&self, column: &str) -> Result<JsonValue, AttributeError> {
        Ok(match self {
            AttributeValue::Null => JsonValue::Null,
            AttributeValue::Bool(v) => JsonValue::Bool(*v),
            AttributeValue::Int(v) => JsonValue::Number((*v).into()),
            AttributeValue::Float(v) => {
                let number =
                    Number::from_f64(*v).ok_or_else(|| AttributeError::NonFiniteNumber {
                        column: column.to_string(),
                        value: *v,
                    })?;
                JsonValue::Number(number)
            },
            AttributeValue::Text(v) => JsonValue::String(v.clone()),
        })
    }

    /// Builds a value from JSON. Arrays and objects are kept as their
    /// serialized text.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => AttributeValue::Null,
            JsonValue::Bool(v) => AttributeValue::Bool(*v),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => n
                    .as_f64()
                    .map_or_else(|| AttributeValue::Text(n.to_string()), AttributeValue::Float),
            },
            JsonValue::String(v) => AttributeValue::Text(v.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => AttributeValue::Text(value.to_string()),
        }
    }

    /// Infers a value from a raw text cell.
    ///
    /// Empty cells become [`AttributeValue::Null`]; integers, floats and
    /// booleans are recognized, everything else stays text.
    #[must_use]
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return AttributeValue::Null;
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return AttributeValue::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return AttributeValue::Float(v);
        }
        match trimmed {
            "true" | "True" | "TRUE" => AttributeValue::Bool(true),
            "false" | "False" | "FALSE" => AttributeValue::Bool(false),
            _ => AttributeValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(v) => write!(f, "{v}"),
            AttributeValue::Int(v) => write!(f, "{v}"),
            // keep the decimal point so `parse_cell` reads it back as a float
            AttributeValue::Float(v) => write!(f, "{v:?}"),
            AttributeValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_cell_infers_kinds() {
        assert_eq!(AttributeValue::parse_cell(""), AttributeValue::Null);
        assert_eq!(AttributeValue::parse_cell("42"), AttributeValue::Int(42));
        assert_eq!(AttributeValue::parse_cell("0.25"), AttributeValue::Float(0.25));
        assert_eq!(AttributeValue::parse_cell("True"), AttributeValue::Bool(true));
        assert_eq!(
            AttributeValue::parse_cell("01020003_a"),
            AttributeValue::Text("01020003_a".to_string())
        );
    }

    #[test]
    fn non_finite_float_has_no_json_form() {
        let err = AttributeValue::Float(f64::NAN).to_json("area").unwrap_err();
        assert!(err.to_string().contains("'area'"));
        assert!(AttributeValue::Float(f64::INFINITY).to_json("area").is_err());
    }

    #[test]
    fn json_conversion() {
        assert_eq!(AttributeValue::Int(7).to_json("a").unwrap(), json!(7));
        assert_eq!(AttributeValue::from_json(&json!(1.5)), AttributeValue::Float(1.5));
        assert_eq!(AttributeValue::from_json(&json!(3)), AttributeValue::Int(3));
        assert_eq!(
            AttributeValue::from_json(&json!({"k": 1})),
            AttributeValue::Text("{\"k\":1}".to_string())
        );
    }

    #[test]
    fn display_null_is_empty() {
        assert_eq!(AttributeValue::Null.to_string(), "");
        assert_eq!(AttributeValue::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn whole_float_survives_text_round_trip() {
        let text = AttributeValue::Float(40.0).to_string();
        assert_eq!(text, "40.0");
        assert_eq!(AttributeValue::parse_cell(&text), AttributeValue::Float(40.0));
        assert_eq!(AttributeValue::Int(40).to_string(), "40");
    }
}
