use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Int,
    Real,
    Text,
}

/// A named, typed attribute column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

impl Field {
    pub fn new<S: Into<String>>(name: S, field_type: FieldType) -> Field {
        Field {
            name: name.into(),
            field_type,
        }
    }
}

/// One attribute value. Every field is nullable.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Text(String),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(x) => Some(*x),
            Value::Real(x) if x.fract() == 0.0 && x.is_finite() => Some(*x as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(x) => Some(*x as f64),
            Value::Real(x) => Some(*x),
            _ => None,
        }
    }

    /// Converts to the given column type. Anything that can't be represented becomes null,
    /// except that every value has a text form.
    pub fn cast(&self, to: FieldType) -> Value {
        match (self, to) {
            (Value::Null, _) => Value::Null,
            (Value::Int(_), FieldType::Int) => self.clone(),
            (Value::Real(_), FieldType::Int) => self.as_i64().map(Value::Int).unwrap_or(Value::Null),
            (Value::Text(x), FieldType::Int) => {
                x.trim().parse().map(Value::Int).unwrap_or(Value::Null)
            }
            (Value::Int(x), FieldType::Real) => Value::Real(*x as f64),
            (Value::Real(_), FieldType::Real) => self.clone(),
            (Value::Text(x), FieldType::Real) => {
                x.trim().parse().map(Value::Real).unwrap_or(Value::Null)
            }
            (Value::Text(_), FieldType::Text) => self.clone(),
            (_, FieldType::Text) => Value::Text(self.to_string()),
        }
    }

    /// Numbers compare numerically and text lexically. Null, or mixing text and numbers, has no
    /// ordering.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(x) => serde_json::Value::from(*x),
            Value::Real(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(x) => serde_json::Value::String(x.clone()),
            Value::Null => serde_json::Value::Null,
        }
    }

    pub(crate) fn from_json(value: &serde_json::Value, field_type: FieldType) -> Value {
        let raw = match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(x) => Value::Int(i64::from(*x)),
            serde_json::Value::Number(x) => {
                if let Some(x) = x.as_i64() {
                    Value::Int(x)
                } else {
                    x.as_f64().map(Value::Real).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(x) => Value::Text(x.clone()),
            other => Value::Text(other.to_string()),
        };
        raw.cast(field_type)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(x) => write!(f, "{}", x),
            Value::Real(x) => write!(f, "{}", x),
            Value::Text(x) => write!(f, "{}", x),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Value {
        Value::Int(x)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Real(x)
    }
}

impl From<&str> for Value {
    fn from(x: &str) -> Value {
        Value::Text(x.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casting() {
        assert_eq!(Value::Real(3.0).cast(FieldType::Int), Value::Int(3));
        assert_eq!(Value::Real(3.5).cast(FieldType::Int), Value::Null);
        assert_eq!(Value::from("42").cast(FieldType::Int), Value::Int(42));
        assert_eq!(Value::from("road").cast(FieldType::Real), Value::Null);
        assert_eq!(Value::Int(7).cast(FieldType::Text), Value::from("7"));
        assert_eq!(Value::Null.cast(FieldType::Text), Value::Null);
    }

    #[test]
    fn comparing() {
        assert_eq!(Value::Int(2).compare(&Value::Real(2.0)), Some(Ordering::Equal));
        assert_eq!(Value::Int(1).compare(&Value::Int(5)), Some(Ordering::Less));
        assert_eq!(Value::from("a").compare(&Value::Int(5)), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }
}
