//! Typed values for INSERT/UPDATE payloads and bound parameters.

use chrono::NaiveDateTime;
use std::fmt;

use crate::sanitize::{is_numeric, Sanitizer};

/// Dynamic value type for payloads and query bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Render as a SQL literal. Strings are always escaped, except the bare
    /// placeholder `?` which is left for later binding.
    pub fn to_sql(&self, sanitizer: &Sanitizer) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            // NaN and infinities have no MySQL literal.
            Value::Float(_) => "NULL".to_string(),
            Value::String(s) if s == "?" => "?".to_string(),
            Value::String(s) => sanitizer.quote(s),
            Value::DateTime(dt) => sanitizer.quote(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl Value {
    /// Guess a value's type from command-line text.
    pub fn infer(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            Value::Int(n)
        } else if let Some(f) = is_numeric(raw).then(|| raw.parse::<f64>().ok()).flatten() {
            Value::Float(f)
        } else if raw.eq_ignore_ascii_case("true") {
            Value::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Value::Bool(false)
        } else if raw.eq_ignore_ascii_case("null") {
            Value::Null
        } else {
            Value::String(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_value_to_sql() {
        let s = Sanitizer::manual();
        assert_eq!(Value::from("Jo").to_sql(&s), "'Jo'");
        assert_eq!(Value::from(30).to_sql(&s), "30");
        assert_eq!(Value::from(true).to_sql(&s), "1");
        assert_eq!(Value::from("?").to_sql(&s), "?");
        assert_eq!(Value::from(None::<i64>).to_sql(&s), "NULL");
    }

    #[test]
    fn test_non_finite_float_is_null() {
        let s = Sanitizer::manual();
        assert_eq!(Value::from(2.5).to_sql(&s), "2.5");
        assert_eq!(Value::from(f64::NAN).to_sql(&s), "NULL");
        assert_eq!(Value::from(f64::INFINITY).to_sql(&s), "NULL");
        assert_eq!(Value::from(f64::NEG_INFINITY).to_sql(&s), "NULL");
    }

    #[test]
    fn test_datetime_literal() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(Value::from(dt).to_sql(&Sanitizer::manual()), "'2024-03-01 12:30:00'");
    }

    #[test]
    fn test_infer() {
        assert_eq!(Value::infer("42"), Value::Int(42));
        assert_eq!(Value::infer("2.5"), Value::Float(2.5));
        assert_eq!(Value::infer("true"), Value::Bool(true));
        assert_eq!(Value::infer("NULL"), Value::Null);
        assert_eq!(Value::infer("Jo"), Value::String("Jo".to_string()));
    }
}
