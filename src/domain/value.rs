//! Typed literal values shared by the argument parser, user functions and
//! the expression language.

use std::cmp::Ordering;
use std::fmt;

/// A typed literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Truthiness as used for condition results.
    ///
    /// `"0"` and the empty string are falsy, mirroring how configuration
    /// values are usually written.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty() && s != "0",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value, if it has one.
    ///
    /// Strings count as numeric when they parse completely after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Null => None,
        }
    }

    /// String form used when a value is handed to string predicates.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    /// Strict equality: same type and same value (`===`).
    pub fn identical(&self, other: &Value) -> bool {
        self == other
    }

    /// Loose equality (`==`).
    ///
    /// Booleans compare by truthiness, numeric operands (including numeric
    /// strings) compare by number, everything else by string form.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), b) | (b, Value::Bool(a)) => *a == b.is_truthy(),
            (Value::Null, v) | (v, Value::Null) => !v.is_truthy(),
            (Value::String(a), Value::String(b)) => match (self.as_number(), other.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            _ => match (self.as_number(), other.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => self.to_plain_string() == other.to_plain_string(),
            },
        }
    }

    /// Ordering for `<`, `<=`, `>`, `>=`: numeric if both sides are numeric,
    /// lexical on the string form otherwise.
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self.as_number(), other.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(self.to_plain_string().cmp(&other.to_plain_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
