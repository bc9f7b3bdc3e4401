//! Scalar values carried by point fields and sideload documents.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An integer literal that does not fit in `i64`. Reading it as a float
/// would silently change its kind, so it is refused instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("integer {0} is outside the signed 64-bit range")]
pub struct IntegerOutOfRange(pub String);

/// A typed scalar. Integers and floats are distinct kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Discriminant of a [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    String,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Int => write!(f, "integer"),
            ScalarKind::Float => write!(f, "float"),
            ScalarKind::Bool => write!(f, "boolean"),
            ScalarKind::String => write!(f, "string"),
        }
    }
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::String(_) => ScalarKind::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a YAML node. Nulls, sequences, mappings and tagged nodes yield
    /// `Ok(None)`; integers outside the i64 range are an error.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Option<Self>, IntegerOutOfRange> {
        Ok(match value {
            serde_yaml::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Int(i)),
                None if n.is_u64() => return Err(IntegerOutOfRange(n.to_string())),
                None => n.as_f64().map(Scalar::Float),
            },
            serde_yaml::Value::String(s) => Some(Scalar::String(s.clone())),
            _ => None,
        })
    }

    /// Convert a JSON node with the same rules as [`Scalar::from_yaml`].
    pub fn from_json(value: &serde_json::Value) -> Result<Option<Self>, IntegerOutOfRange> {
        Ok(match value {
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Int(i)),
                None if n.is_u64() => return Err(IntegerOutOfRange(n.to_string())),
                None => n.as_f64().map(Scalar::Float),
            },
            serde_json::Value::String(s) => Some(Scalar::String(s.clone())),
            _ => None,
        })
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}
