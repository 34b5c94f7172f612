use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MetadataValue – a single entry of the flat metadata record
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value as it is persisted.
///
/// Untagged so that the JSON form is the plain value; variant order matters
/// for deserialization (`1` is an integer, `1.0` a float).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Numeric vector, e.g. the sweep's `param_vals`.
    Array(Vec<f64>),
}

/// Flat metadata record: key → value.
pub type Metadata = BTreeMap<String, MetadataValue>;

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Array(v) => write!(f, "[{} values]", v.len()),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Short type tag, used by formats that store the kind next to the value.
    pub fn kind(&self) -> &'static str {
        match self {
            MetadataValue::Null => "null",
            MetadataValue::Bool(_) => "bool",
            MetadataValue::Integer(_) => "int",
            MetadataValue::Float(_) => "float",
            MetadataValue::String(_) => "str",
            MetadataValue::Array(_) => "array",
        }
    }
}

// ---------------------------------------------------------------------------
// ParamValue – a system parameter as held in memory
// ---------------------------------------------------------------------------

/// Value of one system parameter describing how a sweep was produced.
///
/// Richer than [`MetadataValue`]: parameters may nest (e.g. a grid
/// description) or hold values the metadata record cannot represent.
/// See [`crate::data::metadata`] for how these are normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Complex(Complex64),
    String(String),
    Array(Vec<f64>),
    Map(BTreeMap<String, ParamValue>),
}

/// System parameters of a sweep: key → value.
pub type SystemParams = BTreeMap<String, ParamValue>;

impl From<MetadataValue> for ParamValue {
    fn from(value: MetadataValue) -> Self {
        match value {
            MetadataValue::Null => ParamValue::Null,
            MetadataValue::Bool(b) => ParamValue::Bool(b),
            MetadataValue::Integer(i) => ParamValue::Integer(i),
            MetadataValue::Float(v) => ParamValue::Float(v),
            MetadataValue::String(s) => ParamValue::String(s),
            MetadataValue::Array(v) => ParamValue::Array(v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::Array(v)
    }
}

impl From<Complex64> for ParamValue {
    fn from(v: Complex64) -> Self {
        ParamValue::Complex(v)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(v: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Map(v)
    }
}
