//! Domain values exchanged with the search daemon.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar stored in a document field or used as a query bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self { Self::Integer(i64::from(v)) }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self { Self::Integer(i64::from(v)) }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self { Self::Float(v) }
}

/// Flags are stored numerically, `1` for true.
impl From<bool> for FieldValue {
    fn from(v: bool) -> Self { Self::Integer(i64::from(v)) }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self { Self::Text(v) }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self { Self::Text(v.to_string()) }
}

pub type FieldMap = BTreeMap<String, FieldValue>;

/// The daemon-side representation of one host entity: a flat map of field
/// name to scalar. Documents sent by the adapter always carry the document
/// key field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: FieldMap,
}

impl Document {
    pub fn new() -> Self { Self::default() }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> { self.fields.get(name) }

    pub fn fields(&self) -> &FieldMap { &self.fields }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

impl Extend<(String, FieldValue)> for Document {
    fn extend<I: IntoIterator<Item = (String, FieldValue)>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

impl From<FieldMap> for Document {
    fn from(fields: FieldMap) -> Self { Self { fields } }
}

/// Raw hits returned by one search call.
///
/// `docs` keeps the daemon's ranking order. `total` is the number of matches
/// for the query, independent of the page that was fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub docs: Vec<Document>,
    pub total: u64,
}
