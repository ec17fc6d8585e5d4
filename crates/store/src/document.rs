use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless record as returned by the store: a document id plus its top-level fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Builds a document from a JSON object. Returns `None` for non-object values.
    #[must_use]
    pub fn from_value(id: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(id, fields)),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String field, or `None` when missing or not a string.
    #[must_use]
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// String field with an empty-string default.
    #[must_use]
    pub fn string_or_default(&self, field: &str) -> String {
        self.str_field(field).unwrap_or_default().to_string()
    }

    #[must_use]
    pub fn i64_field(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equal,
    NotEqual,
}

/// A single field predicate. Multiple filters combine with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Equal,
            value: value.into(),
        }
    }

    pub fn not_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::NotEqual,
            value: value.into(),
        }
    }

    /// Evaluates the predicate against a document.
    ///
    /// `NotEqual` never matches a document that lacks the field, mirroring how
    /// hosted document stores treat inequality on absent fields.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match (self.op, doc.fields.get(&self.field)) {
            (FilterOp::Equal, Some(value)) => *value == self.value,
            (FilterOp::Equal, None) => false,
            (FilterOp::NotEqual, Some(Value::Null) | None) => false,
            (FilterOp::NotEqual, Some(value)) => *value != self.value,
        }
    }
}
