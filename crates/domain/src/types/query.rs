//! Query and update result shapes

use serde::{Deserialize, Serialize};

use super::schema::ColumnDescriptor;
use super::value::Value;

/// One result set from `/sql/dml/query` or a TQL call.
///
/// Every entry of `results` is expected to have `columns.len()` values;
/// the service is trusted on that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub results: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.results.len()
    }
}

/// Outcome of one statement sent to `/sql/dml/update`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    #[serde(default, rename = "updatedRows")]
    pub updated_rows: u64,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stmt: Option<String>,
}

/// SQL statement text with positional bindings carried alongside.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statement {
    pub text: String,
    pub bindings: Vec<Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), bindings: Vec::new() }
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: Vec<Value>) -> Self {
        self.bindings = bindings;
        self
    }
}
