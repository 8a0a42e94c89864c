use serde::Serialize;
use serde_json::{Map, Value};

/// One column of the described table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    /// Index role as reported by the database (`PRI`, `UNI`, `MUL`), empty otherwise.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extra: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            key: String::new(),
            default: None,
            extra: String::new(),
        }
    }
}

/// A sampled row, keyed by column name in column order.
pub type SampleRow = Map<String, Value>;

/// Schema and sample rows of one table, fetched together per request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableContext {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<SampleRow>,
}
