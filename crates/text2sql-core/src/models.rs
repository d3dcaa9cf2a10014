//! Core data models used throughout text2sql.
//!
//! These types represent the schema records, fragments, and index entries
//! that flow through the build and query phases of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A table's primary key: one column or a composite list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// Key column names in declaration order.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(col) => vec![col.as_str()],
            PrimaryKey::Composite(cols) => cols.iter().map(String::as_str).collect(),
        }
    }
}

/// Structured metadata attached to every fragment of a table description.
///
/// Mirrors the four non-description fields of an uploaded record. Absent
/// or `null` fields map to `None` / empty lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    #[serde(default)]
    pub table_name: Option<String>,
    /// Column descriptors in declaration order (names or descriptor objects).
    #[serde(default, deserialize_with = "nullable_list")]
    pub columns: Vec<Value>,
    #[serde(default)]
    pub primary_key: Option<PrimaryKey>,
    /// Relations to other tables (column names or descriptor objects).
    #[serde(default, deserialize_with = "nullable_list")]
    pub foreign_keys: Vec<Value>,
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One table description as uploaded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaRecord {
    pub description: String,
    #[serde(flatten)]
    pub metadata: TableMetadata,
}

/// A retrievable unit produced by the schema loader: one per record.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    /// Position of the source record in the uploaded array.
    pub index: usize,
    /// The record's description; the text that gets chunked and embedded.
    pub text: String,
    pub metadata: TableMetadata,
}

/// A contiguous, overlap-padded slice of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub text: String,
    /// Offset of the first character of `text` within the source description,
    /// counted in characters.
    pub start_index: usize,
    /// Position of the source record in the uploaded array.
    pub document_index: usize,
    pub metadata: TableMetadata,
}

/// A fragment stored in the vector index together with its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Opaque entry id (UUID v4).
    pub id: String,
    pub vector: Vec<f32>,
    pub fragment: Fragment,
}

/// A fragment returned from similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredFragment {
    pub fragment: Fragment,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

/// One successful conversion, as recorded in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sql_query: String,
    pub question: String,
    pub timestamp: DateTime<Utc>,
}
