//! Schema loader.
//!
//! Turns an uploaded JSON array of table descriptions into one
//! [`SchemaDocument`] per record. The record's `description` becomes the
//! retrievable text; `table_name`, `columns`, `primary_key` and
//! `foreign_keys` are carried along as [`TableMetadata`](crate::models::TableMetadata).
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use text2sql_core::schema::load_schema;
//!
//! let docs = load_schema(&json!([
//!     { "table_name": "users", "description": "registered users" },
//!     { "description": "audit trail of logins" }
//! ])).unwrap();
//! assert_eq!(docs.len(), 2);
//! assert!(docs[1].metadata.table_name.is_none());
//! ```

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{SchemaDocument, SchemaRecord};

/// Decode raw upload bytes into a JSON value.
pub fn parse_schema_bytes(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|e| Error::SchemaFormat(format!("invalid JSON: {}", e)))
}

/// Load a schema array into documents, one per record, in input order.
///
/// # Errors
///
/// - [`Error::SchemaFormat`] if `value` is not an array.
/// - [`Error::SchemaParse`] if an element is not an object, lacks a string
///   `description`, or carries a metadata field of the wrong shape.
pub fn load_schema(value: &Value) -> Result<Vec<SchemaDocument>> {
    let items = value.as_array().ok_or_else(|| {
        Error::SchemaFormat(format!(
            "schema must be a JSON array, found {}",
            json_type(value)
        ))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| load_record(index, item))
        .collect()
}

fn load_record(index: usize, item: &Value) -> Result<SchemaDocument> {
    let obj = item.as_object().ok_or_else(|| Error::SchemaParse {
        index,
        message: format!("expected an object, found {}", json_type(item)),
    })?;

    match obj.get("description") {
        Some(Value::String(_)) => {}
        Some(other) => {
            return Err(Error::SchemaParse {
                index,
                message: format!("`description` must be a string, found {}", json_type(other)),
            })
        }
        None => {
            return Err(Error::SchemaParse {
                index,
                message: "missing `description` field".to_string(),
            })
        }
    }

    let record: SchemaRecord =
        serde_json::from_value(item.clone()).map_err(|e| Error::SchemaParse {
            index,
            message: e.to_string(),
        })?;

    Ok(SchemaDocument {
        index,
        text: record.description,
        metadata: record.metadata,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrimaryKey;
    use serde_json::json;

    #[test]
    fn test_one_document_per_record() {
        let schema = json!([
            {
                "table_name": "orders",
                "description": "orders placed by customers",
                "columns": ["id", "customer_id", "total"],
                "primary_key": "id",
                "foreign_keys": ["customer_id"]
            },
            {
                "table_name": "customers",
                "description": "people who buy things",
                "columns": [{"name": "id", "type": "INTEGER"}],
                "primary_key": ["id"],
                "foreign_keys": []
            },
            { "description": "a table with no metadata" }
        ]);
        let docs = load_schema(&schema).unwrap();
        assert_eq!(docs.len(), 3);

        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.index, i);
        }

        assert_eq!(docs[0].text, "orders placed by customers");
        assert_eq!(docs[0].metadata.table_name.as_deref(), Some("orders"));
        assert_eq!(
            docs[0].metadata.columns,
            vec![json!("id"), json!("customer_id"), json!("total")]
        );
        assert_eq!(
            docs[0].metadata.primary_key,
            Some(PrimaryKey::Single("id".to_string()))
        );
        assert_eq!(docs[0].metadata.foreign_keys, vec![json!("customer_id")]);

        assert_eq!(
            docs[1].metadata.primary_key,
            Some(PrimaryKey::Composite(vec!["id".to_string()]))
        );

        assert!(docs[2].metadata.table_name.is_none());
        assert!(docs[2].metadata.columns.is_empty());
        assert!(docs[2].metadata.primary_key.is_none());
        assert!(docs[2].metadata.foreign_keys.is_empty());
    }

    #[test]
    fn test_empty_array() {
        let docs = load_schema(&json!([])).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_top_level_not_array() {
        let err = load_schema(&json!({"description": "x"})).unwrap_err();
        assert!(matches!(err, Error::SchemaFormat(_)), "got {:?}", err);
    }

    #[test]
    fn test_element_not_object() {
        let err = load_schema(&json!([{"description": "ok"}, "users"])).unwrap_err();
        match err {
            Error::SchemaParse { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_description() {
        let err = load_schema(&json!([{"table_name": "users"}])).unwrap_err();
        assert!(matches!(err, Error::SchemaParse { index: 0, .. }));
    }

    #[test]
    fn test_wrong_metadata_shape() {
        let err = load_schema(&json!([{"description": "x", "table_name": 7}])).unwrap_err();
        assert!(matches!(err, Error::SchemaParse { index: 0, .. }));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let docs = load_schema(&json!([{"description": "x", "row_count": 12}])).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let err = parse_schema_bytes(b"[{not json").unwrap_err();
        assert!(matches!(err, Error::SchemaFormat(_)));
        assert!(parse_schema_bytes(br#"[{"description": "x"}]"#).is_ok());
    }
}
