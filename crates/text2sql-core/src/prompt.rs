//! Prompt assembly.
//!
//! A [`PromptTemplate`] is a pair of system/user message templates with four
//! placeholders: `{dialect}`, `{top_k}`, `{table_info}` and `{input}`.
//! Rendering is pure and deterministic: the same inputs always produce the
//! same [`Prompt`].
//!
//! Placeholders are filled in a single left-to-right pass, so braces inside
//! substituted values (a question mentioning `{input}`, a JSON column
//! descriptor) are copied through untouched.
//!
//! # Example
//!
//! ```rust
//! use text2sql_core::prompt::{PromptInputs, PromptTemplate};
//!
//! let prompt = PromptTemplate::builtin().render(&PromptInputs {
//!     dialect: "postgresql",
//!     top_k: 10,
//!     table_info: &[],
//!     question: "how many users signed up today",
//! });
//! assert!(prompt.system.contains("postgresql"));
//! assert!(prompt.user.contains("how many users signed up today"));
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::models::{Fragment, ScoredFragment};

/// Version tag of the built-in template.
pub const BUILTIN_TEMPLATE_VERSION: &str = "sql-query-v1";

/// Placeholders every template must contain.
pub const PLACEHOLDERS: [&str; 4] = ["dialect", "top_k", "table_info", "input"];

const BUILTIN_SYSTEM: &str = "\
You are an expert {dialect} developer. Given an input question, write one syntactically \
correct {dialect} query that answers it.

Unless the question asks for a specific number of rows, limit the query to at most {top_k} \
results. Order the results by a relevant column when that makes the answer more useful.

Only select the columns needed to answer the question; never select every column of a table.

Use only the tables and columns described below. Do not reference tables or columns that are \
not listed, and pay attention to which column belongs to which table.

Schema context:
{table_info}

Respond with the SQL query only.";

const BUILTIN_USER: &str = "Question: {input}";

const NO_CONTEXT: &str = "No schema fragments matched this question.";

/// A rendered prompt, ready for a chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Both messages as one block of text.
    pub fn text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Inputs for a single render.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub dialect: &'a str,
    /// Result-row cap the model is told to respect.
    pub top_k: usize,
    pub table_info: &'a [ScoredFragment],
    pub question: &'a str,
}

/// A versioned system/user template pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub version: String,
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    /// The template shipped with this crate.
    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_TEMPLATE_VERSION.to_string(),
            system: BUILTIN_SYSTEM.to_string(),
            user: BUILTIN_USER.to_string(),
        }
    }

    /// Placeholders that appear in neither message.
    pub fn missing_placeholders(&self) -> Vec<&'static str> {
        PLACEHOLDERS
            .iter()
            .copied()
            .filter(|name| {
                let token = format!("{{{}}}", name);
                !self.system.contains(&token) && !self.user.contains(&token)
            })
            .collect()
    }

    pub fn render(&self, inputs: &PromptInputs<'_>) -> Prompt {
        let top_k = inputs.top_k.to_string();
        let table_info = format_table_info(inputs.table_info);
        let vars = [
            ("dialect", inputs.dialect),
            ("top_k", top_k.as_str()),
            ("table_info", table_info.as_str()),
            ("input", inputs.question),
        ];
        Prompt {
            system: fill(&self.system, &vars),
            user: fill(&self.user, &vars),
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Render retrieved fragments as the `{table_info}` block.
///
/// Fragments keep retrieval order. An empty slice renders a fixed marker so
/// the model is told explicitly that no schema matched.
pub fn format_table_info(fragments: &[ScoredFragment]) -> String {
    if fragments.is_empty() {
        return NO_CONTEXT.to_string();
    }
    fragments
        .iter()
        .enumerate()
        .map(|(i, sf)| format_fragment(i + 1, &sf.fragment))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_fragment(n: usize, fragment: &Fragment) -> String {
    let meta = &fragment.metadata;
    let table = meta.table_name.as_deref().unwrap_or("(unnamed)");
    let columns = join_or_none(meta.columns.iter().map(describe_column));
    let primary_key = meta
        .primary_key
        .as_ref()
        .map(|pk| pk.columns().join(", "))
        .unwrap_or_else(|| "none".to_string());
    let foreign_keys = join_or_none(meta.foreign_keys.iter().map(describe_value));

    format!(
        "[{}] table: {}\n    columns: {}\n    primary key: {}\n    foreign keys: {}\n    description: {}",
        n, table, columns, primary_key, foreign_keys, fragment.text
    )
}

fn join_or_none(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// `"id"` stays `id`; `{"name": "id", "type": "INTEGER"}` becomes `id INTEGER`.
fn describe_column(column: &Value) -> String {
    if let Some(name) = column.get("name").and_then(Value::as_str) {
        return match column.get("type").and_then(Value::as_str) {
            Some(ty) => format!("{} {}", name, ty),
            None => name.to_string(),
        };
    }
    describe_value(column)
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Single-pass `{name}` substitution. Unknown names are left as-is.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrimaryKey, TableMetadata};
    use serde_json::json;

    fn orders_fragment() -> ScoredFragment {
        ScoredFragment {
            fragment: Fragment {
                text: "orders placed by customers".to_string(),
                start_index: 0,
                document_index: 0,
                metadata: TableMetadata {
                    table_name: Some("orders".to_string()),
                    columns: vec![json!("id"), json!("customer_id"), json!("total")],
                    primary_key: Some(PrimaryKey::Single("id".to_string())),
                    foreign_keys: vec![json!("customer_id")],
                },
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_builtin_has_all_placeholders() {
        assert!(PromptTemplate::builtin().missing_placeholders().is_empty());
    }

    #[test]
    fn test_render_contains_all_inputs() {
        let frags = vec![orders_fragment()];
        let prompt = PromptTemplate::builtin().render(&PromptInputs {
            dialect: "sqlite",
            top_k: 10,
            table_info: &frags,
            question: "how many orders were placed",
        });
        assert!(prompt.system.contains("sqlite"));
        assert!(prompt.system.contains("at most 10 results"));
        assert!(prompt.system.contains("orders placed by customers"));
        assert!(prompt.system.contains("columns: id, customer_id, total"));
        assert!(prompt.system.contains("primary key: id"));
        assert!(prompt.system.contains("foreign keys: customer_id"));
        assert_eq!(prompt.user, "Question: how many orders were placed");
        assert!(!prompt.text().contains("{table_info}"));
    }

    #[test]
    fn test_render_empty_context() {
        let prompt = PromptTemplate::builtin().render(&PromptInputs {
            dialect: "sql",
            top_k: 5,
            table_info: &[],
            question: "anything",
        });
        assert!(prompt.system.contains(NO_CONTEXT));
    }

    #[test]
    fn test_render_is_deterministic() {
        let frags = vec![orders_fragment(), orders_fragment()];
        let inputs = PromptInputs {
            dialect: "mysql",
            top_k: 3,
            table_info: &frags,
            question: "q",
        };
        let template = PromptTemplate::builtin();
        assert_eq!(template.render(&inputs), template.render(&inputs));
    }

    #[test]
    fn test_substituted_values_not_reexpanded() {
        let template = PromptTemplate {
            version: "t".to_string(),
            system: "{dialect}|{top_k}|{table_info}".to_string(),
            user: "{input} {unknown} {".to_string(),
        };
        let prompt = template.render(&PromptInputs {
            dialect: "{input}",
            top_k: 1,
            table_info: &[],
            question: "why {dialect}?",
        });
        assert_eq!(prompt.system, format!("{{input}}|1|{}", NO_CONTEXT));
        assert_eq!(prompt.user, "why {dialect}? {unknown} {");
    }

    #[test]
    fn test_missing_placeholders_reported() {
        let template = PromptTemplate {
            version: "custom".to_string(),
            system: "Write {dialect}".to_string(),
            user: "{input}".to_string(),
        };
        assert_eq!(template.missing_placeholders(), vec!["top_k", "table_info"]);
    }

    #[test]
    fn test_column_descriptor_objects() {
        let mut frag = orders_fragment();
        frag.fragment.metadata.columns = vec![
            json!({"name": "id", "type": "INTEGER"}),
            json!({"name": "note"}),
            json!(42),
        ];
        frag.fragment.metadata.primary_key = Some(PrimaryKey::Composite(vec![
            "id".to_string(),
            "line".to_string(),
        ]));
        frag.fragment.metadata.foreign_keys = vec![json!({"column": "customer_id"})];
        let info = format_table_info(&[frag]);
        assert!(info.contains("columns: id INTEGER, note, 42"));
        assert!(info.contains("primary key: id, line"));
        assert!(info.contains(r#"foreign keys: {"column":"customer_id"}"#));
    }
}
