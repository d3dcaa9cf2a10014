//! One-shot conversion from the command line.
//!
//! `t2s ask --schema tables.json "how many orders were placed today"` loads
//! the schema, builds a throwaway session, converts one question and prints
//! the SQL to stdout. Progress goes to stderr so the output can be piped.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use text2sql_core::schema::parse_schema_bytes;
use text2sql_core::session::{Credential, PipelineSession};

use crate::config::Config;
use crate::openai::OpenAiFactory;

/// Read the API key from `OPENAI_API_KEY`.
pub fn credential_from_env() -> Result<Credential> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(Credential::new(key)),
        _ => bail!("OPENAI_API_KEY environment variable not set"),
    }
}

/// Read and parse a schema file.
pub fn read_schema(path: &Path) -> Result<Value> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
    let schema = parse_schema_bytes(&bytes)
        .with_context(|| format!("Failed to parse schema file: {}", path.display()))?;
    Ok(schema)
}

pub async fn run_ask(
    config: &Config,
    schema_path: &Path,
    question: &str,
    credential: Credential,
) -> Result<String> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }
    let schema = read_schema(schema_path)?;

    let config = Arc::new(config.clone());
    let factory = OpenAiFactory::new(config.clone())?;
    let mut session = PipelineSession::new(
        "cli",
        config.pipeline_settings(),
        config.sessions.history_limit,
    );
    session.set_credential(credential, &factory)?;

    let report = session.load_schema(&schema).await?;
    eprintln!(
        "Indexed {} tables ({} fragments)",
        report.tables, report.fragments
    );

    let entry = session.convert(question).await?;
    println!("{}", entry.sql_query);
    Ok(entry.sql_query)
}
