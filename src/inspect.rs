//! Debugging commands: show the fragments a schema is split into and the
//! exact prompt a question would produce.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use text2sql_core::chunk::chunk_documents;
use text2sql_core::models::Fragment;
use text2sql_core::pipeline::Pipeline;
use text2sql_core::prompt::Prompt;
use text2sql_core::schema::load_schema;
use text2sql_core::session::{Credential, ProviderFactory};

use crate::ask::read_schema;
use crate::config::Config;
use crate::openai::OpenAiFactory;

/// Chunk a schema file and print every fragment. No network access.
pub fn run_chunks(config: &Config, schema_path: &Path) -> Result<Vec<Fragment>> {
    let schema = read_schema(schema_path)?;
    let docs = load_schema(&schema)?;
    let fragments = chunk_documents(
        &docs,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );

    if fragments.is_empty() {
        println!("No fragments.");
        return Ok(fragments);
    }

    for (i, fragment) in fragments.iter().enumerate() {
        let table = fragment.metadata.table_name.as_deref().unwrap_or("-");
        println!(
            "{}. {} (record {}, offset {}, {} chars)",
            i + 1,
            table,
            fragment.document_index,
            fragment.start_index,
            fragment.text.chars().count()
        );
        println!("    {}", fragment.text.replace('\n', "\n    "));
        println!();
    }
    println!(
        "{} fragments from {} records (chunk_size={}, chunk_overlap={})",
        fragments.len(),
        docs.len(),
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    Ok(fragments)
}

/// Index a schema file and print the prompt a question would be sent with.
/// Embeds the schema and the question but never calls the completion model.
pub async fn run_prompt(
    config: &Config,
    schema_path: &Path,
    question: &str,
    credential: Credential,
) -> Result<Prompt> {
    let schema = read_schema(schema_path)?;

    let config = Arc::new(config.clone());
    let factory = OpenAiFactory::new(config.clone())?;
    let mut pipeline = Pipeline::new(
        config.pipeline_settings(),
        factory.embedding_provider(&credential)?,
        factory.completion_provider(&credential)?,
    );
    pipeline.load_schema(&schema).await?;
    let prompt = pipeline.build_prompt(question).await?;

    println!("--- system ({}) ---", pipeline.settings().template.version);
    println!("{}", prompt.system);
    println!("--- user ---");
    println!("{}", prompt.user);
    Ok(prompt)
}
