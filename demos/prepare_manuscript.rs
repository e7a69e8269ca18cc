//! Prepare a Manuscript
//!
//! Detect structure, chunk, and summarize a text file, then print what a
//! document store would persist.
//!
//! ```bash
//! RUST_LOG=quire=debug cargo run --example prepare_manuscript -- book.txt
//! ```
//!
//! With `--features openai` and `OPENAI_API_KEY` set, keywords and a
//! synopsis are generated as well.

use tracing_subscriber::EnvFilter;

use quire::{load_dotenv, Pipeline, PipelineConfig};

const SAMPLE: &str = "The Long Way Home\n\n\
Chapter 1\nThe harbor was quiet when the ship left. Nobody waved.\n\n\
Chapter 2\nThe storm came on the third night and took the mast.\n\n\
Chapter 3\nTwenty years later a stranger walked up the hill to the house.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let text = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE.to_string(),
    };

    let config = PipelineConfig::from_env();
    let pipeline = Pipeline::new(config)?;
    let doc = pipeline.prepare(&text)?;

    println!("Document: {} chars", text.chars().count());
    println!(
        "Structure: {} chapters, {} sections, {} paragraph breaks",
        doc.structure.chapter_matches.len(),
        doc.structure.section_matches.len(),
        doc.structure.total_paragraphs
    );
    println!("Exact tokenizer: {}\n", pipeline.estimator().is_exact());

    for (i, chunk) in doc.chunks.iter().enumerate() {
        println!("[{i}] {chunk}");
    }

    println!(
        "\nSummary: {} chars, ~{} tokens",
        doc.summary.summary_text.chars().count(),
        doc.summary.estimated_token_count
    );

    generate(pipeline, &doc).await?;
    Ok(())
}

#[cfg(feature = "openai")]
async fn generate(
    pipeline: Pipeline,
    doc: &quire::PreparedDocument,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    let client = match quire::OpenAiClient::from_env() {
        Ok(client) => client,
        Err(err) => {
            println!("\nSkipping generation: {err}");
            return Ok(());
        }
    };
    let pipeline = pipeline.with_client(Arc::new(client));

    for kind in [quire::ContentKind::Keywords, quire::ContentKind::Synopsis] {
        let result = pipeline.generate(kind, doc).await?;
        println!("\n{kind}:\n{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

#[cfg(not(feature = "openai"))]
async fn generate(
    _pipeline: Pipeline,
    _doc: &quire::PreparedDocument,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nBuild with --features openai to generate metadata.");
    Ok(())
}
