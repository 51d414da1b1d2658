use std::io::Write;
use std::path::Path;

use anyhow::Result;

use sema::config::SemaConfig;
use sema::llm::{answer_prompt, GenerationParams, LanguageModel, OpenAiCompatClient};

/// Index a corpus file, retrieve context for a question, and stream a
/// grounded answer from the configured language model.
pub async fn ask(config: &SemaConfig, corpus: &Path, question: &str) -> Result<()> {
    let client = OpenAiCompatClient::from_config(&config.llm)?;
    let store = super::build_store(config, corpus).await?;

    let context = store
        .get_context(question, config.retrieval.context_top_k)
        .await?;
    tracing::debug!(context_len = context.len(), "retrieved context");

    let prompt = answer_prompt(&context, question);
    let on_chunk = |chunk: &str| {
        print!("{chunk}");
        let _ = std::io::stdout().flush();
    };
    client
        .generate_stream(&prompt, &GenerationParams::default(), &on_chunk)
        .await?;
    println!();

    Ok(())
}
