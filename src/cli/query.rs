use std::path::Path;

use anyhow::Result;

use sema::config::SemaConfig;

/// Index a corpus file and print the top-K documents for a query.
pub async fn query(
    config: &SemaConfig,
    corpus: &Path,
    query: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let store = super::build_store(config, corpus).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let results = store.search(query, top_k).await?;

    println!("Found {} result(s)\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. {} (score: {:.4})",
            i + 1,
            result.document.id,
            result.score,
        );
        println!("     {}", preview(&result.document.content));
        println!();
    }

    Ok(())
}

/// Truncate content to at most 120 characters, cutting on a char
/// boundary so multi-byte text never panics the slice.
fn preview(content: &str) -> String {
    match content.char_indices().nth(120) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
