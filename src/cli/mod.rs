//! Terminal commands — the surrounding application around the retrieval
//! core. Each command ingests a corpus into a fresh in-memory store
//! (ingestion strictly before any search, so the store never sees
//! concurrent readers and writers) and then runs its query phase.

pub mod ask;
pub mod query;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use sema::config::SemaConfig;
use sema::embedding::{EmbeddingProvider, Progress};
use sema::store::SemanticStore;

/// Create a provider, load the model, and index the corpus file,
/// reporting both phases on stderr progress bars.
pub(crate) async fn build_store(config: &SemaConfig, corpus_path: &Path) -> Result<SemanticStore> {
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::from(sema::embedding::create_provider(&config.embedding)?);

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Loading embedding model");
    let sink = {
        let spinner = spinner.clone();
        move |p: Progress| {
            spinner.set_message(p.message);
        }
    };
    provider.initialize(Some(&sink)).await?;
    spinner.finish_and_clear();

    let docs = sema::corpus::load_corpus(corpus_path)?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {percent}% {msg}")
            .expect("valid template")
            .progress_chars("##-"),
    );
    let sink = {
        let bar = bar.clone();
        move |p: Progress| {
            bar.set_position(u64::from(p.percent));
            bar.set_message(p.message);
        }
    };
    let mut store = SemanticStore::new(provider);
    store.add_documents(docs, Some(&sink)).await?;
    bar.finish_and_clear();

    tracing::info!(documents = store.len(), "corpus indexed");
    Ok(store)
}
