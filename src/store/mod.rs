//! In-memory semantic document store.
//!
//! [`SemanticStore`] owns parallel collections of documents and their
//! embedding vectors, supports bulk ingestion via [`SemanticStore::add_documents`]
//! and top-K nearest-neighbor retrieval by cosine similarity via
//! [`SemanticStore::search`]. It depends on an [`EmbeddingProvider`] to
//! vectorize both documents (once, at ingestion) and queries (per search).
//!
//! The store is designed for a single logical owner: ingestion takes
//! `&mut self`, so the borrow checker already serializes writers against
//! readers. No internal locking; all suspension comes from awaiting the
//! embedding provider.

pub mod similarity;

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embedding::{EmbeddingProvider, Progress, ProgressSink, ProgressStatus};
use crate::error::{EngineError, Result};
use self::similarity::cosine_similarity;

/// An immutable document record. Created at ingestion, never mutated,
/// removed only by [`SemanticStore::clear`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique within reason — the store does not deduplicate, so duplicate
    /// ids from repeated ingestion calls coexist as separate entries.
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// A single ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub document: Document,
    /// Cosine similarity to the query, higher is more similar.
    pub score: f32,
}

/// Embedding-indexed document store with top-K cosine-similarity search.
pub struct SemanticStore {
    provider: Arc<dyn EmbeddingProvider>,
    documents: Vec<Document>,
    // Invariant: embeddings.len() == documents.len() after any completed
    // mutation, and embeddings[i] is the vector of documents[i].
    embeddings: Vec<Vec<f32>>,
    ready: bool,
}

impl SemanticStore {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            documents: Vec::new(),
            embeddings: Vec::new(),
            ready: false,
        }
    }

    /// Embed and append documents, in input order.
    ///
    /// Each document is embedded once; the `(document, vector)` pair is
    /// appended atomically. If embedding fails for document *i*, the call
    /// aborts with [`EngineError::PartialIngestion`] and documents
    /// `0..i` remain in the store — partial ingestion is observable and
    /// intentional. Returns the number of documents appended by this call.
    ///
    /// A progress event is emitted after each document completes, in
    /// order, once per document. Empty input is a no-op and leaves the
    /// ready flag unchanged.
    pub async fn add_documents(
        &mut self,
        docs: Vec<Document>,
        progress: Option<&ProgressSink>,
    ) -> Result<usize> {
        let total = docs.len();
        tracing::debug!(count = total, "indexing documents");

        for (i, doc) in docs.into_iter().enumerate() {
            let vector = match self.provider.embed(&doc.content).await {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!(
                        document = %doc.id,
                        appended = i,
                        "ingestion aborted by embed failure"
                    );
                    return Err(EngineError::PartialIngestion {
                        appended: i,
                        failed_id: doc.id,
                        source: Box::new(e),
                    });
                }
            };

            self.documents.push(doc);
            self.embeddings.push(vector);
            self.ready = true;

            if let Some(sink) = progress {
                let percent = ((i + 1) as f64 / total as f64 * 100.0).round() as u8;
                sink(Progress {
                    status: ProgressStatus::Indexing,
                    percent,
                    message: format!("Indexing document {}/{}", i + 1, total),
                });
            }
        }

        tracing::debug!(size = self.documents.len(), "documents indexed");
        Ok(total)
    }

    /// Return the `min(top_k, len)` documents most similar to `query`,
    /// most similar first.
    ///
    /// Fails with [`EngineError::EmptyStore`] before any successful
    /// ingestion (checked before the provider is touched, so an
    /// uninitialized provider on an empty store still reports
    /// `EmptyStore`). Ties rank in insertion order; repeated searches
    /// against an unchanged store return identical results.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        if !self.ready || self.documents.is_empty() {
            return Err(EngineError::EmptyStore);
        }

        let query_embedding = self.provider.embed(query).await?;

        let mut ranked: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, embedding)| (i, cosine_similarity(&query_embedding, embedding)))
            .collect();

        // Stable sort: equal scores keep insertion order. Scores are never
        // NaN (zero-norm maps to -inf), so Equal is only hit on real ties.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(i, score)| ScoredDocument {
                document: self.documents[i].clone(),
                score,
            })
            .collect())
    }

    /// Retrieve the top-K documents for `query` and concatenate them as
    /// labeled context blocks:
    ///
    /// ```text
    /// [Source 1] <content>
    ///
    /// [Source 2] <content>
    /// ```
    ///
    /// Labels are 1-indexed in ranked order. How the caller uses the
    /// string (typically as language-model context) is its own business.
    pub async fn get_context(&self, query: &str, top_k: usize) -> Result<String> {
        let results = self.search(query, top_k).await?;
        let blocks: Vec<String> = results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[Source {}] {}", i + 1, r.document.content))
            .collect();
        Ok(blocks.join("\n\n"))
    }

    /// Drop all documents and vectors and reset the ready flag. Idempotent.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.embeddings.clear();
        self.ready = false;
    }

    /// Number of stored documents. For caller-side reporting; the store
    /// itself gates `search` on the ready flag, not on this count.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// True once at least one document has been successfully appended.
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}
