//! Corpus input — knowledge-base records supplied by the application.
//!
//! A corpus is an ordered JSON array of records, each with `content` plus
//! optional `id` and `metadata`. Records convert to [`Document`]s verbatim;
//! a missing `id` gets a generated UUID v7.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::store::Document;

/// One knowledge-base entry as it appears in a corpus file.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CorpusRecord {
    /// Convert into a [`Document`], generating an id if none was supplied.
    pub fn into_document(self) -> Document {
        Document {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
            content: self.content,
            metadata: self.metadata,
        }
    }
}

/// Load a corpus from a JSON file and convert it to documents, preserving
/// record order.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file: {}", path.display()))?;
    let records: Vec<CorpusRecord> =
        serde_json::from_str(&json).context("failed to parse corpus JSON")?;
    tracing::debug!(records = records.len(), file = %path.display(), "corpus loaded");
    Ok(records.into_iter().map(CorpusRecord::into_document).collect())
}
