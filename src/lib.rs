//! Semantic retrieval engine for retrieval-augmented generation.
//!
//! Sema retrieves the most semantically relevant pieces of text from a
//! fixed knowledge corpus given a natural-language query, to ground a
//! downstream language-model answer. The core is an embedding-indexed
//! in-memory document store with top-K nearest-neighbor search by cosine
//! similarity; the embedding model and the language model are reached
//! through narrow trait interfaces.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sema::config::SemaConfig;
//! use sema::embedding::{create_provider, EmbeddingProvider};
//! use sema::store::{Document, SemanticStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SemaConfig::load()?;
//! let provider: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
//! provider.initialize(None).await?;
//!
//! let mut store = SemanticStore::new(Arc::clone(&provider));
//! store
//!     .add_documents(vec![Document::new("rag", "RAG grounds LLM answers in retrieved text.")], None)
//!     .await?;
//!
//! let context = store.get_context("what grounds an answer?", 2).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`corpus`] — Knowledge-base input records and JSON corpus loading
//! - [`embedding`] — Text-to-vector embedding pipeline and load coalescing
//! - [`error`] — The engine's error taxonomy
//! - [`llm`] — Language-model collaborator contract and chat client
//! - [`store`] — The semantic store: ingestion, search, context assembly

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod store;

pub use error::{EngineError, Result};
