//! Error taxonomy for the retrieval engine.
//!
//! Every operational failure the engine can surface is an [`EngineError`]
//! variant. Data conditions (e.g. a zero-norm vector during similarity
//! scoring) are handled locally with a defined numeric fallback and never
//! reach this enum. The engine retries nothing — retry policy belongs to
//! the caller.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// All failures surfaced by the embedding provider, the store, and the
/// language-model collaborator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The embedding provider was used before `initialize` completed.
    #[error("embedding provider not initialized — call initialize() first")]
    NotInitialized,

    /// Loading the embedding model failed. The provider is back in the
    /// uninitialized state and the caller may retry. The payload is a
    /// plain message so that every caller coalesced onto one in-flight
    /// load can receive the same failure.
    #[error("embedding model failed to load: {0}")]
    ProviderLoadFailed(String),

    /// Embedding inference failed on an initialized provider.
    #[error("embedding inference failed: {0}")]
    Inference(String),

    /// `search` was called before any successful ingestion.
    #[error("semantic store is empty — add documents before searching")]
    EmptyStore,

    /// An embed call failed partway through `add_documents`. The
    /// `appended` documents that were ingested before the failure remain
    /// in the store.
    #[error("ingestion aborted at document '{failed_id}' ({appended} already appended): {source}")]
    PartialIngestion {
        appended: usize,
        failed_id: String,
        #[source]
        source: Box<EngineError>,
    },

    /// The language-model collaborator failed.
    #[error("language model error: {0}")]
    Llm(String),
}
