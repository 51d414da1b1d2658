//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, the [`Progress`] reporting
//! types, and a local implementation using all-MiniLM-L6-v2 (384
//! dimensions, L2-normalized). Providers are created via
//! [`create_provider`] from configuration and shared as
//! `Arc<dyn EmbeddingProvider>` — there is no process-wide singleton, so
//! multiple independent providers can coexist (e.g. in tests).

pub mod local;

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{EngineError, Result};

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Loading/indexing phase reported through a [`ProgressSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    /// The embedding model is being loaded.
    Loading,
    /// Documents are being embedded and appended to a store.
    Indexing,
    /// The operation settled successfully. Emitted exactly once, last.
    Ready,
}

/// A single progress event.
#[derive(Debug, Clone)]
pub struct Progress {
    pub status: ProgressStatus,
    /// Completion in `0..=100`.
    pub percent: u8,
    pub message: String,
}

/// Callback receiving [`Progress`] events. Events arrive in order; after a
/// `Ready` event the sink is never invoked again for that operation.
pub type ProgressSink = dyn Fn(Progress) + Send + Sync;

/// Trait for embedding text into vectors.
///
/// Stateful implementations must be initialized once before `embed` /
/// `embed_batch`; using them earlier fails with
/// [`EngineError::NotInitialized`]. Vector dimensionality is fixed for the
/// lifetime of a provider instance.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Load whatever the provider needs to produce embeddings.
    ///
    /// Idempotent once ready. A concurrent call while a load is already in
    /// flight attaches to the in-flight load and settles identically to
    /// the call that started it; only the starting call drives its
    /// progress sink. A failed load leaves the provider uninitialized and
    /// surfaces [`EngineError::ProviderLoadFailed`].
    async fn initialize(&self, progress: Option<&ProgressSink>) -> Result<()>;

    /// Embed a single text string into a vector.
    ///
    /// Output is L2-normalized, but callers should not rely on it.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings, output order matching input order.
    /// Implementations may override for batched inference.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported (ONNX Runtime + all-MiniLM-L6-v2).
/// The model itself is loaded lazily on `initialize`.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::LocalEmbeddingProvider::new(config))),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}

// ── Load coalescing ───────────────────────────────────────────────────────────

/// Outcome broadcast to callers waiting on an in-flight load.
type Settled = Option<std::result::Result<(), String>>;

enum CellState<T> {
    Empty,
    Loading(watch::Receiver<Settled>),
    Ready(Arc<T>),
}

/// A lazily-loaded value with single-flight initialization.
///
/// The first caller of [`LoadCell::get_or_try_init`] runs the load;
/// concurrent callers attach to a shared pending-result handle (a watch
/// channel, not a polling loop) and settle with the same outcome. A failed
/// load resets the cell to empty so a later call may retry.
pub struct LoadCell<T> {
    state: Mutex<CellState<T>>,
}

impl<T> Default for LoadCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LoadCell<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CellState::Empty),
        }
    }

    /// Return the loaded value, or `None` if no load has completed.
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.state.lock().expect("load cell lock poisoned") {
            CellState::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Return the loaded value, running `load` if the cell is empty.
    ///
    /// The boolean is `true` when this call actually ran the load (and
    /// therefore owns progress reporting), `false` when the value was
    /// already present or this call waited on another caller's load.
    pub async fn get_or_try_init<F, Fut>(&self, load: F) -> Result<(bool, Arc<T>)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, String>>,
    {
        enum Role {
            Owner(watch::Sender<Settled>),
            Waiter(watch::Receiver<Settled>),
        }

        let role = {
            let mut state = self.state.lock().expect("load cell lock poisoned");
            match &*state {
                CellState::Ready(value) => return Ok((false, Arc::clone(value))),
                CellState::Loading(rx) => Role::Waiter(rx.clone()),
                CellState::Empty => {
                    let (tx, rx) = watch::channel(None);
                    *state = CellState::Loading(rx);
                    Role::Owner(tx)
                }
            }
        };

        match role {
            Role::Waiter(mut rx) => loop {
                let settled = rx.borrow_and_update().clone();
                if let Some(result) = settled {
                    return match result {
                        Ok(()) => self.get().map(|v| (false, v)).ok_or_else(|| {
                            EngineError::ProviderLoadFailed(
                                "load settled without a value".into(),
                            )
                        }),
                        Err(msg) => Err(EngineError::ProviderLoadFailed(msg)),
                    };
                }
                if rx.changed().await.is_err() {
                    // Owner was cancelled before settling.
                    return Err(EngineError::ProviderLoadFailed(
                        "in-flight load was dropped before settling".into(),
                    ));
                }
            },
            Role::Owner(tx) => {
                // If this future is dropped mid-load, reset to Empty so the
                // next caller can retry; dropping `tx` wakes the waiters.
                let mut guard = ResetGuard {
                    state: &self.state,
                    armed: true,
                };

                let outcome = load().await;

                match outcome {
                    Ok(value) => {
                        let value = Arc::new(value);
                        *self.state.lock().expect("load cell lock poisoned") =
                            CellState::Ready(Arc::clone(&value));
                        guard.armed = false;
                        let _ = tx.send(Some(Ok(())));
                        Ok((true, value))
                    }
                    Err(msg) => {
                        *self.state.lock().expect("load cell lock poisoned") = CellState::Empty;
                        guard.armed = false;
                        let _ = tx.send(Some(Err(msg.clone())));
                        Err(EngineError::ProviderLoadFailed(msg))
                    }
                }
            }
        }
    }
}

struct ResetGuard<'a, T> {
    state: &'a Mutex<CellState<T>>,
    armed: bool,
}

impl<T> Drop for ResetGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            if let Ok(mut state) = self.state.lock() {
                *state = CellState::Empty;
            }
        }
    }
}
