#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sema::embedding::{
    EmbeddingProvider, LoadCell, Progress, ProgressSink, ProgressStatus,
};
use sema::error::{EngineError, Result};
use sema::store::Document;

/// Dimensionality of all test embeddings.
pub const TEST_DIM: usize = 8;

pub fn doc(id: &str, content: &str) -> Document {
    Document::new(id, content)
}

/// Deterministic pseudo-embedding for arbitrary text: hash-seeded values,
/// L2-normalized. Same text always maps to the same unit vector.
pub fn hashed_vector(text: &str) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let mut state = hasher.finish() | 1;

    let mut v = Vec::with_capacity(TEST_DIM);
    for _ in 0..TEST_DIM {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        v.push((state >> 40) as f32 / (1u64 << 24) as f32 - 0.5);
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.into_iter().map(|x| x / norm).collect()
}

/// Pad a short vector with zeros up to [`TEST_DIM`], so tests can write
/// axis-aligned fixtures like `&[1.0, 0.0]` without spelling out all dims.
pub fn padded(prefix: &[f32]) -> Vec<f32> {
    let mut v = prefix.to_vec();
    assert!(v.len() <= TEST_DIM);
    v.resize(TEST_DIM, 0.0);
    v
}

/// Deterministic embedding provider for tests.
///
/// Texts registered via [`StaticProvider::with`] embed to exactly the given
/// vector; everything else falls back to [`hashed_vector`]. Starts ready
/// unless built with [`StaticProvider::uninitialized`].
pub struct StaticProvider {
    vectors: HashMap<String, Vec<f32>>,
    initialized: AtomicBool,
}

impl StaticProvider {
    pub fn ready() -> Self {
        Self {
            vectors: HashMap::new(),
            initialized: AtomicBool::new(true),
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            vectors: HashMap::new(),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with(mut self, text: &str, vector: &[f32]) -> Self {
        self.vectors.insert(text.to_string(), padded(vector));
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StaticProvider {
    async fn initialize(&self, progress: Option<&ProgressSink>) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        if let Some(sink) = progress {
            sink(Progress {
                status: ProgressStatus::Ready,
                percent: 100,
                message: "static provider ready".into(),
            });
        }
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(EngineError::NotInitialized);
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| hashed_vector(text)))
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }
}

/// Provider whose embed calls start failing after a fixed number of
/// successes — exercises partial-ingestion behavior.
pub struct FlakyProvider {
    succeed_first: usize,
    calls: AtomicUsize,
}

impl FlakyProvider {
    pub fn failing_after(succeed_first: usize) -> Self {
        Self {
            succeed_first,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyProvider {
    async fn initialize(&self, _progress: Option<&ProgressSink>) -> Result<()> {
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.succeed_first {
            return Err(EngineError::Inference("synthetic embed failure".into()));
        }
        Ok(hashed_vector(text))
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }
}

/// Provider with a slow, observable load phase built on [`LoadCell`] —
/// the same single-flight machinery the local ONNX provider uses.
pub struct GatedProvider {
    cell: LoadCell<()>,
    loads: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl GatedProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            cell: LoadCell::new(),
            loads: AtomicUsize::new(0),
            delay,
            fail: false,
        }
    }

    pub fn failing(delay: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(delay)
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for GatedProvider {
    async fn initialize(&self, progress: Option<&ProgressSink>) -> Result<()> {
        let (ran_load, _) = self
            .cell
            .get_or_try_init(|| async {
                if let Some(sink) = progress {
                    sink(Progress {
                        status: ProgressStatus::Loading,
                        percent: 0,
                        message: "loading test model".into(),
                    });
                }
                self.loads.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                if self.fail {
                    Err("gated load failed".to_string())
                } else {
                    Ok(())
                }
            })
            .await?;

        if ran_load {
            if let Some(sink) = progress {
                sink(Progress {
                    status: ProgressStatus::Ready,
                    percent: 100,
                    message: "test model ready".into(),
                });
            }
        }
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.cell.get().ok_or(EngineError::NotInitialized)?;
        Ok(hashed_vector(text))
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }
}
