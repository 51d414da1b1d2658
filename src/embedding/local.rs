//! Local ONNX Runtime embedding provider.
//!
//! Implements [`EmbeddingProvider`] using the all-MiniLM-L6-v2 model via
//! `ort`. Handles tokenization, inference, mean pooling, and L2
//! normalization. The model is loaded lazily on [`EmbeddingProvider::initialize`];
//! concurrent initializers coalesce onto a single load through a [`LoadCell`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{
    EmbeddingProvider, LoadCell, Progress, ProgressSink, ProgressStatus, EMBEDDING_DIM,
};
use crate::config::EmbeddingConfig;
use crate::error::{EngineError, Result};

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

/// Local ONNX-based embedding provider using all-MiniLM-L6-v2.
///
/// State machine: uninitialized → loading → ready. A load failure returns
/// the provider to uninitialized; `embed` before ready fails with
/// [`EngineError::NotInitialized`].
pub struct LocalEmbeddingProvider {
    cache_dir: PathBuf,
    engine: LoadCell<Engine>,
}

/// Loaded inference state: ONNX session plus tokenizer.
struct Engine {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex.
// The Mutex guarantees exclusive access during run().
unsafe impl Send for Engine {}
unsafe impl Sync for Engine {}

impl LocalEmbeddingProvider {
    /// Create an uninitialized provider. No files are touched until
    /// `initialize` is called.
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            cache_dir: crate::config::expand_tilde(&config.cache_dir),
            engine: LoadCell::new(),
        }
    }

    fn engine(&self) -> Result<Arc<Engine>> {
        self.engine.get().ok_or(EngineError::NotInitialized)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn initialize(&self, progress: Option<&ProgressSink>) -> Result<()> {
        let cache_dir = self.cache_dir.clone();
        let (ran_load, _engine) = self
            .engine
            .get_or_try_init(|| async move {
                if let Some(sink) = progress {
                    sink(Progress {
                        status: ProgressStatus::Loading,
                        percent: 0,
                        message: "Loading embedding model".into(),
                    });
                }
                tokio::task::spawn_blocking(move || Engine::load(&cache_dir))
                    .await
                    .map_err(|e| format!("model load task failed: {e}"))?
                    .map_err(|e| format!("{e:#}"))
            })
            .await?;

        if ran_load {
            if let Some(sink) = progress {
                sink(Progress {
                    status: ProgressStatus::Ready,
                    percent: 100,
                    message: "Embedding model ready".into(),
                });
            }
        }
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_batch(&[text]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Inference("batch of one produced no output".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let engine = self.engine()?;
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        tokio::task::spawn_blocking(move || engine.embed_batch(&texts))
            .await
            .map_err(|e| EngineError::Inference(format!("embedding task failed: {e}")))?
    }
}

impl Engine {
    /// Load the ONNX session and tokenizer from the model cache directory.
    fn load(cache_dir: &PathBuf) -> AnyResult<Self> {
        let model_path = cache_dir.join("model.onnx");
        let tokenizer_path = cache_dir.join("tokenizer.json");

        anyhow::ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Place all-MiniLM-L6-v2 model files in the cache directory.",
            model_path.display()
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "Tokenizer not found at {}. Place all-MiniLM-L6-v2 model files in the cache directory.",
            tokenizer_path.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(tokenizer = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Step 1: Tokenize
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EngineError::Inference(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        // Step 2: Build flat input tensors as i64
        let mut input_ids_flat = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask_flat = Vec::with_capacity(batch_size * seq_len);

        for encoding in &encodings {
            for &id in encoding.get_ids() {
                input_ids_flat.push(id as i64);
            }
            for &mask in encoding.get_attention_mask() {
                attention_mask_flat.push(mask as i64);
            }
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_tensor =
            Tensor::from_array((shape.clone(), input_ids_flat.into_boxed_slice()))
                .map_err(inference_err)?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask_flat.clone().into_boxed_slice()))
                .map_err(inference_err)?;
        // token_type_ids: all zeros (single sentence, no segment B)
        let token_type_ids = vec![0i64; batch_size * seq_len];
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
                .map_err(inference_err)?;

        // Step 3: Run ONNX inference
        let mut session = self
            .session
            .lock()
            .map_err(|e| EngineError::Inference(format!("session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            })
            .map_err(inference_err)?;

        // Step 4: Extract token embeddings — shape [batch, seq_len, 384]
        // The output name varies by ONNX export. Try common names, fall back to index 0.
        let token_emb_value = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (shape, data) = token_emb_value
            .try_extract_tensor::<f32>()
            .map_err(|e| EngineError::Inference(format!("failed to extract embeddings: {e}")))?;

        let dims: &[i64] = &shape;
        if dims.len() != 3 || dims[2] != EMBEDDING_DIM as i64 {
            return Err(EngineError::Inference(format!(
                "unexpected token_embeddings shape: {dims:?}, expected [batch, seq, {EMBEDDING_DIM}]"
            )));
        }
        let hidden_dim = dims[2] as usize;
        let actual_seq_len = dims[1] as usize;

        // Step 5: Mean pooling with attention mask
        let mut results = Vec::with_capacity(batch_size);
        for b in 0..batch_size {
            let mut sum = vec![0.0f32; hidden_dim];
            let mut count = 0.0f32;

            for s in 0..actual_seq_len {
                let mask = attention_mask_flat[b * seq_len + s] as f32;
                if mask > 0.0 {
                    let offset = (b * actual_seq_len + s) * hidden_dim;
                    for d in 0..hidden_dim {
                        sum[d] += data[offset + d] * mask;
                    }
                    count += mask;
                }
            }

            if count > 0.0 {
                for d in 0..hidden_dim {
                    sum[d] /= count;
                }
            }

            // Step 6: L2 normalize
            results.push(l2_normalize(&sum));
        }

        Ok(results)
    }
}

fn inference_err(e: ort::Error) -> EngineError {
    EngineError::Inference(e.to_string())
}

/// L2-normalize a vector. Returns a zero vector if the input norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
