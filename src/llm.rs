//! Language-model collaborator.
//!
//! The retrieval core only hands the model a context string; everything
//! here is the narrow contract the surrounding application talks through:
//! [`LanguageModel`] (generate, optionally streamed), [`GenerationParams`],
//! and the grounded-answer prompt builder. One implementation ships:
//! [`OpenAiCompatClient`] for any chat-completions-compatible endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{EngineError, Result};

/// Sampling parameters for a generation call.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
            top_p: 0.95,
        }
    }
}

/// Callback receiving each incremental text chunk of a streamed generation.
pub type ChunkSink = dyn Fn(&str) + Send + Sync;

/// A text-generation backend: prompt in, generated text out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a complete response for `prompt`.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Generate a response, invoking `on_chunk` for each incremental piece
    /// of text. Returns the full response. The default implementation
    /// falls back to a single non-streamed call and one chunk.
    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
        on_chunk: &ChunkSink,
    ) -> Result<String> {
        let full = self.generate(prompt, params).await?;
        on_chunk(&full);
        Ok(full)
    }
}

/// Build the prompt for a grounded answer from retrieved context.
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question using only the provided context.\n\n\
         CONTEXT FROM KNOWLEDGE BASE:\n{context}\n\n\
         QUESTION: {question}\n\n\
         Answer concisely based on the context above. If the context does \
         not contain the answer, say so."
    )
}

// ── OpenAI-compatible HTTP client ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct ChatStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Build a client from config. The API key comes from the config file
    /// or the `SEMA_LLM_API_KEY` environment override.
    pub fn from_config(config: &LlmConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no LLM API key configured — set [llm].api_key or SEMA_LLM_API_KEY"))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn request(&self, prompt: &str, params: &GenerationParams, stream: bool) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature: params.temperature,
                max_tokens: params.max_tokens,
                top_p: params.top_p,
                stream,
            })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        Err(EngineError::Llm(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let response = self
            .request(prompt, params, false)
            .send()
            .await
            .map_err(|e| EngineError::Llm(format!("request failed: {e}")))?;
        let response = Self::check_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Llm(format!("failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::Llm("response contained no choices".into()))
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
        on_chunk: &ChunkSink,
    ) -> Result<String> {
        let response = self
            .request(prompt, params, true)
            .send()
            .await
            .map_err(|e| EngineError::Llm(format!("request failed: {e}")))?;
        let mut response = Self::check_status(response).await?;

        // Server-sent events: `data: {json}` lines, terminated by `data: [DONE]`.
        let mut full = String::new();
        let mut buffer = String::new();
        while let Some(bytes) = response
            .chunk()
            .await
            .map_err(|e| EngineError::Llm(format!("stream error: {e}")))?
        {
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    return Ok(full);
                }
                let chunk: ChatStreamChunk = serde_json::from_str(data)
                    .map_err(|e| EngineError::Llm(format!("malformed stream chunk: {e}")))?;
                if let Some(content) = chunk
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.as_deref())
                {
                    full.push_str(content);
                    on_chunk(content);
                }
            }
        }

        Ok(full)
    }
}
