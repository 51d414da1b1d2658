use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SemaConfig {
    pub logging: LoggingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default number of results returned by `sema query`.
    pub top_k: usize,
    /// Number of documents concatenated into LLM context by `sema ask`.
    pub context_top_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for SemaConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_sema_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            context_top_k: 2,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
        }
    }
}

/// Returns `~/.sema/`
pub fn default_sema_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".sema")
}

/// Returns the default config file path: `~/.sema/config.toml`
pub fn default_config_path() -> PathBuf {
    default_sema_dir().join("config.toml")
}

impl SemaConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    ///
    /// A missing file is not an error — defaults apply. No logging here:
    /// config is loaded before the tracing subscriber exists, so the
    /// binary reports the defaults case itself after initializing it.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            SemaConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (SEMA_LOG_LEVEL, SEMA_MODEL_DIR, SEMA_LLM_BASE_URL, SEMA_LLM_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SEMA_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("SEMA_MODEL_DIR") {
            self.embedding.cache_dir = val;
        }
        if let Ok(val) = std::env::var("SEMA_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("SEMA_LLM_API_KEY") {
            self.llm.api_key = Some(val);
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
