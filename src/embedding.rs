//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete backends:
//! - **`openai`** — an OpenAI-compatible `POST /v1/embeddings` API, with
//!   batching, retry, and backoff. Requires `OPENAI_API_KEY`.
//! - **`ollama`** — a local Ollama instance's `/api/embed` endpoint.
//! - **`hash`** — deterministic offline feature-hashing bag of words; no
//!   network, stable across runs. Used for tests and network-free setups.
//!
//! The actual embedding computation is performed by [`embed_texts`],
//! which dispatches on the config's `provider` field and returns one
//! vector per input text, in input order.
//!
//! # Retry strategy
//!
//! HTTP providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately, permanent
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Exhausted retries surface as `Error::EmbeddingService { transient:
//! true }`; permanent failures carry `transient: false`, so call sites
//! serving live traffic can tell an outage from a misconfiguration.

use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::warn;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Trait for embedding providers.
///
/// Carries the metadata the index builder needs (model identity and
/// vector dimensionality). The embedding computation itself is a free
/// async function ([`embed_texts`]) dispatched on the configuration.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
}

/// Create the appropriate [`EmbeddingProvider`] for the configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => Ok(Box::new(HashProvider::new(config))),
        "openai" => Ok(Box::new(OpenAiProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        other => Err(Error::Configuration(format!(
            "Unknown embedding provider: {other}"
        ))),
    }
}

/// Embed a batch of texts using the configured provider.
///
/// One vector per input text, same order. Callers batch at most
/// `config.batch_size` texts per call during ingestion.
pub async fn embed_texts(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    match config.provider.as_str() {
        "hash" => Ok(embed_hash(config, texts)),
        "openai" => embed_openai(config, texts).await,
        "ollama" => embed_ollama(config, texts).await,
        other => Err(Error::Configuration(format!(
            "Unknown embedding provider: {other}"
        ))),
    }
}

/// Embed a single query text.
///
/// Convenience wrapper around [`embed_texts`] for the retrieval path.
pub async fn embed_query(config: &EmbeddingConfig, text: &str) -> Result<Vec<f32>> {
    let results = embed_texts(config, &[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| Error::embedding_permanent("Empty embedding response"))
}

// ============ Hash Provider ============

/// Deterministic feature-hashing embedder.
///
/// Lowercase alphanumeric tokens are bucketed into `dims` slots via
/// SHA-256, producing a bag-of-words count vector. Crude but stable
/// across runs and builds, which is what the offline tests need.
pub struct HashProvider {
    dims: usize,
}

pub const HASH_DEFAULT_DIMS: usize = 256;

impl HashProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            dims: config.dims.unwrap_or(HASH_DEFAULT_DIMS),
        }
    }
}

impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        "hash-bow"
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

fn embed_hash(config: &EmbeddingConfig, texts: &[String]) -> Vec<Vec<f32>> {
    let dims = config.dims.unwrap_or(HASH_DEFAULT_DIMS);
    texts.iter().map(|t| hash_text(t, dims)).collect()
}

fn hash_text(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let d = Sha256::digest(token.as_bytes());
        let bucket =
            u64::from_le_bytes([d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]]) as usize % dims;
        vector[bucket] += 1.0;
    }
    vector
}

// ============ OpenAI-compatible Provider ============

/// Embedding provider for an OpenAI-compatible embeddings API.
///
/// Calls `POST {url}/v1/embeddings` with the configured model. The base
/// URL defaults to `https://api.openai.com` and may be overridden via
/// `embedding.url` for compatible gateways. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAiProvider {
    model: String,
    dims: usize,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::Configuration("embedding.model required for openai".into()))?;
        let dims = config
            .dims
            .ok_or_else(|| Error::Configuration("embedding.dims required for openai".into()))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(Error::Configuration(
                "OPENAI_API_KEY environment variable not set".into(),
            ));
        }

        Ok(Self { model, dims })
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

async fn embed_openai(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| Error::Configuration("OPENAI_API_KEY not set".into()))?;

    let model = config
        .model
        .as_ref()
        .ok_or_else(|| Error::Configuration("embedding.model required".into()))?;

    let base_url = config.url.as_deref().unwrap_or("https://api.openai.com");

    let client = build_client(config)?;
    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            warn!(attempt, delay_secs = delay.as_secs(), "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{base_url}/v1/embeddings"))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await.map_err(|e| {
                        Error::embedding_permanent(format!("Invalid embeddings response: {e}"))
                    })?;
                    return parse_openai_response(&json);
                }

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(Error::embedding_transient(format!(
                        "Embeddings API error {status}: {body_text}"
                    )));
                    continue;
                }

                // Other client error (auth, bad request): permanent
                let body_text = response.text().await.unwrap_or_default();
                return Err(Error::embedding_permanent(format!(
                    "Embeddings API error {status}: {body_text}"
                )));
            }
            Err(e) => {
                last_err = Some(Error::embedding_transient(format!("Network error: {e}")));
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| Error::embedding_transient("Embedding failed after retries")))
}

fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::embedding_permanent("Invalid response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| Error::embedding_permanent("Invalid response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). Requires an embedding model to be pulled,
/// e.g. `ollama pull nomic-embed-text`.
pub struct OllamaProvider {
    model: String,
    dims: usize,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::Configuration("embedding.model required for ollama".into()))?;
        let dims = config
            .dims
            .ok_or_else(|| Error::Configuration("embedding.dims required for ollama".into()))?;
        Ok(Self { model, dims })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

async fn embed_ollama(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| Error::Configuration("embedding.model required".into()))?;

    let url = config.url.as_deref().unwrap_or("http://localhost:11434");

    let client = build_client(config)?;
    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            warn!(attempt, delay_secs = delay.as_secs(), "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{url}/api/embed"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await.map_err(|e| {
                        Error::embedding_permanent(format!("Invalid Ollama response: {e}"))
                    })?;
                    return parse_ollama_response(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(Error::embedding_transient(format!(
                        "Ollama API error {status}: {body_text}"
                    )));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                return Err(Error::embedding_permanent(format!(
                    "Ollama API error {status}: {body_text}"
                )));
            }
            Err(e) => {
                last_err = Some(Error::embedding_transient(format!(
                    "Ollama connection error (is Ollama running at {url}?): {e}"
                )));
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| Error::embedding_transient("Ollama embedding failed after retries")))
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::embedding_permanent("Invalid Ollama response: missing embeddings"))?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| {
                Error::embedding_permanent("Invalid Ollama response: embedding is not an array")
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

fn build_client(config: &EmbeddingConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::embedding_permanent(format!("Failed to build HTTP client: {e}")))
}
