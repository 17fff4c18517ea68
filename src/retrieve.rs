//! Query-time retrieval: embed the question, search the index.
//!
//! The [`Retriever`] holds the loaded, immutable [`VectorIndex`] behind an
//! `Arc` so one instance can serve concurrent requests without locking.
//! The index is injected at construction (startup phase) rather than
//! reached through ambient global state, which keeps fixture indices easy
//! to test against.

use std::sync::Arc;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::embedding::embed_query;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::models::ScoredChunk;

pub struct Retriever {
    index: Arc<VectorIndex>,
    embedding: EmbeddingConfig,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedding: EmbeddingConfig) -> Self {
        Self { index, embedding }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve the `top_k` most relevant chunks for a question.
    ///
    /// Makes exactly one embedding call, then one index search; results
    /// come back unmodified in rank order. An empty index yields an empty
    /// result (callers handle "no context available" downstream), without
    /// spending an embedding call. Embedding failures propagate typed;
    /// retry policy lives in the embedder, not here.
    pub async fn retrieve(&self, question: &str, top_k: i64) -> Result<Vec<ScoredChunk>> {
        if question.trim().is_empty() {
            return Err(Error::InvalidArgument("question cannot be empty".into()));
        }
        if top_k < 1 {
            return Err(Error::InvalidArgument(format!(
                "top_k must be >= 1, got {top_k}"
            )));
        }

        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = embed_query(&self.embedding, question).await?;
        let results = self.index.search(&query_vector, top_k)?;

        debug!(
            question_chars = question.len(),
            results = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved chunks"
        );

        Ok(results)
    }
}
