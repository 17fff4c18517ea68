//! Core data models for the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// A normalized source document, immutable after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    /// Origin identifier, e.g. the knowledge filename.
    pub source: String,
}

/// A document as authored in a knowledge file. `id` is optional; when
/// absent it is derived deterministically from `source` and position so
/// re-ingestion of unchanged inputs is stable.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInput {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub text: String,
    pub source: String,
}

/// A knowledge file may contain one document object or an array of them.
/// Normalized at the ingestion boundary so the rest of the pipeline never
/// branches on shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentSource {
    One(DocumentInput),
    Many(Vec<DocumentInput>),
}

impl DocumentSource {
    pub fn into_inputs(self) -> Vec<DocumentInput> {
        match self {
            Self::One(doc) => vec![doc],
            Self::Many(docs) => docs,
        }
    }
}

/// A bounded contiguous segment of a document's text, the unit of retrieval.
///
/// `title` and `source` are denormalized from the parent [`Document`] so
/// attribution never needs a lookup at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id: `"{document_id}:{position}"`.
    pub id: String,
    pub document_id: String,
    /// Ordinal within the parent document.
    pub position: usize,
    pub text: String,
    pub title: String,
    pub source: String,
}

/// A chunk plus its similarity score and rank, produced per query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity, higher is more relevant.
    pub score: f32,
    /// Zero-based rank within the result list.
    pub rank: usize,
}

/// Speaker role for a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of caller-supplied conversation history. Read-only input to
/// prompt assembly, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// A distinct `(title, source)` attribution pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub title: String,
    pub source: String,
}
