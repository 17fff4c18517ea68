//! # ragkit
//!
//! A retrieval-augmented generation core: document chunking, embedding,
//! exact vector search, and context-budgeted prompt assembly, plus the
//! offline ingestion pipeline that builds and persists the index.
//!
//! ## Architecture
//!
//! ```text
//! ingestion (offline):
//!   knowledge/*.json ──▶ Chunker ──▶ Embedder ──▶ VectorIndex ──▶ disk
//!
//! serving:
//!   question ──▶ Retriever (Embedder + VectorIndex) ──▶ ranked chunks
//!            ──▶ PromptBuilder ──▶ prompt + sources ──▶ (external LLM)
//! ```
//!
//! The HTTP serving layer and the completion call itself are external
//! collaborators: this crate hands the boundary a prompt string and an
//! attribution list and takes no position on what happens next.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping fixed-size text chunking |
//! | [`embedding`] | Embedding provider abstraction (openai, ollama, hash) |
//! | [`index`] | Exact cosine top-k vector index with save/load |
//! | [`retrieve`] | Query-time retrieval |
//! | [`prompt`] | Budgeted prompt assembly with source attribution |
//! | [`ingest`] | Offline ingestion pipeline |
//! | [`error`] | Typed error taxonomy |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod retrieve;
