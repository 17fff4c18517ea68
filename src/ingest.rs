//! Ingestion pipeline orchestration.
//!
//! Coordinates the full offline build: knowledge-file discovery →
//! one-or-many shape normalization → chunking → batched embedding →
//! index build → atomic persist. Ingestion is all-or-nothing: the first
//! unrecoverable error (malformed document, embedding failure, dimension
//! mismatch) aborts the run, and because both index artifacts are staged
//! into a temp directory and swapped in whole, a partially built index is
//! never persisted over a previously good one.
//!
//! Ingestion runs as a separate offline pass and must not race a serving
//! process against the same storage location; the directory swap is the
//! replacement protocol.

use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::chunk::split_document;
use crate::config::Config;
use crate::embedding::{create_provider, embed_texts};
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::models::{Document, DocumentSource};

/// Counters reported after a run.
#[derive(Debug, Clone, Copy)]
pub struct IngestStats {
    pub files: usize,
    pub documents: usize,
    pub chunks: usize,
    pub dims: usize,
}

/// Run the ingestion pipeline described by `config`.
///
/// With `dry_run`, documents are discovered and chunked but nothing is
/// embedded or persisted; the stats report what a real run would do.
pub async fn run_ingest(config: &Config, dry_run: bool) -> Result<IngestStats> {
    let (files, documents) = scan_knowledge(&config.knowledge.root)?;

    let chunks: Vec<_> = documents
        .iter()
        .flat_map(|doc| split_document(doc, &config.chunking))
        .collect();

    info!(
        files,
        documents = documents.len(),
        chunks = chunks.len(),
        "knowledge scanned"
    );

    let provider = create_provider(&config.embedding)?;

    if dry_run {
        return Ok(IngestStats {
            files,
            documents: documents.len(),
            chunks: chunks.len(),
            // Predict the persisted dimension: 0 when there is nothing
            // to embed, same as a real run.
            dims: if chunks.is_empty() { 0 } else { provider.dims() },
        });
    }

    // Batch-embed chunk texts, respecting the provider's per-call limit.
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for batch in texts.chunks(config.embedding.batch_size.max(1)) {
        let embedded = embed_texts(&config.embedding, batch).await?;
        for vector in &embedded {
            if vector.len() != provider.dims() {
                return Err(Error::DimensionMismatch {
                    expected: provider.dims(),
                    actual: vector.len(),
                });
            }
        }
        debug!(batch = embedded.len(), total = vectors.len(), "embedded batch");
        vectors.extend(embedded);
    }

    let index = VectorIndex::build(chunks, vectors)?;
    // Report what was actually persisted; an empty index has dimension 0
    // no matter what the provider would have produced.
    let stats = IngestStats {
        files,
        documents: documents.len(),
        chunks: index.len(),
        dims: index.dims(),
    };
    index.save(&config.index.dir)?;

    Ok(stats)
}

/// Discover and normalize knowledge files under `root`.
///
/// Scans recursively for `*.json`, sorted by path so ingestion order is
/// deterministic. Each file holds one document object or an array of
/// them; a document without an `id` gets `"{source}:{ordinal}"` so
/// re-ingestion of unchanged inputs is stable.
fn scan_knowledge(root: &Path) -> Result<(usize, Vec<Document>)> {
    if !root.exists() {
        return Err(Error::Configuration(format!(
            "knowledge root does not exist: {}",
            root.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| Error::Configuration(format!("scan failed: {e}")))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in &paths {
        let content = std::fs::read_to_string(path)?;
        let parsed: DocumentSource =
            serde_json::from_str(&content).map_err(|e| {
                Error::InvalidArgument(format!(
                    "malformed document file {}: {e}",
                    path.display()
                ))
            })?;

        for (ordinal, input) in parsed.into_inputs().into_iter().enumerate() {
            let id = input
                .id
                .unwrap_or_else(|| format!("{}:{}", input.source, ordinal));
            documents.push(Document {
                id,
                title: input.title,
                text: input.text,
                source: input.source,
            });
        }
    }

    Ok((paths.len(), documents))
}
