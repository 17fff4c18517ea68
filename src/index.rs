//! In-memory vector index with exact cosine top-k search and durable
//! save/load.
//!
//! The index owns parallel chunk metadata and vector state. Vectors are
//! L2-normalized once at build time (and queries once per search), so
//! cosine similarity reduces to a dot product during the scan instead of
//! being recomputed per comparison.
//!
//! Search is a brute-force exact scan over all stored vectors, which is
//! fine for a knowledge base of hundreds to low thousands of chunks. The
//! contract (top-k ordered by descending similarity, ties broken by
//! insertion order) holds regardless of the underlying strategy, so an
//! approximate structure could be dropped in later.
//!
//! # Persisted layout
//!
//! Two paired artifacts in one directory:
//! - `vectors.bin` — the N×D matrix as raw little-endian f32 bytes.
//! - `chunks.jsonl` — a header line `{"dimension": D, "total_chunks": N}`
//!   followed by one chunk record per line.
//!
//! The two artifacts must stay paired: both are staged into a `.tmp`
//! sibling directory which is then renamed over the old index in one
//! step, so a failed ingestion run never leaves a half-written index or
//! a new matrix paired with stale metadata.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Chunk, ScoredChunk};

const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.jsonl";

/// First line of `chunks.jsonl`.
#[derive(Debug, Serialize, Deserialize)]
struct IndexHeader {
    dimension: usize,
    total_chunks: usize,
}

/// Immutable store of `(Chunk, vector)` pairs supporting exact
/// nearest-neighbor search. Built once by ingestion, loaded read-only at
/// serving time, shared across requests via `Arc` without locking.
#[derive(Debug)]
pub struct VectorIndex {
    dims: usize,
    /// Flattened N×dims matrix, row-major, L2-normalized.
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Construct an index from parallel chunk and vector sequences.
    ///
    /// All vectors must share one dimension; it becomes the index
    /// dimension. Empty input builds an empty index (dimension 0).
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::InvalidArgument(format!(
                "chunks ({}) and vectors ({}) count mismatch",
                chunks.len(),
                vectors.len()
            )));
        }

        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        if dims == 0 && !chunks.is_empty() {
            return Err(Error::InvalidArgument(
                "vector dimension must be > 0 for a non-empty index".into(),
            ));
        }
        let mut flat = Vec::with_capacity(chunks.len() * dims);

        for vector in &vectors {
            if vector.len() != dims {
                return Err(Error::DimensionMismatch {
                    expected: dims,
                    actual: vector.len(),
                });
            }
            let mut row = vector.clone();
            normalize_l2(&mut row);
            flat.extend_from_slice(&row);
        }

        debug!(chunks = chunks.len(), dims, "built vector index");

        Ok(Self {
            dims,
            vectors: flat,
            chunks,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Exact top-k search by cosine similarity.
    ///
    /// Results are ordered by descending similarity, ties broken by
    /// insertion order. `k` beyond the index size returns every stored
    /// chunk; `k < 1` is an error. An empty index returns no results for
    /// any query.
    pub fn search(&self, query: &[f32], k: i64) -> Result<Vec<ScoredChunk>> {
        if k < 1 {
            return Err(Error::InvalidArgument(format!("k must be >= 1, got {k}")));
        }

        if self.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let mut normalized = query.to_vec();
        normalize_l2(&mut normalized);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(i, row)| (i, dot(row, &normalized)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k as usize);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (i, score))| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score,
                rank,
            })
            .collect())
    }

    /// Persist the index into `dir` (created if missing).
    ///
    /// Both artifacts are written into a `.tmp` sibling directory first,
    /// then the staged directory replaces `dir` in one rename. The matrix
    /// and metadata always land together: a crash mid-save leaves either
    /// the previous index or none, never a mixed pair.
    pub fn save(&self, dir: &Path) -> Result<()> {
        if let Some(parent) = dir.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let staging = sibling(dir, ".tmp");
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        std::fs::write(staging.join(VECTORS_FILE), vec_to_blob(&self.vectors))?;

        let header = IndexHeader {
            dimension: self.dims,
            total_chunks: self.chunks.len(),
        };
        let mut lines = String::new();
        lines.push_str(&serde_json::to_string(&header).map_err(io_invalid)?);
        lines.push('\n');
        for chunk in &self.chunks {
            lines.push_str(&serde_json::to_string(chunk).map_err(io_invalid)?);
            lines.push('\n');
        }
        std::fs::write(staging.join(CHUNKS_FILE), lines)?;

        // Swap the staged directory into place. rename() cannot replace a
        // non-empty directory, so the old index is moved aside first; a
        // crash in the window between the two renames leaves no index,
        // which `load` reports as `IndexNotFound` rather than serving a
        // stale matrix/metadata pair.
        let retired = sibling(dir, ".old");
        if retired.exists() {
            std::fs::remove_dir_all(&retired)?;
        }
        if dir.exists() {
            std::fs::rename(dir, &retired)?;
        }
        std::fs::rename(&staging, dir)?;
        if retired.exists() {
            std::fs::remove_dir_all(&retired)?;
        }

        info!(
            chunks = self.chunks.len(),
            dims = self.dims,
            dir = %dir.display(),
            "index saved"
        );
        Ok(())
    }

    /// Load a previously saved index from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        if !vectors_path.exists() || !chunks_path.exists() {
            return Err(Error::IndexNotFound {
                path: dir.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(&chunks_path)?;
        let mut lines = content.lines();

        let header_line = lines.next().ok_or_else(|| Error::IndexCorrupt {
            reason: "empty chunks file".into(),
        })?;
        let header: IndexHeader =
            serde_json::from_str(header_line).map_err(|e| Error::IndexCorrupt {
                reason: format!("bad header line: {e}"),
            })?;

        let mut chunks = Vec::with_capacity(header.total_chunks);
        for line in lines.filter(|l| !l.trim().is_empty()) {
            let chunk: Chunk = serde_json::from_str(line).map_err(|e| Error::IndexCorrupt {
                reason: format!("bad chunk record: {e}"),
            })?;
            chunks.push(chunk);
        }

        if header.dimension == 0 && header.total_chunks > 0 {
            return Err(Error::IndexCorrupt {
                reason: format!(
                    "header says dimension 0 with {} chunks",
                    header.total_chunks
                ),
            });
        }

        if chunks.len() != header.total_chunks {
            return Err(Error::IndexCorrupt {
                reason: format!(
                    "header says {} chunks, file has {}",
                    header.total_chunks,
                    chunks.len()
                ),
            });
        }

        let blob = std::fs::read(&vectors_path)?;
        if blob.len() % 4 != 0 {
            return Err(Error::IndexCorrupt {
                reason: format!("vector file size {} is not a multiple of 4", blob.len()),
            });
        }
        let vectors = blob_to_vec(&blob);

        if vectors.len() != header.dimension * chunks.len() {
            return Err(Error::IndexCorrupt {
                reason: format!(
                    "vector count {} does not match {} chunks x {} dims",
                    vectors.len(),
                    chunks.len(),
                    header.dimension
                ),
            });
        }

        info!(
            chunks = chunks.len(),
            dims = header.dimension,
            dir = %dir.display(),
            "index loaded"
        );

        Ok(Self {
            dims: header.dimension,
            vectors,
            chunks,
        })
    }
}

/// Path next to `dir` with `suffix` appended to its final component.
fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(suffix);
    dir.with_file_name(name)
}

fn io_invalid(e: serde_json::Error) -> Error {
    Error::Io {
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    }
}

/// Scale a vector to unit length in place. Zero vectors are left as-is.
pub fn normalize_l2(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Encode a float slice as little-endian f32 bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
