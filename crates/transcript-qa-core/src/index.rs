//! In-memory embedding index over retrieval units.
//!
//! [`EmbeddingIndex::build`] splits every unit into sub-chunks, embeds them
//! in batches and stores the vectors exactly once. After that the index is
//! read-only: [`EmbeddingIndex::search`] ranks all stored chunks by cosine
//! similarity to the query embedding.
//!
//! # Ranking
//!
//! 1. Embed the query once.
//! 2. Score every stored chunk with [`cosine_similarity`].
//! 3. Stable sort by score, descending; ties keep insertion order.
//! 4. Skip chunks whose content was already returned at a better rank.
//! 5. Truncate to `k`.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::chunk::{split_text, SplitterConfig};
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::QaError;
use crate::models::{RetrievalUnit, ScoredChunk, UnitMetadata};

/// Build and query settings for the index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub splitter: SplitterConfig,
    /// Number of texts sent per embedding call.
    pub batch_size: usize,
    /// Upper bound on each embedding call.
    pub timeout: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            batch_size: 64,
            timeout: Duration::from_secs(30),
        }
    }
}

struct IndexedChunk {
    content: String,
    metadata: UnitMetadata,
    embedding: Vec<f32>,
}

/// Embedding vectors for every sub-chunk of the transcript's retrieval units.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    config: IndexConfig,
    entries: OnceLock<Vec<IndexedChunk>>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>, config: IndexConfig) -> Self {
        Self {
            embedder,
            config,
            entries: OnceLock::new(),
        }
    }

    pub fn is_built(&self) -> bool {
        self.entries.get().is_some()
    }

    /// Number of stored sub-chunks (zero before build).
    pub fn len(&self) -> usize {
        self.entries.get().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split, embed and store `units`. Returns the number of stored chunks.
    ///
    /// # Errors
    ///
    /// - [`QaError::AlreadyBuilt`] if the index was built before.
    /// - [`QaError::EmbeddingFailed`] if an embedding call fails, times out,
    ///   or returns vectors of inconsistent count or dimension, or of a
    ///   dimension other than a non-zero [`Embedder::dims`].
    pub async fn build(&self, units: &[RetrievalUnit]) -> Result<usize, QaError> {
        if self.is_built() {
            return Err(QaError::AlreadyBuilt);
        }

        let mut pending: Vec<(String, &UnitMetadata)> = Vec::new();
        for unit in units {
            for piece in split_text(&unit.content, &self.config.splitter) {
                pending.push((piece, &unit.metadata));
            }
        }

        let texts: Vec<String> = pending.iter().map(|(text, _)| text.clone()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let embedded = self.embed_with_timeout(batch).await?;
            if embedded.len() != batch.len() {
                return Err(QaError::EmbeddingFailed(format!(
                    "provider returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }

        if let Some(first) = vectors.first() {
            let dims = first.len();
            let declared = self.embedder.dims();
            if declared > 0 && dims != declared {
                return Err(QaError::EmbeddingFailed(format!(
                    "model {} returned {}-dimensional vectors, configured dims is {}",
                    self.embedder.model_name(),
                    dims,
                    declared
                )));
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
                return Err(QaError::EmbeddingFailed(format!(
                    "inconsistent vector dimensions: expected {}, got {}",
                    dims,
                    bad.len()
                )));
            }
        }

        let entries: Vec<IndexedChunk> = pending
            .into_iter()
            .zip(vectors)
            .map(|((content, metadata), embedding)| IndexedChunk {
                content,
                metadata: metadata.clone(),
                embedding,
            })
            .collect();
        let count = entries.len();

        self.entries
            .set(entries)
            .map_err(|_| QaError::AlreadyBuilt)?;

        tracing::info!(
            units = units.len(),
            chunks = count,
            model = self.embedder.model_name(),
            "embedding index built"
        );
        Ok(count)
    }

    /// Return up to `k` distinct chunks, most similar to `query` first.
    ///
    /// # Errors
    ///
    /// - [`QaError::NotInitialized`] if called before [`build`](Self::build).
    /// - [`QaError::EmbeddingFailed`] if the query cannot be embedded.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, QaError> {
        let entries = self.entries.get().ok_or(QaError::NotInitialized)?;
        if k == 0 || entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embed_with_timeout(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QaError::EmbeddingFailed("empty embedding response".to_string()))?;

        let stored_dims = entries[0].embedding.len();
        if query_vec.len() != stored_dims {
            return Err(QaError::EmbeddingFailed(format!(
                "query vector has {} dimensions, index has {}",
                query_vec.len(),
                stored_dims
            )));
        }

        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&query_vec, &entry.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen: HashSet<&str> = HashSet::new();
        let mut results = Vec::with_capacity(k.min(entries.len()));
        for (i, score) in scored {
            let entry = &entries[i];
            if !seen.insert(entry.content.as_str()) {
                continue;
            }
            results.push(ScoredChunk {
                content: entry.content.clone(),
                metadata: entry.metadata.clone(),
                score,
            });
            if results.len() == k {
                break;
            }
        }

        Ok(results)
    }

    async fn embed_with_timeout(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QaError> {
        match tokio::time::timeout(self.config.timeout, self.embedder.embed(texts)).await {
            Ok(Ok(vectors)) => Ok(vectors),
            Ok(Err(e)) => Err(QaError::EmbeddingFailed(format!("{:#}", e))),
            Err(_) => Err(QaError::EmbeddingFailed(format!(
                "timed out after {}s",
                self.config.timeout.as_secs()
            ))),
        }
    }
}
