//! Question-to-passages retrieval.
//!
//! Embeds the question with the configured provider and ranks stored
//! passages against it. Kept separate from the conversation engine so the
//! `ingest`/`search` path and the chat path share one retrieval code path.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::ScoredPassage;

pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Embed `question` and return the `k` most similar passages.
    ///
    /// Fails with [`crate::error::PipelineError::EmbeddingUnavailable`] when
    /// the provider cannot produce a vector; the failure is surfaced, never
    /// converted into an empty result.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        let query = crate::embedding::embed_query(self.embedder.as_ref(), question).await?;
        let results = self.index.search(&query, k).await?;
        debug!(
            requested = k,
            returned = results.len(),
            "retrieved passages for question"
        );
        Ok(results)
    }

    /// Number of passages currently searchable.
    pub async fn indexed_passages(&self) -> Result<i64> {
        self.index.count().await
    }
}
