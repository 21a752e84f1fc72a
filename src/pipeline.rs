//! End-to-end orchestration: ingest PDFs, answer questions.
//!
//! The [`Pipeline`] wires the extractor, chunker, embedding provider, vector
//! index, and conversation engine together behind the two operations callers
//! need: [`ingest`](Pipeline::ingest) and [`ask`](Pipeline::ask). Components
//! are constructed explicitly and passed in, so tests swap in stub providers
//! without touching the wiring.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunk::chunk_pages;
use crate::config::Config;
use crate::conversation::ConversationEngine;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::Result;
use crate::extract::extract_pages;
use crate::generation::{create_generation, GenerationProvider};
use crate::index::{IndexStats, VectorIndex};
use crate::models::{ConversationTurn, Document, IndexHandle};
use crate::retrieve::Retriever;

pub struct Pipeline {
    config: Config,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    engine: ConversationEngine,
}

impl Pipeline {
    /// Assemble a pipeline from already-constructed components.
    pub fn new(
        config: Config,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        let retriever = Retriever::new(index.clone(), embedder.clone());
        let engine = ConversationEngine::new(
            retriever,
            generator,
            config.retrieval.top_k,
            config.generation.max_history_turns,
        );
        Self {
            config,
            index,
            embedder,
            engine,
        }
    }

    /// Build providers and open the index as the configuration describes.
    pub async fn from_config(config: Config) -> Result<Self> {
        let embedder = create_provider(&config.embedding)?;
        let generator = create_generation(&config.generation)?;
        let index = Arc::new(VectorIndex::open(&config.store.path, embedder.dims()).await?);
        Ok(Self::new(config, index, embedder, generator))
    }

    /// Ingest one PDF: extract pages, chunk, embed, and index atomically.
    ///
    /// A document whose pages carry no extractable text is still recorded,
    /// with zero passages. Any failure after extraction leaves the index
    /// unchanged; the caller can retry the same file.
    pub async fn ingest(&self, pdf_path: &Path) -> Result<IndexHandle> {
        info!(path = %pdf_path.display(), "ingesting PDF");

        let extracted = extract_pages(pdf_path)?;
        let document = Document {
            id: Uuid::new_v4().to_string(),
            source: pdf_path.display().to_string(),
            page_count: extracted.page_count as i64,
            ingested_at: Utc::now().timestamp(),
        };
        let passages = chunk_pages(&document.id, &extracted.pages, &self.config.chunking);

        if passages.is_empty() {
            warn!(path = %pdf_path.display(), "no extractable text, indexing document without passages");
            self.index.upsert(&document, &[], &[]).await?;
            return Ok(IndexHandle {
                document_id: document.id,
                page_count: extracted.page_count,
                passage_count: 0,
            });
        }

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.embedding.batch_size) {
            match self.embedder.embed(batch).await {
                Ok(batch_vectors) => vectors.extend(batch_vectors),
                Err(e) => {
                    error!(path = %pdf_path.display(), error = %e, "ingestion failed while embedding");
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.index.upsert(&document, &passages, &vectors).await {
            error!(path = %pdf_path.display(), error = %e, "ingestion failed while storing");
            return Err(e);
        }

        info!(
            document = %document.id,
            pages = extracted.page_count,
            passages = passages.len(),
            "ingestion complete"
        );
        Ok(IndexHandle {
            document_id: document.id,
            page_count: extracted.page_count,
            passage_count: passages.len(),
        })
    }

    /// Answer a question against the index. See [`ConversationEngine::ask`].
    pub async fn ask(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<(String, Vec<ConversationTurn>)> {
        self.engine.ask(question, history).await
    }

    /// Current index counts, for status reporting.
    pub async fn stats(&self) -> Result<IndexStats> {
        self.index.stats().await
    }
}
