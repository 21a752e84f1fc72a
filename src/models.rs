//! Core data models used throughout docchat.
//!
//! These types represent the documents, passages, and conversation turns that
//! flow through the ingestion and question-answering pipeline.

use serde::Serialize;

/// Text extracted from a single PDF page, in page order.
#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// One ingested PDF, recorded on successful ingestion and never mutated.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub source: String,
    pub page_count: i64,
    pub ingested_at: i64,
}

/// A chunk of document text, the unit of retrieval.
///
/// `page_start`/`page_end` record the originating page range and
/// `char_start`/`char_end` the window offsets into the concatenated document
/// text. The embedding vector is stored alongside the passage by the index;
/// it is not part of this struct.
#[derive(Debug, Clone)]
pub struct Passage {
    pub id: String,
    pub document_id: String,
    pub seq: i64,
    pub text: String,
    pub page_start: i64,
    pub page_end: i64,
    pub char_start: i64,
    pub char_end: i64,
    pub hash: String,
}

/// A passage ranked by similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// One question/answer exchange, with the ids of the passages that grounded
/// the answer. Histories are ordered oldest first.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub passage_ids: Vec<String>,
}

/// A chat-completion message in provider wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Returned by ingestion: what changed in the index.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    pub document_id: String,
    pub page_count: usize,
    pub passage_count: usize,
}
