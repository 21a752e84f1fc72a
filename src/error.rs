//! Typed failures for the ingestion and question-answering pipeline.
//!
//! Every pipeline operation returns a [`PipelineError`] variant rather than a
//! stringly-typed failure so callers (the CLI, the transport dispatcher) can
//! pick user-facing wording per case. Provider errors are surfaced only after
//! the retry policy in [`crate::embedding`] / [`crate::generation`] is
//! exhausted.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the core pipeline modules.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures surfaced by ingestion, retrieval, and answer generation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input file is corrupt, encrypted, or not a PDF at all.
    #[error("unreadable PDF {path}: {reason}")]
    UnreadablePdf { path: PathBuf, reason: String },

    /// An uploaded attachment with a MIME type other than PDF.
    #[error("unsupported attachment type: {mime_type}")]
    UnsupportedAttachment { mime_type: String },

    /// The embedding provider could not be reached or kept failing.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The generation model failed or timed out.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The backing store rejected a read or write.
    #[error("index persistence failed: {0}")]
    IndexPersistence(#[from] sqlx::Error),

    /// A vector's dimensionality does not match the index.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An upsert batch where passages and vectors do not pair up.
    #[error("passage batch mismatch: {passages} passages, {vectors} vectors")]
    BatchMismatch { passages: usize, vectors: usize },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or incomplete configuration detected at startup.
    #[error("invalid configuration: {0}")]
    Config(String),
}
