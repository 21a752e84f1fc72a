//! # DocChat
//!
//! A chat-driven PDF question answering service with a local vector index.
//!
//! DocChat ingests PDF documents into a SQLite-backed vector index (extract
//! pages, chunk with overlap, embed) and answers free-text questions grounded
//! in the most similar passages, with conversation history carried across
//! turns. A CLI covers local use; the [`dispatch`] module adapts the same
//! pipeline to any chat transport.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────┐
//! │   PDF    │──▶│   Pipeline    │──▶│  SQLite    │
//! │  pages   │   │ Chunk+Embed  │   │ vectors   │
//! └──────────┘   └──────────────┘   └────┬──────┘
//!                                        │
//!                    ┌───────────────────┤
//!                    ▼                   ▼
//!               ┌──────────┐       ┌──────────┐
//!               │   CLI    │       │ Dispatch │
//!               │(docchat) │       │  (chat)  │
//!               └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docchat init                  # create the index
//! docchat ingest report.pdf     # extract, chunk, embed, index
//! docchat ask "What is the refund policy?"
//! docchat chat                  # interactive session with history
//! docchat status                # index counts
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF page text extraction |
//! | [`chunk`] | Overlapping passage chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | SQLite-backed vector index |
//! | [`retrieve`] | Question-to-passages retrieval |
//! | [`generation`] | Answer generation providers |
//! | [`conversation`] | Grounded answering with history |
//! | [`pipeline`] | Ingest/ask orchestration |
//! | [`session`] | Per-sender history store |
//! | [`dispatch`] | Chat transport boundary |
//! | [`error`] | Pipeline error taxonomy |

pub mod chunk;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod session;
