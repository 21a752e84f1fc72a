//! Chat transport boundary.
//!
//! The [`Transport`] trait is the seam to whatever chat platform delivers
//! messages; the [`Dispatcher`] routes each inbound event to the pipeline and
//! maps typed failures to the fixed user-facing replies. Errors are logged
//! with their full detail here and leave this layer only as those fixed
//! strings.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::models::IndexHandle;
use crate::pipeline::Pipeline;
use crate::session::SessionStore;

pub const START_REPLY: &str =
    "Hi! Send me a PDF file, then ask me questions about its contents.";
pub const HELP_REPLY: &str = "Send a PDF file to index it, then ask questions in plain text. \
     Use /file for help with attachments.";
pub const FILE_HELP_REPLY: &str =
    "Attach a PDF file to your message and I will index it for you.";
pub const REJECT_NON_PDF: &str = "I can only read PDF files at the moment.";
pub const PROGRESS_INDEXING: &str = "Reading the file and indexing its contents...";
pub const INDEXED_OK: &str = "File indexed successfully. Ask me anything about it.";
pub const REJECT_UNREADABLE: &str =
    "I could not read that PDF file. It may be corrupt or password-protected.";
pub const TECHNICAL_ISSUE: &str = "We are facing a technical issue, please try again later.";

/// One message received from the chat platform.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub sender_id: String,
    pub text: Option<String>,
    pub attachment_id: Option<String>,
    pub mime_type: Option<String>,
}

/// Chat platform operations the dispatcher needs.
///
/// `fetch_attachment` downloads the attachment to a local file and returns
/// its path; the dispatcher deletes the file once ingestion finishes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver_text(&self, recipient_id: &str, text: &str) -> anyhow::Result<()>;
    async fn fetch_attachment(&self, attachment_id: &str) -> anyhow::Result<PathBuf>;
}

pub struct Dispatcher {
    pipeline: Arc<Pipeline>,
    sessions: SessionStore,
}

impl Dispatcher {
    pub fn new(pipeline: Arc<Pipeline>, sessions: SessionStore) -> Self {
        Self { pipeline, sessions }
    }

    /// Route one inbound event.
    ///
    /// An attachment takes precedence over text in the same event. Events
    /// with neither are ignored. Transport delivery failures propagate to
    /// the caller; pipeline failures are answered with the fixed replies.
    pub async fn handle_event(
        &self,
        transport: &dyn Transport,
        event: InboundEvent,
    ) -> anyhow::Result<()> {
        if let Some(attachment_id) = &event.attachment_id {
            return self
                .handle_attachment(transport, &event, attachment_id)
                .await;
        }

        if let Some(text) = event.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(reply) = command_reply(text) {
                transport.deliver_text(&event.sender_id, reply).await?;
                return Ok(());
            }
            return self.handle_question(transport, &event.sender_id, text).await;
        }

        Ok(())
    }

    async fn handle_attachment(
        &self,
        transport: &dyn Transport,
        event: &InboundEvent,
        attachment_id: &str,
    ) -> anyhow::Result<()> {
        let mime = event.mime_type.clone().unwrap_or_default();
        if !is_pdf_mime(&mime) {
            let err = PipelineError::UnsupportedAttachment { mime_type: mime };
            warn!(sender = %event.sender_id, error = %err, "rejecting attachment");
            transport
                .deliver_text(&event.sender_id, REJECT_NON_PDF)
                .await?;
            return Ok(());
        }

        transport
            .deliver_text(&event.sender_id, PROGRESS_INDEXING)
            .await?;

        let path = transport.fetch_attachment(attachment_id).await?;
        let result = self.pipeline.ingest(&path).await;
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "failed to remove downloaded attachment");
        }

        let reply = match &result {
            Ok(IndexHandle {
                document_id,
                page_count,
                passage_count,
            }) => {
                info!(
                    sender = %event.sender_id,
                    document = %document_id,
                    pages = page_count,
                    passages = passage_count,
                    "attachment indexed"
                );
                INDEXED_OK
            }
            Err(e @ PipelineError::UnreadablePdf { .. }) => {
                warn!(sender = %event.sender_id, error = %e, "attachment not readable");
                REJECT_UNREADABLE
            }
            Err(e) => {
                error!(sender = %event.sender_id, error = %e, "ingestion failed");
                TECHNICAL_ISSUE
            }
        };
        transport.deliver_text(&event.sender_id, reply).await?;
        Ok(())
    }

    async fn handle_question(
        &self,
        transport: &dyn Transport,
        sender_id: &str,
        question: &str,
    ) -> anyhow::Result<()> {
        let history = self.sessions.history(sender_id);

        match self.pipeline.ask(question, &history).await {
            Ok((answer, new_history)) => {
                self.sessions.record(sender_id, new_history);
                transport.deliver_text(sender_id, &answer).await?;
            }
            Err(e) => {
                error!(sender = %sender_id, error = %e, "failed to answer question");
                transport.deliver_text(sender_id, TECHNICAL_ISSUE).await?;
            }
        }
        Ok(())
    }
}

/// Fixed reply for a command message, `None` for ordinary questions.
fn command_reply(text: &str) -> Option<&'static str> {
    match text {
        "/start" => Some(START_REPLY),
        "/help" => Some(HELP_REPLY),
        "/file" => Some(FILE_HELP_REPLY),
        _ => None,
    }
}

fn is_pdf_mime(mime: &str) -> bool {
    mime.to_ascii_lowercase().contains("pdf")
}
