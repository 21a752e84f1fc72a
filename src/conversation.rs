//! Grounded question answering over retrieved passages.
//!
//! The [`ConversationEngine`] turns one question plus the caller's prior
//! turns into an answer: retrieve the most similar passages, compose a chat
//! transcript (grounding instruction, passage excerpts, a bounded window of
//! history, the question), and hand it to the generation provider. The
//! caller gets the answer back together with the extended history.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::generation::GenerationProvider;
use crate::models::{ChatMessage, ConversationTurn, ScoredPassage};
use crate::retrieve::Retriever;

/// Fixed answer returned when retrieval yields no passages.
///
/// An empty index is the common case, but any empty retrieval ends here:
/// nothing can ground an answer, so no provider is called and the user is
/// told how to proceed instead.
pub const NO_DOCUMENT_RESPONSE: &str =
    "No document has been indexed yet. Send me a PDF file first, then ask your question again.";

pub struct ConversationEngine {
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
    max_history_turns: usize,
}

impl ConversationEngine {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn GenerationProvider>,
        top_k: usize,
        max_history_turns: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            top_k,
            max_history_turns,
        }
    }

    /// Answer `question` grounded in the index, given the caller's history.
    ///
    /// Returns the answer and the history extended with this turn. History
    /// is owned by the caller; only the most recent turns are included in
    /// the prompt, older ones are dropped silently.
    pub async fn ask(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<(String, Vec<ConversationTurn>)> {
        // An empty index is answered without touching the embedder.
        let passages = if self.retriever.indexed_passages().await? == 0 {
            Vec::new()
        } else {
            self.retriever.retrieve(question, self.top_k).await?
        };

        if passages.is_empty() {
            debug!("nothing retrieved to ground the answer, returning fixed response");
            let turn = ConversationTurn {
                question: question.to_string(),
                answer: NO_DOCUMENT_RESPONSE.to_string(),
                passage_ids: Vec::new(),
            };
            return Ok((NO_DOCUMENT_RESPONSE.to_string(), extend(history, turn)));
        }

        let messages = compose_messages(question, &passages, history, self.max_history_turns);
        let answer = self.generator.complete(&messages).await?;

        let turn = ConversationTurn {
            question: question.to_string(),
            answer: answer.clone(),
            passage_ids: passages.iter().map(|s| s.passage.id.clone()).collect(),
        };
        Ok((answer, extend(history, turn)))
    }
}

fn extend(history: &[ConversationTurn], turn: ConversationTurn) -> Vec<ConversationTurn> {
    let mut new_history = history.to_vec();
    new_history.push(turn);
    new_history
}

/// Build the chat transcript sent to the generation provider.
///
/// Order: one system message carrying the grounding instruction and the
/// passage excerpts (tagged with their page range), then the last
/// `max_history_turns` turns as user/assistant pairs, then the question.
fn compose_messages(
    question: &str,
    passages: &[ScoredPassage],
    history: &[ConversationTurn],
    max_history_turns: usize,
) -> Vec<ChatMessage> {
    let mut excerpts = String::new();
    for scored in passages {
        let passage = &scored.passage;
        if passage.page_start == passage.page_end {
            excerpts.push_str(&format!("[page {}]\n", passage.page_start));
        } else {
            excerpts.push_str(&format!(
                "[pages {}-{}]\n",
                passage.page_start, passage.page_end
            ));
        }
        excerpts.push_str(&passage.text);
        excerpts.push_str("\n\n");
    }

    let system = format!(
        "You are an assistant answering questions about a document. \
         Use only the document excerpts below. If the excerpts do not contain \
         the answer, say the document does not cover it. Mention page numbers \
         when they help.\n\nDocument excerpts:\n\n{}",
        excerpts.trim_end()
    );

    let mut messages = vec![ChatMessage::system(system)];

    let start = history.len().saturating_sub(max_history_turns);
    for turn in &history[start..] {
        messages.push(ChatMessage::user(turn.question.clone()));
        messages.push(ChatMessage::assistant(turn.answer.clone()));
    }

    messages.push(ChatMessage::user(question));
    messages
}
