//! Per-sender conversation history, keyed by sender id.
//!
//! The engine itself takes history from the caller; this store is the
//! transport-facing convenience that remembers it between messages. Entries
//! hold only the most recent turns and expire after a configurable idle
//! period, checked lazily on access.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::SessionConfig;
use crate::models::ConversationTurn;

struct Session {
    turns: Vec<ConversationTurn>,
    last_active: Instant,
}

pub struct SessionStore {
    inner: Mutex<HashMap<String, Session>>,
    max_turns: usize,
    idle: Duration,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_turns: config.max_turns,
            idle: Duration::from_secs(config.idle_secs),
        }
    }

    /// History for `sender_id`, empty for unknown or expired senders.
    pub fn history(&self, sender_id: &str) -> Vec<ConversationTurn> {
        let mut sessions = self.lock();
        match sessions.get(sender_id) {
            Some(session) if session.last_active.elapsed() < self.idle => {
                session.turns.clone()
            }
            Some(_) => {
                sessions.remove(sender_id);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Store the updated history for `sender_id`, keeping the newest turns.
    pub fn record(&self, sender_id: &str, mut history: Vec<ConversationTurn>) {
        if history.len() > self.max_turns {
            history.drain(..history.len() - self.max_turns);
        }
        self.lock().insert(
            sender_id.to_string(),
            Session {
                turns: history,
                last_active: Instant::now(),
            },
        );
    }

    /// Drop the history for `sender_id`.
    pub fn clear(&self, sender_id: &str) {
        self.lock().remove(sender_id);
    }

    /// Remove all expired sessions, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_active.elapsed() < self.idle);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_turns: usize, idle_secs: u64) -> SessionStore {
        SessionStore::new(&SessionConfig {
            max_turns,
            idle_secs,
        })
    }

    fn turn(question: &str) -> ConversationTurn {
        ConversationTurn {
            question: question.to_string(),
            answer: "answer".to_string(),
            passage_ids: Vec::new(),
        }
    }

    #[test]
    fn test_unknown_sender_has_empty_history() {
        assert!(store(6, 60).history("nobody").is_empty());
    }

    #[test]
    fn test_record_then_history_roundtrip() {
        let store = store(6, 60);
        store.record("alice", vec![turn("q1"), turn("q2")]);
        let history = store.history("alice");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "q1");
    }

    #[test]
    fn test_record_keeps_newest_turns() {
        let store = store(2, 60);
        store.record("alice", vec![turn("q1"), turn("q2"), turn("q3")]);
        let history = store.history("alice");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "q2");
        assert_eq!(history[1].question, "q3");
    }

    #[test]
    fn test_senders_are_isolated() {
        let store = store(6, 60);
        store.record("alice", vec![turn("qa")]);
        store.record("bob", vec![turn("qb")]);
        assert_eq!(store.history("alice")[0].question, "qa");
        assert_eq!(store.history("bob")[0].question, "qb");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = store(6, 0);
        store.record("alice", vec![turn("q1")]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.history("alice").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = store(6, 0);
        store.record("alice", vec![turn("q1")]);
        store.record("bob", vec![turn("q2")]);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.cleanup_expired(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_single_sender() {
        let store = store(6, 60);
        store.record("alice", vec![turn("q1")]);
        store.clear("alice");
        assert!(store.history("alice").is_empty());
    }
}
