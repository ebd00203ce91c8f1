//! Conversation history collaborator

use crate::llm::LlmMessage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Turns retained by [`InMemoryHistory`] before the oldest are dropped
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Ordered record of prior conversation turns
#[async_trait]
pub trait ConversationHistory: Send + Sync {
    async fn get_history(&self) -> Vec<LlmMessage>;

    async fn append(&self, message: LlmMessage);
}

/// Process-local history shared by the ingress, the orchestrator and the
/// speech output
#[derive(Debug)]
pub struct InMemoryHistory {
    turns: Mutex<VecDeque<LlmMessage>>,
    limit: usize,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            limit,
        }
    }
}

#[async_trait]
impl ConversationHistory for InMemoryHistory {
    async fn get_history(&self) -> Vec<LlmMessage> {
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    async fn append(&self, message: LlmMessage) {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        turns.push_back(message);
        while turns.len() > self.limit {
            turns.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    #[tokio::test]
    async fn test_append_and_read_in_order() {
        let history = InMemoryHistory::new();
        history.append(LlmMessage::user("first")).await;
        history.append(LlmMessage::assistant("second")).await;

        let turns = history.get_history().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text(), "first");
        assert_eq!(turns[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_limit_drops_oldest() {
        let history = InMemoryHistory::with_limit(3);
        for i in 0..5 {
            history.append(LlmMessage::user(format!("{i}"))).await;
        }
        let texts: Vec<_> = history
            .get_history()
            .await
            .iter()
            .map(LlmMessage::text)
            .collect();
        assert_eq!(texts, vec!["2", "3", "4"]);
    }
}
