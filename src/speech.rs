//! Audible output
//!
//! The agent speaks only through [`Responder::respond_text`]. In production
//! the text is broadcast to subscribers of the speech event stream (the
//! text-to-speech front end) and recorded in the conversation history.

use crate::history::ConversationHistory;
use crate::llm::LlmMessage;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

const SPEECH_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("no speech listener is connected")]
    NoListeners,
}

/// Delivers the agent's output to the user
#[async_trait]
pub trait Responder: Send + Sync {
    /// Emit `text`; the empty string marks the end of a turn
    async fn respond_text(&self, text: &str) -> Result<(), ResponseError>;
}

/// Event sent to speech stream subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEvent {
    Say { text: String },
    TurnComplete,
}

/// Production responder backed by a broadcast channel
pub struct SpeechBroadcaster {
    tx: broadcast::Sender<SpeechEvent>,
    history: Arc<dyn ConversationHistory>,
}

impl SpeechBroadcaster {
    pub fn new(history: Arc<dyn ConversationHistory>) -> Self {
        let (tx, _) = broadcast::channel(SPEECH_CHANNEL_CAPACITY);
        Self { tx, history }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl Responder for SpeechBroadcaster {
    async fn respond_text(&self, text: &str) -> Result<(), ResponseError> {
        if text.is_empty() {
            if self.tx.send(SpeechEvent::TurnComplete).is_err() {
                tracing::debug!("Turn complete with no speech listener");
            }
            return Ok(());
        }

        self.tx
            .send(SpeechEvent::Say {
                text: text.to_string(),
            })
            .map_err(|_| ResponseError::NoListeners)?;
        self.history.append(LlmMessage::assistant(text)).await;
        Ok(())
    }
}
