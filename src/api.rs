//! HTTP surface
//!
//! The presentation front-end connects over `/ws`; a speech-to-text front end
//! posts utterances to `/api/utterance`; a text-to-speech front end follows
//! `/api/speech`.

mod handlers;
mod sse;
mod types;
mod ws;

pub use handlers::create_router;

use crate::orchestrator::TextMessageHandler;
use crate::presentation::PresentationManager;
use crate::speech::SpeechBroadcaster;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub presentation: Arc<PresentationManager>,
    pub speech: Arc<SpeechBroadcaster>,
    pub handler: Arc<dyn TextMessageHandler>,
    /// Fired on shutdown; open WebSocket sessions close when it does
    pub shutdown: CancellationToken,
}
