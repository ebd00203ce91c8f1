//! Speech event stream

use crate::speech::SpeechEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert the speech broadcast into an SSE stream
pub fn speech_stream(
    rx: broadcast::Receiver<SpeechEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(to_sse_event(&event))),
        Err(e) => {
            tracing::warn!(error = %e, "Speech listener lagged, events dropped");
            None
        }
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn to_sse_event(event: &SpeechEvent) -> Event {
    let name = match event {
        SpeechEvent::Say { .. } => "say",
        SpeechEvent::TurnComplete => "turn_complete",
    };
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(data)
}
