//! Presentation front-end WebSocket bridge

use super::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

/// Outbound frames buffered per connection before sends start waiting
const OUTBOUND_BUFFER: usize = 256;

pub async fn presentation_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let id = state.presentation.attach_transport(tx);
    tracing::info!(id, "Presentation front-end connected");

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    loop {
        let message = tokio::select! {
            () = state.shutdown.cancelled() => break,
            message = receiver.next() => message,
        };
        match message {
            Some(Ok(Message::Text(raw))) => {
                tracing::debug!(id, raw = %raw, "Received front-end message");
                state.presentation.handle_message(&raw).await;
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!(id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.presentation.detach_transport(id);
    send_task.abort();
    tracing::info!(id, "Presentation front-end disconnected");
}
