//! Presentation state store and front-end bridge
//!
//! Holds the deck's routes, their loaded source, the currently displayed
//! route, and the live front-end transport. Mutated only by inbound
//! front-end events; read by tools and the orchestrator. Locks are held for
//! a single field swap and never across an await point, so reads always
//! return immediately with the latest snapshot.

pub mod protocol;
pub mod slides;

pub use protocol::{InboundMessage, OutboundMessage, ProtocolError};
pub use slides::{RouteContent, SlideSource};

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("WebSocket not connected")]
    NotConnected,
    #[error("route '{0}' not in available routes")]
    UnknownRoute(String),
    #[error("failed to send message: {0}")]
    SendFailed(String),
}

/// Operations the agent performs against the presentation
#[async_trait]
pub trait Presentation: Send + Sync {
    async fn current_route(&self) -> Option<String>;

    /// Snapshot of all routes in connection order
    async fn all_routes(&self) -> Vec<String>;

    async fn route_content(&self, route: &str) -> Option<String>;

    /// Route → content for every known route
    async fn all_slide_contents(&self) -> BTreeMap<String, Option<String>>;

    fn is_connected(&self) -> bool;

    async fn goto_route(&self, route: &str) -> Result<(), PresentationError>;

    async fn send_hint(&self, text: &str) -> Result<(), PresentationError>;
}

/// Serializable view of the store
#[derive(Debug, Clone, Serialize)]
pub struct PresentationSnapshot {
    pub connected: bool,
    pub current_route: Option<String>,
    pub routes: Vec<String>,
}

#[derive(Debug, Default)]
struct DeckState {
    routes: Vec<String>,
    contents: Vec<RouteContent>,
    current_route: Option<String>,
    /// Bumped on every connection message so a slow content load cannot
    /// overwrite the deck of a newer connection
    deck_epoch: u64,
}

#[derive(Debug, Clone)]
struct Transport {
    id: u64,
    tx: mpsc::Sender<String>,
}

/// Production presentation store
#[derive(Debug)]
pub struct PresentationManager {
    deck: RwLock<DeckState>,
    transport: RwLock<Option<Transport>>,
    slides: SlideSource,
    next_transport_id: AtomicU64,
}

impl Default for PresentationManager {
    fn default() -> Self {
        Self::new(SlideSource::default())
    }
}

impl PresentationManager {
    pub fn new(slides: SlideSource) -> Self {
        Self {
            deck: RwLock::new(DeckState::default()),
            transport: RwLock::new(None),
            slides,
            next_transport_id: AtomicU64::new(1),
        }
    }

    /// Handle one raw frame from the front-end.
    ///
    /// Malformed frames and unknown types are logged and ignored.
    pub async fn handle_message(&self, raw: &str) {
        match InboundMessage::parse(raw) {
            Ok(InboundMessage::Connection {
                routes,
                current_route,
            }) => {
                self.apply_connection(routes, current_route).await;
            }
            Ok(InboundMessage::RouteChange {
                current_route: Some(route),
            }) => {
                self.apply_route_change(route);
            }
            Ok(InboundMessage::RouteChange {
                current_route: None,
            }) => {
                tracing::warn!(raw, "Route change without currentRoute");
            }
            Ok(InboundMessage::Heartbeat) => {
                tracing::debug!("Received heartbeat message");
            }
            Err(ProtocolError::UnknownType(kind)) => {
                tracing::info!(kind = %kind, "Ignoring message of unknown type");
            }
            Err(e) => {
                tracing::error!(error = %e, raw, "Failed to parse front-end message");
            }
        }
    }

    /// Replace the deck and load each route's source
    pub async fn apply_connection(&self, routes: Vec<String>, current_route: Option<String>) {
        let epoch = {
            let mut deck = self.deck.write().unwrap_or_else(PoisonError::into_inner);
            deck.routes.clone_from(&routes);
            deck.contents.clear();
            deck.current_route.clone_from(&current_route);
            deck.deck_epoch += 1;
            deck.deck_epoch
        };
        tracing::info!(
            routes = routes.len(),
            current_route = current_route.as_deref().unwrap_or("[Not set]"),
            "Stored routes from connection message"
        );

        let contents = self.slides.load_all(&routes).await;

        let mut deck = self.deck.write().unwrap_or_else(PoisonError::into_inner);
        if deck.deck_epoch == epoch {
            deck.contents = contents;
        } else {
            tracing::debug!(epoch, "Discarding slide content of a superseded connection");
        }
    }

    pub fn apply_route_change(&self, route: String) {
        tracing::info!(route = %route, "Route changed");
        let mut deck = self.deck.write().unwrap_or_else(PoisonError::into_inner);
        deck.current_route = Some(route);
    }

    /// Register the live front-end connection; returns its id
    pub fn attach_transport(&self, tx: mpsc::Sender<String>) -> u64 {
        let id = self.next_transport_id.fetch_add(1, Ordering::SeqCst);
        let mut transport = self.transport.write().unwrap_or_else(PoisonError::into_inner);
        if transport.is_some() {
            tracing::info!(id, "Replacing existing front-end connection");
        }
        *transport = Some(Transport { id, tx });
        id
    }

    /// Forget the connection `id`, unless a newer one already replaced it
    pub fn detach_transport(&self, id: u64) {
        let mut transport = self.transport.write().unwrap_or_else(PoisonError::into_inner);
        if transport.as_ref().is_some_and(|t| t.id == id) {
            *transport = None;
            tracing::info!(id, "Front-end connection cleared");
        }
    }

    pub fn snapshot(&self) -> PresentationSnapshot {
        let deck = self.deck.read().unwrap_or_else(PoisonError::into_inner);
        PresentationSnapshot {
            connected: self.is_connected(),
            current_route: deck.current_route.clone(),
            routes: deck.routes.clone(),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<String>> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| t.tx.clone())
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), PresentationError> {
        let tx = self.sender().ok_or(PresentationError::NotConnected)?;
        let frame = message
            .to_json()
            .map_err(|e| PresentationError::SendFailed(e.to_string()))?;
        tx.send(frame)
            .await
            .map_err(|e| PresentationError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl Presentation for PresentationManager {
    async fn current_route(&self) -> Option<String> {
        self.deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_route
            .clone()
    }

    async fn all_routes(&self) -> Vec<String> {
        self.deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .routes
            .clone()
    }

    async fn route_content(&self, route: &str) -> Option<String> {
        self.deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contents
            .iter()
            .find(|c| c.route == route)
            .and_then(|c| c.content.clone())
    }

    async fn all_slide_contents(&self) -> BTreeMap<String, Option<String>> {
        self.deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contents
            .iter()
            .map(|c| (c.route.clone(), c.content.clone()))
            .collect()
    }

    fn is_connected(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn goto_route(&self, route: &str) -> Result<(), PresentationError> {
        if !self.is_connected() {
            tracing::error!(route, "WebSocket not connected, cannot send goto command");
            return Err(PresentationError::NotConnected);
        }
        if !self.all_routes().await.iter().any(|r| r == route) {
            tracing::warn!(route, "Route not in available routes");
            return Err(PresentationError::UnknownRoute(route.to_string()));
        }

        self.send(&OutboundMessage::Goto {
            route: route.to_string(),
        })
        .await?;
        tracing::info!(route, "Sent goto command");
        Ok(())
    }

    async fn send_hint(&self, text: &str) -> Result<(), PresentationError> {
        self.send(&OutboundMessage::Hint {
            text: text.to_string(),
        })
        .await?;
        tracing::info!(text, "Sent hint message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_slide(root: &Path, route: &str, content: &str) {
        let dir = root.join(route.trim_start_matches('/'));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("+page.svelte"), content).unwrap();
    }

    #[tokio::test]
    async fn test_connection_message_populates_deck() {
        let dir = tempfile::tempdir().unwrap();
        write_slide(dir.path(), "/00-cover", "Cover");
        let manager = PresentationManager::new(SlideSource::new(dir.path()));

        manager
            .handle_message(
                r#"{"type":"connection","routes":["/00-cover","/01-intro"],"currentRoute":"/00-cover"}"#,
            )
            .await;

        assert_eq!(manager.current_route().await.as_deref(), Some("/00-cover"));
        assert_eq!(manager.all_routes().await, vec!["/00-cover", "/01-intro"]);
        assert_eq!(manager.route_content("/00-cover").await.as_deref(), Some("Cover"));
        assert!(manager.route_content("/01-intro").await.is_none());

        let contents = manager.all_slide_contents().await;
        assert_eq!(contents.len(), 2);
        assert_eq!(contents["/01-intro"], None);
    }

    #[tokio::test]
    async fn test_route_change_and_ignored_messages() {
        let manager = PresentationManager::default();
        manager
            .handle_message(r#"{"type":"route_change","currentRoute":"/03-demo"}"#)
            .await;
        // Route change racing ahead of the connection message is tolerated
        assert_eq!(manager.current_route().await.as_deref(), Some("/03-demo"));
        assert!(manager.all_routes().await.is_empty());

        manager.handle_message(r#"{"type":"route_change"}"#).await;
        manager.handle_message(r#"{"type":"heartbeat"}"#).await;
        manager.handle_message(r#"{"type":"mystery"}"#).await;
        manager.handle_message("not json at all").await;
        assert_eq!(manager.current_route().await.as_deref(), Some("/03-demo"));
    }

    #[tokio::test]
    async fn test_goto_requires_transport_and_known_route() {
        let manager = PresentationManager::default();
        manager
            .apply_connection(vec!["/a".to_string(), "/b".to_string()], None)
            .await;

        assert!(matches!(
            manager.goto_route("/a").await,
            Err(PresentationError::NotConnected)
        ));

        let (tx, mut rx) = mpsc::channel(8);
        manager.attach_transport(tx);
        assert!(matches!(
            manager.goto_route("/zzz").await,
            Err(PresentationError::UnknownRoute(_))
        ));

        manager.goto_route("/b").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"goto","route":"/b"}"#);

        manager.send_hint("Breathe").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"hint","text":"Breathe"}"#);
    }

    #[tokio::test]
    async fn test_detach_only_clears_matching_connection() {
        let manager = PresentationManager::default();
        let (old_tx, _old_rx) = mpsc::channel(1);
        let (new_tx, _new_rx) = mpsc::channel(1);

        let old_id = manager.attach_transport(old_tx);
        let new_id = manager.attach_transport(new_tx);
        assert_ne!(old_id, new_id);

        manager.detach_transport(old_id);
        assert!(manager.is_connected());

        manager.detach_transport(new_id);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_send_to_closed_channel_fails() {
        let manager = PresentationManager::default();
        let (tx, rx) = mpsc::channel(1);
        manager.attach_transport(tx);
        drop(rx);

        assert!(matches!(
            manager.send_hint("hello").await,
            Err(PresentationError::SendFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot() {
        let manager = PresentationManager::default();
        manager
            .apply_connection(vec!["/x".to_string()], Some("/x".to_string()))
            .await;
        let snapshot = manager.snapshot();
        assert!(!snapshot.connected);
        assert_eq!(snapshot.current_route.as_deref(), Some("/x"));
        assert_eq!(snapshot.routes, vec!["/x"]);
    }
}
