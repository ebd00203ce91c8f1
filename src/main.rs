//! slide-pilot - voice-driven presentation assistant
//!
//! Narrates and navigates a slide deck in response to transcribed speech,
//! dropping stale work whenever the speaker interrupts.

mod api;
mod config;
mod demo;
mod gate;
mod hints;
mod history;
mod llm;
mod orchestrator;
mod presentation;
mod speech;
mod tools;
mod transcript;

#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use config::{Config, HandlerKind};
use gate::GenerationGate;
use hints::HintHistory;
use history::InMemoryHistory;
use llm::LlmClient;
use orchestrator::{Collaborators, Orchestrator, TextMessageHandler};
use presentation::{PresentationManager, SlideSource};
use speech::SpeechBroadcaster;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tools::PresentationTools;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use transcript::TranscriptLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slide_pilot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;
    let started_at = Instant::now();

    // Shared state
    let presentation = Arc::new(PresentationManager::new(SlideSource::new(
        &config.slides_dir,
    )));
    let history = Arc::new(InMemoryHistory::new());
    let speech = Arc::new(SpeechBroadcaster::new(history.clone()));
    tracing::info!(slides_dir = %config.slides_dir.display(), "Presentation store ready");

    let handler: Arc<dyn TextMessageHandler> = match config.handler {
        HandlerKind::Orchestrator => {
            if config.llm.api_key.is_none() {
                tracing::warn!("No LLM API key configured. Set OPENAI_API_KEY.");
            }
            let llm = llm::build_client(&config.llm)?;
            tracing::info!(
                model = %llm.model_id(),
                max_thoughts = config.orchestrator.max_thoughts,
                "Orchestrator initialized"
            );
            let deps = Collaborators {
                gate: Arc::new(GenerationGate::new()),
                llm,
                tools: Arc::new(PresentationTools::new(presentation.clone(), speech.clone())),
                history: history.clone(),
                presentation: presentation.clone(),
                hints: Arc::new(HintHistory::new()),
                responder: speech.clone(),
            };
            Arc::new(Orchestrator::new(
                config.orchestrator.clone(),
                deps,
                started_at,
            ))
        }
        HandlerKind::Logger => {
            tracing::info!(path = %config.log_file.display(), "Transcript logger initialized");
            Arc::new(TranscriptLogger::new(
                &config.log_file,
                history.clone(),
                presentation.clone(),
                speech.clone(),
                started_at,
            ))
        }
    };

    let shutdown = CancellationToken::new();
    let demo_task = config.demo_navigation.then(|| {
        tokio::spawn(demo::run_demo_navigation(
            presentation.clone(),
            demo::DEMO_PERIOD,
            shutdown.child_token(),
        ))
    });

    let state = AppState {
        presentation,
        speech,
        handler,
        shutdown: shutdown.clone(),
    };

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("slide-pilot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    if let Some(task) = demo_task {
        task.await?;
    }
    tracing::info!("slide-pilot stopped");
    Ok(())
}

/// Resolve on Ctrl-C, cancelling background tasks and open sessions
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}
