//! Demo navigation: drives the deck to random slides on a timer

use crate::presentation::Presentation;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEMO_PERIOD: Duration = Duration::from_secs(5);
pub const DEMO_HINT: &str = "Hello World! 👋";

/// Every `period`, jump to a random route and show the demo hint.
///
/// Runs until `cancel` fires. Ticks without routes are skipped.
pub async fn run_demo_navigation(
    presentation: Arc<dyn Presentation>,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(period_ms = %period.as_millis(), "Demo navigation started");
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(period) => {}
        }

        let routes = presentation.all_routes().await;
        let Some(route) = routes.choose(&mut rand::thread_rng()).cloned() else {
            tracing::debug!("No routes available yet for navigation");
            continue;
        };

        if let Err(e) = presentation.goto_route(&route).await {
            tracing::warn!(route = %route, error = %e, "Demo navigation failed");
            continue;
        }
        if let Err(e) = presentation.send_hint(DEMO_HINT).await {
            tracing::warn!(error = %e, "Demo hint failed");
        }
    }
    tracing::info!("Demo navigation stopped");
}
