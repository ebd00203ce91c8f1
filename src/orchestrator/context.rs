//! Prompt context assembly

use crate::llm::{LlmMessage, MessageRole};
use crate::presentation::Presentation;
use crate::transcript::{format_elapsed, SLIDE_NOT_SET};
use std::time::Duration;

/// Collapse runs of consecutive user turns into one turn each.
///
/// Streaming speech-to-text delivers an utterance in fragments; joining them
/// with blank lines keeps paragraph boundaries. A run of one is kept as is.
pub fn collapse_user_turns(turns: Vec<LlmMessage>) -> Vec<LlmMessage> {
    let mut collapsed = Vec::with_capacity(turns.len());
    let mut run: Vec<LlmMessage> = Vec::new();

    for turn in turns {
        if turn.role == MessageRole::User {
            run.push(turn);
        } else {
            flush_user_run(&mut run, &mut collapsed);
            collapsed.push(turn);
        }
    }
    flush_user_run(&mut run, &mut collapsed);
    collapsed
}

fn flush_user_run(run: &mut Vec<LlmMessage>, out: &mut Vec<LlmMessage>) {
    if run.len() <= 1 {
        out.append(run);
        return;
    }

    let joined = run
        .drain(..)
        .map(|turn| turn.text().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push(LlmMessage::user(joined));
}

/// Describe the deck: every route, and the full source of the current one
pub async fn slide_context(presentation: &dyn Presentation) -> String {
    let routes = presentation.all_routes().await;
    if routes.is_empty() {
        tracing::debug!("No slide routes available yet");
        return "PRESENTATION CONTEXT: No presentation slides are currently available.".to_string();
    }
    let current = presentation.current_route().await;

    let mut lines = vec![
        "PRESENTATION CONTEXT:".to_string(),
        format!("Current slide: {}", current.as_deref().unwrap_or(SLIDE_NOT_SET)),
        format!("Available slides ({} total):", routes.len()),
    ];
    lines.extend(routes.iter().map(|route| format!("  - {route}")));

    if let Some(current) = current {
        let content = presentation.route_content(&current).await;
        lines.push("\nCurrent slide content:".to_string());
        lines.push(format!("\n--- SLIDE: {current} ---"));
        lines.push(
            content
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "[No content available]".to_string()),
        );
        lines.push(format!("--- END SLIDE: {current} ---"));
    }

    lines.join("\n")
}

pub fn elapsed_line(elapsed: Duration) -> String {
    format!("ELAPSED SESSION TIME: {}", format_elapsed(elapsed))
}
