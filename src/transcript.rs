//! Session transcripts
//!
//! [`TranscriptLogger`] is the logging-only message handler: instead of
//! thinking about an utterance it appends one JSONL record describing it.
//! The replay side reads such a file back into a context block for the
//! orchestrator.

use crate::history::ConversationHistory;
use crate::llm::{ContentBlock, LlmMessage};
use crate::orchestrator::TextMessageHandler;
use crate::presentation::Presentation;
use crate::speech::Responder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Slide label used when the current route is unknown
pub const SLIDE_NOT_SET: &str = "[Not set]";

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcript I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode transcript record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the presentation stood when a record was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideInfo {
    pub current_slide: String,
    pub total_slides: usize,
    /// Index of the current slide in connection order, -1 if absent
    pub position: i64,
}

/// One line of a transcript file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptRecord {
    pub message_text: String,
    pub slide_info: SlideInfo,
    pub elapsed_time: String,
    pub timestamp: String,
}

/// The part of a transcript line that replay reads; other keys are ignored
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplayEntry {
    pub message_text: String,
    #[serde(default)]
    pub slide_info: ReplaySlide,
    #[serde(default)]
    pub elapsed_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplaySlide {
    #[serde(default = "slide_not_set")]
    pub current_slide: String,
}

impl Default for ReplaySlide {
    fn default() -> Self {
        Self {
            current_slide: slide_not_set(),
        }
    }
}

fn slide_not_set() -> String {
    SLIDE_NOT_SET.to_string()
}

/// Format a duration as `Xm Ys`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}

pub async fn slide_info(presentation: &dyn Presentation) -> SlideInfo {
    let current = presentation.current_route().await;
    let routes = presentation.all_routes().await;
    let position = current
        .as_ref()
        .and_then(|c| routes.iter().position(|r| r == c))
        .and_then(|p| i64::try_from(p).ok())
        .unwrap_or(-1);

    SlideInfo {
        current_slide: current.unwrap_or_else(|| SLIDE_NOT_SET.to_string()),
        total_slides: routes.len(),
        position,
    }
}

/// Message handler that records each utterance instead of answering it
pub struct TranscriptLogger {
    log_file: PathBuf,
    history: Arc<dyn ConversationHistory>,
    presentation: Arc<dyn Presentation>,
    responder: Arc<dyn Responder>,
    started_at: Instant,
}

impl TranscriptLogger {
    pub fn new(
        log_file: impl Into<PathBuf>,
        history: Arc<dyn ConversationHistory>,
        presentation: Arc<dyn Presentation>,
        responder: Arc<dyn Responder>,
        started_at: Instant,
    ) -> Self {
        Self {
            log_file: log_file.into(),
            history,
            presentation,
            responder,
            started_at,
        }
    }

    /// Text of the most recent history turn, trimmed per block
    async fn last_message_text(&self) -> String {
        let turns = self.history.get_history().await;
        let Some(last) = turns.last() else {
            return String::new();
        };
        last.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } if !text.trim().is_empty() => {
                    Some(text.trim())
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn record(&self, utterance: &str) -> Result<TranscriptRecord, TranscriptError> {
        self.history.append(LlmMessage::user(utterance)).await;
        let mut message_text = self.last_message_text().await;
        if message_text.is_empty() {
            message_text = utterance.to_string();
        }

        let record = TranscriptRecord {
            message_text,
            slide_info: slide_info(self.presentation.as_ref()).await,
            elapsed_time: format_elapsed(self.started_at.elapsed()),
            timestamp: chrono::Local::now().to_rfc3339(),
        };
        append_record(&self.log_file, &record).await?;
        Ok(record)
    }
}

#[async_trait]
impl TextMessageHandler for TranscriptLogger {
    async fn handle_text(&self, text: &str) -> String {
        match self.record(text).await {
            Ok(record) => tracing::debug!(
                path = %self.log_file.display(),
                chars = record.message_text.len(),
                "Logged message"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to write transcript record"),
        }

        if let Err(e) = self.responder.respond_text("").await {
            tracing::warn!(error = %e, "Failed to deliver empty response");
        }
        String::new()
    }
}

/// Append one record as a JSON line
pub async fn append_record(path: &Path, record: &TranscriptRecord) -> Result<(), TranscriptError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let io_err = |source| TranscriptError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(io_err)?;
    file.write_all(line.as_bytes()).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)
}

/// Parse transcript lines, skipping blank and malformed ones
pub fn parse_records(raw: &str) -> Vec<ReplayEntry> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping malformed transcript line");
                None
            }
        })
        .collect()
}

/// Render records as quoted speaker lines
pub fn format_replay(records: &[ReplayEntry]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut block = String::from("PREVIOUS PRESENTATION TRANSCRIPT:");
    for record in records {
        let slide = &record.slide_info.current_slide;
        let _ = if record.elapsed_time.is_empty() {
            write!(block, "\n  [{slide}] Speaker: \"{}\"", record.message_text)
        } else {
            write!(
                block,
                "\n  [{} | {slide}] Speaker: \"{}\"",
                record.elapsed_time, record.message_text
            )
        };
    }
    block
}

/// Load a replay file into a context block; empty if nothing usable
pub async fn load_replay(path: &Path) -> Result<String, TranscriptError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| TranscriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let records = parse_records(&raw);
    tracing::info!(path = %path.display(), records = records.len(), "Loaded transcript replay");
    Ok(format_replay(&records))
}
