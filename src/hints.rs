//! Bounded history of hints shown to the presenter
//!
//! Shared by all orchestrator invocations. Appends and evictions happen under
//! one mutex; the lock is never held across an await point.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

/// Number of hints retained
pub const HINT_HISTORY_CAPACITY: usize = 50;

/// Number of hints surfaced to the model
pub const HINT_CONTEXT_LIMIT: usize = 10;

/// Argument names the hint text may arrive under, in priority order
pub const HINT_TEXT_ARGUMENTS: &[&str] = &["text", "hint", "message", "content"];

/// A single hint that was displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintRecord {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub slide: Option<String>,
}

#[derive(Debug)]
pub struct HintHistory {
    entries: Mutex<VecDeque<HintRecord>>,
    capacity: usize,
}

impl Default for HintHistory {
    fn default() -> Self {
        Self::with_capacity(HINT_HISTORY_CAPACITY)
    }
}

impl HintHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a hint, evicting the oldest entries beyond capacity
    pub fn record(&self, text: impl Into<String>, slide: Option<String>) {
        let record = HintRecord {
            text: text.into(),
            timestamp: Utc::now(),
            slide,
        };
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(record);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        tracing::debug!(retained = entries.len(), "Recorded hint");
    }

    /// The `limit` most recent hints, newest first
    pub fn recent(&self, limit: usize) -> Vec<HintRecord> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the hint-usage block placed in the model's context
    pub fn context_block(&self) -> String {
        if self.is_empty() {
            return "HINT HISTORY: No hints have been shown yet.".to_string();
        }
        let recent = self.recent(HINT_CONTEXT_LIMIT);

        let mut block = format!(
            "HINT HISTORY (last {} hints, most recent first):",
            recent.len()
        );
        for hint in &recent {
            let slide = hint.slide.as_deref().unwrap_or("[Not set]");
            let _ = write!(
                block,
                "\n  - [{}] on {slide}: {}",
                hint.timestamp.format("%H:%M:%S"),
                hint.text
            );
        }
        block
    }
}

/// Pull the hint text out of a tool call's arguments.
///
/// Returns the first non-empty string among [`HINT_TEXT_ARGUMENTS`].
pub fn extract_hint_text(arguments: &serde_json::Value) -> Option<String> {
    HINT_TEXT_ARGUMENTS.iter().find_map(|name| {
        arguments
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_capacity_and_recent_order() {
        let history = HintHistory::new();
        for i in 0..60 {
            history.record(format!("hint {i}"), Some("/01-intro".to_string()));
        }

        assert_eq!(history.len(), HINT_HISTORY_CAPACITY);

        let recent = history.recent(HINT_CONTEXT_LIMIT);
        let texts: Vec<_> = recent.iter().map(|h| h.text.as_str()).collect();
        let expected: Vec<String> = (50..60).rev().map(|i| format!("hint {i}")).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_context_block_lists_surfaced_hints_newest_first() {
        let history = HintHistory::new();
        for i in 0..60 {
            history.record(format!("hint {i}"), None);
        }

        let block = history.context_block();
        assert!(block.starts_with("HINT HISTORY (last 10 hints"));
        assert!(block.contains("hint 59"));
        assert!(block.contains("hint 50"));
        assert!(!block.contains("hint 49"));
        let newest = block.find("hint 59").unwrap();
        let oldest = block.find("hint 50").unwrap();
        assert!(newest < oldest);
    }

    #[test]
    fn test_empty_context_block() {
        let history = HintHistory::new();
        assert!(history.is_empty());
        assert_eq!(
            history.context_block(),
            "HINT HISTORY: No hints have been shown yet."
        );
    }

    #[test]
    fn test_context_block_includes_slide() {
        let history = HintHistory::new();
        history.record("Mention the roadmap", Some("/03-roadmap".to_string()));
        assert!(history
            .context_block()
            .contains("on /03-roadmap: Mention the roadmap"));
    }

    #[test]
    fn test_extract_hint_text_prefers_first_populated() {
        assert_eq!(
            extract_hint_text(&json!({"text": "a", "hint": "b"})),
            Some("a".to_string())
        );
        assert_eq!(
            extract_hint_text(&json!({"text": "  ", "hint": "b"})),
            Some("b".to_string())
        );
        assert_eq!(
            extract_hint_text(&json!({"content": "c"})),
            Some("c".to_string())
        );
        assert_eq!(extract_hint_text(&json!({"text": 3})), None);
        assert_eq!(extract_hint_text(&json!({})), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_respect_capacity() {
        let history = std::sync::Arc::new(HintHistory::new());
        let mut handles = Vec::new();
        for task in 0..8 {
            let history = history.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..20 {
                    history.record(format!("{task}-{i}"), None);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(history.len(), HINT_HISTORY_CAPACITY);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(count in 0usize..200, capacity in 1usize..60) {
            let history = HintHistory::with_capacity(capacity);
            for i in 0..count {
                history.record(format!("{i}"), None);
            }
            prop_assert_eq!(history.len(), count.min(capacity));
            if count > 0 {
                let newest = history.recent(1);
                prop_assert_eq!(newest[0].text.clone(), format!("{}", count - 1));
            }
        }
    }
}
