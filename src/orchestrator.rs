//! Think-act orchestration with generation-based supersession
//!
//! Each utterance becomes one invocation stamped by the [`GenerationGate`].
//! The invocation alternates model calls and tool executions and re-checks
//! the gate after every one of them; as soon as a newer utterance has begun,
//! the invocation stops and issues no further effects. The agent speaks only
//! through the `say` tool, so every invocation ends by delivering the empty
//! response.

mod context;

pub use context::{collapse_user_turns, elapsed_line, slide_context};

use crate::gate::{GenerationGate, InvocationToken};
use crate::hints::{extract_hint_text, HintHistory};
use crate::history::ConversationHistory;
use crate::llm::{
    ContentBlock, LlmClient, LlmMessage, LlmRequest, MessageRole, ToolCallRequest,
};
use crate::presentation::Presentation;
use crate::speech::Responder;
use crate::tools::{PresentationTool, ToolExecutor};
use crate::transcript::load_replay;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::Instrument;

/// Default think-act iteration cap
pub const DEFAULT_MAX_THOUGHTS: u32 = 10;

/// System note added before the final iteration, which offers no tools
pub const MAX_TOOLS_NOTICE: &str = "Maximum tool usage reached. Tools Unavailable";

/// Entry point for transcribed utterances
#[async_trait]
pub trait TextMessageHandler: Send + Sync {
    /// Handle one utterance; returns the text to speak, which is always empty
    async fn handle_text(&self, text: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub system_prompt: String,
    pub max_thoughts: u32,
    pub transcription_file: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            max_thoughts: DEFAULT_MAX_THOUGHTS,
            transcription_file: None,
        }
    }
}

/// Shared collaborators of the orchestrator
#[derive(Clone)]
pub struct Collaborators {
    pub gate: Arc<GenerationGate>,
    pub llm: Arc<dyn LlmClient>,
    pub tools: Arc<dyn ToolExecutor>,
    pub history: Arc<dyn ConversationHistory>,
    pub presentation: Arc<dyn Presentation>,
    pub hints: Arc<HintHistory>,
    pub responder: Arc<dyn Responder>,
}

/// Point at which a newer invocation was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictStage {
    AfterModel { thought: u32 },
    AfterTool { thought: u32, tool: String },
    BeforeResponse,
}

impl fmt::Display for ConflictStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictStage::AfterModel { thought } => write!(f, "after model call {thought}"),
            ConflictStage::AfterTool { thought, tool } => {
                write!(f, "after tool {tool} in thought {thought}")
            }
            ConflictStage::BeforeResponse => write!(f, "before final response"),
        }
    }
}

/// How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    Completed { thoughts: u32 },
    Superseded { stage: ConflictStage },
    Failed { error: String },
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    deps: Collaborators,
    started_at: Instant,
    replay: OnceCell<String>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, deps: Collaborators, started_at: Instant) -> Self {
        Self {
            config,
            deps,
            started_at,
            replay: OnceCell::new(),
        }
    }

    /// Run one invocation and deliver the empty response
    pub async fn invoke(&self, text: &str) -> InvocationOutcome {
        let token = self.deps.gate.begin_invocation();
        let span = tracing::info_span!("invocation", generation = token.generation());

        let outcome = self.run(token, text).instrument(span.clone()).await;
        span.in_scope(|| match &outcome {
            InvocationOutcome::Completed { thoughts } => {
                tracing::info!(thoughts, "Invocation completed");
            }
            InvocationOutcome::Superseded { stage } => {
                tracing::info!(
                    stage = %stage,
                    latest = self.deps.gate.current(),
                    "Invocation superseded, stopping"
                );
            }
            InvocationOutcome::Failed { error } => {
                tracing::error!(error = %error, "Invocation failed");
            }
        });

        if let Err(e) = self.deps.responder.respond_text("").instrument(span).await {
            tracing::warn!(error = %e, "Failed to deliver empty response");
        }
        outcome
    }

    async fn run(&self, token: InvocationToken, text: &str) -> InvocationOutcome {
        tracing::debug!("Invocation started");
        let mut messages = self.assemble_context(text).await;
        let definitions = self.deps.tools.definitions();
        let max_thoughts = self.config.max_thoughts;

        for thought in 1..=max_thoughts {
            let final_thought = thought == max_thoughts;
            if final_thought {
                messages.push(LlmMessage::system(MAX_TOOLS_NOTICE));
            }

            let request = LlmRequest {
                messages: messages.clone(),
                tools: if final_thought {
                    Vec::new()
                } else {
                    definitions.clone()
                },
                temperature: Some(0.0),
                max_tokens: None,
            };
            let response = match self.deps.llm.complete(&request).await {
                Ok(response) => response,
                Err(e) => {
                    return InvocationOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            if self.deps.gate.has_conflict(token) {
                return InvocationOutcome::Superseded {
                    stage: ConflictStage::AfterModel { thought },
                };
            }

            let calls = response.tool_calls();
            tracing::debug!(
                thought,
                chars = response.text().len(),
                tool_calls = calls.len(),
                "Model replied"
            );
            let role = if calls.is_empty() {
                MessageRole::Assistant
            } else {
                MessageRole::Function
            };
            messages.push(LlmMessage::new(role, response.content));

            if final_thought || calls.is_empty() {
                return self.finish(token, thought);
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.execute_tool(thought, &call).await);
                if self.deps.gate.has_conflict(token) {
                    return InvocationOutcome::Superseded {
                        stage: ConflictStage::AfterTool {
                            thought,
                            tool: call.name,
                        },
                    };
                }
            }
            messages.push(LlmMessage::new(MessageRole::Function, results));
        }

        self.finish(token, max_thoughts)
    }

    fn finish(&self, token: InvocationToken, thoughts: u32) -> InvocationOutcome {
        if self.deps.gate.has_conflict(token) {
            return InvocationOutcome::Superseded {
                stage: ConflictStage::BeforeResponse,
            };
        }
        InvocationOutcome::Completed { thoughts }
    }

    /// Execute one tool call and turn its outcome into a result block
    async fn execute_tool(&self, thought: u32, call: &ToolCallRequest) -> ContentBlock {
        tracing::info!(tool = %call.name, id = %call.id, thought, "Executing tool");

        let (content, is_error) = match self.deps.tools.execute(&call.name, call.input.clone()).await
        {
            Ok(output) if output.success => {
                if PresentationTool::from_name(&call.name) == Some(PresentationTool::Hint) {
                    self.record_hint(call).await;
                }
                (output.result_value().to_string(), false)
            }
            Ok(output) => (format!("Error: {}", output.output), true),
            Err(e) => (format!("Error: {e}"), true),
        };

        if is_error {
            tracing::warn!(tool = %call.name, error = %content, "Tool failed");
        }
        ContentBlock::tool_result(&call.id, &call.name, content, is_error)
    }

    async fn record_hint(&self, call: &ToolCallRequest) {
        let Some(text) = extract_hint_text(&call.input) else {
            tracing::warn!(id = %call.id, "Hint call carried no hint text");
            return;
        };
        let slide = self.deps.presentation.current_route().await;
        self.deps.hints.record(text, slide);
    }

    /// Build the prompt: system blocks, prior turns, then the utterance
    async fn assemble_context(&self, text: &str) -> Vec<LlmMessage> {
        let prior = self.deps.history.get_history().await;
        self.deps.history.append(LlmMessage::user(text)).await;

        let mut messages = Vec::with_capacity(prior.len() + 6);
        if !self.config.system_prompt.is_empty() {
            messages.push(LlmMessage::system(&self.config.system_prompt));
        }
        let replay = self.replay_block().await;
        if !replay.is_empty() {
            messages.push(LlmMessage::system(replay));
        }
        messages.push(LlmMessage::system(
            slide_context(self.deps.presentation.as_ref()).await,
        ));
        messages.push(LlmMessage::system(elapsed_line(self.started_at.elapsed())));
        messages.push(LlmMessage::system(self.deps.hints.context_block()));

        messages.extend(collapse_user_turns(prior));
        messages.push(LlmMessage::user(text));
        messages
    }

    /// Transcript replay, read from disk on first use only
    async fn replay_block(&self) -> &str {
        self.replay
            .get_or_init(|| async {
                let Some(path) = &self.config.transcription_file else {
                    return String::new();
                };
                load_replay(path).await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Transcript replay unavailable");
                    String::new()
                })
            })
            .await
    }
}

#[async_trait]
impl TextMessageHandler for Orchestrator {
    async fn handle_text(&self, text: &str) -> String {
        self.invoke(text).await;
        String::new()
    }
}
