//! Mock implementations for testing
//!
//! These mocks let the orchestrator and the tools run without a model, a
//! front-end or a speech listener.

use crate::llm::{
    ContentBlock, LlmClient, LlmError, LlmRequest, LlmResponse, ToolDefinition, Usage,
};
use crate::speech::{ResponseError, Responder};
use crate::tools::{ToolError, ToolExecutor, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Text-only model reply
pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::text(text)],
        usage: Usage::default(),
    }
}

/// Model reply requesting the given `(id, name, input)` tool calls
pub fn tool_response(calls: &[(&str, &str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::tool_use(*id, *name, input.clone()))
            .collect(),
        usage: Usage::default(),
    }
}

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.next(request)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Client (for supersession testing)
// ============================================================================

/// Mock LLM client that sleeps before answering.
///
/// The reply is taken from the queue when the request arrives, so concurrent
/// callers receive replies in request order whatever order their timers fire.
pub struct DelayedMockLlmClient {
    inner: MockLlmClient,
    delay: Duration,
    /// Notified when a request starts; the permit is stored if no one waits yet
    pub request_started: Arc<Notify>,
}

impl DelayedMockLlmClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.inner.queue_response(response);
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmClient for DelayedMockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let reply = self.inner.next(request);
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        reply
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

type ExecuteHook = Box<dyn Fn(&str) + Send + Sync>;

/// Mock tool executor with predefined outputs
#[derive(Default)]
pub struct MockToolExecutor {
    outputs: HashMap<String, Result<ToolOutput, String>>,
    definitions: Vec<ToolDefinition>,
    executions: Mutex<Vec<(String, Value)>>,
    on_execute: Option<ExecuteHook>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn define(&mut self, name: &str) {
        self.definitions.push(ToolDefinition {
            name: name.to_string(),
            description: format!("Mock {name}"),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        });
    }

    /// Add a tool with a predefined output
    pub fn with_tool(mut self, name: &str, output: ToolOutput) -> Self {
        self.define(name);
        self.outputs.insert(name.to_string(), Ok(output));
        self
    }

    /// Add a tool whose execution returns `Err`
    pub fn with_failing_tool(mut self, name: &str, message: &str) -> Self {
        self.define(name);
        self.outputs.insert(name.to_string(), Err(message.to_string()));
        self
    }

    /// Run `hook` with the tool name on every execution, after recording it
    pub fn on_execute(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_execute = Some(Box::new(hook));
        self
    }

    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }

    async fn execute(&self, name: &str, input: Value) -> Result<ToolOutput, ToolError> {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), input));
        if let Some(hook) = &self.on_execute {
            hook(name);
        }
        match self.outputs.get(name) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(message)) => Err(ToolError::Execution(message.clone())),
            None => Ok(ToolOutput::error(format!("Unknown tool: {name}"))),
        }
    }
}

// ============================================================================
// Recording Responder
// ============================================================================

/// Responder that records everything it is asked to deliver
#[derive(Default)]
pub struct RecordingResponder {
    texts: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Responder whose every delivery fails
    pub fn failing() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn respond_text(&self, text: &str) -> Result<(), ResponseError> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(ResponseError::NoListeners);
        }
        Ok(())
    }
}
