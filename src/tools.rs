//! Presentation tools exposed to the model
//!
//! The tool set is closed: [`PresentationTool`] lists every tool and all
//! dispatch is an exhaustive match on it. Every failure, from parameter
//! validation to transport errors, comes back as an unsuccessful
//! [`ToolOutput`] so the model can read the message and recover.

use crate::llm::ToolDefinition;
use crate::presentation::Presentation;
use crate::speech::Responder;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub success: bool,
    /// Human-readable result, or the error message on failure
    pub output: String,
    /// Structured result, when the tool returns data rather than a message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The value reported back to the model on success
    pub fn result_value(&self) -> Value {
        self.data
            .clone()
            .unwrap_or_else(|| Value::String(self.output.clone()))
    }
}

/// Unexpected failure while running a tool
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Execution(String),
}

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Tool catalog offered to the model
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Execute a tool by name
    async fn execute(&self, name: &str, input: Value) -> Result<ToolOutput, ToolError>;
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }

    async fn execute(&self, name: &str, input: Value) -> Result<ToolOutput, ToolError> {
        (**self).execute(name, input).await
    }
}

/// The fixed presentation tool set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationTool {
    GotoSlide,
    NextSlide,
    PreviousSlide,
    Say,
    Hint,
    GetAllSlideDetails,
}

impl PresentationTool {
    pub const ALL: [PresentationTool; 6] = [
        PresentationTool::GotoSlide,
        PresentationTool::NextSlide,
        PresentationTool::PreviousSlide,
        PresentationTool::Say,
        PresentationTool::Hint,
        PresentationTool::GetAllSlideDetails,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PresentationTool::GotoSlide => "goto_slide",
            PresentationTool::NextSlide => "next_slide",
            PresentationTool::PreviousSlide => "previous_slide",
            PresentationTool::Say => "say",
            PresentationTool::Hint => "hint",
            PresentationTool::GetAllSlideDetails => "get_all_slide_details",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            PresentationTool::GotoSlide => {
                "Navigate to a specific slide/route in the presentation"
            }
            PresentationTool::NextSlide => {
                "Navigate to the next slide in the presentation sequence"
            }
            PresentationTool::PreviousSlide => {
                "Navigate to the previous slide in the presentation sequence"
            }
            PresentationTool::Say => {
                "Say something out loud. Only use this tool if the agent has been spoken to directly."
            }
            PresentationTool::Hint => {
                "Provide a hint to the user about content they should discuss"
            }
            PresentationTool::GetAllSlideDetails => {
                "Retrieve the content/details of all slides in the presentation"
            }
        }
    }

    fn input_schema(self) -> Value {
        match self {
            PresentationTool::GotoSlide => json!({
                "type": "object",
                "required": ["route"],
                "properties": {
                    "route": {
                        "type": "string",
                        "description": "The route/path of the slide to navigate to (e.g., '/00-cover', '/01-intro')"
                    }
                }
            }),
            PresentationTool::Say => json!({
                "type": "object",
                "required": ["text"],
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "The text to say out loud"
                    }
                }
            }),
            PresentationTool::Hint => json!({
                "type": "object",
                "required": ["text"],
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "The hint text to display"
                    }
                }
            }),
            PresentationTool::NextSlide
            | PresentationTool::PreviousSlide
            | PresentationTool::GetAllSlideDetails => json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Direction for relative navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Previous => "previous",
        }
    }
}

/// Find the route adjacent to `current`.
///
/// Adjacency is defined on the lexicographically sorted route list, not on
/// the order the front-end announced the routes in.
pub fn adjacent_route(
    routes: &[String],
    current: &str,
    direction: Direction,
) -> Result<String, String> {
    let mut sorted = routes.to_vec();
    sorted.sort();

    let index = sorted
        .iter()
        .position(|r| r == current)
        .ok_or_else(|| format!("Current route '{current}' not found in available routes."))?;

    let target = match direction {
        Direction::Next => index
            .checked_add(1)
            .filter(|&i| i < sorted.len())
            .ok_or("Already at the last slide. Cannot navigate to next slide.")?,
        Direction::Previous => index
            .checked_sub(1)
            .ok_or("Already at the first slide. Cannot navigate to previous slide.")?,
    };

    Ok(sorted.swap_remove(target))
}

/// Read a required string parameter
fn required_str<'a>(input: &'a Value, name: &str) -> Result<&'a str, ToolOutput> {
    match input.get(name) {
        None => Err(ToolOutput::error(format!(
            "Missing required parameter: {name}"
        ))),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(ToolOutput::error(format!(
            "Parameter '{name}' must be a string"
        ))),
    }
}

/// Read a required string parameter that must carry visible text
fn required_text<'a>(input: &'a Value, name: &str) -> Result<&'a str, ToolOutput> {
    let value = required_str(input, name)?;
    if value.trim().is_empty() {
        return Err(ToolOutput::error(format!(
            "Parameter '{name}' must not be empty"
        )));
    }
    Ok(value)
}

/// Wrap a runtime failure with the operation that was attempted
fn operation_failed(operation: &str, error: &impl std::fmt::Display) -> ToolOutput {
    tracing::error!(operation, error = %error, "Tool operation failed");
    ToolOutput::error(format!("Failed to {operation}: {error}"))
}

/// Production tool executor operating on the presentation and the speech output
pub struct PresentationTools {
    presentation: Arc<dyn Presentation>,
    responder: Arc<dyn Responder>,
}

impl PresentationTools {
    pub fn new(presentation: Arc<dyn Presentation>, responder: Arc<dyn Responder>) -> Self {
        Self {
            presentation,
            responder,
        }
    }

    /// Run one tool; never fails, failures are unsuccessful outputs
    pub async fn run(&self, tool: PresentationTool, input: &Value) -> ToolOutput {
        match tool {
            PresentationTool::GotoSlide => self.goto_slide(input).await,
            PresentationTool::NextSlide => self.navigate(Direction::Next).await,
            PresentationTool::PreviousSlide => self.navigate(Direction::Previous).await,
            PresentationTool::Say => self.say(input).await,
            PresentationTool::Hint => self.hint(input).await,
            PresentationTool::GetAllSlideDetails => self.all_slide_details().await,
        }
    }

    async fn available_routes(&self) -> Result<Vec<String>, ToolOutput> {
        let routes = self.presentation.all_routes().await;
        if routes.is_empty() {
            return Err(ToolOutput::error(
                "No routes available. Presentation may not be connected.",
            ));
        }
        Ok(routes)
    }

    async fn goto_slide(&self, input: &Value) -> ToolOutput {
        let route = match required_str(input, "route") {
            Ok(route) => route,
            Err(output) => return output,
        };
        let routes = match self.available_routes().await {
            Ok(routes) => routes,
            Err(output) => return output,
        };

        if !routes.iter().any(|r| r == route) {
            return ToolOutput::error(format!(
                "Route '{route}' not found. Available routes: {}",
                routes.join(", ")
            ));
        }
        if !self.presentation.is_connected() {
            return ToolOutput::error("WebSocket not connected. Cannot navigate to slide.");
        }

        let from = self.presentation.current_route().await;
        tracing::info!(from = from.as_deref().unwrap_or("[Not set]"), to = route, "Navigating");

        match self.presentation.goto_route(route).await {
            Ok(()) => ToolOutput::success(format!("Successfully navigated to slide: {route}")),
            Err(e) => operation_failed(&format!("navigate to slide {route}"), &e),
        }
    }

    async fn navigate(&self, direction: Direction) -> ToolOutput {
        let label = direction.label();
        let current = self.presentation.current_route().await;
        let routes = match self.available_routes().await {
            Ok(routes) => routes,
            Err(output) => return output,
        };

        let Some(current) = current else {
            return ToolOutput::error(format!(
                "Current route is unknown. Cannot determine {label} slide."
            ));
        };
        if !self.presentation.is_connected() {
            return ToolOutput::error(format!(
                "WebSocket not connected. Cannot navigate to {label} slide."
            ));
        }

        let target = match adjacent_route(&routes, &current, direction) {
            Ok(target) => target,
            Err(message) => return ToolOutput::error(message),
        };

        tracing::info!(from = %current, to = %target, direction = label, "Navigating");
        match self.presentation.goto_route(&target).await {
            Ok(()) => {
                ToolOutput::success(format!("Successfully navigated to {label} slide: {target}"))
            }
            Err(e) => operation_failed(&format!("navigate to {label} slide"), &e),
        }
    }

    async fn say(&self, input: &Value) -> ToolOutput {
        // The responder treats "" as the end of the turn
        let text = match required_text(input, "text") {
            Ok(text) => text,
            Err(output) => return output,
        };

        match self.responder.respond_text(text).await {
            Ok(()) => {
                tracing::info!(text, "Said");
                ToolOutput::success(format!("Successfully said: {text}"))
            }
            Err(e) => operation_failed("say text", &e),
        }
    }

    async fn hint(&self, input: &Value) -> ToolOutput {
        let text = match required_text(input, "text") {
            Ok(text) => text,
            Err(output) => return output,
        };
        if !self.presentation.is_connected() {
            return ToolOutput::error("WebSocket not connected. Cannot send hint.");
        }

        match self.presentation.send_hint(text).await {
            Ok(()) => ToolOutput::success(format!("Successfully sent hint: {text}")),
            Err(e) => operation_failed("send hint", &e),
        }
    }

    async fn all_slide_details(&self) -> ToolOutput {
        let contents = self.presentation.all_slide_contents().await;
        if contents.is_empty() {
            return ToolOutput::error(
                "No slide contents available. Presentation may not be connected or no slides loaded.",
            );
        }

        tracing::info!(slides = contents.len(), "Retrieved slide details");
        match serde_json::to_value(&contents) {
            Ok(data) => {
                ToolOutput::success(format!("Retrieved details for {} slides", contents.len()))
                    .with_data(data)
            }
            Err(e) => operation_failed("retrieve slide details", &e),
        }
    }
}

#[async_trait]
impl ToolExecutor for PresentationTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        PresentationTool::ALL
            .into_iter()
            .map(PresentationTool::definition)
            .collect()
    }

    async fn execute(&self, name: &str, input: Value) -> Result<ToolOutput, ToolError> {
        let Some(tool) = PresentationTool::from_name(name) else {
            return Ok(ToolOutput::error(format!("Unknown tool: {name}")));
        };
        Ok(self.run(tool, &input).await)
    }
}
