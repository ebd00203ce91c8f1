//! API request and response types

use serde::{Deserialize, Serialize};

/// Transcribed user speech
#[derive(Debug, Deserialize)]
pub struct UtteranceRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct UtteranceResponse {
    pub accepted: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
