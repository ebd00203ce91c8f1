//! Wire protocol spoken with the presentation front-end
//!
//! Every frame is one JSON object with a `type` discriminator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Messages sent by the front-end
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Sent once per page load with the full deck
    Connection {
        #[serde(default)]
        routes: Vec<String>,
        #[serde(default, rename = "currentRoute")]
        current_route: Option<String>,
    },
    /// The presenter (or a `goto`) moved to another slide
    RouteChange {
        #[serde(default, rename = "currentRoute")]
        current_route: Option<String>,
    },
    Heartbeat,
}

const KNOWN_TYPES: &[&str] = &["connection", "route_change", "heartbeat"];

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

impl InboundMessage {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown");
        if !KNOWN_TYPES.contains(&kind) {
            return Err(ProtocolError::UnknownType(kind.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Messages sent to the front-end
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Goto { route: String },
    Hint { text: String },
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection() {
        let msg = InboundMessage::parse(
            r#"{"type":"connection","routes":["/00-cover","/01-intro"],"currentRoute":"/00-cover"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            InboundMessage::Connection {
                routes: vec!["/00-cover".to_string(), "/01-intro".to_string()],
                current_route: Some("/00-cover".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_route_change_without_route() {
        let msg = InboundMessage::parse(r#"{"type":"route_change"}"#).unwrap();
        assert_eq!(msg, InboundMessage::RouteChange { current_route: None });
    }

    #[test]
    fn test_parse_heartbeat() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"heartbeat","ts":1}"#).unwrap(),
            InboundMessage::Heartbeat
        );
    }

    #[test]
    fn test_parse_unknown_and_malformed() {
        assert!(matches!(
            InboundMessage::parse(r#"{"type":"dance"}"#),
            Err(ProtocolError::UnknownType(t)) if t == "dance"
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"routes":[]}"#),
            Err(ProtocolError::UnknownType(t)) if t == "unknown"
        ));
        assert!(matches!(
            InboundMessage::parse("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_outbound_encoding() {
        let goto = OutboundMessage::Goto {
            route: "/02-agenda".to_string(),
        };
        assert_eq!(goto.to_json().unwrap(), r#"{"type":"goto","route":"/02-agenda"}"#);

        let hint = OutboundMessage::Hint {
            text: "Smile".to_string(),
        };
        assert_eq!(hint.to_json().unwrap(), r#"{"type":"hint","text":"Smile"}"#);
    }
}
