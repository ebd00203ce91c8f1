//! Process configuration from environment variables

use crate::llm::LlmConfig;
use crate::orchestrator::{OrchestratorConfig, DEFAULT_MAX_THOUGHTS};
use crate::presentation::slides::DEFAULT_SLIDES_DIR;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 9002;
pub const DEFAULT_LOG_FILE: &str = "conversation_log.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read {name} from {path}: {source}")]
    Read {
        name: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which handler receives utterances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Orchestrator,
    Logger,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub handler: HandlerKind,
    pub orchestrator: OrchestratorConfig,
    pub log_file: PathBuf,
    pub slides_dir: PathBuf,
    pub demo_navigation: bool,
    pub llm: LlmConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("SLIDE_PILOT_PORT") {
            Some(raw) => parse("SLIDE_PILOT_PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let handler = match var("SLIDE_PILOT_HANDLER").as_deref().map(str::trim) {
            None | Some("orchestrator") => HandlerKind::Orchestrator,
            Some("logger") => HandlerKind::Logger,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "SLIDE_PILOT_HANDLER",
                    value: other.to_string(),
                    reason: "expected 'orchestrator' or 'logger'".to_string(),
                })
            }
        };

        let max_thoughts: u32 = match var("SLIDE_PILOT_MAX_THOUGHTS") {
            Some(raw) => parse("SLIDE_PILOT_MAX_THOUGHTS", &raw)?,
            None => DEFAULT_MAX_THOUGHTS,
        };
        if max_thoughts == 0 {
            return Err(ConfigError::Invalid {
                name: "SLIDE_PILOT_MAX_THOUGHTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let system_prompt = match var("SLIDE_PILOT_SYSTEM_PROMPT_FILE") {
            Some(path) => std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                name: "SLIDE_PILOT_SYSTEM_PROMPT_FILE",
                path: PathBuf::from(&path),
                source,
            })?,
            None => lookup("SLIDE_PILOT_SYSTEM_PROMPT").unwrap_or_default(),
        };

        let demo_navigation = match var("SLIDE_PILOT_DEMO_NAVIGATION").as_deref() {
            None => false,
            Some(raw) => parse_flag("SLIDE_PILOT_DEMO_NAVIGATION", raw)?,
        };

        let llm = LlmConfig::from_lookup(&lookup);

        Ok(Self {
            port,
            handler,
            orchestrator: OrchestratorConfig {
                system_prompt,
                max_thoughts,
                transcription_file: var("SLIDE_PILOT_TRANSCRIPTION_FILE").map(PathBuf::from),
            },
            log_file: PathBuf::from(
                var("SLIDE_PILOT_LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            ),
            slides_dir: PathBuf::from(
                var("SLIDE_PILOT_SLIDES_DIR").unwrap_or_else(|| DEFAULT_SLIDES_DIR.to_string()),
            ),
            demo_navigation,
            llm,
        })
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 9002);
        assert_eq!(config.handler, HandlerKind::Orchestrator);
        assert_eq!(config.orchestrator.max_thoughts, 10);
        assert!(config.orchestrator.system_prompt.is_empty());
        assert!(config.orchestrator.transcription_file.is_none());
        assert_eq!(config.log_file, PathBuf::from("conversation_log.jsonl"));
        assert_eq!(config.slides_dir, PathBuf::from("ui/src/routes"));
        assert!(!config.demo_navigation);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("SLIDE_PILOT_PORT", "8080"),
            ("SLIDE_PILOT_HANDLER", "logger"),
            ("SLIDE_PILOT_MAX_THOUGHTS", "3"),
            ("SLIDE_PILOT_SYSTEM_PROMPT", "Be brief."),
            ("SLIDE_PILOT_TRANSCRIPTION_FILE", "prev.jsonl"),
            ("SLIDE_PILOT_DEMO_NAVIGATION", "true"),
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_MODEL", "gpt-4o-mini"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.handler, HandlerKind::Logger);
        assert_eq!(config.orchestrator.max_thoughts, 3);
        assert_eq!(config.orchestrator.system_prompt, "Be brief.");
        assert_eq!(
            config.orchestrator.transcription_file,
            Some(PathBuf::from("prev.jsonl"))
        );
        assert!(config.demo_navigation);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_prompt_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "From file").unwrap();
        let config = config(&[
            ("SLIDE_PILOT_SYSTEM_PROMPT", "Inline"),
            ("SLIDE_PILOT_SYSTEM_PROMPT_FILE", path.to_str().unwrap()),
        ])
        .unwrap();
        assert_eq!(config.orchestrator.system_prompt, "From file");

        let err = config_missing_prompt();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    fn config_missing_prompt() -> ConfigError {
        config(&[("SLIDE_PILOT_SYSTEM_PROMPT_FILE", "/nonexistent/prompt.txt")]).unwrap_err()
    }

    #[test]
    fn test_invalid_values() {
        for vars in [
            [("SLIDE_PILOT_PORT", "ninety")],
            [("SLIDE_PILOT_MAX_THOUGHTS", "0")],
            [("SLIDE_PILOT_MAX_THOUGHTS", "-2")],
            [("SLIDE_PILOT_HANDLER", "poet")],
            [("SLIDE_PILOT_DEMO_NAVIGATION", "sometimes")],
        ] {
            assert!(
                matches!(config(&vars), Err(ConfigError::Invalid { .. })),
                "{vars:?}"
            );
        }
    }
}
