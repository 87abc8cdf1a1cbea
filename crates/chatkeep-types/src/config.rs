//! Global configuration types for chatkeep.
//!
//! `GlobalConfig` represents the top-level `config.toml`: session lifecycle
//! bounds, LLM backend settings, and logging. Every field has a default so
//! an empty or missing file yields a working configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.chatkeep/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Overrides the default `sqlite://{data_dir}/chatkeep.db`.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Bounds enforced by the session lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Inactivity threshold after which a session counts as expired.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Maximum number of turns loaded back into the model context.
    #[serde(default = "default_max_history_length")]
    pub max_history_length: usize,

    /// Token ceiling per session; at or above it, further turns are refused.
    #[serde(default = "default_max_tokens_per_session")]
    pub max_tokens_per_session: u64,

    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Total attempts for a chat turn that keeps hitting write conflicts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_session_timeout_secs() -> u64 {
    300
}

fn default_max_history_length() -> usize {
    20
}

fn default_max_tokens_per_session() -> u64 {
    100_000
}

fn default_max_prompt_chars() -> usize {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    100
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: default_session_timeout_secs(),
            max_history_length: default_max_history_length(),
            max_tokens_per_session: default_max_tokens_per_session(),
            max_prompt_chars: default_max_prompt_chars(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Settings for the Gemini backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature, 0.0..=2.0.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound on a single backend call, after which it fails as unavailable.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Advertise the built-in tools to the model.
    #[serde(default = "default_tools_enabled")]
    pub tools_enabled: bool,

    /// Model/tool round trips allowed while answering one prompt.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

fn default_model() -> String {
    "gemini-flash-latest".to_string()
}

fn default_temperature() -> f64 {
    1.0
}

fn default_max_output_tokens() -> u32 {
    100
}

fn default_system_instruction() -> String {
    "No system instruction has been configured. Tell the user to add one to config.toml."
        .to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_tools_enabled() -> bool {
    true
}

fn default_max_tool_rounds() -> usize {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            system_instruction: default_system_instruction(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            tools_enabled: default_tools_enabled(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl LlmConfig {
    /// Reject values the backend would refuse anyway.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        Ok(())
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Bridge spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            otel: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.chat.session_timeout_secs, 300);
        assert_eq!(config.chat.max_prompt_chars, 1000);
        assert_eq!(config.chat.max_attempts, 3);
        assert_eq!(config.llm.model, "gemini-flash-latest");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.chat.max_history_length, 20);
        assert_eq!(config.chat.max_tokens_per_session, 100_000);
        assert_eq!(config.llm.max_output_tokens, 100);
        assert!(config.llm.tools_enabled);
        assert_eq!(config.llm.max_tool_rounds, 5);
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
database_url = "sqlite:///tmp/chat.db"

[chat]
session_timeout_secs = 60
max_history_length = 6

[llm]
model = "gemini-2.0-flash"
temperature = 0.4

[log]
json = true
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite:///tmp/chat.db"));
        assert_eq!(config.chat.session_timeout_secs, 60);
        assert_eq!(config.chat.max_history_length, 6);
        // Unspecified fields in a present table still default.
        assert_eq!(config.chat.max_attempts, 3);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert!((config.llm.temperature - 0.4).abs() < f64::EPSILON);
        assert!(config.log.json);
        assert!(!config.log.otel);
    }

    #[test]
    fn test_llm_config_validate_temperature() {
        let mut config = LlmConfig::default();
        assert!(config.validate().is_ok());

        config.temperature = 2.5;
        assert!(config.validate().is_err());

        config.temperature = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_llm_config_validate_model() {
        let config = LlmConfig {
            model: "  ".to_string(),
            ..LlmConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
