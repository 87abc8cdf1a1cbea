//! GeminiBackend -- concrete [`ChatBackend`] implementation for Google Gemini.
//!
//! Sends requests to `{base_url}/v1beta/models/{model}:generateContent`.
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed when
//! building the request header.
//!
//! When the model answers with function calls, the registered tools run and
//! their results are sent back, up to `max_tool_rounds` times per prompt.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use chatkeep_core::llm::backend::ChatBackend;
use chatkeep_core::llm::tools::ToolRegistry;
use chatkeep_types::config::LlmConfig;
use chatkeep_types::llm::{ChatReply, FunctionCall, LlmError, Part, TokenUsage, Turn};

use super::types::{
    ErrorResponse, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    SystemInstruction, ToolSet,
};

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Google Gemini chat backend.
///
/// Stateless: every call carries the full history it should continue.
/// The HTTP client timeout bounds each call.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f64,
    max_output_tokens: u32,
    system_instruction: String,
    tools: ToolRegistry,
    max_tool_rounds: usize,
}

// No Debug derive: keeps the key out of any formatted output.

impl GeminiBackend {
    /// Create a backend from LLM settings.
    pub fn new(api_key: SecretString, config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            system_instruction: config.system_instruction.clone(),
            tools: if config.tools_enabled {
                ToolRegistry::builtin()
            } else {
                ToolRegistry::new()
            },
            max_tool_rounds: config.max_tool_rounds,
        })
    }

    /// Create a backend reading the key from `GEMINI_API_KEY`.
    pub fn from_env(config: &LlmConfig) -> Result<Self, LlmError> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::AuthenticationFailed)?;
        Self::new(SecretString::from(key), config)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Replace the tools offered to the model.
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(&self, contents: Vec<Turn>) -> GenerateContentRequest {
        let system_instruction = (!self.system_instruction.trim().is_empty()).then(|| {
            SystemInstruction {
                parts: vec![Part::text(self.system_instruction.clone())],
            }
        });

        let tools = if self.tools.is_empty() {
            Vec::new()
        } else {
            vec![ToolSet {
                function_declarations: self.tools.declarations(),
            }]
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
            tools,
        }
    }

    /// Answer the trailing user turn of `contents`, running tools as asked.
    ///
    /// Usage is summed over every call made. A model still asking for tools
    /// after `max_tool_rounds` rounds is an error, so an unanswered call never
    /// ends up in stored history.
    async fn converse(&self, mut contents: Vec<Turn>) -> Result<ChatReply, LlmError> {
        let mut usage = None;
        let mut rounds = 0;

        loop {
            let step = self.send(contents).await?;
            usage = add_usage(usage, step.usage);

            let calls: Vec<FunctionCall> = step
                .history
                .last()
                .map(|turn| turn.function_calls().into_iter().cloned().collect())
                .unwrap_or_default();
            if calls.is_empty() {
                return Ok(ChatReply { usage, ..step });
            }
            if rounds >= self.max_tool_rounds {
                tracing::warn!(model = %self.model, rounds, "Tool round limit reached");
                return Err(LlmError::ToolLoopExhausted { rounds });
            }
            rounds += 1;

            let results = calls
                .iter()
                .map(|call| {
                    tracing::info!(tool = %call.name, args = %call.args, round = rounds, "Model requested tool");
                    self.tools.invoke(call)
                })
                .collect();
            contents = step.history;
            contents.push(Turn::function_results(results));
        }
    }

    /// Run one `generateContent` call over `contents`.
    async fn send(&self, contents: Vec<Turn>) -> Result<ChatReply, LlmError> {
        let body = self.build_request(contents);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Http(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status.as_u16(), &error_body));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Deserialization(format!("failed to parse response: {e}"))
            }
        })?;

        tracing::debug!(
            model = %self.model,
            total_tokens = parsed.usage_metadata.and_then(|u| u.total_token_count),
            "Gemini call completed"
        );
        parsed.into_reply(body.contents)
    }
}

fn add_usage(total: Option<TokenUsage>, step: Option<TokenUsage>) -> Option<TokenUsage> {
    match (total, step) {
        (Some(a), Some(b)) => Some(TokenUsage {
            prompt_tokens: a.prompt_tokens + b.prompt_tokens,
            output_tokens: a.output_tokens + b.output_tokens,
            total_tokens: a.total_tokens + b.total_tokens,
        }),
        (a, b) => a.or(b),
    }
}

/// Map a non-2xx response onto an [`LlmError`].
fn map_error_status(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        408 | 504 => LlmError::Timeout,
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

impl ChatBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, history: &[Turn], prompt: &str) -> Result<ChatReply, LlmError> {
        let mut contents = history.to_vec();
        contents.push(Turn::user(prompt));
        self.converse(contents).await
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let reply = self.converse(vec![Turn::user(prompt)]).await?;
        Ok(reply.text)
    }
}
