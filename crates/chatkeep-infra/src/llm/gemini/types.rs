//! Gemini `generateContent` request/response types.
//!
//! Gemini's `Content` object has the same JSON shape as the domain
//! [`Turn`], so history is sent as-is. The only translation between wire
//! and domain types happens in [`GenerateContentResponse::into_reply`].

use serde::{Deserialize, Serialize};

use chatkeep_types::llm::{
    ChatReply, FunctionDeclaration, LlmError, Part, TokenUsage, Turn, TurnRole,
};

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSet>,
}

/// Function declarations offered to the model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSet {
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// System prompt, sent as a role-less content object.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

/// Candidate content. `role` may be omitted by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    pub total_token_count: Option<u64>,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

impl GenerateContentResponse {
    /// Convert the first candidate into a [`ChatReply`] continuing `contents`.
    ///
    /// `contents` is the request history including the new user turn. A
    /// candidate that only calls functions yields empty text; the caller
    /// runs the tools and asks again.
    pub fn into_reply(self, mut contents: Vec<Turn>) -> Result<ChatReply, LlmError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        if parts.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        let answer = Turn {
            role: TurnRole::Model,
            parts,
        };
        let text = answer.text();
        contents.push(answer);

        // No totalTokenCount means nothing is charged.
        let usage = self.usage_metadata.and_then(|u| {
            u.total_token_count.map(|total| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: total,
            })
        });

        Ok(ChatReply {
            text,
            history: contents,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Turn::user("hi")],
            system_instruction: Some(SystemInstruction {
                parts: vec![Part::text("be brief")],
            }),
            generation_config: GenerationConfig {
                temperature: 1.0,
                max_output_tokens: 100,
            },
            tools: Vec::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "generationConfig": {"temperature": 1.0, "maxOutputTokens": 100}
            })
        );
    }

    #[test]
    fn test_response_into_reply() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let reply = response.into_reply(vec![Turn::user("hi")]).unwrap();

        assert_eq!(reply.text, "Hello there");
        assert_eq!(reply.history.len(), 2);
        assert_eq!(reply.history[1].role, TurnRole::Model);
        assert_eq!(reply.tokens_used(), 6);
        assert_eq!(reply.usage.unwrap().prompt_tokens, 4);
    }

    #[test]
    fn test_missing_usage_charges_nothing() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let reply = response.into_reply(vec![Turn::user("hi")]).unwrap();
        assert!(reply.usage.is_none());
        assert_eq!(reply.tokens_used(), 0);
    }

    #[test]
    fn test_function_call_turn_is_exposed_to_caller() {
        let body = r#"{"candidates": [{"content": {"role": "model", "parts": [
            {"functionCall": {"name": "lookup", "args": {"q": "rust"}}}
        ]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let step = response.into_reply(vec![Turn::user("search")]).unwrap();
        let calls = step.history[1].function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args["q"], "rust");
    }

    #[test]
    fn test_tools_serialize_as_function_declarations() {
        let request = GenerateContentRequest {
            contents: Vec::new(),
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 1.0,
                max_output_tokens: 10,
            },
            tools: vec![ToolSet {
                function_declarations: vec![FunctionDeclaration {
                    name: "current_time".to_string(),
                    description: "Now.".to_string(),
                    parameters: None,
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["tools"],
            serde_json::json!([{"functionDeclarations": [{"name": "current_time", "description": "Now."}]}])
        );
    }

    #[test]
    fn test_no_candidates_is_empty_response() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"usageMetadata": {"totalTokenCount": 3}}"#).unwrap();
        assert!(matches!(
            response.into_reply(Vec::new()),
            Err(LlmError::EmptyResponse)
        ));

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(matches!(
            blocked.into_reply(Vec::new()),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_error_envelope_parses() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.code, 400);
        assert_eq!(parsed.error.status.as_deref(), Some("INVALID_ARGUMENT"));
    }
}
