//! ChatBackend trait definition.
//!
//! The LLM is an external collaborator: it receives a history and a prompt and
//! returns the answer, the extended history, and the tokens it consumed. It
//! holds no session state of its own.

use chatkeep_types::llm::{ChatReply, LlmError, Turn};

/// Stateless chat backend (Gemini, test doubles).
///
/// Implementations own their own request timeout; a timeout is reported as
/// an ordinary [`LlmError`]. Callers must not retry inside a chat turn.
pub trait ChatBackend: Send + Sync {
    /// Human-readable backend name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Continue `history` with `prompt`.
    fn chat(
        &self,
        history: &[Turn],
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<ChatReply, LlmError>> + Send;

    /// One-off generation with no history.
    fn generate(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;
}
