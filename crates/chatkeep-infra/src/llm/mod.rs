//! Chat backend implementations.
//!
//! Contains the concrete [`ChatBackend`](chatkeep_core::llm::backend::ChatBackend)
//! used in production: Google Gemini over REST.

pub mod gemini;
