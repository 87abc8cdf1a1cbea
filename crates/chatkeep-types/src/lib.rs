//! Shared domain types for chatkeep.
//!
//! Users, chat sessions, conversation history, LLM exchange types,
//! configuration, and the error enums shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod session;
