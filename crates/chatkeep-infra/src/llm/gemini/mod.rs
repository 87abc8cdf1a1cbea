//! Google Gemini chat backend.
//!
//! This module provides the [`GeminiBackend`] which implements the
//! [`ChatBackend`](chatkeep_core::llm::backend::ChatBackend) trait for the
//! Gemini `generateContent` REST API.

pub mod client;
pub mod types;

pub use client::GeminiBackend;
