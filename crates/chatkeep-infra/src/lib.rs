//! Infrastructure layer for chatkeep.
//!
//! Contains implementations of the ports defined in `chatkeep-core`: the
//! SQLite session repository, the Gemini chat backend, and the
//! configuration file loader.

pub mod config;
pub mod llm;
pub mod sqlite;
