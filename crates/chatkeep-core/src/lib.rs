//! Session lifecycle logic and port definitions for chatkeep.
//!
//! This crate defines the repository and backend traits that the
//! infrastructure layer implements. It depends only on `chatkeep-types`,
//! never on `chatkeep-infra` or any database/IO crate.

pub mod chat;
pub mod llm;
