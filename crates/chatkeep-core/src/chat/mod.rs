//! Chat sessions: persistence port, history windowing, and the lifecycle
//! manager that ties them to a chat backend.

pub mod history;
pub mod repository;
pub mod service;
