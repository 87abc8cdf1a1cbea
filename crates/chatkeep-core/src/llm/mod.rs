//! Chat backend abstraction and the tools a backend may expose.

pub mod backend;
pub mod tools;
