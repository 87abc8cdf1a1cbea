//! Observability setup for chatkeep: tracing subscriber and optional
//! OpenTelemetry export.

pub mod tracing_setup;
