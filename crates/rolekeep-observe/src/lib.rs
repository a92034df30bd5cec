//! Observability setup for rolekeep: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
