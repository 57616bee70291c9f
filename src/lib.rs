//! burdencascade — CLI support: configuration, argument parsing, pipeline wiring.
//!
//! Shared between the binary and the integration tests.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod telemetry;
pub mod timearg;
