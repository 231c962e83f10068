//! Tubely Infrastructure Library
//!
//! Shared infrastructure for Tubely binaries. Currently this is telemetry
//! initialisation: a `tracing` subscriber with an `EnvFilter` and either
//! human-readable or JSON output.

#[cfg(feature = "observability-basic")]
pub mod telemetry;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat, TelemetryConfig};
