//! Telemetry initialization
//!
//! Installs the global `tracing` subscriber. Call once at process start.

mod init_basic;

pub use init_basic::{init_telemetry, LogFormat, TelemetryConfig};
