//! Support code for the `tubely` binary.

pub mod records;

pub use records::JsonFileRepository;

use anyhow::Context;
use serde::Serialize;
use tubely_infra::{init_telemetry, TelemetryConfig};

/// Initialize tracing for CLI binaries. Honors `RUST_LOG` and `LOG_FORMAT`.
pub fn init_tracing(environment: &str) -> anyhow::Result<()> {
    let config = TelemetryConfig::new("tubely-cli", environment)
        .with_env_format()
        .map_err(anyhow::Error::msg)?;
    init_telemetry(&config).map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(1024), "1.0 KiB");
        assert_eq!(format_size(1536 * 1024), "1.5 MiB");
        assert_eq!(format_size(1 << 30), "1.0 GiB");
    }
}
