//! Logging initialization and configuration.
//!
//! Uses the `tracing` ecosystem for structured logging with support for
//! both human-readable and JSON output formats.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// # Arguments
///
/// * `level` - Default filter directive when RUST_LOG is unset (e.g. "info").
/// * `json_format` - If true, outputs structured JSON logs; otherwise pretty-printed.
///
/// # Notes
///
/// - Log output goes to stderr (stdout is reserved for summaries)
/// - The RUST_LOG environment variable can override the log level
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        // JSON format for machine parsing
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty format for humans
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section.
///
/// `--verbose` forces debug level; `--json-logs` forces JSON output.
pub fn init_from_config(
    config: &loraprep_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = resolve_level(&config.logging.level, verbose_override);
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}

fn resolve_level(configured: &str, verbose: bool) -> &str {
    match configured {
        _ if verbose && configured != "trace" => "debug",
        "error" | "warn" | "info" | "debug" | "trace" => configured,
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_level() {
        assert_eq!(resolve_level("info", false), "info");
        assert_eq!(resolve_level("warn", true), "debug");
        assert_eq!(resolve_level("trace", true), "trace");
        assert_eq!(resolve_level("loud", false), "info");
    }
}
