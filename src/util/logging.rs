//! Structured logging setup for appbundler
//!
//! Logging goes to stderr through `tracing`, so the artifact path printed on
//! stdout stays machine-readable.
//!
//! # Level resolution
//!
//! The first of these that is set wins:
//! 1. `--log-level <level>`
//! 2. `-v/--verbose` (debug) or `-q/--quiet` (error)
//! 3. `APPBUNDLER_LOG_LEVEL`
//! 4. `info`
//!
//! `APPBUNDLER_LOG_JSON=true` switches to JSON lines and `RUST_LOG`, when set,
//! overrides the per-crate filter entirely.
//!
//! # Example
//!
//! ```no_run
//! use appbundler::util::logging::{self, LoggingConfig};
//!
//! logging::init_logging(LoggingConfig::resolve(Some("debug"), false, false));
//! tracing::info!(action = "gitclone", "Running action");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., appbundler::pipeline) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Build a configuration from command-line flags and the environment
    pub fn resolve(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = if let Some(level_str) = log_level {
            parse_level(level_str)
        } else if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            let level_str =
                env::var("APPBUNDLER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        let use_json = env::var("APPBUNDLER_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level,
            use_json,
            ..Default::default()
        }
    }
}

/// Parses a log level from a string
///
/// Unknown levels fall back to `INFO` with a note on stderr.
///
/// ```
/// use appbundler::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("loud"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn build_filter(level: Level) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let mut filter = EnvFilter::new("warn");
    for directive in [
        format!("appbundler={}", level),
        "hyper=warn".to_string(),
        "reqwest=warn".to_string(),
    ] {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring log directive '{}': {}", directive, e),
        }
    }
    filter
}

/// Initializes the logging system; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}

/// Initializes logging from `APPBUNDLER_LOG_LEVEL` / `APPBUNDLER_LOG_JSON`
pub fn init_from_env() {
    init_logging(LoggingConfig::resolve(None, false, false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level("INFO"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(config.include_target);
        assert!(!config.include_location);
    }

    #[test]
    #[serial]
    fn test_resolve_priority() {
        env::set_var("APPBUNDLER_LOG_LEVEL", "warn");
        assert_eq!(LoggingConfig::resolve(Some("trace"), true, false).level, Level::TRACE);
        assert_eq!(LoggingConfig::resolve(None, true, false).level, Level::DEBUG);
        assert_eq!(LoggingConfig::resolve(None, false, true).level, Level::ERROR);
        assert_eq!(LoggingConfig::resolve(None, false, false).level, Level::WARN);
        env::remove_var("APPBUNDLER_LOG_LEVEL");
        assert_eq!(LoggingConfig::resolve(None, false, false).level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_resolve_json() {
        env::set_var("APPBUNDLER_LOG_JSON", "true");
        assert!(LoggingConfig::resolve(None, false, false).use_json);
        env::set_var("APPBUNDLER_LOG_JSON", "nope");
        assert!(!LoggingConfig::resolve(None, false, false).use_json);
        env::remove_var("APPBUNDLER_LOG_JSON");
    }
}
