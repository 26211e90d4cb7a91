//! Tracing subscriber setup.
//!
//! Two output modes:
//! - `pretty`: human-readable lines for terminals
//! - `json`: one JSON object per event for log aggregation
//!
//! `RUST_LOG` takes precedence over the configured level. Logs go to
//! stderr so `--mode detect` output on stdout stays machine-readable.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log format mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty-printed human-readable logs (default).
    #[default]
    Pretty,
    /// JSON-formatted logs for production.
    Json,
}

/// Filter directives for a bare level such as `debug`.
///
/// A value that already contains directives (`=` or `,`) is used verbatim.
pub fn filter_directives(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!(
        "featurecache_server={lvl},featurecache_api={lvl},appstate={lvl},storage={lvl},feature_detector={lvl},tower_http={lvl}",
        lvl = level
    )
}

/// Install the global subscriber. Call once, at startup.
pub fn init(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_current_span(true)
                        .with_target(true),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_expands_to_crate_directives() {
        let directives = filter_directives("debug");
        assert!(directives.contains("appstate=debug"));
        assert!(directives.contains("tower_http=debug"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_explicit_directives_pass_through() {
        assert_eq!(filter_directives("appstate=trace"), "appstate=trace");
    }

    #[test]
    fn test_log_format_from_toml_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: LogFormat,
        }
        let parsed: Wrapper = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(parsed.format, LogFormat::Json);
    }
}
