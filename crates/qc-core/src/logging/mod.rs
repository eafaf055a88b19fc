//! Structured logging for the study pipeline.
//!
//! Two output modes share one set of event names:
//! - human-readable console output on stderr
//! - JSONL on stderr for machine consumption
//!
//! # Usage
//!
//! ```ignore
//! use qc_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! init_logging(&LogConfig::from_env(None, None));
//!
//! let ctx = LogContext::new(RunId::new()).with_study_id(StudyId::new());
//! let span = ctx.span(Stage::Ingest);
//! let _guard = span.enter();
//! tracing::info!(target: event_names::INGEST_FINISHED, accepted = 812, "catalog ingested");
//! ```
//!
//! stdout is never written; bundles are returned to the caller.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel, ENV_LOG_FORMAT, ENV_LOG_LEVEL};
pub use events::{event_names, Level, LogContext, LogEvent, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` directives are honoured verbatim when present; otherwise the
/// configured level applies to every target. Returns `false` when a global
/// subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .from_env_lossy();

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(use_ansi);
            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
                    .is_ok()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
                    .is_ok()
            }
        }
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(JsonlLayer::stderr())
            .try_init()
            .is_ok(),
    }
}

/// Initialize logging from the environment alone.
pub fn init_default_logging() -> bool {
    init_logging(&LogConfig::from_env(None, None))
}

/// Emit a [`LogEvent`] through `tracing` at its own level, with the event
/// name as target.
///
/// Targets must be static in `tracing`, so the event name is carried as a
/// field and the target is fixed per stage.
pub fn emit(event: &LogEvent) {
    let fields = serde_json::Value::Object(
        event
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    let study = event
        .study_id
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_default();
    macro_rules! at {
        ($mac:ident) => {
            tracing::$mac!(
                target: "qc_core::event",
                event = %event.event,
                run_id = %event.run_id,
                study_id = %study,
                stage = event.stage.as_str(),
                fields = %fields,
                message = %event.message
            )
        };
    }
    match event.level {
        Level::Trace => at!(trace),
        Level::Debug => at!(debug),
        Level::Info => at!(info),
        Level::Warn => at!(warn),
        Level::Error => at!(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Human);
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn second_init_reports_already_installed() {
        let cfg = LogConfig::default().with_level(LogLevel::Off);
        let _ = init_logging(&cfg);
        assert!(!init_logging(&cfg));
    }
}
