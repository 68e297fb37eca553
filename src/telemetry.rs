//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; hosts that have no subscriber of
//! their own can install one here.
//!
//! ```rust,ignore
//! use siumai_azure_stream::telemetry::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! let _guard = init_subscriber(
//!     SubscriberConfig::builder()
//!         .log_level(tracing::Level::DEBUG)
//!         .output_format(OutputFormat::Json)
//!         .build(),
//! )?;
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::LlmError;

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonCompact,
}

impl std::str::FromStr for OutputFormat {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            other => Err(LlmError::ConfigurationError(format!(
                "Invalid log format: {other}. Valid options: text, json, json-compact"
            ))),
        }
    }
}

/// Configuration for tracing subscriber
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Write to stderr when no log file is set.
    pub enable_console: bool,
    /// Log file; written through a non-blocking appender.
    pub log_file: Option<PathBuf>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            enable_console: true,
            log_file: None,
        }
    }
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Self::default()
        }
    }
}

/// Builder for SubscriberConfig
#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    enable_console: Option<bool>,
    log_file: Option<PathBuf>,
}

impl SubscriberConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn log_level_str(mut self, level: &str) -> Result<Self, LlmError> {
        self.log_level = Some(parse_level(level)?);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = Some(enable);
        self
    }

    pub fn log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    pub fn build(self) -> SubscriberConfig {
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            enable_console: self.enable_console.unwrap_or(true),
            log_file: self.log_file,
        }
    }
}

fn parse_level(level: &str) -> Result<tracing::Level, LlmError> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(tracing::Level::TRACE),
        "debug" => Ok(tracing::Level::DEBUG),
        "info" => Ok(tracing::Level::INFO),
        "warn" => Ok(tracing::Level::WARN),
        "error" => Ok(tracing::Level::ERROR),
        _ => Err(LlmError::ConfigurationError(format!(
            "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
        ))),
    }
}

fn file_writer(path: &std::path::Path) -> Result<(BoxMakeWriter, WorkerGuard), LlmError> {
    let file_name = path.file_name().ok_or_else(|| {
        LlmError::ConfigurationError(format!("log file path '{}' has no file name", path.display()))
    })?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(writer), guard))
}

/// Install a global subscriber.
///
/// Returns the appender guard when logging to a file; keep it alive for as
/// long as logs should be flushed. An already installed global subscriber is
/// not an error.
pub fn init_subscriber(config: SubscriberConfig) -> Result<Option<WorkerGuard>, LlmError> {
    let level = config.log_level.as_str().to_lowercase();
    let filter = format!("siumai_azure_stream={level}");

    let (writer, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            (writer, Some(guard))
        }
        None if config.enable_console => (BoxMakeWriter::new(std::io::stderr), None),
        None => return Ok(None),
    };
    let ansi = guard.is_none();

    let init_result = match config.output_format {
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .try_init(),
        OutputFormat::JsonCompact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .json()
            .flatten_event(true)
            .try_init(),
        OutputFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .try_init(),
    };

    match init_result {
        Ok(()) => Ok(guard),
        Err(e) if already_initialized(&e.to_string()) => Ok(guard),
        Err(e) => Err(LlmError::InternalError(format!(
            "Failed to initialize tracing: {e}"
        ))),
    }
}

// Either the tracing dispatcher or the `log` bridge was installed earlier.
fn already_initialized(message: &str) -> bool {
    message.contains("global default trace dispatcher has already been set")
        || message.contains("logging system was already initialized")
}

/// Initialize from environment variables
///
/// - `SIUMAI_LOG_LEVEL`: trace, debug, info, warn, error
/// - `SIUMAI_LOG_FORMAT`: text, json, json-compact
/// - `SIUMAI_LOG_FILE`: log file path
pub fn init_from_env() -> Result<Option<WorkerGuard>, LlmError> {
    let mut builder = SubscriberConfig::builder();
    if let Ok(level) = std::env::var("SIUMAI_LOG_LEVEL") {
        builder = builder.log_level_str(&level)?;
    }
    if let Ok(format) = std::env::var("SIUMAI_LOG_FORMAT") {
        builder = builder.output_format(format.parse()?);
    }
    if let Ok(file) = std::env::var("SIUMAI_LOG_FILE") {
        builder = builder.log_file(PathBuf::from(file));
    }
    init_subscriber(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_and_formats() {
        assert_eq!(parse_level("DEBUG").unwrap(), tracing::Level::DEBUG);
        assert!(parse_level("verbose").is_err());
        assert_eq!("json-compact".parse::<OutputFormat>().unwrap(), OutputFormat::JsonCompact);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn builder_defaults() {
        let config = SubscriberConfig::builder().build();
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert_eq!(config.output_format, OutputFormat::Text);
        assert!(config.enable_console);
    }

    // Installing a global subscriber here would clash with `traced_test`.
    #[test]
    fn file_writer_creates_the_log_file() {
        use std::io::Write;
        use tracing_subscriber::fmt::MakeWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.log");
        let (writer, guard) = file_writer(&path).unwrap();
        writer.make_writer().write_all(b"hello\n").unwrap();
        drop(guard);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn file_writer_rejects_paths_without_a_name() {
        assert!(file_writer(std::path::Path::new("/")).is_err());
    }

    #[test]
    fn console_disabled_without_file_is_a_no_op() {
        let config = SubscriberConfig::builder().enable_console(false).build();
        assert!(init_subscriber(config).unwrap().is_none());
    }
}
