//! Logging configuration and initialization
//!
//! The harness logs through `tracing`; this module installs the global
//! subscriber once per process. Console output is human-readable or JSON,
//! and an optional log file always receives JSON lines.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard tracing filter, wins over everything else
//!   (e.g. "info", "nnhal_vts::driver=debug")
//! - `NNHAL_VTS_LOG_LEVEL`: Simple level (error, warn, info, debug, trace)
//! - `NNHAL_VTS_LOG_FORMAT`: Console format ("human" or "json")
//! - `NNHAL_VTS_LOG_FILE`: Optional JSON log file

use once_cell::sync::OnceCell;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

static TRACING_INITIALIZED: OnceCell<()> = OnceCell::new();

pub const LOG_LEVEL_ENV: &str = "NNHAL_VTS_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "NNHAL_VTS_LOG_FORMAT";
pub const LOG_FILE_ENV: &str = "NNHAL_VTS_LOG_FILE";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),

    #[error("failed to create log directory: {0}")]
    DirectoryCreationFailed(String),

    #[error("failed to open log file: {0}")]
    FileOpenFailed(String),

    /// Another global subscriber was installed first
    #[error("failed to install subscriber: {0}")]
    SubscriberInit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    /// Default: case verdicts and run summary only
    #[default]
    Warn,
    Info,
    /// Lifecycle transitions of every case
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLogLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human" | "pretty" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidLogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include source file and line
    pub with_file_info: bool,
    /// Emit an event when each case span closes
    pub with_span_events: bool,
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `NNHAL_VTS_LOG_*`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, LoggingError> {
        let mut config = Self::new();
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            config.level = level.parse()?;
        }
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }
        if let Ok(file) = std::env::var(LOG_FILE_ENV) {
            if !file.is_empty() {
                config.log_file = Some(PathBuf::from(file));
            }
        }
        Ok(config)
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_info(mut self, with_file_info: bool) -> Self {
        self.with_file_info = with_file_info;
        self
    }

    pub fn with_span_events(mut self, with_span_events: bool) -> Self {
        self.with_span_events = with_span_events;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

/// Install the global subscriber described by `config`.
///
/// Idempotent: returns `Ok(false)` without touching anything if logging was
/// already initialized by an earlier call.
pub fn init_with_config(config: &LoggingConfig) -> Result<bool, LoggingError> {
    if TRACING_INITIALIZED.get().is_some() {
        return Ok(false);
    }
    let mut installed = false;
    TRACING_INITIALIZED.get_or_try_init(|| {
        install(config)?;
        installed = true;
        Ok::<(), LoggingError>(())
    })?;
    Ok(installed)
}

/// Initialize from the environment, see the module docs.
pub fn init_logging_from_env() -> Result<bool, LoggingError> {
    init_with_config(&LoggingConfig::from_env()?)
}

/// Best-effort initialization for tests and examples; errors are dropped.
pub fn init_logging_default() {
    let _ = init_logging_from_env();
}

pub fn is_initialized() -> bool {
    TRACING_INITIALIZED.get().is_some()
}

fn install(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_env_filter(config.level)?;
    let spans = if config.with_span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let console = match config.format {
        LogFormat::Human => fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info)
            .with_span_events(spans.clone())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(false)
            .with_thread_names(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info)
            .with_span_events(spans.clone())
            .boxed(),
    };
    layers.push(console);

    if let Some(path) = &config.log_file {
        let file = open_log_file(path)?;
        layers.push(
            fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(spans)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::SubscriberInit(e.to_string()))
}

/// Open `path` for appending, creating parent directories as needed.
pub(crate) fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| LoggingError::DirectoryCreationFailed(e.to_string()))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggingError::FileOpenFailed(format!("{}: {}", path.display(), e)))
}

/// `RUST_LOG` if set, otherwise `level`.
fn build_env_filter(level: LogLevel) -> Result<EnvFilter, LoggingError> {
    match std::env::var("RUST_LOG") {
        Ok(rust_log) => {
            EnvFilter::try_new(rust_log).map_err(|e| LoggingError::InvalidLogLevel(e.to_string()))
        }
        Err(_) => Ok(EnvFilter::new(level.as_filter_str())),
    }
}
