//! Structured logging for the load harness
//!
//! A [`Logger`] is an ordinary value handed to each component when it is
//! built, usually behind an `Arc`. Loggers made by one [`LoggerFactory`] share
//! a session id. Records are rendered as console
//! lines, JSON objects or terse one-liners; warnings and worse go to stderr.

use crate::error::{AppError, Result};
use crate::models::{AppConfig, Measurement};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Severity of a record, ordered from chattiest to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    /// One line per request
    Debug,
    /// Run progress
    Info,
    /// Degraded but continuing
    Warn,
    /// A failure the harness absorbed
    Error,
    Fatal,
}

impl LogLevel {
    const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        ["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "FATAL"][*self as usize]
    }

    /// Level name padded to five columns and tinted for a terminal
    fn painted(&self) -> ColoredString {
        let label = format!("{:>5}", self.as_str());
        match self {
            LogLevel::Trace => label.dimmed(),
            LogLevel::Debug => label.cyan(),
            LogLevel::Info => label.green(),
            LogLevel::Warn => label.yellow().bold(),
            LogLevel::Error => label.red().bold(),
            LogLevel::Fatal => label.magenta().bold(),
        }
    }

    fn is_stderr(&self) -> bool {
        *self >= LogLevel::Warn
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    /// Accepts any case plus the `ERR` and `WARNING` spellings
    fn from_str(s: &str) -> Result<Self> {
        let wanted = match s.trim().to_ascii_uppercase().as_str() {
            "ERR" => "ERROR".to_string(),
            "WARNING" => "WARN".to_string(),
            other => other.to_string(),
        };
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| AppError::parse(format!("Unknown log level '{}'", s)))
    }
}

/// How records are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Timestamped, aligned, optionally colored lines
    #[default]
    Console,
    /// One JSON object per line
    Json,
    /// `HH:MM:SS L NAME: message`
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("console") {
            Ok(LogFormat::Console)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else if s.eq_ignore_ascii_case("compact") {
            Ok(LogFormat::Compact)
        } else {
            Err(AppError::parse(format!("Unknown log format '{}' (console, json, compact)", s)))
        }
    }
}

/// One rendered event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    /// Name of the emitting logger
    pub target: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
    /// `file:line` of the call site, filled by the `log_*!` macros
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// State shared by a logger and all of its children
#[derive(Debug, Default)]
struct Session {
    id: Option<String>,
}

/// Where rendered records go
#[derive(Debug, Clone)]
enum Sink {
    /// stdout, or stderr from `WARN` up
    Std,
    /// Records kept in memory instead of written
    #[cfg(test)]
    Memory(Arc<std::sync::Mutex<Vec<LogRecord>>>),
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    threshold: LogLevel,
    format: LogFormat,
    color: bool,
    show_origin: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { threshold: LogLevel::Info, format: LogFormat::Console, color: true, show_origin: false }
    }
}

/// Named logger filtering by level and writing to stdout/stderr
pub struct Logger {
    name: String,
    settings: Settings,
    session: Arc<RwLock<Session>>,
    sink: Sink,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self::with_settings(name, Settings::default())
    }

    /// Level, format and color taken from the application settings.
    /// Call sites are shown from `DEBUG` down.
    pub fn with_config(name: String, config: &AppConfig) -> Self {
        Self::with_settings(
            name,
            Settings {
                threshold: config.log_level,
                format: config.log_format,
                color: config.enable_color,
                show_origin: config.log_level <= LogLevel::Debug,
            },
        )
    }

    fn with_settings(name: String, settings: Settings) -> Self {
        Self { name, settings, session: Arc::new(RwLock::new(Session::default())), sink: Sink::Std }
    }

    /// Logger at `level` whose records are collected instead of written
    #[cfg(test)]
    pub(crate) fn capturing(name: &str, level: LogLevel) -> (Self, Arc<std::sync::Mutex<Vec<LogRecord>>>) {
        let records = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut logger = Self::new(name.to_string()).with_level(level);
        logger.sink = Sink::Memory(Arc::clone(&records));
        (logger, records)
    }

    /// Only `FATAL` gets through; used by tests and library callers
    pub fn silent(name: &str) -> Self {
        Self::new(name.to_string()).with_level(LogLevel::Fatal)
    }

    /// Same settings and session under another name
    pub fn child(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            settings: self.settings,
            session: Arc::clone(&self.session),
            sink: self.sink.clone(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.settings.threshold = level;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.settings.threshold
    }

    pub async fn set_session_id(&self, id: impl Into<String>) {
        self.session.write().await.id = Some(id.into());
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            record: LogRecord {
                at: Utc::now(),
                level,
                target: self.name.clone(),
                message: message.to_string(),
                fields: BTreeMap::new(),
                origin: None,
            },
        }
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    async fn emit(&self, mut record: LogRecord) {
        if !self.enabled(record.level) {
            return;
        }

        if let Some(id) = &self.session.read().await.id {
            record.fields.entry("session_id".to_string()).or_insert_with(|| id.clone().into());
        }

        match &self.sink {
            Sink::Std => {
                let line = self.render(&record);
                // A closed pipe must not take the harness down
                if record.level.is_stderr() {
                    let _ = writeln!(std::io::stderr().lock(), "{}", line);
                } else {
                    let _ = writeln!(std::io::stdout().lock(), "{}", line);
                }
            }
            #[cfg(test)]
            Sink::Memory(records) => {
                if let Ok(mut records) = records.lock() {
                    records.push(record);
                }
            }
        }
    }

    fn render(&self, record: &LogRecord) -> String {
        match self.settings.format {
            LogFormat::Console => self.render_console(record),
            LogFormat::Json => serde_json::to_string(record)
                .unwrap_or_else(|e| serde_json::json!({ "message": record.message, "render_error": e.to_string() }).to_string()),
            LogFormat::Compact => format!(
                "{} {} {}: {}",
                record.at.format("%H:%M:%S"),
                &record.level.as_str()[..1],
                record.target,
                record.message
            ),
        }
    }

    fn render_console(&self, record: &LogRecord) -> String {
        let level = if self.settings.color {
            record.level.painted().to_string()
        } else {
            format!("{:>5}", record.level.as_str())
        };

        let mut line = format!(
            "{} {} [{}] {}",
            record.at.format("%Y-%m-%d %H:%M:%S%.3f"),
            level,
            record.target,
            record.message
        );

        if !record.fields.is_empty() {
            let pairs: Vec<String> = record.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            let _ = write!(line, " {{{}}}", pairs.join(", "));
        }

        if self.settings.show_origin {
            if let Some(origin) = &record.origin {
                let _ = write!(line, " @ {}", origin);
            }
        }

        line
    }
}

/// Accumulates fields for one record; nothing is written until [`log`](Self::log)
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    record: LogRecord,
}

impl<'a> LogEntryBuilder<'a> {
    /// Values that fail to serialize are dropped
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.record.fields.insert(key.to_string(), value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32) -> Self {
        self.record.origin = Some(format!("{}:{}", file, line));
        self
    }

    pub fn measurement(self, measurement: &Measurement) -> Self {
        self.field("timestamp", measurement.timestamp)
            .field("duration_s", measurement.duration)
            .field("status", measurement.status.as_str())
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("exit_code", error.exit_code())
    }

    pub async fn log(self) {
        self.logger.emit(self.record).await;
    }
}

/// Per-request trace of the HTTP client
pub struct RequestLogger {
    logger: Logger,
}

impl RequestLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// An answered call, at `DEBUG`; failures go through [`log_failure`](Self::log_failure)
    pub async fn log_request(&self, method: &str, path: &str, status_code: Option<u16>, duration_ms: f64) {
        let status = status_code.map_or_else(|| "no status".to_string(), |code| code.to_string());

        self.logger
            .debug(&format!("{} {} answered {} after {:.1}ms", method, path, status, duration_ms))
            .field("method", method)
            .field("path", path)
            .field("status_code", status_code)
            .field("duration_ms", duration_ms)
            .log()
            .await;
    }

    /// A post that never produced a response
    pub async fn log_failure(&self, method: &str, path: &str, error: &AppError) {
        self.logger
            .error(&format!("Failed to post message {} {}: {}", method, path, error))
            .field("method", method)
            .field("path", path)
            .error_info(error)
            .log()
            .await;
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Run-level faults: lost workers, harvest timeouts, interrupts
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub async fn log_error(&self, error: &AppError, context: Option<&str>) {
        let message = context.map_or_else(|| error.to_string(), |ctx| format!("{}: {}", ctx, error));
        let mut entry = self.logger.error(&message).error_info(error);
        if let Some(ctx) = context {
            entry = entry.field("context", ctx);
        }
        entry.log().await;
    }
}

/// Hands out loggers bound to one run session
pub struct LoggerFactory {
    config: AppConfig,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: AppConfig) -> Self {
        Self { config, session_id: Uuid::new_v4().to_string() }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.as_str()).await;
        logger
    }

    pub async fn create_request_logger(&self) -> RequestLogger {
        RequestLogger::new(self.create_logger("HTTP").await)
    }

    pub async fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger::new(self.create_logger("ERR").await)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// `log_<level>!(logger, "fmt", args..)` formats, records the call site and awaits the write
#[macro_export]
macro_rules! log_at {
    ($method:ident, $logger:expr, $($arg:tt)*) => {
        $logger.$method(&format!($($arg)*)).location(file!(), line!()).log().await
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => { $crate::log_at!(debug, $logger, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => { $crate::log_at!(info, $logger, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => { $crate::log_at!(warn, $logger, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => { $crate::log_at!(error, $logger, $($arg)*) };
}
