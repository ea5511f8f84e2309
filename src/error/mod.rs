//! Error type shared by every layer of the harness
//!
//! Each variant carries a human-readable message. The variant decides the log
//! category, the process exit code and the console color.

use colored::{Color, Colorize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid options, bad `.env` content
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection refused, reset or unresolved host
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered outside 2xx/3xx
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Output directory and result files
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parsing error: {0}")]
    Parse(String),

    /// A worker panicked, was cancelled or never reported
    #[error("Worker error: {0}")]
    Worker(String),

    /// Nothing to aggregate
    #[error("Statistics error: {0}")]
    Statistics(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

macro_rules! constructors {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant(message.into())
            }
        )*
    };
}

impl AppError {
    constructors! {
        config => Config,
        network => Network,
        http_request => HttpRequest,
        timeout => Timeout,
        io => Io,
        parse => Parse,
        worker => Worker,
        statistics => Statistics,
        internal => Internal,
    }

    /// Short tag used in log records and console output
    pub fn category(&self) -> &'static str {
        self.traits().0
    }

    /// Process exit status when this error ends the run
    pub fn exit_code(&self) -> i32 {
        self.traits().1
    }

    /// `[CATEGORY] message`, tinted by severity when `use_color` is set
    pub fn format_for_console(&self, use_color: bool) -> String {
        let (category, _, color) = self.traits();
        if use_color {
            format!("[{}] {}", category.color(color).bold(), self.to_string().color(color))
        } else {
            format!("[{}] {}", category, self)
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::Network(m)
            | Self::HttpRequest(m)
            | Self::Timeout(m)
            | Self::Io(m)
            | Self::Parse(m)
            | Self::Worker(m)
            | Self::Statistics(m)
            | Self::Internal(m) => m,
        }
    }

    /// Same variant with `prefix: ` in front of the message
    fn prefixed(self, prefix: &str) -> Self {
        let message = format!("{}: {}", prefix, self.message());
        match self {
            Self::Config(_) => Self::Config(message),
            Self::Network(_) => Self::Network(message),
            Self::HttpRequest(_) => Self::HttpRequest(message),
            Self::Timeout(_) => Self::Timeout(message),
            Self::Io(_) => Self::Io(message),
            Self::Parse(_) => Self::Parse(message),
            Self::Worker(_) => Self::Worker(message),
            Self::Statistics(_) => Self::Statistics(message),
            Self::Internal(_) => Self::Internal(message),
        }
    }

    fn traits(&self) -> (&'static str, i32, Color) {
        match self {
            Self::Config(_) => ("CONFIG", 1, Color::Red),
            Self::Parse(_) => ("PARSE", 1, Color::Red),
            Self::Network(_) => ("NETWORK", 2, Color::Yellow),
            Self::HttpRequest(_) => ("HTTP", 2, Color::Yellow),
            Self::Timeout(_) => ("TIMEOUT", 3, Color::Blue),
            Self::Io(_) => ("IO", 5, Color::Cyan),
            Self::Worker(_) => ("WORKER", 6, Color::Cyan),
            Self::Statistics(_) => ("STATS", 6, Color::Cyan),
            Self::Internal(_) => ("INTERNAL", 99, Color::BrightRed),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("not an integer ({})", error))
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("invalid server URL ({})", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("invalid JSON ({})", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!(".env file: {}", error))
    }
}

/// Connect and request failures count as network errors so the exit code
/// tells an unreachable server apart from a misbehaving one
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        let text = error.to_string();
        if error.is_timeout() {
            Self::Timeout(text)
        } else if error.is_connect() || error.is_request() {
            Self::Network(text)
        } else {
            Self::HttpRequest(text)
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        let what = if error.is_panic() { "panicked" } else { "was cancelled" };
        Self::worker(format!("worker task {}: {}", what, error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(format!("{:#}", error))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Prefix an error with what was being attempted, keeping its variant
pub trait ErrorContext<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().prefixed(&f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn one_of_each() -> Vec<AppError> {
        vec![
            AppError::config("c"),
            AppError::network("n"),
            AppError::http_request("h"),
            AppError::timeout("t"),
            AppError::io("i"),
            AppError::parse("p"),
            AppError::worker("w"),
            AppError::statistics("s"),
            AppError::internal("x"),
        ]
    }

    #[test]
    fn test_category_and_exit_code_table() {
        let table: Vec<(&str, i32)> = one_of_each().iter().map(|e| (e.category(), e.exit_code())).collect();
        assert_eq!(
            table,
            vec![
                ("CONFIG", 1),
                ("NETWORK", 2),
                ("HTTP", 2),
                ("TIMEOUT", 3),
                ("IO", 5),
                ("PARSE", 1),
                ("WORKER", 6),
                ("STATS", 6),
                ("INTERNAL", 99),
            ]
        );
    }

    #[test]
    fn test_display_includes_message() {
        let error = AppError::statistics("no measurements collected");
        assert_eq!(error.to_string(), "Statistics error: no measurements collected");
    }

    #[test]
    fn test_conversions() {
        let error: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(error.category(), "IO");

        let error: AppError = "eighty".parse::<u16>().unwrap_err().into();
        assert_eq!(error.category(), "PARSE");

        let error: AppError = url::Url::parse("http://").unwrap_err().into();
        assert!(error.to_string().contains("invalid server URL"));

        let error: AppError = anyhow::anyhow!("low level").context("high level").into();
        assert_eq!(error.to_string(), "Internal error: high level: low level");
    }

    #[tokio::test]
    async fn test_panicked_task_becomes_worker_error() {
        let join_error = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        let error = AppError::from(join_error);
        assert_eq!(error.category(), "WORKER");
        assert!(error.to_string().contains("panicked"));
    }

    #[test]
    fn test_context_keeps_the_variant() {
        let io_failure: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let error = io_failure.with_context(|| "Failed to create test_2_3.csv".to_string()).unwrap_err();
        assert_eq!(error.exit_code(), 5);
        assert_eq!(error.to_string(), "I/O error: Failed to create test_2_3.csv: denied");

        let harvest: Result<()> = Err(AppError::worker("lost"));
        let error = harvest.with_context(|| "Harvest".to_string()).unwrap_err();
        assert!(matches!(error, AppError::Worker(ref m) if m == "Harvest: lost"));
    }

    #[test]
    fn test_console_format() {
        let error = AppError::config("missing --nb-children");
        assert_eq!(error.format_for_console(false), "[CONFIG] Configuration error: missing --nb-children");
        assert!(error.format_for_console(true).contains("missing --nb-children"));
    }
}
