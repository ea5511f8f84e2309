//! Environment variables and `.env` file handling

use crate::{
    error::{AppError, Result},
    logging::{LogFormat, LogLevel},
    models::ConnectionMode,
};
use std::path::{Path, PathBuf};

pub const ENV_NB_CHILDREN: &str = "LOAD_NB_CHILDREN";
pub const ENV_NB_ITERATIONS: &str = "LOAD_NB_ITERATIONS";
pub const ENV_SERVER_IP: &str = "LOAD_SERVER_IP";
pub const ENV_SERVER_PORT: &str = "LOAD_SERVER_PORT";
pub const ENV_CONNECTION_MODE: &str = "LOAD_CONNECTION_MODE";
pub const ENV_OUTPUT_DIRECTORY: &str = "LOAD_OUTPUT_DIRECTORY";
pub const ENV_LOG_LEVEL: &str = "LOAD_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOAD_LOG_FORMAT";
pub const ENV_REQUEST_TIMEOUT: &str = "LOAD_REQUEST_TIMEOUT";
pub const ENV_HARVEST_TIMEOUT: &str = "LOAD_HARVEST_TIMEOUT";
pub const ENV_ENABLE_COLOR: &str = "LOAD_ENABLE_COLOR";

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the current directory if it exists
    ///
    /// Variables already set in the process environment are left untouched.
    /// Returns whether a file was loaded.
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        dotenv::from_filename(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok(true)
    }

    /// Example `.env` content
    pub fn create_example_env_content() -> String {
        r#"# Meter Load Tester Configuration
#
# Values here are used when the matching command-line flag is absent.

# Number of concurrent workers
# LOAD_NB_CHILDREN=10

# Sequential requests per worker
# LOAD_NB_ITERATIONS=100

# Target server
# LOAD_SERVER_IP=127.0.0.1
# LOAD_SERVER_PORT=8080

# REUSE_SESSION keeps one connection per worker, NO_REUSE_SESSION opens one per request
# LOAD_CONNECTION_MODE=NO_REUSE_SESSION

# Directory receiving test_<children>_<iterations>.csv and .stat
# LOAD_OUTPUT_DIRECTORY=/tmp

# TRACE, DEBUG, INFO, WARN or ERR
# LOAD_LOG_LEVEL=INFO

# console, json or compact
# LOAD_LOG_FORMAT=console

# Per-request timeout and per-worker harvest timeout, in seconds
# LOAD_REQUEST_TIMEOUT=60
# LOAD_HARVEST_TIMEOUT=600

# LOAD_ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Validate one variable's format
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            ENV_NB_CHILDREN | ENV_NB_ITERATIONS => {
                let count: u32 = parse_value(key, value)?;
                if count == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            ENV_SERVER_PORT => {
                let port: u16 = parse_value(key, value)?;
                if port == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            ENV_SERVER_IP | ENV_OUTPUT_DIRECTORY => {
                if value.trim().is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            ENV_CONNECTION_MODE => {
                value.parse::<ConnectionMode>()
                    .map_err(|e| AppError::config(format!("{}: {}", key, e)))?;
            }
            ENV_LOG_LEVEL => {
                value.parse::<LogLevel>()
                    .map_err(|e| AppError::config(format!("{}: {}", key, e)))?;
            }
            ENV_LOG_FORMAT => {
                value.parse::<LogFormat>()
                    .map_err(|e| AppError::config(format!("{}: {}", key, e)))?;
            }
            ENV_REQUEST_TIMEOUT | ENV_HARVEST_TIMEOUT => {
                let seconds: u64 = parse_value(key, value)?;
                if seconds == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            ENV_ENABLE_COLOR => {
                parse_value::<bool>(key, value)?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Supported variables with a description and an example value
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            (ENV_NB_CHILDREN, "Number of concurrent workers", "10"),
            (ENV_NB_ITERATIONS, "Sequential requests per worker", "100"),
            (ENV_SERVER_IP, "Target server host or IP", "127.0.0.1"),
            (ENV_SERVER_PORT, "Target server port", "8080"),
            (ENV_CONNECTION_MODE, "REUSE_SESSION or NO_REUSE_SESSION", "NO_REUSE_SESSION"),
            (ENV_OUTPUT_DIRECTORY, "Directory for result files", "/tmp"),
            (ENV_LOG_LEVEL, "TRACE, DEBUG, INFO, WARN or ERR", "INFO"),
            (ENV_LOG_FORMAT, "console, json or compact", "console"),
            (ENV_REQUEST_TIMEOUT, "Per-request timeout in seconds", "60"),
            (ENV_HARVEST_TIMEOUT, "Per-worker harvest timeout in seconds", "600"),
            (ENV_ENABLE_COLOR, "Enable colored output", "true"),
        ]
    }

    /// Environment variable help text
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<22} {}\n", var, description));
            help.push_str(&format!("  {:<22} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

/// Values found in the environment, all optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub nb_children: Option<u32>,
    pub nb_iterations: Option<u32>,
    pub server_ip: Option<String>,
    pub server_port: Option<u16>,
    pub connection_mode: Option<ConnectionMode>,
    pub output_directory: Option<PathBuf>,
    pub log_level: Option<LogLevel>,
    pub log_format: Option<LogFormat>,
    pub request_timeout: Option<u64>,
    pub harvest_timeout: Option<u64>,
    pub enable_color: Option<bool>,
}

impl EnvOverrides {
    /// Read through an arbitrary lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Result<Option<String>> {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(value) => {
                    EnvManager::validate_env_var(key, &value)?;
                    Ok(Some(value.trim().to_string()))
                }
                None => Ok(None),
            }
        };

        Ok(Self {
            nb_children: get(ENV_NB_CHILDREN)?.map(|v| parse_value(ENV_NB_CHILDREN, &v)).transpose()?,
            nb_iterations: get(ENV_NB_ITERATIONS)?.map(|v| parse_value(ENV_NB_ITERATIONS, &v)).transpose()?,
            server_ip: get(ENV_SERVER_IP)?,
            server_port: get(ENV_SERVER_PORT)?.map(|v| parse_value(ENV_SERVER_PORT, &v)).transpose()?,
            connection_mode: get(ENV_CONNECTION_MODE)?.map(|v| v.parse()).transpose()?,
            output_directory: get(ENV_OUTPUT_DIRECTORY)?.map(PathBuf::from),
            log_level: get(ENV_LOG_LEVEL)?.map(|v| v.parse()).transpose()?,
            log_format: get(ENV_LOG_FORMAT)?.map(|v| v.parse()).transpose()?,
            request_timeout: get(ENV_REQUEST_TIMEOUT)?.map(|v| parse_value(ENV_REQUEST_TIMEOUT, &v)).transpose()?,
            harvest_timeout: get(ENV_HARVEST_TIMEOUT)?.map(|v| parse_value(ENV_HARVEST_TIMEOUT, &v)).transpose()?,
            enable_color: get(ENV_ENABLE_COLOR)?.map(|v| parse_value(ENV_ENABLE_COLOR, &v)).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var(ENV_NB_CHILDREN, "10").is_ok());
        assert!(EnvManager::validate_env_var(ENV_SERVER_PORT, "8080").is_ok());
        assert!(EnvManager::validate_env_var(ENV_CONNECTION_MODE, "REUSE_SESSION").is_ok());
        assert!(EnvManager::validate_env_var(ENV_LOG_LEVEL, "ERR").is_ok());
        assert!(EnvManager::validate_env_var(ENV_ENABLE_COLOR, "false").is_ok());

        assert!(EnvManager::validate_env_var(ENV_NB_CHILDREN, "0").is_err());
        assert!(EnvManager::validate_env_var(ENV_NB_ITERATIONS, "lots").is_err());
        assert!(EnvManager::validate_env_var(ENV_SERVER_PORT, "65536").is_err());
        assert!(EnvManager::validate_env_var(ENV_CONNECTION_MODE, "SOMETIMES").is_err());
        assert!(EnvManager::validate_env_var(ENV_LOG_LEVEL, "LOUD").is_err());
        assert!(EnvManager::validate_env_var(ENV_REQUEST_TIMEOUT, "0").is_err());

        // Unknown keys are ignored
        assert!(EnvManager::validate_env_var("PATH", "whatever").is_ok());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let overrides = EnvOverrides::from_lookup(lookup(&[
            (ENV_NB_CHILDREN, "4"),
            (ENV_NB_ITERATIONS, " 25 "),
            (ENV_SERVER_IP, "10.1.2.3"),
            (ENV_SERVER_PORT, "8080"),
            (ENV_CONNECTION_MODE, "REUSE_SESSION"),
            (ENV_OUTPUT_DIRECTORY, "/var/tmp"),
            (ENV_LOG_LEVEL, "DEBUG"),
            (ENV_HARVEST_TIMEOUT, "90"),
        ]))
        .unwrap();

        assert_eq!(overrides.nb_children, Some(4));
        assert_eq!(overrides.nb_iterations, Some(25));
        assert_eq!(overrides.server_ip.as_deref(), Some("10.1.2.3"));
        assert_eq!(overrides.server_port, Some(8080));
        assert_eq!(overrides.connection_mode, Some(ConnectionMode::Reuse));
        assert_eq!(overrides.output_directory, Some(PathBuf::from("/var/tmp")));
        assert_eq!(overrides.log_level, Some(LogLevel::Debug));
        assert_eq!(overrides.harvest_timeout, Some(90));
        assert!(overrides.log_format.is_none());
        assert!(overrides.enable_color.is_none());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let overrides = EnvOverrides::from_lookup(lookup(&[(ENV_SERVER_IP, "  "), (ENV_NB_CHILDREN, "")])).unwrap();
        assert_eq!(overrides, EnvOverrides::default());
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let error = EnvOverrides::from_lookup(lookup(&[(ENV_SERVER_PORT, "http")])).unwrap_err();
        assert_eq!(error.category(), "CONFIG");
        assert!(error.to_string().contains(ENV_SERVER_PORT));
    }

    #[test]
    fn test_load_env_file_from() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "LOAD_TEST_ONLY_MARKER=from_file").unwrap();

        assert!(EnvManager::load_env_file_from(file.path()).unwrap());
        assert_eq!(std::env::var("LOAD_TEST_ONLY_MARKER").unwrap(), "from_file");

        let missing = file.path().with_extension("absent");
        assert!(!EnvManager::load_env_file_from(&missing).unwrap());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains(ENV_NB_CHILDREN));
        assert!(help.contains("Configuration Priority"));
    }
}
